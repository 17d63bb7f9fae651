//! # Graph-Aware Temporary Storage Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Stages an unfamiliar transaction and its ancestry while a sync session
//! runs, re-derives the peer's claim that the transaction belongs in the
//! topic, then flattens the staged graph into dependency order and commits
//! it through the admission pipeline.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Session never exceeds its node ceiling | `application/temp_store.rs` - `reserve()` |
//! | Ancestors attach only to staged spenders | `application/temp_store.rs` - `attach()` |
//! | Commit order is ancestors first, root last | `algorithms/ordering.rs` - post-order walk |
//! | A shared ancestor is committed once | `algorithms/ordering.rs` - content de-duplication |
//! | Root must be admitted on replay | `application/storage.rs` - `validate_graph_anchor()` |
//! | Discard and finalize release every node | `application/temp_store.rs` - `remove_session()` |
//!
//! ## Session Lifecycle
//!
//! ```text
//! append root ──→ append ancestors ──→ validate anchor ──→ finalize (Historical submits)
//!                        │                    │
//!                        └── graph full ──────┴── failure ──→ discard
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs - GraphStorageApi trait                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  application/storage.rs    - GaspStorage (one per topic)        │
//! │  application/temp_store.rs - TemporaryGraphStore (shared arena) │
//! │  algorithms/               - bundle rebuild, dependency order   │
//! │  domain/                   - GraphNode, GaspNode, GraphError    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use application::{GaspStorage, TemporaryGraphStore};
pub use config::GraphConfig;
pub use domain::*;
pub use ports::*;
