//! # Overlay-Chain Test Suite
//!
//! Flows that cross subsystem boundaries: two in-process nodes, each with
//! its own admission pipeline and graph storage, syncing a topic over the
//! GASP wire messages.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs        # OverlayNode fixture, transaction builders
//!     └── two_node_sync.rs  # initiator/responder end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ov-tests
//! RUST_LOG=debug cargo test -p ov-tests -- --nocapture
//! ```

pub mod integration;
