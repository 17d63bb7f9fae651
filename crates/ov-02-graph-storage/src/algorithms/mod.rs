//! Algorithms module for graph storage
//!
//! Contains:
//! - Bundle reconstruction over a staged graph
//! - Dependency ordering with content de-duplication

pub mod bundle;
pub mod ordering;

pub use bundle::{reconstruct_bundle, uncovered_sources, LocalBundles};
pub use ordering::{dependency_order, OrderedTx};
