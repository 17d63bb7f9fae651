//! # Application Layer
//!
//! The shared temporary graph store and the per-topic storage service.

pub mod storage;
pub mod temp_store;

pub use storage::GaspStorage;
pub use temp_store::TemporaryGraphStore;
