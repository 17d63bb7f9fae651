//! # Adapters
//!
//! In-process implementations of the outbound ports.

pub mod broadcaster;
pub mod memory_store;

pub use broadcaster::RecordingBroadcaster;
pub use memory_store::InMemoryOutputStore;
