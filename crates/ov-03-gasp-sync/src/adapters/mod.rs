//! # Adapters
//!
//! In-process implementations of the outbound ports.

pub mod local_remote;

pub use local_remote::{LocalGaspRemote, LocalPeerConnector};
