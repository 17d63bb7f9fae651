//! # GASP Sync Protocol Driver Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Keeps a topic's state in step with other nodes hosting the same topic.
//! As initiator it asks a peer what it has seen since the last watermark,
//! pulls each unfamiliar output with its unproven ancestry into graph
//! storage, and commits the graphs whose anchors re-validate. It then
//! offers the peer what this node holds and the peer lacks. As responder it
//! answers the same questions and stages what peers offer.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Version mismatch ends the session, never retried | `application/driver.rs` - handshake |
//! | Nodes from another session are rejected | `application/driver.rs` - `fetch()` |
//! | Every failed graph is discarded | `application/driver.rs` - `run_graph()` |
//! | Watermark advances only after a clean session | `application/driver.rs` - `sync_with_peer()` |
//! | Reply offers only what the peer lacks | `application/driver.rs` - `reply()` |
//! | Offered graphs are validated before commit | `application/responder.rs` - `handle_finish_graph()` |
//! | Never syncs with itself | `application/driver.rs` - `peers_for()` |
//! | Session follows the state machine | `domain/session.rs` - `advance()` |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - SyncApi, GaspResponderApi                  │
//! │  ports/outbound.rs - GaspRemote, PeerConnector, PeerResolver    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  application/driver.rs    - SyncDriver (initiator)              │
//! │  application/responder.rs - GaspResponder                       │
//! │  adapters/local_remote.rs - in-process peers over JSON          │
//! │  domain/                  - messages, session, SyncError        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::{LocalGaspRemote, LocalPeerConnector};
pub use application::{GaspResponder, SyncDriver, TopicStorages};
pub use config::{SyncConfig, SyncStrategy};
pub use domain::*;
pub use ports::*;
