//! # Admission Pipeline Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Accepts a transaction bundle tagged with topics, asks each topic's
//! manager which outputs to admit, records the outcome per topic and reports
//! it back as a STEAK (Submitted Transaction Execution AcKnowledgment).
//! Lookup questions are routed to registered lookup services.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Unknown topic leaves no side effects | `application/service.rs` - `check_topics()` runs first |
//! | Idempotent per (txid, topic) | `application/service.rs` - applied-transaction record |
//! | No concurrent double admission | `application/locks.rs` - keyed async mutexes |
//! | Failed broadcast writes nothing | `application/service.rs` - broadcast precedes commit |
//! | Spent coins are linked to consumers | `application/service.rs` - `commit_topic()` |
//!
//! ## Submit Modes
//!
//! | Mode | Broadcast | Use |
//! |------|-----------|-----|
//! | `Current` | Yes (unless every topic is a duplicate) | Fresh client submissions |
//! | `Historical` | Never | Graph sync and replay |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `OutputStore` | Topic UTXOs and applied-transaction records |
//! | `TopicManager` | Per-topic admission policy |
//! | `LookupService` | Query answering, output notifications |
//! | `Broadcaster` | Base network submission |
//! | `ChainTracker` | SPV root checks |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - InMemoryOutputStore, RecordingBroadcaster          │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - AdmissionApi trait                         │
//! │  ports/outbound.rs - OutputStore, TopicManager, LookupService,  │
//! │                      Broadcaster                                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  application/ - AdmissionService, TopicRegistry, KeyedLocks     │
//! │  domain/      - AdmissionError, lookup value objects            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use application::{
    steak_channel, AdmissionService, PreviousCoin, RegistryBuilder, SteakOutcome, SteakReceiver,
    TopicRegistry,
};
pub use config::AdmissionConfig;
pub use domain::*;
pub use ports::*;
