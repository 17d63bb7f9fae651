//! # Application Layer
//!
//! Submission orchestration and its supporting pieces.

pub mod locks;
pub mod registry;
pub mod service;
pub mod steak_waiter;

pub use registry::{RegistryBuilder, TopicRegistry};
pub use service::{AdmissionService, PreviousCoin};
pub use steak_waiter::{steak_channel, SteakOutcome, SteakReceiver};
