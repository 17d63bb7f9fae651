//! # Application Layer
//!
//! Initiator (driver) and responder sides of the protocol.

pub mod driver;
pub mod responder;
pub mod topics;

pub use driver::SyncDriver;
pub use responder::GaspResponder;
pub use topics::TopicStorages;
