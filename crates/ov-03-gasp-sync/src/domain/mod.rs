//! # Domain Module
//!
//! Wire messages, session state machine, errors.

pub mod errors;
pub mod messages;
pub mod session;

pub use errors::*;
pub use messages::*;
pub use session::*;
