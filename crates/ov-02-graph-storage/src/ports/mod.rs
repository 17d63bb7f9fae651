//! # Ports Module
//!
//! Hexagonal architecture ports. Outbound collaborators are reached through
//! the admission pipeline's ports.

pub mod inbound;

pub use inbound::*;
