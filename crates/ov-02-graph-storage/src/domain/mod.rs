//! # Domain Module
//!
//! Staged graph nodes, wire shapes and errors.

pub mod errors;
pub mod graph;
pub mod value_objects;

pub use errors::*;
pub use graph::GraphNode;
pub use value_objects::*;
