//! # Domain Module
//!
//! Core domain types for the Admission Pipeline.

pub mod errors;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
