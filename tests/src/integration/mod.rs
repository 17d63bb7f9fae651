//! # Integration Tests
//!
//! Admission (1), graph storage (2) and the sync driver (3) wired together.

pub mod support;

#[cfg(test)]
mod two_node_sync;
