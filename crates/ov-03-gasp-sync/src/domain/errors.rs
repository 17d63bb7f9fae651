//! # Domain Errors
//!
//! Error types for the sync protocol driver.

use crate::domain::session::SessionState;
use ov_02_graph_storage::GraphError;
use shared_types::ErrorClass;
use thiserror::Error;

/// Sync protocol errors.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The peer speaks another protocol version. Fatal for the session.
    #[error("Protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Our version
        expected: u32,
        /// Peer's version
        got: u32,
    },

    /// No graph storage is registered for the topic.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// A peer sent a node for a different session.
    #[error("Peer {peer} answered for graph {got}, expected {expected}")]
    ForeignNode {
        /// Peer URL
        peer: String,
        /// Session root
        expected: String,
        /// Graph id in the answer
        got: String,
    },

    /// The session tried an illegal state change.
    #[error("Invalid session transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Requested state
        to: SessionState,
    },

    /// The peer could not be reached or answered badly.
    #[error("Peer {peer} failed: {reason}")]
    Remote {
        /// Peer URL
        peer: String,
        /// Failure reason
        reason: String,
    },

    /// The peer resolver failed.
    #[error("Peer resolution failed: {0}")]
    Resolver(String),

    /// Graph storage failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SyncError {
    /// Classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::VersionMismatch { .. }
            | SyncError::UnknownTopic(_)
            | SyncError::ForeignNode { .. }
            | SyncError::InvalidTransition { .. } => ErrorClass::Input,
            SyncError::Remote { .. } | SyncError::Resolver(_) => ErrorClass::Collaborator,
            SyncError::Graph(inner) => inner.class(),
        }
    }

    /// Whether retrying the session could succeed.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}
