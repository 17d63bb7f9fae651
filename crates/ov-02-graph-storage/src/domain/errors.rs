//! # Domain Errors
//!
//! Error types for graph-aware temporary storage.

use ov_01_admission::{AdmissionError, StoreError};
use shared_types::{ErrorClass, Outpoint, TypesError};
use thiserror::Error;

/// Temporary graph errors.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// The session already holds its node ceiling.
    #[error("Graph {graph_id} is full ({max} nodes)")]
    GraphFull {
        /// Session root
        graph_id: Outpoint,
        /// Configured ceiling
        max: usize,
    },

    /// An attachment target or ancestor dependency is not in the graph.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// A root was appended for a graph that is already being built.
    #[error("Graph session already active: {0}")]
    SessionActive(Outpoint),

    /// No session is staged under this root.
    #[error("Unknown graph: {0}")]
    UnknownGraph(Outpoint),

    /// The output (or its bundle) is not held locally.
    #[error("Unknown output: {0}")]
    UnknownOutput(Outpoint),

    /// A node could not be decoded.
    #[error("Malformed node: {0}")]
    MalformedNode(String),

    /// The peer's claim could not be re-derived.
    #[error("Anchor validation failed for {graph_id}: {reason}")]
    AnchorFailed {
        /// Session root
        graph_id: Outpoint,
        /// What failed
        reason: String,
    },

    /// The admission pipeline or one of its collaborators failed.
    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl GraphError {
    /// Classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            GraphError::GraphFull { .. } => ErrorClass::Capacity,
            GraphError::MissingInput(_)
            | GraphError::SessionActive(_)
            | GraphError::UnknownGraph(_)
            | GraphError::UnknownOutput(_)
            | GraphError::MalformedNode(_) => ErrorClass::Input,
            GraphError::AnchorFailed { .. } => ErrorClass::Verification,
            GraphError::Admission(inner) => inner.class(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        GraphError::Admission(err.into())
    }
}

impl From<TypesError> for GraphError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::ChainTracker(_) => GraphError::Admission(err.into()),
            other => GraphError::MalformedNode(other.to_string()),
        }
    }
}
