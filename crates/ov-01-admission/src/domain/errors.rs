//! # Domain Errors
//!
//! Error types for the Admission Pipeline.

use shared_types::{ErrorClass, Txid, TypesError};
use thiserror::Error;

/// Output Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An output with this outpoint already exists in the topic.
    #[error("Duplicate output {outpoint} in topic {topic}")]
    Duplicate {
        /// Canonical outpoint string
        outpoint: String,
        /// Topic name
        topic: String,
    },

    /// The addressed record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Structured reason a broadcast was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Broadcast failed ({code}): {description}")]
pub struct BroadcastFailure {
    /// Short machine-readable status.
    pub code: String,
    /// Human-readable reason.
    pub description: String,
}

/// Admission pipeline error types.
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    /// A requested topic has no registered topic manager.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// More topics than a single submission may name.
    #[error("Too many topics: {got} > {max}")]
    TooManyTopics {
        /// Topics named
        got: usize,
        /// Configured maximum
        max: usize,
    },

    /// The bundle could not be parsed.
    #[error("Malformed bundle: {0}")]
    MalformedBundle(String),

    /// The subject transaction is not anchored to the chain.
    #[error("SPV verification failed for {0}")]
    InvalidProof(Txid),

    /// No stored outputs belong to the transaction.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(Txid),

    /// A lookup question named an unregistered service.
    #[error("Unknown lookup service: {0}")]
    UnknownLookupService(String),

    /// The Output Store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The base network refused the transaction.
    #[error(transparent)]
    Broadcast(#[from] BroadcastFailure),

    /// A topic manager failed to reach a decision.
    #[error("Topic manager {topic} failed: {reason}")]
    TopicManager {
        /// Topic name
        topic: String,
        /// Failure reason
        reason: String,
    },

    /// A lookup service failed to answer.
    #[error("Lookup service {service} failed: {reason}")]
    LookupService {
        /// Service name
        service: String,
        /// Failure reason
        reason: String,
    },

    /// The chain tracker could not answer.
    #[error("Chain tracker error: {0}")]
    ChainTracker(String),
}

impl AdmissionError {
    /// Classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            AdmissionError::UnknownTopic(_)
            | AdmissionError::TooManyTopics { .. }
            | AdmissionError::MalformedBundle(_)
            | AdmissionError::UnknownTransaction(_)
            | AdmissionError::UnknownLookupService(_) => ErrorClass::Input,
            AdmissionError::InvalidProof(_) => ErrorClass::Verification,
            AdmissionError::Storage(_)
            | AdmissionError::Broadcast(_)
            | AdmissionError::TopicManager { .. }
            | AdmissionError::LookupService { .. }
            | AdmissionError::ChainTracker(_) => ErrorClass::Collaborator,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

impl From<TypesError> for AdmissionError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::ChainTracker(reason) => AdmissionError::ChainTracker(reason),
            other => AdmissionError::MalformedBundle(other.to_string()),
        }
    }
}
