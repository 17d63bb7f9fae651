//! # Error Types
//!
//! Errors raised while parsing or verifying shared overlay types.

use thiserror::Error;

/// Coarse classification every subsystem error maps into.
///
/// | Class | Examples | Caller action |
/// |-------|----------|---------------|
/// | Input | unknown topic, malformed bundle | reject |
/// | Verification | bad Merkle proof, failed anchor | reject permanently |
/// | Capacity | graph node ceiling | abort session |
/// | Collaborator | storage or broadcast failure | retry |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected before any state change.
    Input,
    /// Cryptographic or re-derivation check failed.
    Verification,
    /// A resource ceiling was reached.
    Capacity,
    /// An external collaborator failed.
    Collaborator,
}

impl ErrorClass {
    /// Only collaborator failures are worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Collaborator)
    }
}

/// Errors from the shared data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A transaction id was not 32 bytes of hex.
    #[error("Invalid txid: {0}")]
    InvalidTxid(String),

    /// An outpoint string was not of the form `<txid>.<index>`.
    #[error("Invalid outpoint: {0}")]
    InvalidOutpoint(String),

    /// Bundle bytes could not be decoded or are structurally inconsistent.
    #[error("Malformed bundle: {0}")]
    MalformedBundle(String),

    /// A raw transaction or Merkle path could not be decoded.
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// A value could not be serialized.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The chain tracker could not answer.
    #[error("Chain tracker error: {0}")]
    ChainTracker(String),
}

impl TypesError {
    /// Classification of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            TypesError::ChainTracker(_) => ErrorClass::Collaborator,
            _ => ErrorClass::Input,
        }
    }
}
