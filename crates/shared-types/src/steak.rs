//! # Submission Types
//!
//! Tagged bundles going into the admission pipeline and the STEAK
//! (Submitted Transaction Execution AcKnowledgment) coming out of it.

use crate::entities::Txid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a submission is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitMode {
    /// A live submission; the transaction is broadcast to the base network.
    Current,
    /// Replay of an already-validated sync graph; never broadcast.
    Historical,
}

/// A bundle together with the topics it is being submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedBundle {
    /// Serialized BEEF.
    pub beef: Vec<u8>,
    /// Topics to evaluate the subject transaction under.
    pub topics: Vec<String>,
}

impl TaggedBundle {
    /// Tag `beef` with `topics`.
    pub fn new(beef: Vec<u8>, topics: Vec<String>) -> Self {
        Self { beef, topics }
    }
}

/// A topic manager's decision for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittanceInstructions {
    /// Output indices of the transaction to admit.
    pub outputs_to_admit: Vec<u32>,
    /// Input indices whose previous coins stay in the topic.
    pub coins_to_retain: Vec<u32>,
    /// Input indices whose previous coins leave the topic.
    pub coins_removed: Vec<u32>,
    /// Extra transactions the decision relied on.
    pub ancillary_txids: Vec<Txid>,
}

impl AdmittanceInstructions {
    /// Nothing admitted, retained or removed.
    pub fn is_empty(&self) -> bool {
        self.outputs_to_admit.is_empty()
            && self.coins_to_retain.is_empty()
            && self.coins_removed.is_empty()
            && self.ancillary_txids.is_empty()
    }

    /// Whether output `index` is admitted.
    pub fn admits(&self, index: u32) -> bool {
        self.outputs_to_admit.contains(&index)
    }
}

/// Per-topic admittance instructions, the result of a submission.
pub type Steak = BTreeMap<String, AdmittanceInstructions>;
