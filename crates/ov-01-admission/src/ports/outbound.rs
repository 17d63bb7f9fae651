//! # Outbound Ports
//!
//! Traits for external collaborators (storage, topic managers, lookup
//! services, broadcaster, chain tracker).

use crate::domain::{
    AdmissionError, BroadcastFailure, BroadcastReceipt, LookupAnswer, LookupQuestion, StoreError,
};
use async_trait::async_trait;
use shared_types::{AdmittanceInstructions, Beef, Outpoint, Output, Transaction, Txid};
use std::sync::atomic::{AtomicUsize, Ordering};

pub use shared_types::ChainTracker;

/// Durable storage of topic UTXOs and applied-transaction records - outbound port.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Insert a new output. Fails with `Duplicate` if (outpoint, topic) exists.
    async fn insert_output(&self, output: Output) -> Result<(), StoreError>;

    /// Find an output, optionally scoped to a topic and filtered by spent state.
    async fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: Option<bool>,
    ) -> Result<Option<Output>, StoreError>;

    /// All outputs created by a transaction, across topics.
    async fn find_outputs_for_transaction(&self, txid: &Txid) -> Result<Vec<Output>, StoreError>;

    /// Unspent outputs of a topic with `score >= since`, oldest first.
    async fn find_utxos_for_topic(&self, topic: &str, since: u64) -> Result<Vec<Output>, StoreError>;

    /// Remove an output from a topic.
    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError>;

    /// Mark an output spent.
    async fn mark_utxo_as_spent(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError>;

    /// Replace the list of outputs that consumed this one.
    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StoreError>;

    /// Replace the stored bundle of one output.
    async fn update_output_beef(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        beef: &[u8],
    ) -> Result<(), StoreError>;

    /// Record the block height of a mined output.
    async fn update_output_block_height(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        block_height: u32,
    ) -> Result<(), StoreError>;

    /// Record that a transaction was applied to a topic.
    async fn insert_applied_transaction(&self, txid: &Txid, topic: &str) -> Result<(), StoreError>;

    /// Has a transaction already been applied to a topic?
    async fn does_applied_transaction_exist(&self, txid: &Txid, topic: &str)
        -> Result<bool, StoreError>;
}

/// Pluggable admission policy for one topic - outbound port.
#[async_trait]
pub trait TopicManager: Send + Sync {
    /// Decide which outputs of the bundle's subject to admit.
    ///
    /// `previous_coins` lists the input indices whose source outputs are
    /// already held by this topic.
    async fn identify_admissible_outputs(
        &self,
        beef: &[u8],
        previous_coins: &[u32],
    ) -> Result<AdmittanceInstructions, AdmissionError>;

    /// Which ancestor outputs are needed before a decision can be made.
    async fn identify_needed_inputs(&self, beef: &[u8]) -> Result<Vec<Outpoint>, AdmissionError>;
}

/// Query answering over topic outputs - outbound port.
#[async_trait]
pub trait LookupService: Send + Sync {
    /// An output was admitted to a topic.
    async fn output_added(
        &self,
        _outpoint: &Outpoint,
        _locking_script: &[u8],
        _topic: &str,
    ) -> Result<(), AdmissionError> {
        Ok(())
    }

    /// A topic output was spent.
    async fn output_spent(&self, _outpoint: &Outpoint, _topic: &str) -> Result<(), AdmissionError> {
        Ok(())
    }

    /// Answer a question.
    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupAnswer, AdmissionError>;
}

/// Base network submission - outbound port.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit `tx` (with its bundle) to the base network.
    async fn broadcast(&self, tx: &Transaction, beef: &[u8])
        -> Result<BroadcastReceipt, BroadcastFailure>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Decision rule for [`MockTopicManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionRule {
    /// Admit every output and retain every previous coin.
    AdmitAll,
    /// Admit nothing.
    RejectAll,
    /// Admit only the listed output indices.
    AdmitIndices(Vec<u32>),
    /// Admit every output when the subject spends a known topic coin or
    /// carries its own Merkle proof.
    RequireProvenance,
    /// Admit every output except those of the listed transactions.
    RejectTxids(Vec<Txid>),
}

/// Mock topic manager for testing.
#[derive(Debug)]
pub struct MockTopicManager {
    /// Decision rule.
    pub rule: AdmissionRule,
    /// Ancillary txids reported with every admission.
    pub ancillary_txids: Vec<Txid>,
    admissible_calls: AtomicUsize,
}

impl MockTopicManager {
    /// Create a manager with `rule`.
    pub fn new(rule: AdmissionRule) -> Self {
        Self {
            rule,
            ancillary_txids: Vec::new(),
            admissible_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `identify_admissible_outputs` calls so far.
    pub fn admissible_calls(&self) -> usize {
        self.admissible_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTopicManager {
    fn default() -> Self {
        Self::new(AdmissionRule::AdmitAll)
    }
}

#[async_trait]
impl TopicManager for MockTopicManager {
    async fn identify_admissible_outputs(
        &self,
        beef: &[u8],
        previous_coins: &[u32],
    ) -> Result<AdmittanceInstructions, AdmissionError> {
        self.admissible_calls.fetch_add(1, Ordering::SeqCst);

        let beef = Beef::from_bytes(beef)?;
        let subject = beef.subject()?;
        let all_outputs: Vec<u32> = (0..subject.tx.outputs.len() as u32).collect();

        let outputs_to_admit = match &self.rule {
            AdmissionRule::AdmitAll => all_outputs,
            AdmissionRule::RejectAll => Vec::new(),
            AdmissionRule::AdmitIndices(indices) => indices
                .iter()
                .copied()
                .filter(|i| (*i as usize) < subject.tx.outputs.len())
                .collect(),
            AdmissionRule::RequireProvenance => {
                if !previous_coins.is_empty() || subject.proof.is_some() {
                    all_outputs
                } else {
                    Vec::new()
                }
            }
            AdmissionRule::RejectTxids(rejected) => {
                if rejected.contains(&subject.txid()) {
                    Vec::new()
                } else {
                    all_outputs
                }
            }
        };

        let coins_to_retain = if outputs_to_admit.is_empty() {
            Vec::new()
        } else {
            previous_coins.to_vec()
        };

        Ok(AdmittanceInstructions {
            outputs_to_admit,
            coins_to_retain,
            coins_removed: Vec::new(),
            ancillary_txids: self.ancillary_txids.clone(),
        })
    }

    async fn identify_needed_inputs(&self, beef: &[u8]) -> Result<Vec<Outpoint>, AdmissionError> {
        let beef = Beef::from_bytes(beef)?;
        let subject = beef.subject()?;
        Ok(subject.tx.inputs.iter().map(|input| input.source).collect())
    }
}
