//! # Admission Service
//!
//! Application service orchestrating transaction submission.
//!
//! ## Submit Sequence
//!
//! 1. Every topic must have a registered manager (no side effects otherwise)
//! 2. Parse the bundle and SPV-check its subject
//! 3. Under the (txid, topic) locks, per topic: skip duplicates, gather
//!    previous coins, ask the topic manager
//! 4. Broadcast (`Current` mode only)
//! 5. Per topic: insert admitted outputs, mark consumed coins spent and
//!    link them to their consumers, write the applied-transaction record
//! 6. Fire the STEAK callback
//!
//! Topics are independent units of work. A storage failure in a later topic
//! leaves earlier topics committed; nothing is rolled back.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::application::locks::KeyedLocks;
use crate::application::registry::TopicRegistry;
use crate::config::AdmissionConfig;
use crate::domain::{AdmissionError, LookupAnswer, LookupOutput, LookupQuestion};
use crate::ports::{
    AdmissionApi, Broadcaster, ChainTracker, LookupService, OutputStore, SteakCallback, TopicManager,
};
use shared_types::{
    AdmittanceInstructions, Beef, BeefTx, MerklePath, Outpoint, Output, Steak, SubmitMode,
    TaggedBundle, Transaction, Txid,
};

/// A coin spent by the subject transaction that the topic already holds.
#[derive(Debug, Clone)]
pub struct PreviousCoin {
    /// Index of the spending input.
    pub input_index: u32,
    /// The stored output.
    pub output: Output,
}

/// Decision for one topic, computed before anything is written.
struct TopicPlan {
    topic: String,
    previous: Vec<PreviousCoin>,
    instructions: AdmittanceInstructions,
}

/// Admission Service - turns tagged bundles into committed topic state.
///
/// ## Thread Safety
///
/// Safe to share behind `Arc`. Submissions for different (txid, topic) pairs
/// run concurrently; submissions for the same pair are serialized, so the
/// duplicate check cannot race the write of the applied-transaction record.
pub struct AdmissionService {
    /// Configuration.
    config: AdmissionConfig,
    /// Topic managers and lookup services.
    registry: Arc<TopicRegistry>,
    /// Output Store.
    store: Arc<dyn OutputStore>,
    /// SPV oracle.
    chain_tracker: Arc<dyn ChainTracker>,
    /// Base network submission.
    broadcaster: Arc<dyn Broadcaster>,
    /// Per (txid, topic) exclusivity.
    locks: KeyedLocks,
}

impl AdmissionService {
    /// Create a new admission service.
    pub fn new(
        config: AdmissionConfig,
        registry: Arc<TopicRegistry>,
        store: Arc<dyn OutputStore>,
        chain_tracker: Arc<dyn ChainTracker>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            chain_tracker,
            broadcaster,
            locks: KeyedLocks::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Registered topic managers and lookup services.
    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// The Output Store.
    pub fn store(&self) -> &Arc<dyn OutputStore> {
        &self.store
    }

    /// The chain tracker.
    pub fn chain_tracker(&self) -> &Arc<dyn ChainTracker> {
        &self.chain_tracker
    }

    /// Unspent coins held by `topic` that the inputs of `tx` spend.
    pub async fn previous_coins(
        &self,
        tx: &Transaction,
        topic: &str,
    ) -> Result<Vec<PreviousCoin>, AdmissionError> {
        let mut coins = Vec::new();
        for (index, input) in tx.inputs.iter().enumerate() {
            if let Some(output) = self
                .store
                .find_output(&input.source, Some(topic), Some(false))
                .await?
            {
                coins.push(PreviousCoin {
                    input_index: index as u32,
                    output,
                });
            }
        }
        Ok(coins)
    }

    /// Validate the topic list: bounded, deduplicated, every topic registered.
    fn check_topics(&self, topics: &[String]) -> Result<Vec<String>, AdmissionError> {
        if topics.len() > self.config.max_topics_per_submission {
            return Err(AdmissionError::TooManyTopics {
                got: topics.len(),
                max: self.config.max_topics_per_submission,
            });
        }
        let unique: BTreeSet<&String> = topics.iter().collect();
        for topic in &unique {
            if self.registry.manager(topic).is_none() {
                return Err(AdmissionError::UnknownTopic((*topic).clone()));
            }
        }
        Ok(unique.into_iter().cloned().collect())
    }

    async fn decide(
        &self,
        topic: &str,
        raw_beef: &[u8],
        subject: &BeefTx,
    ) -> Result<TopicPlan, AdmissionError> {
        let manager = self
            .registry
            .manager(topic)
            .ok_or_else(|| AdmissionError::UnknownTopic(topic.to_string()))?;

        let previous = self.previous_coins(&subject.tx, topic).await?;
        let previous_indices: Vec<u32> = previous.iter().map(|c| c.input_index).collect();

        let decided = manager
            .identify_admissible_outputs(raw_beef, &previous_indices)
            .await?;
        let instructions = sanitize(decided, &subject.tx, &previous_indices);

        Ok(TopicPlan {
            topic: topic.to_string(),
            previous,
            instructions,
        })
    }

    async fn commit_topic(
        &self,
        beef: &Beef,
        raw_beef: &[u8],
        subject: &BeefTx,
        plan: TopicPlan,
    ) -> Result<(), AdmissionError> {
        let txid = subject.txid();
        let topic = plan.topic.as_str();
        let score = now_millis();
        let consumed: Vec<Outpoint> = plan.previous.iter().map(|c| c.output.outpoint).collect();

        let ancillary_beef = if plan.instructions.ancillary_txids.is_empty() {
            None
        } else {
            let extracted = beef.extract(&plan.instructions.ancillary_txids);
            (!extracted.is_empty()).then(|| extracted.to_bytes())
        };

        let mut admitted = Vec::with_capacity(plan.instructions.outputs_to_admit.len());
        for &index in &plan.instructions.outputs_to_admit {
            let Some(tx_output) = subject.tx.outputs.get(index as usize) else {
                continue;
            };
            let outpoint = Outpoint::new(txid, index);
            self.store
                .insert_output(Output {
                    outpoint,
                    topic: topic.to_string(),
                    satoshis: tx_output.satoshis,
                    locking_script: tx_output.locking_script.clone(),
                    beef: raw_beef.to_vec(),
                    spent: false,
                    outputs_consumed: consumed.clone(),
                    consumed_by: Vec::new(),
                    block_height: subject.proof.as_ref().map(|p| p.block_height),
                    score,
                    ancillary_txids: plan.instructions.ancillary_txids.clone(),
                    ancillary_beef: ancillary_beef.clone(),
                })
                .await?;
            self.notify_added(&outpoint, &tx_output.locking_script, topic).await;
            admitted.push(outpoint);
        }

        for coin in &plan.previous {
            let outpoint = coin.output.outpoint;
            self.store.mark_utxo_as_spent(&outpoint, topic).await?;

            let mut consumed_by = coin.output.consumed_by.clone();
            for new_outpoint in &admitted {
                if !consumed_by.contains(new_outpoint) {
                    consumed_by.push(*new_outpoint);
                }
            }
            self.store
                .update_consumed_by(&outpoint, topic, &consumed_by)
                .await?;
            self.notify_spent(&outpoint, topic).await;
        }

        self.store.insert_applied_transaction(&txid, topic).await?;

        info!(
            "[ov-01] Applied {} to {}: {} admitted, {} consumed, {} removed",
            txid,
            topic,
            admitted.len(),
            plan.previous.len(),
            plan.instructions.coins_removed.len()
        );
        Ok(())
    }

    async fn notify_added(&self, outpoint: &Outpoint, locking_script: &[u8], topic: &str) {
        for (name, service) in self.registry.lookup_services() {
            if let Err(e) = service.output_added(outpoint, locking_script, topic).await {
                warn!("[ov-01] Lookup service {} rejected output_added for {}: {}", name, outpoint, e);
            }
        }
    }

    async fn notify_spent(&self, outpoint: &Outpoint, topic: &str) {
        for (name, service) in self.registry.lookup_services() {
            if let Err(e) = service.output_spent(outpoint, topic).await {
                warn!("[ov-01] Lookup service {} rejected output_spent for {}: {}", name, outpoint, e);
            }
        }
    }
}

#[async_trait]
impl AdmissionApi for AdmissionService {
    async fn submit(
        &self,
        tagged: TaggedBundle,
        mode: SubmitMode,
        on_steak_ready: Option<SteakCallback>,
    ) -> Result<Steak, AdmissionError> {
        let topics = self.check_topics(&tagged.topics)?;

        let beef = Beef::from_bytes(&tagged.beef)?;
        let subject = beef.subject()?.clone();
        let txid = subject.txid();

        if !beef.verify(self.chain_tracker.as_ref()).await? {
            warn!("[ov-01] Rejecting {}: SPV verification failed", txid);
            return Err(AdmissionError::InvalidProof(txid));
        }

        let _guards = self
            .locks
            .lock_all(topics.iter().map(|topic| lock_key(&txid, topic)))
            .await;

        let mut steak = Steak::new();
        let mut plans = Vec::with_capacity(topics.len());
        for topic in &topics {
            if self.store.does_applied_transaction_exist(&txid, topic).await? {
                debug!("[ov-01] {} already applied to {}", txid, topic);
                steak.insert(topic.clone(), AdmittanceInstructions::default());
                continue;
            }
            let plan = self.decide(topic, &tagged.beef, &subject).await?;
            steak.insert(topic.clone(), plan.instructions.clone());
            plans.push(plan);
        }

        let skip_broadcast = plans.is_empty() && self.config.skip_broadcast_for_duplicates;
        if mode == SubmitMode::Current && !skip_broadcast {
            let receipt = self.broadcaster.broadcast(&subject.tx, &tagged.beef).await?;
            debug!("[ov-01] Broadcast {}: {}", receipt.txid, receipt.message);
        }

        for plan in plans {
            self.commit_topic(&beef, &tagged.beef, &subject, plan).await?;
        }

        if let Some(callback) = on_steak_ready {
            callback(&steak);
        }
        Ok(steak)
    }

    async fn lookup(&self, question: LookupQuestion) -> Result<LookupAnswer, AdmissionError> {
        let service = self
            .registry
            .lookup_service(&question.service)
            .ok_or_else(|| AdmissionError::UnknownLookupService(question.service.clone()))?;

        match service.lookup(&question).await? {
            LookupAnswer::Formulas(formulas) => {
                let mut outputs = Vec::with_capacity(formulas.len());
                for formula in formulas {
                    match self.store.find_output(&formula.outpoint, None, None).await? {
                        Some(output) => outputs.push(LookupOutput {
                            outpoint: output.outpoint,
                            beef: output.beef,
                        }),
                        None => debug!("[ov-01] Formula output {} not stored", formula.outpoint),
                    }
                }
                Ok(LookupAnswer::OutputList(outputs))
            }
            answer => Ok(answer),
        }
    }

    async fn handle_new_merkle_proof(
        &self,
        txid: Txid,
        proof: MerklePath,
    ) -> Result<usize, AdmissionError> {
        let outputs = self.store.find_outputs_for_transaction(&txid).await?;
        if outputs.is_empty() {
            return Err(AdmissionError::UnknownTransaction(txid));
        }

        let root = proof.compute_root(&txid);
        if !self
            .chain_tracker
            .is_valid_root_for_height(&root, proof.block_height)
            .await?
        {
            return Err(AdmissionError::InvalidProof(txid));
        }

        // Each output keeps its own bundle: topics may hold different ancestry.
        for output in &outputs {
            let mut beef = Beef::from_bytes(&output.beef)?;
            beef.attach_proof(&txid, proof.clone());
            self.store
                .update_output_beef(&output.outpoint, &output.topic, &beef.try_to_bytes()?)
                .await?;
            self.store
                .update_output_block_height(&output.outpoint, &output.topic, proof.block_height)
                .await?;
        }

        info!(
            "[ov-01] Recorded proof for {} at height {} ({} outputs)",
            txid,
            proof.block_height,
            outputs.len()
        );
        Ok(outputs.len())
    }

    fn list_topic_managers(&self) -> Vec<String> {
        self.registry.topic_names()
    }

    fn list_lookup_services(&self) -> Vec<String> {
        self.registry.lookup_service_names()
    }
}

fn lock_key(txid: &Txid, topic: &str) -> String {
    format!("{txid}:{topic}")
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Clamp a manager's decision to the transaction's shape.
///
/// Admitted indices must name real outputs, retained coins must be previous
/// coins, and removed coins are exactly the previous coins not retained.
fn sanitize(
    mut instructions: AdmittanceInstructions,
    tx: &Transaction,
    previous_indices: &[u32],
) -> AdmittanceInstructions {
    let output_count = tx.outputs.len();
    instructions
        .outputs_to_admit
        .retain(|i| (*i as usize) < output_count);
    instructions.outputs_to_admit.sort_unstable();
    instructions.outputs_to_admit.dedup();

    instructions
        .coins_to_retain
        .retain(|i| previous_indices.contains(i));
    instructions.coins_to_retain.sort_unstable();
    instructions.coins_to_retain.dedup();

    instructions.coins_removed = previous_indices
        .iter()
        .copied()
        .filter(|i| !instructions.coins_to_retain.contains(i))
        .collect();
    instructions
}
