//! # GASP Storage
//!
//! One topic's view of the temporary graph store, wired to the admission
//! pipeline for coin lookups, topic manager decisions and the final commit.
//!
//! ## Anchor Validation
//!
//! 1. Rebuild the root bundle from the staged ancestry (stored bundles fill
//!    in coins the node already holds)
//! 2. SPV-check it
//! 3. Order the staged transactions, deepest first
//! 4. Replay each through the topic manager, counting only coins known at
//!    that point (stored, or admitted earlier in the replay)
//! 5. The root outpoint must be among the admitted outputs

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::algorithms::{dependency_order, reconstruct_bundle, uncovered_sources, LocalBundles, OrderedTx};
use crate::application::temp_store::TemporaryGraphStore;
use crate::domain::{GaspNode, GraphError, GraphNode, KnownUtxo, NodeResponse};
use crate::ports::GraphStorageApi;
use ov_01_admission::{AdmissionApi, AdmissionError, AdmissionService, TopicManager};
use shared_types::{Beef, MerklePath, Outpoint, SubmitMode, TaggedBundle};

/// Graph-aware temporary storage for one topic.
pub struct GaspStorage {
    topic: String,
    admission: Arc<AdmissionService>,
    graphs: Arc<TemporaryGraphStore>,
}

impl GaspStorage {
    /// Create storage for `topic` over a (possibly shared) graph store.
    pub fn new(
        topic: impl Into<String>,
        admission: Arc<AdmissionService>,
        graphs: Arc<TemporaryGraphStore>,
    ) -> Self {
        Self {
            topic: topic.into(),
            admission,
            graphs,
        }
    }

    /// The staged graphs.
    pub fn graphs(&self) -> &Arc<TemporaryGraphStore> {
        &self.graphs
    }

    fn manager(&self) -> Result<&Arc<dyn TopicManager>, GraphError> {
        self.admission
            .registry()
            .manager(&self.topic)
            .ok_or_else(|| AdmissionError::UnknownTopic(self.topic.clone()).into())
    }

    fn max_nodes(&self) -> usize {
        self.graphs.max_nodes()
    }

    /// Drop outpoints this topic already holds.
    async fn strip_known(&self, outpoints: Vec<Outpoint>) -> Result<Vec<Outpoint>, GraphError> {
        let mut missing = Vec::with_capacity(outpoints.len());
        for outpoint in outpoints {
            if !self.is_known(&outpoint).await? && !missing.contains(&outpoint) {
                missing.push(outpoint);
            }
        }
        Ok(missing)
    }

    /// Stored bundles for the coins the staged ancestry leaves uncovered.
    async fn local_bundles(&self, root: &Arc<GraphNode>) -> Result<LocalBundles, GraphError> {
        let mut local = LocalBundles::new();
        for source in uncovered_sources(root, self.max_nodes())? {
            if local.contains_key(&source.txid) {
                continue;
            }
            if let Some(output) = self
                .admission
                .store()
                .find_output(&source, Some(&self.topic), None)
                .await?
            {
                local.insert(source.txid, Beef::from_bytes(&output.beef)?);
            }
        }
        Ok(local)
    }

    fn staged_root(&self, graph_id: &Outpoint) -> Result<Arc<GraphNode>, GraphError> {
        self.graphs
            .root(&self.topic, graph_id)
            .ok_or(GraphError::UnknownGraph(*graph_id))
    }

    async fn ordered_transactions(&self, graph_id: &Outpoint) -> Result<Vec<OrderedTx>, GraphError> {
        let root = self.staged_root(graph_id)?;
        let local = self.local_bundles(&root).await?;
        dependency_order(&root, self.max_nodes(), &local)
    }

    /// Replay `ordered` through the topic manager; returns every admitted outpoint.
    async fn replay(&self, ordered: &[OrderedTx]) -> Result<HashSet<Outpoint>, GraphError> {
        let manager = self.manager()?;
        let store = self.admission.store();
        let mut admitted: HashSet<Outpoint> = HashSet::new();

        for entry in ordered {
            let beef = Beef::from_bytes(&entry.beef)?;
            let subject = beef.subject()?;

            let mut previous = Vec::new();
            for (index, input) in subject.tx.inputs.iter().enumerate() {
                let known = admitted.contains(&input.source)
                    || store
                        .find_output(&input.source, Some(&self.topic), Some(false))
                        .await?
                        .is_some();
                if known {
                    previous.push(index as u32);
                }
            }

            let decision = manager
                .identify_admissible_outputs(&entry.beef, &previous)
                .await?;
            let output_count = subject.tx.outputs.len() as u32;
            admitted.extend(
                decision
                    .outputs_to_admit
                    .iter()
                    .filter(|i| **i < output_count)
                    .map(|i| Outpoint::new(entry.txid, *i)),
            );
        }
        Ok(admitted)
    }

    /// Submit every staged transaction, deepest first, in historical mode.
    ///
    /// Every bundle is SPV-checked before the first write, so a graph whose
    /// anchor went stale since validation commits nothing.
    async fn commit(&self, graph_id: &Outpoint) -> Result<usize, GraphError> {
        let ordered = self.ordered_transactions(graph_id).await?;
        let tracker = self.admission.chain_tracker();
        for entry in &ordered {
            if !Beef::from_bytes(&entry.beef)?.verify(tracker.as_ref()).await? {
                return Err(GraphError::AnchorFailed {
                    graph_id: *graph_id,
                    reason: format!("{} is no longer anchored", entry.txid),
                });
            }
        }

        for entry in &ordered {
            self.admission
                .submit(
                    TaggedBundle::new(entry.beef.clone(), vec![self.topic.clone()]),
                    SubmitMode::Historical,
                    None,
                )
                .await?;
        }
        Ok(ordered.len())
    }
}

#[async_trait]
impl GraphStorageApi for GaspStorage {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn find_known_utxos(&self, since: u64) -> Result<Vec<KnownUtxo>, GraphError> {
        let utxos = self
            .admission
            .store()
            .find_utxos_for_topic(&self.topic, since)
            .await?;
        Ok(utxos
            .into_iter()
            .map(|o| KnownUtxo {
                outpoint: o.outpoint,
                score: o.score,
            })
            .collect())
    }

    async fn is_known(&self, outpoint: &Outpoint) -> Result<bool, GraphError> {
        Ok(self
            .admission
            .store()
            .find_output(outpoint, Some(&self.topic), None)
            .await?
            .is_some())
    }

    async fn hydrate_graph_node(
        &self,
        graph_id: Outpoint,
        outpoint: Outpoint,
        include_metadata: bool,
    ) -> Result<GaspNode, GraphError> {
        let store = self.admission.store();
        // An ancestor that never was a topic output travels in the root's bundle.
        let output = match store.find_output(&outpoint, Some(&self.topic), None).await? {
            Some(output) => output,
            None => store
                .find_output(&graph_id, Some(&self.topic), None)
                .await?
                .ok_or(GraphError::UnknownOutput(outpoint))?,
        };
        let beef = Beef::from_bytes(&output.beef)?;
        let btx = beef
            .find(&outpoint.txid)
            .ok_or(GraphError::UnknownOutput(outpoint))?;
        if outpoint.index as usize >= btx.tx.outputs.len() {
            return Err(GraphError::UnknownOutput(outpoint));
        }
        let ancillary_beef = if include_metadata && output.outpoint == outpoint {
            output.ancillary_beef
        } else {
            None
        };

        Ok(GaspNode {
            graph_id,
            raw_tx: btx.tx.to_hex(),
            output_index: outpoint.index,
            proof: btx.proof.as_ref().map(MerklePath::to_hex),
            ancillary_beef,
        })
    }

    async fn find_needed_inputs(&self, node: &GaspNode) -> Result<Option<NodeResponse>, GraphError> {
        let tx = node.transaction()?;

        let (wanted, metadata) = match node.merkle_path()? {
            None => (tx.inputs.iter().map(|i| i.source).collect(), false),
            Some(proof) => {
                let mut beef = Beef::from_transaction(tx.clone(), Some(proof));
                if let Some(ancillary) = &node.ancillary_beef {
                    beef.merge_bytes(ancillary)?;
                }
                let bytes = beef.to_bytes();

                let previous: Vec<u32> = self
                    .admission
                    .previous_coins(&tx, &self.topic)
                    .await?
                    .iter()
                    .map(|c| c.input_index)
                    .collect();
                let manager = self.manager()?;
                let decision = manager.identify_admissible_outputs(&bytes, &previous).await?;
                if decision.admits(node.output_index) {
                    return Ok(None);
                }
                (manager.identify_needed_inputs(&bytes).await?, true)
            }
        };

        let missing = self.strip_known(wanted).await?;
        if missing.is_empty() {
            Ok(None)
        } else {
            debug!(
                "[ov-02] {} needs {} inputs in {}",
                tx.outpoint(node.output_index),
                missing.len(),
                self.topic
            );
            Ok(Some(NodeResponse::requesting(missing, metadata)))
        }
    }

    async fn append_to_graph(
        &self,
        node: &GaspNode,
        spent_by: Option<Outpoint>,
    ) -> Result<(), GraphError> {
        match spent_by {
            None => self.graphs.insert_root(&self.topic, node)?,
            Some(target) => self.graphs.attach(&self.topic, node, target)?,
        };
        Ok(())
    }

    async fn validate_graph_anchor(&self, graph_id: Outpoint) -> Result<(), GraphError> {
        let root = self.staged_root(&graph_id)?;
        let local = self.local_bundles(&root).await?;

        let beef = reconstruct_bundle(&root, self.max_nodes(), &local)?;
        if !beef.verify(self.admission.chain_tracker().as_ref()).await? {
            warn!("[ov-02] Graph {} is not anchored to the chain", graph_id);
            return Err(GraphError::AnchorFailed {
                graph_id,
                reason: "root transaction is not anchored".to_string(),
            });
        }

        let ordered = dependency_order(&root, self.max_nodes(), &local)?;
        let admitted = self.replay(&ordered).await?;
        if !admitted.contains(&graph_id) {
            warn!(
                "[ov-02] Graph {}: root not admitted on replay ({} outputs admitted)",
                graph_id,
                admitted.len()
            );
            return Err(GraphError::AnchorFailed {
                graph_id,
                reason: "root output not admitted on replay".to_string(),
            });
        }

        debug!(
            "[ov-02] Graph {} validated ({} transactions)",
            graph_id,
            ordered.len()
        );
        Ok(())
    }

    async fn finalize_graph(&self, graph_id: Outpoint) -> Result<usize, GraphError> {
        let result = self.commit(&graph_id).await;
        self.graphs.remove_session(&self.topic, &graph_id);
        match &result {
            Ok(count) => info!(
                "[ov-02] Finalized graph {} in {}: {} transactions",
                graph_id, self.topic, count
            ),
            Err(e) => warn!("[ov-02] Finalizing graph {} failed: {}", graph_id, e),
        }
        result
    }

    async fn discard_graph(&self, graph_id: Outpoint) -> usize {
        self.graphs.remove_session(&self.topic, &graph_id)
    }

    fn node_count(&self, graph_id: &Outpoint) -> usize {
        self.graphs.node_count(&self.topic, graph_id)
    }
}
