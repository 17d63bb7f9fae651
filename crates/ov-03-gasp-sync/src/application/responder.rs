//! # GASP Responder
//!
//! Answers peers that sync against this node: the handshake lists our
//! unspent topic outputs since the peer's watermark, and node requests
//! hydrate individual transactions of a graph.
//!
//! In the reply half the peer offers graphs we lack. Those are staged in
//! our own graph storage and re-validated here before anything commits;
//! the peer's word is never taken for it.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::topics::TopicStorages;
use crate::domain::{
    FinishGraph, FinishResponse, GaspNode, InitialRequest, InitialResponse, NodeRequest,
    NodeSubmission, SubmitOutcome, SyncError, GASP_VERSION,
};
use crate::ports::GaspResponderApi;
use ov_02_graph_storage::{GraphError, GraphStorageApi};

/// Responder side of the protocol, one table of topics.
#[derive(Debug)]
pub struct GaspResponder {
    storages: TopicStorages,
    version: u32,
}

impl GaspResponder {
    pub fn new(version: u32) -> Self {
        Self {
            storages: TopicStorages::new(),
            version,
        }
    }

    /// Serve `storage`'s topic.
    pub fn with_storage(mut self, storage: Arc<dyn GraphStorageApi>) -> Self {
        self.storages.insert(storage);
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }
}

impl Default for GaspResponder {
    fn default() -> Self {
        Self::new(GASP_VERSION)
    }
}

#[async_trait]
impl GaspResponderApi for GaspResponder {
    async fn handle_initial_request(
        &self,
        topic: &str,
        request: &InitialRequest,
    ) -> Result<InitialResponse, SyncError> {
        if request.version != self.version {
            return Err(SyncError::VersionMismatch {
                expected: self.version,
                got: request.version,
            });
        }
        let storage = self.storages.get(topic)?;
        let utxo_list = storage.find_known_utxos(request.since).await?;
        let since = utxo_list
            .iter()
            .map(|u| u.score)
            .max()
            .unwrap_or(request.since);

        debug!(
            topic,
            since = request.since,
            "[ov-03] Answering handshake with {} UTXOs",
            utxo_list.len()
        );
        Ok(InitialResponse {
            version: self.version,
            since,
            utxo_list,
        })
    }

    async fn handle_node_request(
        &self,
        topic: &str,
        request: &NodeRequest,
    ) -> Result<GaspNode, SyncError> {
        let storage = self.storages.get(topic)?;
        let node = storage
            .hydrate_graph_node(request.graph_id, request.outpoint, request.metadata)
            .await?;
        Ok(node)
    }

    async fn handle_submit_node(
        &self,
        topic: &str,
        submission: &NodeSubmission,
    ) -> Result<SubmitOutcome, SyncError> {
        let storage = self.storages.get(topic)?;
        let node = &submission.node;
        let graph_id = node.graph_id;

        if submission.spent_by.is_none() && storage.is_known(&node.outpoint()?).await? {
            return Ok(SubmitOutcome::AlreadyKnown);
        }
        let staged = match storage.append_to_graph(node, submission.spent_by).await {
            Err(GraphError::SessionActive(_)) if submission.spent_by.is_none() => {
                return Ok(SubmitOutcome::Busy);
            }
            Err(e) => Err(e),
            Ok(()) => storage.find_needed_inputs(node).await,
        };

        match staged {
            Ok(Some(needed)) => Ok(SubmitOutcome::Needs(needed)),
            Ok(None) => Ok(SubmitOutcome::Staged),
            Err(e) => {
                let released = storage.discard_graph(graph_id).await;
                warn!(
                    topic,
                    "[ov-03] Dropped offered graph {} ({} nodes): {}",
                    graph_id,
                    released,
                    e
                );
                Err(e.into())
            }
        }
    }

    async fn handle_finish_graph(
        &self,
        topic: &str,
        finish: &FinishGraph,
    ) -> Result<FinishResponse, SyncError> {
        let storage = self.storages.get(topic)?;
        let graph_id = finish.graph_id;

        if !finish.commit {
            let released = storage.discard_graph(graph_id).await;
            debug!(topic, "[ov-03] Peer abandoned graph {} ({} nodes)", graph_id, released);
            return Ok(FinishResponse { committed: 0 });
        }
        if let Err(e) = storage.validate_graph_anchor(graph_id).await {
            storage.discard_graph(graph_id).await;
            warn!(topic, "[ov-03] Offered graph {} failed validation: {}", graph_id, e);
            return Err(e.into());
        }
        let committed = storage.finalize_graph(graph_id).await?;
        info!(topic, "[ov-03] Committed offered graph {} ({} txs)", graph_id, committed);
        Ok(FinishResponse { committed })
    }
}
