//! # Inbound Ports
//!
//! API trait for one topic's graph-aware temporary storage.

use crate::domain::{GaspNode, GraphError, KnownUtxo, NodeResponse};
use async_trait::async_trait;
use shared_types::Outpoint;

/// Graph-aware temporary storage - inbound port.
///
/// One instance serves one topic. Sessions are keyed by topic and root
/// outpoint (the graph id), so sessions of different topics never block
/// each other even over one shared graph store.
#[async_trait]
pub trait GraphStorageApi: Send + Sync {
    /// Topic served.
    fn topic(&self) -> &str;

    /// Unspent topic outputs with score at or above `since`, oldest first.
    async fn find_known_utxos(&self, since: u64) -> Result<Vec<KnownUtxo>, GraphError>;

    /// Does the topic already hold `outpoint` (spent or not)?
    async fn is_known(&self, outpoint: &Outpoint) -> Result<bool, GraphError>;

    /// Serialize a locally held output's transaction for a peer.
    async fn hydrate_graph_node(
        &self,
        graph_id: Outpoint,
        outpoint: Outpoint,
        include_metadata: bool,
    ) -> Result<GaspNode, GraphError>;

    /// Inputs of `node` still to fetch; `None` when nothing is outstanding.
    async fn find_needed_inputs(&self, node: &GaspNode) -> Result<Option<NodeResponse>, GraphError>;

    /// Stage `node`. Without `spent_by` it becomes the session root.
    async fn append_to_graph(
        &self,
        node: &GaspNode,
        spent_by: Option<Outpoint>,
    ) -> Result<(), GraphError>;

    /// Re-derive the peer's claim that the root is admissible.
    async fn validate_graph_anchor(&self, graph_id: Outpoint) -> Result<(), GraphError>;

    /// Commit the session through the admission pipeline, then release it.
    ///
    /// Returns the number of transactions submitted.
    async fn finalize_graph(&self, graph_id: Outpoint) -> Result<usize, GraphError>;

    /// Release every node of the session. Returns how many were removed.
    async fn discard_graph(&self, graph_id: Outpoint) -> usize;

    /// Nodes currently staged for the session.
    fn node_count(&self, graph_id: &Outpoint) -> usize;
}
