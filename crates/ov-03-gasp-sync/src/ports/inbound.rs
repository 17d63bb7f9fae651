//! # Inbound Ports
//!
//! What the sync subsystem offers: driving sessions against peers, and
//! answering peers that drive sessions against us.

use crate::domain::{
    FinishGraph, FinishResponse, GaspNode, InitialRequest, InitialResponse, NodeRequest,
    NodeSubmission, SubmitOutcome, SyncError, SyncReport,
};
use async_trait::async_trait;

/// Initiator side - inbound port.
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Sync one topic with one peer.
    async fn sync_with_peer(&self, topic: &str, peer: &str) -> Result<SyncReport, SyncError>;

    /// Sync one topic with every peer its strategy selects.
    ///
    /// A failing peer is logged and skipped; the other peers still run.
    async fn sync_topic(&self, topic: &str) -> Result<Vec<SyncReport>, SyncError>;

    /// Sync every topic with a configured strategy.
    async fn sync_all(&self) -> Result<Vec<SyncReport>, SyncError>;
}

/// Responder side - inbound port.
#[async_trait]
pub trait GaspResponderApi: Send + Sync {
    async fn handle_initial_request(
        &self,
        topic: &str,
        request: &InitialRequest,
    ) -> Result<InitialResponse, SyncError>;

    async fn handle_node_request(
        &self,
        topic: &str,
        request: &NodeRequest,
    ) -> Result<GaspNode, SyncError>;

    /// Stage a node an initiator offers. A failed root or ancestor drops
    /// the whole graph.
    async fn handle_submit_node(
        &self,
        topic: &str,
        submission: &NodeSubmission,
    ) -> Result<SubmitOutcome, SyncError>;

    /// Validate and commit an offered graph, or drop it.
    async fn handle_finish_graph(
        &self,
        topic: &str,
        finish: &FinishGraph,
    ) -> Result<FinishResponse, SyncError>;
}
