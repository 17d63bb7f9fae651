//! # Outbound Ports
//!
//! Traits for reaching peers.

use crate::domain::{
    FinishGraph, FinishResponse, GaspNode, InitialRequest, InitialResponse, NodeRequest,
    NodeSubmission, SubmitOutcome, SyncError,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One peer, scoped to one topic - outbound port.
#[async_trait]
pub trait GaspRemote: Send + Sync {
    /// Handshake.
    async fn initial_request(&self, request: &InitialRequest) -> Result<InitialResponse, SyncError>;

    /// Fetch one node of a graph.
    async fn request_node(&self, request: &NodeRequest) -> Result<GaspNode, SyncError>;

    /// Offer one node of a graph the peer lacks.
    async fn submit_node(&self, submission: &NodeSubmission) -> Result<SubmitOutcome, SyncError>;

    /// Have the peer commit or drop a graph it was offered.
    async fn finish_graph(&self, finish: &FinishGraph) -> Result<FinishResponse, SyncError>;
}

/// Opens [`GaspRemote`]s by peer URL - outbound port.
pub trait PeerConnector: Send + Sync {
    fn connect(&self, peer: &str, topic: &str) -> Result<Arc<dyn GaspRemote>, SyncError>;
}

/// Finds peers hosting a topic (the broadcast tracker) - outbound port.
#[async_trait]
pub trait PeerResolver: Send + Sync {
    async fn resolve(&self, topic: &str) -> Result<Vec<String>, SyncError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Resolver answering from a fixed table.
#[derive(Debug, Default, Clone)]
pub struct StaticPeerResolver {
    peers: BTreeMap<String, Vec<String>>,
}

impl StaticPeerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `peers` for `topic`.
    pub fn with_topic(mut self, topic: impl Into<String>, peers: Vec<String>) -> Self {
        self.peers.insert(topic.into(), peers);
        self
    }
}

#[async_trait]
impl PeerResolver for StaticPeerResolver {
    async fn resolve(&self, topic: &str) -> Result<Vec<String>, SyncError> {
        Ok(self.peers.get(topic).cloned().unwrap_or_default())
    }
}
