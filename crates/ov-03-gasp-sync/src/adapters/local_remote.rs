//! In-process peers.
//!
//! [`LocalGaspRemote`] talks to a responder in the same process, but every
//! message crosses a JSON encode/decode so the wire shapes are exercised the
//! way an HTTP transport would.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::trace;

use crate::domain::{
    FinishGraph, FinishResponse, GaspNode, InitialRequest, InitialResponse, NodeRequest,
    NodeSubmission, SubmitOutcome, SyncError,
};
use crate::ports::{GaspRemote, GaspResponderApi, PeerConnector};

/// A peer reached through a local responder.
pub struct LocalGaspRemote {
    peer: String,
    topic: String,
    responder: Arc<dyn GaspResponderApi>,
}

impl LocalGaspRemote {
    pub fn new(
        peer: impl Into<String>,
        topic: impl Into<String>,
        responder: Arc<dyn GaspResponderApi>,
    ) -> Self {
        Self {
            peer: peer.into(),
            topic: topic.into(),
            responder,
        }
    }

    fn transmit<T: Serialize + DeserializeOwned>(&self, message: &T) -> Result<T, SyncError> {
        let bytes = serde_json::to_vec(message).map_err(|e| self.remote_error(e))?;
        trace!(peer = %self.peer, "[ov-03] {} bytes on the wire", bytes.len());
        serde_json::from_slice(&bytes).map_err(|e| self.remote_error(e))
    }

    /// Version mismatches keep their type; everything else is the peer's fault.
    fn carry(&self, err: SyncError) -> SyncError {
        match err {
            SyncError::VersionMismatch { .. } => err,
            other => self.remote_error(other),
        }
    }

    fn remote_error(&self, reason: impl ToString) -> SyncError {
        SyncError::Remote {
            peer: self.peer.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl GaspRemote for LocalGaspRemote {
    async fn initial_request(&self, request: &InitialRequest) -> Result<InitialResponse, SyncError> {
        let request = self.transmit(request)?;
        let response = self
            .responder
            .handle_initial_request(&self.topic, &request)
            .await
            .map_err(|e| self.carry(e))?;
        self.transmit(&response)
    }

    async fn request_node(&self, request: &NodeRequest) -> Result<GaspNode, SyncError> {
        let request = self.transmit(request)?;
        let node = self
            .responder
            .handle_node_request(&self.topic, &request)
            .await
            .map_err(|e| self.carry(e))?;
        self.transmit(&node)
    }

    async fn submit_node(&self, submission: &NodeSubmission) -> Result<SubmitOutcome, SyncError> {
        let submission = self.transmit(submission)?;
        let outcome = self
            .responder
            .handle_submit_node(&self.topic, &submission)
            .await
            .map_err(|e| self.carry(e))?;
        self.transmit(&outcome)
    }

    async fn finish_graph(&self, finish: &FinishGraph) -> Result<FinishResponse, SyncError> {
        let finish = self.transmit(finish)?;
        let response = self
            .responder
            .handle_finish_graph(&self.topic, &finish)
            .await
            .map_err(|e| self.carry(e))?;
        self.transmit(&response)
    }
}

/// Connects to responders registered by URL.
#[derive(Default)]
pub struct LocalPeerConnector {
    peers: DashMap<String, Arc<dyn GaspResponderApi>>,
}

impl LocalPeerConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `responder` reachable at `url`.
    pub fn register(&self, url: impl Into<String>, responder: Arc<dyn GaspResponderApi>) {
        self.peers.insert(url.into(), responder);
    }

    /// Take `url` offline.
    pub fn disconnect(&self, url: &str) -> bool {
        self.peers.remove(url).is_some()
    }
}

impl PeerConnector for LocalPeerConnector {
    fn connect(&self, peer: &str, topic: &str) -> Result<Arc<dyn GaspRemote>, SyncError> {
        let responder = self
            .peers
            .get(peer)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SyncError::Remote {
                peer: peer.to_string(),
                reason: "unreachable".to_string(),
            })?;
        Ok(Arc::new(LocalGaspRemote::new(peer, topic, responder)))
    }
}
