//! # Wire Messages
//!
//! GASP handshake, node exchange and reply messages. Node payloads
//! ([`GaspNode`], [`NodeResponse`]) are defined by graph storage.
//!
//! The initiator pulls with [`NodeRequest`] and pushes with
//! [`NodeSubmission`]; a pushed graph ends with [`FinishGraph`].

use ov_02_graph_storage::KnownUtxo;
use serde::{Deserialize, Serialize};
use shared_types::Outpoint;

pub use ov_02_graph_storage::{GaspNode, InputRequest, NodeResponse};

/// Protocol version spoken by this node.
pub const GASP_VERSION: u32 = 1;

/// Opens a session: "what have you seen since `since`?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialRequest {
    pub version: u32,
    pub since: u64,
}

/// The responder's UTXOs at or after the requested watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialResponse {
    pub version: u32,
    /// Watermark to send next time.
    pub since: u64,
    pub utxo_list: Vec<KnownUtxo>,
}

/// Asks for one transaction of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub graph_id: Outpoint,
    pub outpoint: Outpoint,
    /// Include the ancillary bundle.
    pub metadata: bool,
}

/// Offers one node of a graph to the responder.
///
/// Without `spent_by` the node opens a graph on the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSubmission {
    pub node: GaspNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent_by: Option<Outpoint>,
}

/// What the responder did with a [`NodeSubmission`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "needed", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The root is already held; nothing was staged.
    AlreadyKnown,
    /// Another session is building this root; try again later.
    Busy,
    /// Staged; send these inputs next.
    Needs(NodeResponse),
    /// Staged; nothing more is needed below this node.
    Staged,
}

/// Ends a pushed graph: validate and commit it, or drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishGraph {
    pub graph_id: Outpoint,
    pub commit: bool,
}

/// Transactions the responder committed for a finished graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishResponse {
    pub committed: usize,
}
