//! # Domain Value Objects
//!
//! Wire shapes exchanged with peers during node exchange.

use crate::domain::errors::GraphError;
use serde::{Deserialize, Serialize};
use shared_types::{MerklePath, Outpoint, Transaction};
use std::collections::BTreeMap;

/// A transaction serialized for a peer, pinned to one of its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspNode {
    /// Root outpoint of the sync session this node belongs to.
    pub graph_id: Outpoint,
    /// Hex of the transaction's canonical encoding.
    pub raw_tx: String,
    /// Output of interest within the transaction.
    pub output_index: u32,
    /// Hex-encoded Merkle path when the transaction is mined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
    /// Bundle of transactions the topic manager needs alongside this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancillary_beef: Option<Vec<u8>>,
}

impl GaspNode {
    /// Decode the transaction.
    pub fn transaction(&self) -> Result<Transaction, GraphError> {
        let tx = Transaction::from_hex(&self.raw_tx)?;
        if self.output_index as usize >= tx.outputs.len() {
            return Err(GraphError::MalformedNode(format!(
                "output index {} out of range ({} outputs)",
                self.output_index,
                tx.outputs.len()
            )));
        }
        Ok(tx)
    }

    /// Decode the Merkle path, if any.
    pub fn merkle_path(&self) -> Result<Option<MerklePath>, GraphError> {
        self.proof
            .as_deref()
            .map(MerklePath::from_hex)
            .transpose()
            .map_err(GraphError::from)
    }

    /// The outpoint this node describes.
    pub fn outpoint(&self) -> Result<Outpoint, GraphError> {
        Ok(self.transaction()?.outpoint(self.output_index))
    }
}

/// How an input should be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    /// Ask the peer for the ancillary bundle too.
    pub metadata: bool,
}

/// Inputs a node still needs, keyed by canonical outpoint string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub requested_inputs: BTreeMap<String, InputRequest>,
}

impl NodeResponse {
    /// Request each outpoint with the same metadata flag.
    pub fn requesting(outpoints: impl IntoIterator<Item = Outpoint>, metadata: bool) -> Self {
        Self {
            requested_inputs: outpoints
                .into_iter()
                .map(|o| (o.to_string(), InputRequest { metadata }))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requested_inputs.is_empty()
    }

    /// Parsed requests in key order.
    pub fn requests(&self) -> Result<Vec<(Outpoint, bool)>, GraphError> {
        self.requested_inputs
            .iter()
            .map(|(key, req)| Ok((key.parse::<Outpoint>()?, req.metadata)))
            .collect()
    }
}

/// An unspent topic output a peer may not have, with its watermark score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownUtxo {
    pub outpoint: Outpoint,
    pub score: u64,
}
