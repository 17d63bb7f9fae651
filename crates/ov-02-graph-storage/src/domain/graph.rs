//! # Graph Node
//!
//! One staged transaction in a session's provenance DAG. A node owns its
//! children (the ancestors feeding its inputs) and keeps a weak pointer to
//! the node it was attached under, so dropping the root releases the session.

use crate::domain::errors::GraphError;
use crate::domain::value_objects::GaspNode;
use parking_lot::Mutex;
use shared_types::{MerklePath, Outpoint, Transaction, Txid};
use std::sync::{Arc, Weak};

/// A decoded, staged transaction.
#[derive(Debug)]
pub struct GraphNode {
    /// Session root.
    pub graph_id: Outpoint,
    /// Transaction id.
    pub txid: Txid,
    /// Output of interest.
    pub output_index: u32,
    /// Decoded transaction.
    pub tx: Transaction,
    /// Merkle path when the transaction is mined.
    pub proof: Option<MerklePath>,
    /// Ancillary bundle carried with the node.
    pub ancillary_beef: Option<Vec<u8>>,
    /// Outpoint this node was attached under; the root points at itself.
    pub spent_by: Outpoint,
    children: Mutex<Vec<Arc<GraphNode>>>,
    parent: Weak<GraphNode>,
}

impl GraphNode {
    /// Decode a wire node.
    pub fn from_wire(
        node: &GaspNode,
        spent_by: Option<Outpoint>,
        parent: Weak<GraphNode>,
    ) -> Result<Self, GraphError> {
        let tx = node.transaction()?;
        let proof = node.merkle_path()?;
        let txid = tx.txid();
        let outpoint = Outpoint::new(txid, node.output_index);
        Ok(Self {
            graph_id: node.graph_id,
            txid,
            output_index: node.output_index,
            tx,
            proof,
            ancillary_beef: node.ancillary_beef.clone(),
            spent_by: spent_by.unwrap_or(outpoint),
            children: Mutex::new(Vec::new()),
            parent,
        })
    }

    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid, self.output_index)
    }

    pub fn is_root(&self) -> bool {
        self.outpoint() == self.graph_id
    }

    /// Snapshot of the children.
    pub fn children(&self) -> Vec<Arc<GraphNode>> {
        self.children.lock().clone()
    }

    /// Link an ancestor. Serialized per parent.
    pub fn add_child(&self, child: Arc<GraphNode>) {
        let mut children = self.children.lock();
        if !children.iter().any(|c| c.outpoint() == child.outpoint()) {
            children.push(child);
        }
    }

    /// The node this one was attached under, while it is alive.
    pub fn parent(&self) -> Option<Arc<GraphNode>> {
        self.parent.upgrade()
    }
}
