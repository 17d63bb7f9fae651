//! Graph fixtures shared by unit tests.

use crate::domain::{GaspNode, GraphNode};
use shared_types::{
    build_merkle_path, compute_merkle_root, MerklePath, Outpoint, StaticChainTracker, Transaction,
    TxInput, TxOutput,
};
use std::sync::{Arc, Weak};

pub(crate) fn tx(sources: &[Outpoint], outputs: usize, tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: sources.iter().copied().map(TxInput::spending).collect(),
        outputs: (0..outputs)
            .map(|i| TxOutput {
                satoshis: 50,
                locking_script: vec![tag, i as u8],
            })
            .collect(),
        lock_time: 0,
    }
}

/// `tx` alone in a block at `height`, with its proof.
pub(crate) fn mined(tx: &Transaction, height: u32) -> (Transaction, MerklePath) {
    let proof = build_merkle_path(&[tx.txid()], 0, height).unwrap();
    (tx.clone(), proof)
}

/// Teach `tracker` the block that [`mined`] put `tx` in.
pub(crate) fn register(tracker: &StaticChainTracker, tx: &Transaction, height: u32) {
    tracker.add_root(height, compute_merkle_root(&[tx.txid()]));
}

pub(crate) fn wire(
    tx: &Transaction,
    index: u32,
    graph_id: Outpoint,
    proof: Option<&MerklePath>,
) -> GaspNode {
    GaspNode {
        graph_id,
        raw_tx: tx.to_hex(),
        output_index: index,
        proof: proof.map(MerklePath::to_hex),
        ancillary_beef: None,
    }
}

pub(crate) fn root_node(tx: &Transaction, index: u32, proof: Option<&MerklePath>) -> Arc<GraphNode> {
    let node = wire(tx, index, tx.outpoint(index), proof);
    Arc::new(GraphNode::from_wire(&node, None, Weak::new()).unwrap())
}

pub(crate) fn attach(
    parent: &Arc<GraphNode>,
    tx: &Transaction,
    index: u32,
    proof: Option<&MerklePath>,
) -> Arc<GraphNode> {
    let node = wire(tx, index, parent.graph_id, proof);
    let child = Arc::new(
        GraphNode::from_wire(&node, Some(parent.outpoint()), Arc::downgrade(parent)).unwrap(),
    );
    parent.add_child(child.clone());
    child
}
