//! Dependency ordering of a staged graph.
//!
//! Post-order walk: every ancestor's bundle precedes the bundles of the
//! transactions spending it, and the root comes last. Two nodes describing
//! the same transaction rebuild byte-identical bundles, so identical
//! bundles are emitted once.

use crate::algorithms::bundle::{reconstruct_bundle, LocalBundles};
use crate::domain::{GraphError, GraphNode};
use shared_types::{Outpoint, Txid};
use std::collections::HashSet;
use std::sync::Arc;

/// One transaction of the commit order with the bundle proving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTx {
    pub txid: Txid,
    pub beef: Vec<u8>,
}

/// Transactions of the graph under `root`, deepest ancestors first.
pub fn dependency_order(
    root: &Arc<GraphNode>,
    max_nodes: usize,
    local: &LocalBundles,
) -> Result<Vec<OrderedTx>, GraphError> {
    let mut ordered = Vec::new();
    let mut emitted: HashSet<Vec<u8>> = HashSet::new();
    let mut visited: HashSet<Outpoint> = HashSet::new();
    let mut stack: Vec<(Arc<GraphNode>, bool)> = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            let beef = reconstruct_bundle(&node, max_nodes, local)?.to_bytes();
            if emitted.insert(beef.clone()) {
                ordered.push(OrderedTx {
                    txid: node.txid,
                    beef,
                });
            }
            continue;
        }

        if !visited.insert(node.outpoint()) {
            continue;
        }
        if visited.len() > max_nodes {
            return Err(GraphError::GraphFull {
                graph_id: root.graph_id,
                max: max_nodes,
            });
        }

        let children = node.children();
        stack.push((node, true));
        for child in children.into_iter().rev() {
            stack.push((child, false));
        }
    }
    Ok(ordered)
}
