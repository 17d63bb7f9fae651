//! Bundle reconstruction from a staged graph.
//!
//! An unproven node is only verifiable together with its ancestry, so its
//! bundle is rebuilt by walking its children. Inputs no child covers fall
//! back to bundles already stored locally. The walk visits at most
//! `max_nodes` nodes.

use crate::domain::{GraphError, GraphNode};
use shared_types::{Beef, Outpoint, Txid};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Locally stored bundles, by the txid of the transaction they prove.
pub type LocalBundles = HashMap<Txid, Beef>;

/// Rebuild the bundle proving `node`, with `node` as its subject.
pub fn reconstruct_bundle(
    node: &Arc<GraphNode>,
    max_nodes: usize,
    local: &LocalBundles,
) -> Result<Beef, GraphError> {
    let mut beef = Beef::new();
    let mut seen: HashSet<Txid> = HashSet::new();
    let mut stack = vec![node.clone()];

    while let Some(current) = stack.pop() {
        if !seen.insert(current.txid) {
            continue;
        }
        if seen.len() > max_nodes {
            return Err(GraphError::GraphFull {
                graph_id: node.graph_id,
                max: max_nodes,
            });
        }

        if let Some(ancillary) = &current.ancillary_beef {
            beef.merge_bytes(ancillary)?;
        }
        beef.add_transaction(current.tx.clone(), current.proof.clone());
        if current.proof.is_some() {
            continue;
        }

        let children = current.children();
        for input in &current.tx.inputs {
            let source = input.source;
            if let Some(child) = children.iter().find(|c| c.txid == source.txid) {
                stack.push(child.clone());
            } else if let Some(stored) = local.get(&source.txid) {
                beef.merge(stored);
            } else if !beef.contains(&source.txid) {
                return Err(GraphError::MissingInput(source.to_string()));
            }
        }
    }

    beef.set_subject(node.txid);
    Ok(beef)
}

/// Inputs of unproven nodes that no staged child covers.
///
/// These are the coins whose bundles must come from local storage.
pub fn uncovered_sources(
    root: &Arc<GraphNode>,
    max_nodes: usize,
) -> Result<Vec<Outpoint>, GraphError> {
    let mut uncovered = Vec::new();
    let mut seen: HashSet<Outpoint> = HashSet::new();
    let mut stack = vec![root.clone()];

    while let Some(current) = stack.pop() {
        if !seen.insert(current.outpoint()) {
            continue;
        }
        if seen.len() > max_nodes {
            return Err(GraphError::GraphFull {
                graph_id: root.graph_id,
                max: max_nodes,
            });
        }

        let children = current.children();
        if current.proof.is_none() {
            for input in &current.tx.inputs {
                let covered = children.iter().any(|c| c.txid == input.source.txid);
                if !covered && !uncovered.contains(&input.source) {
                    uncovered.push(input.source);
                }
            }
        }
        stack.extend(children);
    }
    Ok(uncovered)
}
