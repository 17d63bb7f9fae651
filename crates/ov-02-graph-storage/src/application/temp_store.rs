//! Temporary graph store.
//!
//! Concurrent arena shared by every sync session of every topic. A session
//! is named by its topic and graph id. Its root is stored under
//! `"<topic>|<graph id>"` and every other node under
//! `"<topic>|<graph id>/<outpoint>"`, so an ancestor attaches to its spender
//! with one map lookup and sessions never see each other's nodes.
//!
//! The per-session node count is checked and incremented under the count
//! map's entry lock, so concurrent appends can't overshoot the ceiling.

use crate::config::GraphConfig;
use crate::domain::{GaspNode, GraphError, GraphNode};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::Outpoint;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Staged nodes of every active session.
#[derive(Debug)]
pub struct TemporaryGraphStore {
    nodes: DashMap<String, Arc<GraphNode>>,
    counts: DashMap<(String, Outpoint), usize>,
    max_nodes: usize,
}

impl TemporaryGraphStore {
    /// Create a store bounding each session at `max_nodes`.
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: DashMap::new(),
            counts: DashMap::new(),
            max_nodes,
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &GraphConfig) -> Self {
        Self::new(config.max_nodes)
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Stage a session root for `topic`.
    pub fn insert_root(&self, topic: &str, node: &GaspNode) -> Result<Arc<GraphNode>, GraphError> {
        let graph_id = node.graph_id;
        let staged = Arc::new(GraphNode::from_wire(node, None, Weak::new())?);
        if staged.outpoint() != graph_id {
            return Err(GraphError::MalformedNode(format!(
                "root {} does not describe graph {}",
                staged.outpoint(),
                graph_id
            )));
        }

        match self.nodes.entry(root_key(topic, &graph_id)) {
            Entry::Occupied(_) => Err(GraphError::SessionActive(graph_id)),
            Entry::Vacant(slot) => {
                self.reserve(topic, &graph_id)?;
                slot.insert(staged.clone());
                debug!(topic, "[ov-02] Opened graph {}", graph_id);
                Ok(staged)
            }
        }
    }

    /// Stage an ancestor under the node stored for `spent_by`.
    pub fn attach(
        &self,
        topic: &str,
        node: &GaspNode,
        spent_by: Outpoint,
    ) -> Result<Arc<GraphNode>, GraphError> {
        let graph_id = node.graph_id;
        let parent = self
            .get(topic, &graph_id, &spent_by)
            .ok_or_else(|| GraphError::MissingInput(node_key(topic, &graph_id, &spent_by)))?;
        let staged = GraphNode::from_wire(node, Some(spent_by), Arc::downgrade(&parent))?;
        let outpoint = staged.outpoint();

        if !parent.tx.inputs.iter().any(|i| i.source.txid == staged.txid) {
            return Err(GraphError::MalformedNode(format!(
                "{outpoint} is not an input of {spent_by}"
            )));
        }

        match self.nodes.entry(node_key(topic, &graph_id, &outpoint)) {
            Entry::Occupied(existing) => {
                // Reached along a second path: link, don't recount.
                parent.add_child(existing.get().clone());
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                self.reserve(topic, &graph_id)?;
                let staged = Arc::new(staged);
                parent.add_child(staged.clone());
                slot.insert(staged.clone());
                Ok(staged)
            }
        }
    }

    /// Node staged for `outpoint` in the session (`topic`, `graph_id`).
    pub fn get(&self, topic: &str, graph_id: &Outpoint, outpoint: &Outpoint) -> Option<Arc<GraphNode>> {
        self.nodes
            .get(&node_key(topic, graph_id, outpoint))
            .map(|entry| entry.value().clone())
    }

    /// Root of the session.
    pub fn root(&self, topic: &str, graph_id: &Outpoint) -> Option<Arc<GraphNode>> {
        self.get(topic, graph_id, graph_id)
    }

    pub fn contains(&self, topic: &str, graph_id: &Outpoint, outpoint: &Outpoint) -> bool {
        self.nodes.contains_key(&node_key(topic, graph_id, outpoint))
    }

    /// Nodes staged for the session.
    pub fn node_count(&self, topic: &str, graph_id: &Outpoint) -> usize {
        self.counts
            .get(&(topic.to_string(), *graph_id))
            .map(|c| *c)
            .unwrap_or(0)
    }

    /// Active sessions.
    pub fn session_count(&self) -> usize {
        self.counts.len()
    }

    /// Nodes staged across all sessions.
    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the session from its root and remove every node.
    pub fn remove_session(&self, topic: &str, graph_id: &Outpoint) -> usize {
        let mut removed = 0;
        let mut seen: HashSet<Outpoint> = HashSet::new();
        let mut stack: Vec<Arc<GraphNode>> = self.root(topic, graph_id).into_iter().collect();

        while let Some(node) = stack.pop() {
            let outpoint = node.outpoint();
            if !seen.insert(outpoint) {
                continue;
            }
            if self.nodes.remove(&node_key(topic, graph_id, &outpoint)).is_some() {
                removed += 1;
            }
            stack.extend(node.children());
        }
        self.counts.remove(&(topic.to_string(), *graph_id));

        debug!(topic, "[ov-02] Released graph {} ({} nodes)", graph_id, removed);
        removed
    }

    fn reserve(&self, topic: &str, graph_id: &Outpoint) -> Result<(), GraphError> {
        let mut count = self.counts.entry((topic.to_string(), *graph_id)).or_insert(0);
        if *count >= self.max_nodes {
            return Err(GraphError::GraphFull {
                graph_id: *graph_id,
                max: self.max_nodes,
            });
        }
        *count += 1;
        Ok(())
    }
}

fn root_key(topic: &str, graph_id: &Outpoint) -> String {
    format!("{topic}|{graph_id}")
}

fn node_key(topic: &str, graph_id: &Outpoint, outpoint: &Outpoint) -> String {
    if graph_id == outpoint {
        root_key(topic, graph_id)
    } else {
        format!("{topic}|{graph_id}/{outpoint}")
    }
}
