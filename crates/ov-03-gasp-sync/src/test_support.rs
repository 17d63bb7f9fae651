//! Scripted graph storage shared by unit tests.
//!
//! Behaves like a topic's storage without running admission: an input is
//! needed when its source is neither held nor staged, unless it spends the
//! all-zero "genesis" txid. Finalizing moves staged transactions into the
//! held set with increasing scores.

use async_trait::async_trait;
use ov_02_graph_storage::{
    GaspNode, GraphError, GraphStorageApi, KnownUtxo, NodeResponse,
};
use parking_lot::Mutex;
use shared_types::{Outpoint, Transaction, TxInput, TxOutput, Txid};
use std::collections::{BTreeMap, HashMap, HashSet};

pub(crate) const GENESIS: Txid = Txid([0u8; 32]);

pub(crate) fn tx(sources: &[Outpoint], tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: sources.iter().copied().map(TxInput::spending).collect(),
        outputs: vec![TxOutput {
            satoshis: 10,
            locking_script: vec![tag],
        }],
        lock_time: 0,
    }
}

/// Unproven wire node for output 0 of `tx`.
pub(crate) fn node(tx: &Transaction, graph_id: Outpoint) -> GaspNode {
    GaspNode {
        graph_id,
        raw_tx: tx.to_hex(),
        output_index: 0,
        proof: None,
        ancillary_beef: None,
    }
}

/// `chain[0]` spends genesis, every later tx spends the one before.
pub(crate) fn chain(len: usize, salt: u8) -> Vec<Transaction> {
    let mut txs = vec![tx(&[Outpoint::new(GENESIS, salt as u32)], salt)];
    for i in 1..len {
        let prev = txs[i - 1].outpoint(0);
        txs.push(tx(&[prev], salt.wrapping_add(i as u8)));
    }
    txs
}

#[derive(Default)]
struct State {
    held: BTreeMap<Outpoint, (Transaction, u64)>,
    staged: HashMap<Outpoint, Vec<Transaction>>,
    /// Held but never advertised in a handshake.
    hidden: HashSet<Outpoint>,
    next_score: u64,
}

pub(crate) struct ScriptedStorage {
    topic: String,
    max_nodes: usize,
    state: Mutex<State>,
    reject: Mutex<HashSet<Outpoint>>,
    pub(crate) discarded: Mutex<Vec<Outpoint>>,
}

impl ScriptedStorage {
    pub(crate) fn new(topic: &str, max_nodes: usize) -> Self {
        Self {
            topic: topic.to_string(),
            max_nodes,
            state: Mutex::new(State {
                next_score: 1,
                ..State::default()
            }),
            reject: Mutex::new(HashSet::new()),
            discarded: Mutex::new(Vec::new()),
        }
    }

    /// Hold every transaction of `txs` with increasing scores.
    pub(crate) fn hold(&self, txs: &[Transaction]) {
        let mut state = self.state.lock();
        for tx in txs {
            let score = state.next_score;
            state.next_score += 1;
            state.held.insert(tx.outpoint(0), (tx.clone(), score));
        }
    }

    /// Hold `txs` but advertise only the last one.
    pub(crate) fn hold_tip_only(&self, txs: &[Transaction]) {
        self.hold(txs);
        let mut state = self.state.lock();
        for tx in txs.iter().take(txs.len().saturating_sub(1)) {
            state.hidden.insert(tx.outpoint(0));
        }
    }

    /// Fail anchor validation for `graph_id`.
    pub(crate) fn reject(&self, graph_id: Outpoint) {
        self.reject.lock().insert(graph_id);
    }

    pub(crate) fn holds(&self, outpoint: &Outpoint) -> bool {
        self.state.lock().held.contains_key(outpoint)
    }

    pub(crate) fn held_count(&self) -> usize {
        self.state.lock().held.len()
    }

    pub(crate) fn staged_sessions(&self) -> usize {
        self.state.lock().staged.len()
    }
}

#[async_trait]
impl GraphStorageApi for ScriptedStorage {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn find_known_utxos(&self, since: u64) -> Result<Vec<KnownUtxo>, GraphError> {
        let state = self.state.lock();
        let mut utxos: Vec<KnownUtxo> = state
            .held
            .iter()
            .filter(|(outpoint, (_, score))| *score >= since && !state.hidden.contains(outpoint))
            .map(|(outpoint, (_, score))| KnownUtxo {
                outpoint: *outpoint,
                score: *score,
            })
            .collect();
        utxos.sort_by_key(|u| (u.score, u.outpoint));
        Ok(utxos)
    }

    async fn is_known(&self, outpoint: &Outpoint) -> Result<bool, GraphError> {
        Ok(self.holds(outpoint))
    }

    async fn hydrate_graph_node(
        &self,
        graph_id: Outpoint,
        outpoint: Outpoint,
        _include_metadata: bool,
    ) -> Result<GaspNode, GraphError> {
        let state = self.state.lock();
        let (tx, _) = state
            .held
            .get(&outpoint)
            .ok_or(GraphError::UnknownOutput(outpoint))?;
        Ok(GaspNode {
            graph_id,
            raw_tx: tx.to_hex(),
            output_index: outpoint.index,
            proof: None,
            ancillary_beef: None,
        })
    }

    async fn find_needed_inputs(&self, node: &GaspNode) -> Result<Option<NodeResponse>, GraphError> {
        let tx = node.transaction()?;
        let state = self.state.lock();
        let staged: HashSet<Txid> = state
            .staged
            .get(&node.graph_id)
            .map(|txs| txs.iter().map(Transaction::txid).collect())
            .unwrap_or_default();
        let needed: Vec<Outpoint> = tx
            .inputs
            .iter()
            .map(|i| i.source)
            .filter(|s| s.txid != GENESIS && !state.held.contains_key(s) && !staged.contains(&s.txid))
            .collect();
        Ok((!needed.is_empty()).then(|| NodeResponse::requesting(needed, false)))
    }

    async fn append_to_graph(
        &self,
        node: &GaspNode,
        spent_by: Option<Outpoint>,
    ) -> Result<(), GraphError> {
        let tx = node.transaction()?;
        let mut state = self.state.lock();
        match spent_by {
            None if state.staged.contains_key(&node.graph_id) => {
                Err(GraphError::SessionActive(node.graph_id))
            }
            None => {
                state.staged.insert(node.graph_id, vec![tx]);
                Ok(())
            }
            Some(parent) => {
                let staged = state
                    .staged
                    .get_mut(&node.graph_id)
                    .ok_or(GraphError::UnknownGraph(node.graph_id))?;
                if !staged.iter().any(|t| t.txid() == parent.txid) {
                    return Err(GraphError::MissingInput(parent.to_string()));
                }
                if staged.iter().any(|t| t.txid() == tx.txid()) {
                    return Ok(());
                }
                if staged.len() >= self.max_nodes {
                    return Err(GraphError::GraphFull {
                        graph_id: node.graph_id,
                        max: self.max_nodes,
                    });
                }
                staged.push(tx);
                Ok(())
            }
        }
    }

    async fn validate_graph_anchor(&self, graph_id: Outpoint) -> Result<(), GraphError> {
        if self.reject.lock().contains(&graph_id) {
            return Err(GraphError::AnchorFailed {
                graph_id,
                reason: "rejected by script".to_string(),
            });
        }
        Ok(())
    }

    async fn finalize_graph(&self, graph_id: Outpoint) -> Result<usize, GraphError> {
        let mut state = self.state.lock();
        let mut staged = state
            .staged
            .remove(&graph_id)
            .ok_or(GraphError::UnknownGraph(graph_id))?;
        // Ancestors were staged after their spenders.
        staged.reverse();
        let count = staged.len();
        for tx in staged {
            let score = state.next_score;
            state.next_score += 1;
            state.held.insert(tx.outpoint(0), (tx, score));
        }
        Ok(count)
    }

    async fn discard_graph(&self, graph_id: Outpoint) -> usize {
        self.discarded.lock().push(graph_id);
        self.state
            .lock()
            .staged
            .remove(&graph_id)
            .map(|txs| txs.len())
            .unwrap_or(0)
    }

    fn node_count(&self, graph_id: &Outpoint) -> usize {
        self.state
            .lock()
            .staged
            .get(graph_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
