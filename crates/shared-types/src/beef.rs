//! # BEEF Bundles
//!
//! A self-contained serialization of a transaction plus the ancestors and
//! Merkle paths needed to verify it without external lookups.
//!
//! ## Layout
//!
//! Transactions are kept in dependency order: every transaction appears after
//! all in-bundle transactions it spends from. The *subject* is the
//! transaction the bundle is about; it defaults to the last transaction.
//!
//! ## SPV Rule
//!
//! A transaction is anchored when it carries a Merkle path whose root the
//! chain tracker accepts, or when every one of its inputs spends an existing
//! output of an anchored in-bundle transaction.

use crate::chain::ChainTracker;
use crate::entities::{Transaction, Txid};
use crate::errors::TypesError;
use crate::merkle::MerklePath;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Encoding version written in front of every serialized bundle.
pub const BEEF_VERSION: u32 = 1;

/// A transaction inside a bundle, with its proof when mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeefTx {
    /// The transaction.
    pub tx: Transaction,
    /// Merkle path, if the transaction is mined.
    pub proof: Option<MerklePath>,
}

impl BeefTx {
    /// Id of the wrapped transaction.
    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }
}

#[derive(Serialize, Deserialize)]
struct BeefWire {
    version: u32,
    transactions: Vec<BeefTx>,
    subject: Option<Txid>,
}

/// A parsed transaction bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Beef {
    transactions: Vec<BeefTx>,
    subject: Option<Txid>,
}

impl Beef {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle holding a single transaction, which becomes the subject.
    pub fn from_transaction(tx: Transaction, proof: Option<MerklePath>) -> Self {
        let subject = tx.txid();
        Self {
            transactions: vec![BeefTx { tx, proof }],
            subject: Some(subject),
        }
    }

    /// Parse bundle bytes.
    ///
    /// # Errors
    /// - `MalformedBundle` if the bytes don't decode, the version is unknown,
    ///   the bundle is empty, a txid repeats, or the subject is absent
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let wire: BeefWire = bincode::deserialize(bytes)
            .map_err(|e| TypesError::MalformedBundle(e.to_string()))?;

        if wire.version != BEEF_VERSION {
            return Err(TypesError::MalformedBundle(format!(
                "unsupported bundle version {}",
                wire.version
            )));
        }
        if wire.transactions.is_empty() {
            return Err(TypesError::MalformedBundle(
                "bundle contains no transactions".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for btx in &wire.transactions {
            if !seen.insert(btx.txid()) {
                return Err(TypesError::MalformedBundle(format!(
                    "duplicate transaction {}",
                    btx.txid()
                )));
            }
        }
        if let Some(subject) = wire.subject {
            if !seen.contains(&subject) {
                return Err(TypesError::MalformedBundle(format!(
                    "subject {subject} not in bundle"
                )));
            }
        }

        let mut beef = Self {
            transactions: wire.transactions,
            subject: wire.subject,
        };
        beef.sort_dependencies()?;
        Ok(beef)
    }

    /// Serialize to bytes.
    pub fn try_to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        let wire = BeefWire {
            version: BEEF_VERSION,
            transactions: self.transactions.clone(),
            subject: self.subject,
        };
        bincode::serialize(&wire).map_err(|e| TypesError::Encoding(e.to_string()))
    }

    /// Serialize to bytes, logging and returning nothing on failure.
    ///
    /// Empty bytes never parse, so a failure here surfaces downstream as a
    /// malformed bundle. Use [`Beef::try_to_bytes`] where the caller can
    /// propagate the error.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.try_to_bytes().unwrap_or_else(|e| {
            tracing::error!("bundle of {} transactions not serialized: {e}", self.len());
            Vec::new()
        })
    }

    /// Transactions in dependency order.
    pub fn transactions(&self) -> &[BeefTx] {
        &self.transactions
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the bundle holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Look up a transaction by id.
    pub fn find(&self, txid: &Txid) -> Option<&BeefTx> {
        self.transactions.iter().find(|btx| btx.txid() == *txid)
    }

    /// Whether `txid` is in the bundle.
    pub fn contains(&self, txid: &Txid) -> bool {
        self.find(txid).is_some()
    }

    /// The subject transaction.
    pub fn subject(&self) -> Result<&BeefTx, TypesError> {
        match self.subject {
            Some(txid) => self.find(&txid).ok_or_else(|| {
                TypesError::MalformedBundle(format!("subject {txid} not in bundle"))
            }),
            None => self
                .transactions
                .last()
                .ok_or_else(|| TypesError::MalformedBundle("empty bundle".to_string())),
        }
    }

    /// Id of the subject transaction.
    pub fn subject_txid(&self) -> Result<Txid, TypesError> {
        self.subject().map(BeefTx::txid)
    }

    /// Make `txid` the subject.
    pub fn set_subject(&mut self, txid: Txid) {
        self.subject = Some(txid);
    }

    /// Add a transaction. A known transaction only gains a missing proof.
    pub fn add_transaction(&mut self, tx: Transaction, proof: Option<MerklePath>) {
        let txid = tx.txid();
        if let Some(existing) = self.transactions.iter_mut().find(|b| b.txid() == txid) {
            if existing.proof.is_none() {
                existing.proof = proof;
            }
            return;
        }
        self.transactions.push(BeefTx { tx, proof });
        self.resort();
    }

    /// Merge `other` into this bundle, keeping this bundle's subject.
    pub fn merge(&mut self, other: &Beef) {
        if self.transactions.is_empty() && self.subject.is_none() {
            self.subject = other.subject;
        }
        for btx in &other.transactions {
            let txid = btx.txid();
            match self.transactions.iter_mut().find(|b| b.txid() == txid) {
                Some(existing) => {
                    if existing.proof.is_none() {
                        existing.proof = btx.proof.clone();
                    }
                }
                None => self.transactions.push(btx.clone()),
            }
        }
        self.resort();
    }

    /// Parse `bytes` and merge them into this bundle.
    pub fn merge_bytes(&mut self, bytes: &[u8]) -> Result<(), TypesError> {
        let other = Beef::from_bytes(bytes)?;
        self.merge(&other);
        Ok(())
    }

    /// Attach a newly available proof. Returns false if `txid` is absent.
    pub fn attach_proof(&mut self, txid: &Txid, proof: MerklePath) -> bool {
        match self.transactions.iter_mut().find(|b| b.txid() == *txid) {
            Some(btx) => {
                btx.proof = Some(proof);
                true
            }
            None => false,
        }
    }

    /// Sub-bundle with `txids` and every in-bundle ancestor they depend on.
    pub fn extract(&self, txids: &[Txid]) -> Beef {
        let by_id: HashMap<Txid, &BeefTx> =
            self.transactions.iter().map(|b| (b.txid(), b)).collect();

        let mut wanted: HashSet<Txid> = HashSet::new();
        let mut stack: Vec<Txid> = txids.to_vec();
        while let Some(txid) = stack.pop() {
            let Some(btx) = by_id.get(&txid) else {
                continue;
            };
            if !wanted.insert(txid) || btx.proof.is_some() {
                continue;
            }
            stack.extend(btx.tx.inputs.iter().map(|i| i.source.txid));
        }

        Beef {
            transactions: self
                .transactions
                .iter()
                .filter(|b| wanted.contains(&b.txid()))
                .cloned()
                .collect(),
            subject: None,
        }
    }

    /// SPV-check the subject against `tracker`.
    ///
    /// Returns `Ok(false)` when the subject is not anchored; errors only when
    /// the bundle is empty or the tracker fails.
    pub async fn verify(&self, tracker: &dyn ChainTracker) -> Result<bool, TypesError> {
        let subject = self.subject_txid()?;
        let mut anchored: HashMap<Txid, bool> = HashMap::new();
        let mut output_counts: HashMap<Txid, usize> = HashMap::new();

        for btx in &self.transactions {
            let txid = btx.txid();
            let ok = match &btx.proof {
                Some(path) => {
                    let root = path.compute_root(&txid);
                    tracker
                        .is_valid_root_for_height(&root, path.block_height)
                        .await?
                }
                None => {
                    !btx.tx.inputs.is_empty()
                        && btx.tx.inputs.iter().all(|input| {
                            let source = input.source;
                            anchored.get(&source.txid).copied().unwrap_or(false)
                                && output_counts
                                    .get(&source.txid)
                                    .is_some_and(|n| (source.index as usize) < *n)
                        })
                }
            };
            anchored.insert(txid, ok);
            output_counts.insert(txid, btx.tx.outputs.len());
            if txid == subject {
                break;
            }
        }

        Ok(anchored.get(&subject).copied().unwrap_or(false))
    }

    fn resort(&mut self) {
        if let Err(e) = self.sort_dependencies() {
            tracing::warn!("bundle left in insertion order: {e}");
        }
    }

    /// Stable topological sort: parents before children.
    fn sort_dependencies(&mut self) -> Result<(), TypesError> {
        let ids: Vec<Txid> = self.transactions.iter().map(BeefTx::txid).collect();
        let present: HashSet<Txid> = ids.iter().copied().collect();
        let mut emitted: HashSet<Txid> = HashSet::new();
        let mut order: Vec<usize> = Vec::with_capacity(ids.len());

        while order.len() < ids.len() {
            let before = order.len();
            for (i, btx) in self.transactions.iter().enumerate() {
                if emitted.contains(&ids[i]) {
                    continue;
                }
                let ready = btx.tx.inputs.iter().all(|input| {
                    let parent = input.source.txid;
                    !present.contains(&parent) || emitted.contains(&parent)
                });
                if ready {
                    emitted.insert(ids[i]);
                    order.push(i);
                }
            }
            if order.len() == before {
                return Err(TypesError::MalformedBundle(
                    "cyclic transaction dependencies".to_string(),
                ));
            }
        }

        let mut slots: Vec<Option<BeefTx>> = self.transactions.drain(..).map(Some).collect();
        self.transactions = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(())
    }
}
