//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Txid`, `Outpoint`, `Transaction`, `TxInput`, `TxOutput`
//! - **Overlay State**: `Output`, the stored, topic-scoped UTXO

use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// Transaction identifier: double SHA-256 of the canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Txid(pub Hash);

impl Txid {
    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = hex::decode(s).map_err(|_| TypesError::InvalidTxid(s.to_string()))?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidTxid(s.to_string()))?;
        Ok(Self(hash))
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", self.to_hex())
    }
}

impl FromStr for Txid {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Reference to a single transaction output.
///
/// Canonical string form is `"<txid hex>.<index>"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    /// Transaction containing the output.
    pub txid: Txid,
    /// Index of the output within that transaction.
    pub index: u32,
}

impl Outpoint {
    /// Create a new outpoint.
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.index)
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({self})")
    }
}

impl FromStr for Outpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .rsplit_once('.')
            .ok_or_else(|| TypesError::InvalidOutpoint(s.to_string()))?;
        let txid = Txid::from_hex(txid).map_err(|_| TypesError::InvalidOutpoint(s.to_string()))?;
        let index = index
            .parse::<u32>()
            .map_err(|_| TypesError::InvalidOutpoint(s.to_string()))?;
        Ok(Self { txid, index })
    }
}

/// A transaction input spending a previous output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The output being spent.
    pub source: Outpoint,
    /// Script satisfying the source output's locking script.
    pub unlocking_script: Vec<u8>,
    /// Input sequence number.
    pub sequence: u32,
}

impl TxInput {
    /// Spend `source` with an empty unlocking script.
    pub fn spending(source: Outpoint) -> Self {
        Self {
            source,
            unlocking_script: Vec::new(),
            sequence: u32::MAX,
        }
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount locked in this output.
    pub satoshis: u64,
    /// Locking script.
    pub locking_script: Vec<u8>,
}

/// A base-layer transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Inputs, in order.
    pub inputs: Vec<TxInput>,
    /// Outputs, in order.
    pub outputs: Vec<TxOutput>,
    /// Lock time.
    pub lock_time: u32,
}

impl Transaction {
    /// Canonical encoding. Serializing an in-memory transaction cannot fail.
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// Decode from canonical bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        bincode::deserialize(bytes).map_err(|e| TypesError::Decoding(e.to_string()))
    }

    /// Hex of the canonical encoding ("raw tx").
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Decode a raw tx hex string.
    pub fn from_hex(raw: &str) -> Result<Self, TypesError> {
        let bytes = hex::decode(raw).map_err(|e| TypesError::Decoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Double SHA-256 of the canonical encoding.
    pub fn txid(&self) -> Txid {
        let first = Sha256::digest(self.to_bytes());
        let second = Sha256::digest(first);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&second);
        Txid(hash)
    }

    /// Outpoint of output `index` of this transaction.
    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.txid(), index)
    }
}

// =============================================================================
// CLUSTER B: OVERLAY STATE
// =============================================================================

/// A UTXO admitted into a topic.
///
/// Created on admission and mutated to mark it spent or consumed; the core
/// never deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// The output's location on chain.
    pub outpoint: Outpoint,
    /// Topic that admitted this output.
    pub topic: String,
    /// Amount locked in the output.
    pub satoshis: u64,
    /// Locking script of the output.
    pub locking_script: Vec<u8>,
    /// BEEF bundle of the transaction that created this output.
    pub beef: Vec<u8>,
    /// Whether a later admitted transaction spent this output.
    pub spent: bool,
    /// Topic outputs consumed by the transaction that created this one.
    pub outputs_consumed: Vec<Outpoint>,
    /// Outputs whose transaction consumed this one.
    pub consumed_by: Vec<Outpoint>,
    /// Block height once the transaction is mined.
    pub block_height: Option<u32>,
    /// Admission watermark, milliseconds since the Unix epoch.
    pub score: u64,
    /// Additional transactions the topic manager needed to admit this output.
    pub ancillary_txids: Vec<Txid>,
    /// Bundle holding the ancillary transactions.
    pub ancillary_beef: Option<Vec<u8>>,
}
