//! # Merkle Paths
//!
//! SPV inclusion proofs for transactions.
//!
//! # Algorithm
//!
//! 1. Start with the txid as the current hash
//! 2. For each node in the path:
//!    - If sibling is on left: hash = SHA256(sibling || current)
//!    - If sibling is on right: hash = SHA256(current || sibling)
//! 3. The final hash is the block's Merkle root

use crate::entities::{Hash, Txid};
use crate::errors::TypesError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Side of the sibling hash relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// Sibling is the left operand.
    Left,
    /// Sibling is the right operand.
    Right,
}

/// One level of a Merkle path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Sibling hash at this level.
    pub hash: Hash,
    /// Which side the sibling is on.
    pub position: Position,
}

impl ProofNode {
    /// Sibling on the left.
    pub fn left(hash: Hash) -> Self {
        Self {
            hash,
            position: Position::Left,
        }
    }

    /// Sibling on the right.
    pub fn right(hash: Hash) -> Self {
        Self {
            hash,
            position: Position::Right,
        }
    }
}

/// Proof that a transaction is included in the block at `block_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Height of the block containing the transaction.
    pub block_height: u32,
    /// Sibling hashes from leaf to root.
    pub path: Vec<ProofNode>,
}

impl MerklePath {
    /// Merkle root implied by this path for `txid`.
    ///
    /// # Time Complexity: O(log n)
    pub fn compute_root(&self, txid: &Txid) -> Hash {
        let mut current = *txid.as_bytes();
        for node in &self.path {
            current = match node.position {
                Position::Left => hash_concat(&node.hash, &current),
                Position::Right => hash_concat(&current, &node.hash),
            };
        }
        current
    }

    /// Hex of the canonical encoding, the form carried in graph nodes.
    pub fn try_to_hex(&self) -> Result<String, TypesError> {
        bincode::serialize(self)
            .map(hex::encode)
            .map_err(|e| TypesError::Encoding(e.to_string()))
    }

    /// Like [`MerklePath::try_to_hex`], logging and returning an empty string on failure.
    pub fn to_hex(&self) -> String {
        self.try_to_hex().unwrap_or_else(|e| {
            tracing::error!("merkle path at height {} not encoded: {e}", self.block_height);
            String::new()
        })
    }

    /// Decode a hex-encoded path.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = hex::decode(s).map_err(|e| TypesError::Decoding(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| TypesError::Decoding(e.to_string()))
    }
}

fn hash_concat(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Merkle root of a block's txids. Odd levels duplicate their last hash.
pub fn compute_merkle_root(txids: &[Txid]) -> Hash {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Hash> = txids.iter().map(|t| *t.as_bytes()).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// Build the Merkle path for `txids[index]` in a block at `block_height`.
pub fn build_merkle_path(
    txids: &[Txid],
    index: usize,
    block_height: u32,
) -> Result<MerklePath, TypesError> {
    let Some(target) = txids.get(index) else {
        return Err(TypesError::Decoding(format!(
            "index {index} out of range for {} txids",
            txids.len()
        )));
    };
    tracing::trace!("building merkle path for {target} at height {block_height}");

    let mut path = Vec::new();
    let mut level: Vec<Hash> = txids.iter().map(|t| *t.as_bytes()).collect();
    let mut index = index;

    while level.len() > 1 {
        let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
        if sibling_index < level.len() {
            if index % 2 == 0 {
                path.push(ProofNode::right(level[sibling_index]));
            } else {
                path.push(ProofNode::left(level[sibling_index]));
            }
        } else {
            // Last element with no pair - duplicate self
            path.push(ProofNode::right(level[index]));
        }

        level = next_level(&level);
        index /= 2;
    }

    Ok(MerklePath { block_height, path })
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|chunk| {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left);
            hash_concat(left, right)
        })
        .collect()
}
