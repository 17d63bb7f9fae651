//! # Chain Tracker
//!
//! Block-header oracle used for SPV checks. Production deployments back this
//! with a header service; [`StaticChainTracker`] holds headers in memory.

use crate::entities::Hash;
use crate::errors::TypesError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Verifies Merkle roots against known block headers.
#[async_trait]
pub trait ChainTracker: Send + Sync {
    /// Is `root` the Merkle root of the block at `height`?
    async fn is_valid_root_for_height(&self, root: &Hash, height: u32) -> Result<bool, TypesError>;

    /// Height of the best known block.
    async fn current_height(&self) -> Result<u32, TypesError>;
}

/// In-memory chain tracker over a fixed set of block roots.
#[derive(Debug, Default)]
pub struct StaticChainTracker {
    roots: RwLock<HashMap<u32, Hash>>,
}

impl StaticChainTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the Merkle root of the block at `height`.
    pub fn add_root(&self, height: u32, root: Hash) {
        self.roots.write().insert(height, root);
    }

    /// Forget the block at `height`, as after a reorg.
    pub fn remove_root(&self, height: u32) {
        self.roots.write().remove(&height);
    }
}

#[async_trait]
impl ChainTracker for StaticChainTracker {
    async fn is_valid_root_for_height(&self, root: &Hash, height: u32) -> Result<bool, TypesError> {
        Ok(self.roots.read().get(&height) == Some(root))
    }

    async fn current_height(&self) -> Result<u32, TypesError> {
        Ok(self.roots.read().keys().copied().max().unwrap_or(0))
    }
}
