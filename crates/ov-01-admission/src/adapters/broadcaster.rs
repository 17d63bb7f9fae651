//! Recording broadcaster.
//!
//! Accepts every transaction (remembering it) unless told to fail.

use crate::domain::{BroadcastFailure, BroadcastReceipt};
use crate::ports::Broadcaster;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Transaction, Txid};
use tracing::debug;

/// [`Broadcaster`] that records submissions instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    sent: RwLock<Vec<Txid>>,
    failure: RwLock<Option<BroadcastFailure>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every later broadcast with this code and description.
    pub fn fail_with(&self, code: &str, description: &str) {
        *self.failure.write() = Some(BroadcastFailure {
            code: code.to_string(),
            description: description.to_string(),
        });
    }

    /// Accept broadcasts again.
    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Accepted transactions, in order.
    pub fn broadcasts(&self) -> Vec<Txid> {
        self.sent.read().clone()
    }

    pub fn broadcast_count(&self) -> usize {
        self.sent.read().len()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(
        &self,
        tx: &Transaction,
        _beef: &[u8],
    ) -> Result<BroadcastReceipt, BroadcastFailure> {
        if let Some(failure) = self.failure.read().clone() {
            return Err(failure);
        }
        let txid = tx.txid();
        self.sent.write().push(txid);
        debug!("[ov-01] Recorded broadcast of {}", txid);
        Ok(BroadcastReceipt {
            txid,
            message: "accepted".to_string(),
        })
    }
}
