//! Keyed submission locks.
//!
//! Serializes work on the same (txid, topic) pair while letting unrelated
//! pairs proceed in parallel.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per live key.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire every key in sorted order (so overlapping callers can't deadlock).
    pub async fn lock_all(&self, keys: impl IntoIterator<Item = String>) -> KeyedGuards<'_> {
        let mut keys: Vec<String> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let lock = self
                .locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            guards.push(lock.lock_owned().await);
        }

        KeyedGuards {
            owner: self,
            keys,
            guards,
        }
    }

    /// Number of keys with a live lock entry.
    pub fn live_keys(&self) -> usize {
        self.locks.len()
    }
}

/// Held locks; released (and idle entries pruned) on drop.
pub struct KeyedGuards<'a> {
    owner: &'a KeyedLocks,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuards<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            self.owner
                .locks
                .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}
