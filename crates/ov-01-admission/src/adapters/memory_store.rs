//! In-memory Output Store.
//!
//! Backs tests and single-process nodes. Outputs are keyed by
//! (outpoint, topic); applied-transaction records by (txid, topic).

use crate::domain::StoreError;
use crate::ports::OutputStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Outpoint, Output, Txid};
use std::collections::{HashMap, HashSet};

/// In-memory implementation of [`OutputStore`].
#[derive(Debug, Default)]
pub struct InMemoryOutputStore {
    outputs: RwLock<HashMap<(Outpoint, String), Output>>,
    applied: RwLock<HashSet<(Txid, String)>>,
}

impl InMemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one stored output.
    pub fn output(&self, outpoint: &Outpoint, topic: &str) -> Option<Output> {
        self.outputs
            .read()
            .get(&(*outpoint, topic.to_string()))
            .cloned()
    }

    /// Total outputs across topics.
    pub fn output_count(&self) -> usize {
        self.outputs.read().len()
    }

    /// Number of applied-transaction records.
    pub fn applied_count(&self) -> usize {
        self.applied.read().len()
    }

    fn with_output<F>(&self, outpoint: &Outpoint, topic: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Output),
    {
        let mut outputs = self.outputs.write();
        let output = outputs
            .get_mut(&(*outpoint, topic.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("{outpoint} in {topic}")))?;
        f(output);
        Ok(())
    }
}

#[async_trait]
impl OutputStore for InMemoryOutputStore {
    async fn insert_output(&self, output: Output) -> Result<(), StoreError> {
        let key = (output.outpoint, output.topic.clone());
        let mut outputs = self.outputs.write();
        if outputs.contains_key(&key) {
            return Err(StoreError::Duplicate {
                outpoint: output.outpoint.to_string(),
                topic: output.topic,
            });
        }
        outputs.insert(key, output);
        Ok(())
    }

    async fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: Option<bool>,
    ) -> Result<Option<Output>, StoreError> {
        let outputs = self.outputs.read();
        let found = match topic {
            Some(topic) => outputs.get(&(*outpoint, topic.to_string())),
            None => outputs
                .iter()
                .filter(|((op, _), _)| op == outpoint)
                .map(|(_, output)| output)
                .min_by(|a, b| a.topic.cmp(&b.topic)),
        };
        Ok(found
            .filter(|output| spent.map_or(true, |s| output.spent == s))
            .cloned())
    }

    async fn find_outputs_for_transaction(&self, txid: &Txid) -> Result<Vec<Output>, StoreError> {
        let mut found: Vec<Output> = self
            .outputs
            .read()
            .values()
            .filter(|output| output.outpoint.txid == *txid)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.outpoint.index, &a.topic).cmp(&(b.outpoint.index, &b.topic))
        });
        Ok(found)
    }

    async fn find_utxos_for_topic(&self, topic: &str, since: u64) -> Result<Vec<Output>, StoreError> {
        let mut found: Vec<Output> = self
            .outputs
            .read()
            .values()
            .filter(|output| output.topic == topic && !output.spent && output.score >= since)
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.score, a.outpoint).cmp(&(b.score, b.outpoint)));
        Ok(found)
    }

    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError> {
        self.outputs.write().remove(&(*outpoint, topic.to_string()));
        Ok(())
    }

    async fn mark_utxo_as_spent(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError> {
        self.with_output(outpoint, topic, |output| output.spent = true)
    }

    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StoreError> {
        self.with_output(outpoint, topic, |output| {
            output.consumed_by = consumed_by.to_vec()
        })
    }

    async fn update_output_beef(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        beef: &[u8],
    ) -> Result<(), StoreError> {
        self.with_output(outpoint, topic, |output| output.beef = beef.to_vec())
    }

    async fn update_output_block_height(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        block_height: u32,
    ) -> Result<(), StoreError> {
        self.with_output(outpoint, topic, |output| {
            output.block_height = Some(block_height)
        })
    }

    async fn insert_applied_transaction(&self, txid: &Txid, topic: &str) -> Result<(), StoreError> {
        self.applied.write().insert((*txid, topic.to_string()));
        Ok(())
    }

    async fn does_applied_transaction_exist(
        &self,
        txid: &Txid,
        topic: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.applied.read().contains(&(*txid, topic.to_string())))
    }
}
