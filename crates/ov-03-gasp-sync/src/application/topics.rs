//! Per-topic graph storage table shared by the driver and the responder.

use crate::domain::SyncError;
use ov_02_graph_storage::GraphStorageApi;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Graph storage instances keyed by the topic they serve.
#[derive(Clone, Default)]
pub struct TopicStorages {
    inner: BTreeMap<String, Arc<dyn GraphStorageApi>>,
}

impl TopicStorages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` under its own topic, replacing any previous one.
    pub fn insert(&mut self, storage: Arc<dyn GraphStorageApi>) {
        self.inner.insert(storage.topic().to_string(), storage);
    }

    pub fn get(&self, topic: &str) -> Result<&Arc<dyn GraphStorageApi>, SyncError> {
        self.inner
            .get(topic)
            .ok_or_else(|| SyncError::UnknownTopic(topic.to_string()))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.inner.contains_key(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TopicStorages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.keys()).finish()
    }
}
