//! # Topic Registry
//!
//! Topic managers and lookup services, fixed at construction.

use crate::ports::{LookupService, TopicManager};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered topic managers and lookup services.
///
/// Built once through [`RegistryBuilder`] and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct TopicRegistry {
    managers: BTreeMap<String, Arc<dyn TopicManager>>,
    lookup_services: BTreeMap<String, Arc<dyn LookupService>>,
}

impl TopicRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Topic manager for `topic`.
    pub fn manager(&self, topic: &str) -> Option<&Arc<dyn TopicManager>> {
        self.managers.get(topic)
    }

    /// Lookup service named `name`.
    pub fn lookup_service(&self, name: &str) -> Option<&Arc<dyn LookupService>> {
        self.lookup_services.get(name)
    }

    /// All lookup services, in name order.
    pub fn lookup_services(&self) -> impl Iterator<Item = (&String, &Arc<dyn LookupService>)> {
        self.lookup_services.iter()
    }

    /// Registered topic names, sorted.
    pub fn topic_names(&self) -> Vec<String> {
        self.managers.keys().cloned().collect()
    }

    /// Registered lookup service names, sorted.
    pub fn lookup_service_names(&self) -> Vec<String> {
        self.lookup_services.keys().cloned().collect()
    }
}

/// Builder for [`TopicRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    inner: TopicRegistry,
}

impl RegistryBuilder {
    /// Register the manager for `topic`, replacing any earlier one.
    pub fn topic(mut self, topic: impl Into<String>, manager: Arc<dyn TopicManager>) -> Self {
        self.inner.managers.insert(topic.into(), manager);
        self
    }

    /// Register a lookup service under `name`.
    pub fn lookup_service(mut self, name: impl Into<String>, service: Arc<dyn LookupService>) -> Self {
        self.inner.lookup_services.insert(name.into(), service);
        self
    }

    /// Finish building.
    pub fn build(self) -> TopicRegistry {
        self.inner
    }
}
