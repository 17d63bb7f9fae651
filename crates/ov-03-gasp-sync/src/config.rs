//! # Sync Configuration
//!
//! Per-topic peer selection for the sync driver.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::GASP_VERSION;

/// How a topic finds peers to sync with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "peers", rename_all = "snake_case")]
pub enum SyncStrategy {
    /// A fixed list of peer URLs.
    Peers(Vec<String>),
    /// Ask the peer resolver (the broadcast tracker).
    Tracker,
    /// Never sync this topic.
    Disabled,
}

/// Sync driver configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Strategy per topic. Topics without an entry are not synced.
    pub strategies: BTreeMap<String, SyncStrategy>,

    /// URL this node advertises; never selected as a peer.
    pub self_url: Option<String>,

    /// Protocol version sent in the handshake.
    pub protocol_version: u32,

    /// Only pull; never offer the peer what it lacks.
    #[serde(default)]
    pub unidirectional: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategies: BTreeMap::new(),
            self_url: None,
            protocol_version: GASP_VERSION,
            unidirectional: false,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            self_url: Some("local://self".to_string()),
            ..Self::default()
        }
    }

    /// Set the strategy for `topic`.
    pub fn with_strategy(mut self, topic: impl Into<String>, strategy: SyncStrategy) -> Self {
        self.strategies.insert(topic.into(), strategy);
        self
    }

    /// Strategy for `topic`; unlisted topics are disabled.
    pub fn strategy(&self, topic: &str) -> &SyncStrategy {
        self.strategies.get(topic).unwrap_or(&SyncStrategy::Disabled)
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `OV_SELF_URL`
    /// - `OV_SYNC_UNIDIRECTIONAL` (`true`/`1`)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OV_SELF_URL") {
            if !url.trim().is_empty() {
                config.self_url = Some(url.trim().to_string());
            }
        }
        if let Ok(flag) = std::env::var("OV_SYNC_UNIDIRECTIONAL") {
            config.unidirectional = matches!(flag.trim(), "1" | "true");
        }
        config
    }
}
