//! # Graph Storage Configuration

use serde::{Deserialize, Serialize};

/// Temporary graph configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Node ceiling per sync session (root included).
    pub max_nodes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { max_nodes: 1_000 }
    }
}

impl GraphConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self { max_nodes: 16 }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `OV_GRAPH_MAX_NODES`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("OV_GRAPH_MAX_NODES") {
            match value.parse::<usize>() {
                Ok(max) if max > 0 => config.max_nodes = max,
                _ => tracing::warn!("[ov-02] Ignoring invalid OV_GRAPH_MAX_NODES={}", value),
            }
        }
        config
    }
}
