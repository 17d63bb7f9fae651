//! # Admission Configuration
//!
//! Configuration for the Admission Pipeline.

use serde::{Deserialize, Serialize};

/// Admission pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum topics one submission may name.
    pub max_topics_per_submission: usize,

    /// Default wait used by callers awaiting a STEAK, in milliseconds.
    pub steak_timeout_ms: u64,

    /// Skip broadcast when every requested topic was a duplicate.
    pub skip_broadcast_for_duplicates: bool,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_topics_per_submission: 64,
            steak_timeout_ms: 30_000,
            skip_broadcast_for_duplicates: true,
        }
    }
}

impl AdmissionConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            max_topics_per_submission: 8,
            steak_timeout_ms: 1_000,
            skip_broadcast_for_duplicates: true,
        }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `OV_MAX_TOPICS_PER_SUBMISSION`
    /// - `OV_STEAK_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max) = env_parse("OV_MAX_TOPICS_PER_SUBMISSION") {
            config.max_topics_per_submission = max;
        }
        if let Some(timeout) = env_parse("OV_STEAK_TIMEOUT_MS") {
            config.steak_timeout_ms = timeout;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("[ov-01] Ignoring unparsable {}={}", key, value);
            None
        }
    }
}
