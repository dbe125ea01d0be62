//! Engine configuration.
//!
//! # Responsibility
//! - Collect every tunable constant of persistence, sync and layout.
//! - Parse overrides from a JSON document; absent keys keep defaults.
//!
//! # Invariants
//! - A config returned by `from_json_str` has passed `validate()`.

use crate::layout::LayoutParams;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Key of the single workspace record, locally and remotely.
pub const DEFAULT_WORKSPACE_KEY: &str = "default";

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workspace_key: String,
    /// Coalescing window for non-immediate `mark_dirty` calls.
    pub debounce_ms: u64,
    /// Period of the background sync retry.
    pub sync_interval_ms: u64,
    /// Ring size of history snapshots.
    pub history_capacity: usize,
    /// Minimum spacing between two history snapshots.
    pub history_throttle_ms: u64,
    pub layout: LayoutParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_key: DEFAULT_WORKSPACE_KEY.to_string(),
            debounce_ms: 100,
            sync_interval_ms: 30_000,
            history_capacity: 20,
            history_throttle_ms: 30_000,
            layout: LayoutParams::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workspace_key must not be blank".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.sync_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync_interval_ms must be positive".to_string(),
            ));
        }
        let layout = &self.layout;
        if !(layout.base_radius > 0.0 && layout.min_radius > 0.0) {
            return Err(ConfigError::Invalid(
                "layout radii must be positive".to_string(),
            ));
        }
        if !(layout.depth_falloff > 0.0 && layout.depth_falloff <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "layout.depth_falloff must be in (0, 1], got {}",
                layout.depth_falloff
            )));
        }
        if layout.sibling_pad < 0.0 || layout.root_spacing <= 0.0 || layout.root_gap < 0.0 {
            return Err(ConfigError::Invalid(
                "layout spacing values must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn history_throttle(&self) -> Duration {
        Duration::from_millis(self.history_throttle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig, DEFAULT_WORKSPACE_KEY};
    use std::time::Duration;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.workspace_key, DEFAULT_WORKSPACE_KEY);
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.sync_interval(), Duration::from_secs(30));
        assert_eq!(config.history_capacity, 20);
    }

    #[test]
    fn partial_layout_override_keeps_other_constants() {
        let config =
            EngineConfig::from_json_str(r#"{"layout":{"base_radius":200.0}}"#).unwrap();
        assert_eq!(config.layout.base_radius, 200.0);
        assert_eq!(config.layout.min_radius, 80.0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = EngineConfig::from_json_str(r#"{"layout":{"depth_falloff":1.5}}"#)
            .expect_err("falloff above one must be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str(r#"{"history_capacity":0}"#).unwrap_err();
        assert!(err.to_string().contains("history_capacity"));

        let err = EngineConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
