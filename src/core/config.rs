//! Engine configuration
//!
//! JSON shape:
//! ```json
//! { "tick_interval_ms": 1500, "history_capacity": 10, "rule_profile": "enhanced", "seed": 7 }
//! ```
//! `rule_profile` may also be `{"custom": { ...profile definition... }}`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::profiles::{ProfileDefinition, RuleProfile};
use crate::types::ConfigError;
use crate::DEFAULT_HISTORY_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides the profile's default cadence
    pub tick_interval_ms: Option<u64>,
    pub history_capacity: usize,
    pub rule_profile: RuleProfile,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: None,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            rule_profile: RuleProfile::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new(rule_profile: RuleProfile) -> Self {
        Self {
            rule_profile,
            ..Self::default()
        }
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = Some(ms);
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn profile(&self) -> &ProfileDefinition {
        self.rule_profile.definition()
    }

    /// Effective cadence in milliseconds
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
            .unwrap_or(self.profile().tick_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms() == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        self.profile().validate()
    }

    /// Parse and validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Read {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read_err = |message: String| ConfigError::Read {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| read_err(e.to_string()))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| read_err(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
