//! Per-tree tunables.
use std::env;

use thiserror::Error;

/// Rejected tunables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_sequence_length must be at least 1")]
    EmptySequence,

    #[error("update_interval must be a non-negative number of seconds, got {0}")]
    InvalidUpdateInterval(f64),

    #[error("failed to parse tree config TOML: {0}")]
    Parse(String),
}

/// Tree configuration.
///
/// ```
/// use behavior_tree::TreeConfig;
///
/// let config = TreeConfig::default().with_update_interval(0.25);
/// assert_eq!(config.max_sequence_length, TreeConfig::DEFAULT_MAX_SEQUENCE_LENGTH);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TreeConfig {
    /// Capacity of the execution sequence and of the running stack. A tick that
    /// visits more nodes than this aborts with
    /// [`BehaviorError::SequenceExhausted`](crate::BehaviorError::SequenceExhausted).
    pub max_sequence_length: usize,
    /// Minimum simulated seconds between two full ticks; 0 ticks every call.
    pub update_interval: f64,
    /// Between full ticks, drive the running actions immediately.
    pub continuous_update: bool,
    /// Seed of the tree's random source. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl TreeConfig {
    pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 200;

    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BT_MAX_SEQUENCE_LENGTH` - execution sequence capacity (default: 200)
    /// - `BT_UPDATE_INTERVAL` - seconds between full ticks (default: 0)
    /// - `BT_CONTINUOUS_UPDATE` - `true` to update running actions between ticks
    /// - `BT_SEED` - fixed seed for random selection
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(length) = read_env::<usize>("BT_MAX_SEQUENCE_LENGTH") {
            config.max_sequence_length = length;
        }
        if let Some(interval) = read_env::<f64>("BT_UPDATE_INTERVAL") {
            config.update_interval = interval;
        }
        if let Some(continuous) = read_env::<bool>("BT_CONTINUOUS_UPDATE") {
            config.continuous_update = continuous;
        }
        if let Some(seed) = read_env::<u64>("BT_SEED") {
            config.seed = Some(seed);
        }

        config
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    #[cfg(feature = "loaders")]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_max_sequence_length(mut self, length: usize) -> Self {
        self.max_sequence_length = length;
        self
    }

    #[must_use]
    pub fn with_update_interval(mut self, seconds: f64) -> Self {
        self.update_interval = seconds;
        self
    }

    #[must_use]
    pub fn with_continuous_update(mut self, enabled: bool) -> Self {
        self.continuous_update = enabled;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sequence_length == 0 {
            return Err(ConfigError::EmptySequence);
        }
        if self.update_interval.is_nan() || self.update_interval < 0.0 {
            return Err(ConfigError::InvalidUpdateInterval(self.update_interval));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: Self::DEFAULT_MAX_SEQUENCE_LENGTH,
            update_interval: 0.0,
            continuous_update: false,
            seed: None,
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
