//! Submission client configuration.
//!
//! ```toml
//! validator = "val1"
//! keys = ["feeder1", "feeder2"]
//! max_try = 3
//! ```

use serde::{Deserialize, Serialize};

use crate::{Result, SubmitterError};

/// Submission client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitterConfig {
    /// Validator address prices are submitted for.
    pub validator: String,
    /// Signing key names. One batch may be in flight per key.
    pub keys: Vec<String>,
    /// Lower bound of the assigned-time window, percent of the feed interval.
    #[serde(default = "default_distribution_start_pct")]
    pub distribution_start_pct: u64,
    /// Width of the assigned-time window, percent of the feed interval.
    #[serde(default = "default_distribution_offset_pct")]
    pub distribution_offset_pct: u64,
    /// Seconds added to the chain cooldown before resubmitting.
    #[serde(default = "default_cooldown_buffer_secs")]
    pub cooldown_buffer_secs: i64,
    /// Unavailable prices are only sent this close to the feed deadline.
    #[serde(default = "default_unavailable_window_secs")]
    pub unavailable_window_secs: i64,
    /// Maximum broadcasts per batch.
    #[serde(default = "default_max_try")]
    pub max_try: u32,
    /// Seconds to wait for inclusion before giving up on a batch.
    #[serde(default = "default_broadcast_timeout_secs")]
    pub broadcast_timeout_secs: i64,
    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Initial gas adjustment.
    #[serde(default = "default_gas_adjust_start")]
    pub gas_adjust_start: f64,
    /// Gas adjustment increment after an out-of-gas result.
    #[serde(default = "default_gas_adjust_step")]
    pub gas_adjust_step: f64,
}

fn default_distribution_start_pct() -> u64 {
    50
}

fn default_distribution_offset_pct() -> u64 {
    30
}

fn default_cooldown_buffer_secs() -> i64 {
    3
}

fn default_unavailable_window_secs() -> i64 {
    10
}

fn default_max_try() -> u32 {
    5
}

fn default_broadcast_timeout_secs() -> i64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_gas_adjust_start() -> f64 {
    2.0
}

fn default_gas_adjust_step() -> f64 {
    0.1
}

impl SubmitterConfig {
    /// Configuration with defaults for everything but the identity.
    pub fn new(validator: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            validator: validator.into(),
            keys,
            distribution_start_pct: default_distribution_start_pct(),
            distribution_offset_pct: default_distribution_offset_pct(),
            cooldown_buffer_secs: default_cooldown_buffer_secs(),
            unavailable_window_secs: default_unavailable_window_secs(),
            max_try: default_max_try(),
            broadcast_timeout_secs: default_broadcast_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            gas_adjust_start: default_gas_adjust_start(),
            gas_adjust_step: default_gas_adjust_step(),
        }
    }

    /// Parse and validate a TOML configuration.
    ///
    /// # Errors
    ///
    /// [`SubmitterError::Config`] on malformed TOML, or any error from
    /// [`SubmitterConfig::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SubmitterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// [`SubmitterError::InvalidConfig`] naming the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.validator.is_empty() {
            return Err(SubmitterError::InvalidConfig("validator cannot be empty".into()));
        }
        if self.keys.is_empty() {
            return Err(SubmitterError::InvalidConfig("at least one key is required".into()));
        }
        if self.distribution_offset_pct == 0 {
            return Err(SubmitterError::InvalidConfig(
                "distribution offset must be positive".into(),
            ));
        }
        if self.max_try == 0 {
            return Err(SubmitterError::InvalidConfig("max try must be positive".into()));
        }
        if self.broadcast_timeout_secs <= 0 {
            return Err(SubmitterError::InvalidConfig(
                "broadcast timeout must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_toml() {
        let config = SubmitterConfig::from_toml_str("validator = \"val1\"\nkeys = [\"k1\"]\n")
            .expect("config");
        assert_eq!(config.distribution_start_pct, 50);
        assert_eq!(config.distribution_offset_pct, 30);
        assert_eq!(config.max_try, 5);
        assert_eq!(config, SubmitterConfig::new("val1", vec!["k1".to_string()]));
    }

    #[test]
    fn test_requires_keys() {
        let err = SubmitterConfig::from_toml_str("validator = \"val1\"\nkeys = []\n")
            .expect_err("no keys");
        assert!(matches!(err, SubmitterError::InvalidConfig(_)));
    }

    #[test]
    fn test_requires_identity() {
        let err = SubmitterConfig::from_toml_str("keys = [\"k1\"]\n").expect_err("no validator");
        assert!(matches!(err, SubmitterError::Config(_)));
    }

    #[test]
    fn test_zero_offset_rejected() {
        let config = SubmitterConfig {
            distribution_offset_pct: 0,
            ..SubmitterConfig::new("val1", vec!["k1".to_string()])
        };
        assert!(config.validate().is_err());
    }
}
