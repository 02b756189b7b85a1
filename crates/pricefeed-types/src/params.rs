//! Module parameters.
//!
//! Parameters are plain TOML-deserializable values. Every field has a
//! default, so a config file only needs the keys it overrides:
//!
//! ```toml
//! admin = "band1admin"
//! cooldown_time = 15
//! max_current_feeds = 100
//! ```

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError, BASIS_POINT_DENOMINATOR};

/// Full parameter set of the feeds module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Address allowed to update parameters.
    #[serde(default = "default_admin")]
    pub admin: String,
    /// Max |submission timestamp - block time| in seconds.
    #[serde(default = "default_allowable_block_time_discrepancy")]
    pub allowable_block_time_discrepancy: i64,
    /// Seconds a validator has to report after feeds change or it activates.
    #[serde(default = "default_grace_period")]
    pub grace_period: i64,
    /// Shortest refresh interval in seconds.
    #[serde(default = "default_min_interval")]
    pub min_interval: i64,
    /// Longest refresh interval in seconds.
    #[serde(default = "default_max_interval")]
    pub max_interval: i64,
    /// Power per scheduler step.
    #[serde(default = "default_power_step_threshold")]
    pub power_step_threshold: i64,
    /// Maximum size of the current feed set.
    #[serde(default = "default_max_current_feeds")]
    pub max_current_feeds: u64,
    /// Minimum seconds between accepted submissions per (validator, signal).
    #[serde(default = "default_cooldown_time")]
    pub cooldown_time: i64,
    /// Tightest deviation tolerance in basis points.
    #[serde(default = "default_min_deviation_basis_point")]
    pub min_deviation_basis_point: i64,
    /// Loosest deviation tolerance in basis points.
    #[serde(default = "default_max_deviation_basis_point")]
    pub max_deviation_basis_point: i64,
    /// Blocks between current-feed recalculations.
    #[serde(default = "default_current_feeds_update_interval")]
    pub current_feeds_update_interval: i64,
    /// Share of total bonded power that must report, in basis points.
    #[serde(default = "default_price_quorum_basis_point")]
    pub price_quorum_basis_point: u64,
    /// Maximum signal ids in one relay payload.
    #[serde(default = "default_max_signal_ids_per_signing")]
    pub max_signal_ids_per_signing: u64,
}

fn default_admin() -> String {
    "[NOT_SET]".to_string()
}

fn default_allowable_block_time_discrepancy() -> i64 {
    60
}

fn default_grace_period() -> i64 {
    30
}

fn default_min_interval() -> i64 {
    60
}

fn default_max_interval() -> i64 {
    3600
}

fn default_power_step_threshold() -> i64 {
    1_000_000_000
}

fn default_max_current_feeds() -> u64 {
    300
}

fn default_cooldown_time() -> i64 {
    30
}

fn default_min_deviation_basis_point() -> i64 {
    50
}

fn default_max_deviation_basis_point() -> i64 {
    3000
}

// ~1 day at a 3 second block time.
fn default_current_feeds_update_interval() -> i64 {
    28_800
}

fn default_price_quorum_basis_point() -> u64 {
    3000
}

fn default_max_signal_ids_per_signing() -> u64 {
    10
}

impl Default for Params {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            allowable_block_time_discrepancy: default_allowable_block_time_discrepancy(),
            grace_period: default_grace_period(),
            min_interval: default_min_interval(),
            max_interval: default_max_interval(),
            power_step_threshold: default_power_step_threshold(),
            max_current_feeds: default_max_current_feeds(),
            cooldown_time: default_cooldown_time(),
            min_deviation_basis_point: default_min_deviation_basis_point(),
            max_deviation_basis_point: default_max_deviation_basis_point(),
            current_feeds_update_interval: default_current_feeds_update_interval(),
            price_quorum_basis_point: default_price_quorum_basis_point(),
            max_signal_ids_per_signing: default_max_signal_ids_per_signing(),
        }
    }
}

impl Params {
    /// Parse parameters from a TOML string and validate them.
    ///
    /// # Errors
    ///
    /// [`TypesError::Config`] on malformed TOML, or any error from [`Params::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let params: Params = toml::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every field is in range.
    ///
    /// # Errors
    ///
    /// [`TypesError::InvalidParams`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.admin.is_empty() {
            return Err(TypesError::InvalidParams("admin cannot be empty".to_string()));
        }

        let positive = [
            ("allowable block time discrepancy", self.allowable_block_time_discrepancy),
            ("grace period", self.grace_period),
            ("min interval", self.min_interval),
            ("max interval", self.max_interval),
            ("power threshold", self.power_step_threshold),
            ("cooldown time", self.cooldown_time),
            ("min deviation basis point", self.min_deviation_basis_point),
            ("max deviation basis point", self.max_deviation_basis_point),
            ("current feeds update interval", self.current_feeds_update_interval),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(TypesError::InvalidParams(format!(
                    "{name} must be positive: {value}"
                )));
            }
        }

        if self.min_interval > self.max_interval {
            return Err(TypesError::InvalidParams(format!(
                "min interval {} exceeds max interval {}",
                self.min_interval, self.max_interval
            )));
        }
        if self.min_deviation_basis_point > self.max_deviation_basis_point {
            return Err(TypesError::InvalidParams(format!(
                "min deviation {} exceeds max deviation {}",
                self.min_deviation_basis_point, self.max_deviation_basis_point
            )));
        }
        if self.price_quorum_basis_point > BASIS_POINT_DENOMINATOR {
            return Err(TypesError::InvalidParams(format!(
                "price quorum too large: {}",
                self.price_quorum_basis_point
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        let params = Params::default();
        params.validate().expect("defaults are valid");
        assert_eq!(params.min_interval, 60);
        assert_eq!(params.max_interval, 3600);
        assert_eq!(params.max_current_feeds, 300);
        assert_eq!(params.current_feeds_update_interval, 28_800);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let params = Params::from_toml_str("admin = \"admin1\"\ncooldown_time = 15\n")
            .expect("partial config");
        assert_eq!(params.admin, "admin1");
        assert_eq!(params.cooldown_time, 15);
        assert_eq!(params.grace_period, 30);
    }

    #[test]
    fn test_min_above_max_rejected() {
        let params = Params {
            min_interval: 4000,
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(TypesError::InvalidParams(_))));
    }

    #[test]
    fn test_non_positive_rejected() {
        let params = Params {
            cooldown_time: 0,
            ..Params::default()
        };
        let err = params.validate().expect_err("zero cooldown");
        assert!(err.to_string().contains("cooldown time"));
    }

    #[test]
    fn test_quorum_above_one_rejected() {
        let params = Params {
            price_quorum_basis_point: 10_001,
            ..Params::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = Params::from_toml_str("cooldown_time = \"soon\"").expect_err("bad type");
        assert!(matches!(err, TypesError::Config(_)));
    }
}
