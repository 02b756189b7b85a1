//! Scenario files.
//!
//! A scenario fixes everything a run depends on: chain parameters, stake,
//! genesis votes, the simulated market and the random seed. Two runs of the
//! same scenario produce the same blocks.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use pricefeed_types::{Encoder, Params, Signal, SignalPriceStatus};

/// A complete simulation setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Seed for every random source in the run.
    #[serde(default)]
    pub seed: u64,
    /// Blocks to produce.
    #[serde(default = "default_blocks")]
    pub blocks: u64,
    /// Seconds between blocks.
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: i64,
    /// Time of the first block, unix seconds.
    #[serde(default = "default_start_time")]
    pub start_time: i64,
    /// Wall-clock pause between blocks. 0 runs as fast as possible.
    #[serde(default)]
    pub tick_millis: u64,
    /// Broadcasts below this gas adjustment run out of gas.
    #[serde(default = "default_min_gas_adjustment")]
    pub min_gas_adjustment: f64,
    /// Relay encoding.
    #[serde(default = "default_encoder")]
    pub encoder: Encoder,
    /// Signals encoded for relay after every block. Empty relays every feed.
    #[serde(default)]
    pub relay_signal_ids: Vec<String>,
    /// Chain parameters.
    #[serde(default)]
    pub params: Params,
    /// Delegators and their genesis votes.
    #[serde(default)]
    pub delegators: Vec<DelegatorSpec>,
    /// Bonded validators, each running a submitter.
    pub validators: Vec<ValidatorSpec>,
    /// Simulated market.
    #[serde(default)]
    pub signals: Vec<SignalSpec>,
}

/// A delegator with its genesis vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatorSpec {
    /// Address.
    pub address: String,
    /// Delegated power.
    pub power: u64,
    /// Genesis vote.
    #[serde(default)]
    pub votes: Vec<Signal>,
}

/// A bonded validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSpec {
    /// Address.
    pub address: String,
    /// Bonded power.
    pub power: u64,
    /// Signing keys for the validator's submitter.
    pub keys: Vec<String>,
    /// Spread of this validator's quotes around the market, basis points.
    #[serde(default = "default_noise_bp")]
    pub noise_bp: u64,
    /// Whether the oracle status starts active.
    #[serde(default = "default_true")]
    pub active: bool,
}

/// One simulated market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSpec {
    /// Signal id.
    pub id: String,
    /// Opening price, 1e9-scaled.
    pub base_price: u64,
    /// Largest move per block, basis points.
    #[serde(default = "default_volatility_bp")]
    pub volatility_bp: u64,
    /// Status every price source reports for this signal.
    #[serde(default = "default_status")]
    pub status: SignalPriceStatus,
}

fn default_blocks() -> u64 {
    200
}

fn default_block_time_secs() -> i64 {
    3
}

fn default_start_time() -> i64 {
    1_700_000_000
}

fn default_min_gas_adjustment() -> f64 {
    1.0
}

fn default_encoder() -> Encoder {
    Encoder::FixedPoint
}

fn default_noise_bp() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_volatility_bp() -> u64 {
    10
}

fn default_status() -> SignalPriceStatus {
    SignalPriceStatus::Available
}

impl Scenario {
    /// Parse and validate a scenario.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("malformed scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Check the scenario can run.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.params.validate().context("invalid params")?;
        if self.block_time_secs <= 0 {
            bail!("block time must be positive: {}", self.block_time_secs);
        }
        if self.validators.is_empty() {
            bail!("scenario has no validators");
        }
        for v in &self.validators {
            if v.keys.is_empty() {
                bail!("validator {} has no signing keys", v.address);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = include_str!("../scenarios/basic.toml");

    #[test]
    fn test_basic_scenario_parses() {
        let scenario = Scenario::from_toml_str(BASIC).expect("basic scenario");
        assert_eq!(scenario.validators.len(), 3);
        assert_eq!(scenario.encoder, Encoder::FixedPoint);
        assert!(!scenario.delegators[0].votes.is_empty());
        assert!(scenario
            .signals
            .iter()
            .any(|s| s.status == SignalPriceStatus::Unsupported));
    }

    #[test]
    fn test_defaults() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[validators]]
            address = "val1"
            power = 10
            keys = ["k1"]
            "#,
        )
        .expect("minimal scenario");
        assert_eq!(scenario.block_time_secs, 3);
        assert_eq!(scenario.params, Params::default());
        assert!(scenario.validators[0].active);
        assert_eq!(scenario.validators[0].noise_bp, 5);
    }

    #[test]
    fn test_rejects_keyless_validator() {
        let err = Scenario::from_toml_str(
            r#"
            [[validators]]
            address = "val1"
            power = 10
            keys = []
            "#,
        )
        .expect_err("no keys");
        assert!(err.to_string().contains("no signing keys"));
    }

    #[test]
    fn test_rejects_bad_params() {
        let err = Scenario::from_toml_str(
            r#"
            [params]
            min_interval = 100
            max_interval = 10

            [[validators]]
            address = "val1"
            power = 10
            keys = ["k1"]
            "#,
        )
        .expect_err("bad params");
        assert!(err.to_string().contains("invalid params"));
    }
}
