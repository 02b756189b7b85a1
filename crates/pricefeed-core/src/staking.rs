//! Read-only view of the staking layer.
//!
//! The feeds module never mutates stake. It reads delegated power to bound
//! votes, bonded validators and their power to weight prices, and each
//! validator's oracle status to decide who must report.

use serde::{Deserialize, Serialize};

/// Whether a validator participates in price reporting, and since when.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStatus {
    /// Whether the validator currently reports prices.
    pub is_active: bool,
    /// Block time the status last changed.
    pub since: i64,
}

impl OracleStatus {
    /// Active since `since`.
    pub fn active(since: i64) -> Self {
        Self {
            is_active: true,
            since,
        }
    }

    /// Inactive since `since`.
    pub fn inactive(since: i64) -> Self {
        Self {
            is_active: false,
            since,
        }
    }
}

/// A bonded validator as seen by price aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    /// Validator address.
    pub address: String,
    /// Bonded power.
    pub power: u64,
    /// Oracle participation status.
    pub status: OracleStatus,
}

/// Stake queries consumed by the feeds keeper.
pub trait StakingView {
    /// Power `delegator` has delegated, available for voting.
    fn delegated_power(&self, delegator: &str) -> u64;

    /// Every bonded validator, ordered by power descending.
    fn bonded_validators_by_power(&self) -> Vec<ValidatorInfo>;

    /// Sum of bonded power across all validators.
    fn total_bonded_power(&self) -> u64;

    /// Whether `validator` is bonded.
    fn is_bonded(&self, validator: &str) -> bool;

    /// Oracle status of `validator`; inactive if unknown.
    fn oracle_status(&self, validator: &str) -> OracleStatus;
}
