//! Fixed stake table.
//!
//! [`StubStaking`] answers every [`StakingView`] query from in-memory maps.
//! The simulator and the tests build one up front and adjust it between
//! blocks with the `dev_*` methods.

use std::collections::BTreeMap;

use crate::staking::{OracleStatus, StakingView, ValidatorInfo};

#[derive(Debug, Clone)]
struct StubValidator {
    power: u64,
    status: OracleStatus,
}

/// A [`StakingView`] over hardcoded delegations and validators.
#[derive(Debug, Clone, Default)]
pub struct StubStaking {
    delegations: BTreeMap<String, u64>,
    validators: BTreeMap<String, StubValidator>,
}

impl StubStaking {
    /// Create an empty stake table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delegation.
    pub fn with_delegation(mut self, delegator: impl Into<String>, power: u64) -> Self {
        self.delegations.insert(delegator.into(), power);
        self
    }

    /// Add a bonded validator with an active oracle status.
    ///
    /// # Arguments
    ///
    /// * `address` - Validator address
    /// * `power` - Bonded power
    /// * `active_since` - Block time the oracle status became active
    pub fn with_validator(
        mut self,
        address: impl Into<String>,
        power: u64,
        active_since: i64,
    ) -> Self {
        self.validators.insert(
            address.into(),
            StubValidator {
                power,
                status: OracleStatus::active(active_since),
            },
        );
        self
    }

    /// Change a validator's oracle status (development/testing only).
    pub fn dev_set_status(&mut self, validator: &str, status: OracleStatus) {
        if let Some(v) = self.validators.get_mut(validator) {
            tracing::warn!(
                validator,
                active = status.is_active,
                "stub staking: oracle status changed (dev only)"
            );
            v.status = status;
        }
    }

    /// Change a delegator's power (development/testing only).
    pub fn dev_set_delegation(&mut self, delegator: &str, power: u64) {
        tracing::warn!(delegator, power, "stub staking: delegation changed (dev only)");
        self.delegations.insert(delegator.to_string(), power);
    }
}

impl StakingView for StubStaking {
    fn delegated_power(&self, delegator: &str) -> u64 {
        self.delegations.get(delegator).copied().unwrap_or(0)
    }

    fn bonded_validators_by_power(&self) -> Vec<ValidatorInfo> {
        let mut validators: Vec<ValidatorInfo> = self
            .validators
            .iter()
            .map(|(address, v)| ValidatorInfo {
                address: address.clone(),
                power: v.power,
                status: v.status,
            })
            .collect();
        validators.sort_by(|a, b| b.power.cmp(&a.power).then_with(|| a.address.cmp(&b.address)));
        validators
    }

    fn total_bonded_power(&self) -> u64 {
        self.validators
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(v.power))
    }

    fn is_bonded(&self, validator: &str) -> bool {
        self.validators.contains_key(validator)
    }

    fn oracle_status(&self, validator: &str) -> OracleStatus {
        self.validators
            .get(validator)
            .map(|v| v.status)
            .unwrap_or(OracleStatus::inactive(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staking() -> StubStaking {
        StubStaking::new()
            .with_delegation("alice", 500)
            .with_validator("val1", 100, 0)
            .with_validator("val2", 300, 0)
            .with_validator("val3", 100, 0)
    }

    #[test]
    fn test_delegated_power() {
        let s = staking();
        assert_eq!(s.delegated_power("alice"), 500);
        assert_eq!(s.delegated_power("bob"), 0);
    }

    #[test]
    fn test_validators_by_power() {
        let order: Vec<String> = staking()
            .bonded_validators_by_power()
            .into_iter()
            .map(|v| v.address)
            .collect();
        assert_eq!(order, vec!["val2", "val1", "val3"]);
    }

    #[test]
    fn test_total_bonded_power() {
        assert_eq!(staking().total_bonded_power(), 500);
    }

    #[test]
    fn test_unknown_validator_inactive() {
        let s = staking();
        assert!(!s.is_bonded("nobody"));
        assert!(!s.oracle_status("nobody").is_active);
    }

    #[test]
    fn test_dev_set_status() {
        let mut s = staking();
        s.dev_set_status("val1", OracleStatus::inactive(50));
        assert_eq!(s.oracle_status("val1"), OracleStatus::inactive(50));
        assert!(s.is_bonded("val1"));
    }
}
