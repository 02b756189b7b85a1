//! Read-only queries over feeds state.
//!
//! [`FeedsQuery`] only needs shared borrows, so off-chain clients and the
//! keeper itself can read state without holding the store mutably.

use pricefeed_types::{
    CurrentFeeds, CurrentFeedsWithDeviation, FeedWithDeviation, Params, Price, PriceStatus,
    SignalTotalPower, ValidatorPrice, Vote,
};

use crate::keeper::BlockContext;
use crate::scheduler;
use crate::staking::StakingView;
use crate::store::FeedsStore;
use crate::{FeedsError, Result};

/// Read-only view of feeds state at one block.
pub struct FeedsQuery<'a, S: FeedsStore + ?Sized, K: StakingView + ?Sized> {
    store: &'a S,
    staking: &'a K,
    ctx: BlockContext,
}

impl<'a, S: FeedsStore + ?Sized, K: StakingView + ?Sized> FeedsQuery<'a, S, K> {
    /// Create a view.
    pub fn new(store: &'a S, staking: &'a K, ctx: BlockContext) -> Self {
        Self {
            store,
            staking,
            ctx,
        }
    }

    /// Current parameters.
    pub fn params(&self) -> Params {
        self.store.params()
    }

    /// Stored price of `signal_id`, or `NotInCurrentFeeds` at block time.
    pub fn price(&self, signal_id: &str) -> Price {
        self.store.price(signal_id).unwrap_or_else(|| {
            Price::new(signal_id, PriceStatus::NotInCurrentFeeds, 0, self.ctx.block_time)
        })
    }

    /// Prices of `signal_ids`, in request order.
    pub fn prices(&self, signal_ids: &[String]) -> Vec<Price> {
        signal_ids.iter().map(|id| self.price(id)).collect()
    }

    /// Every stored price.
    pub fn all_prices(&self) -> Vec<Price> {
        self.store.prices()
    }

    /// Every stored price of `validator`.
    pub fn validator_prices(&self, validator: &str) -> Vec<ValidatorPrice> {
        self.store.validator_prices(validator)
    }

    /// The stored vote of `voter`.
    pub fn vote(&self, voter: &str) -> Option<Vote> {
        self.store.vote(voter)
    }

    /// Every signal's aggregate power.
    pub fn signal_total_powers(&self) -> Vec<SignalTotalPower> {
        self.store.signal_total_powers()
    }

    /// The current feed set.
    pub fn current_feeds(&self) -> CurrentFeeds {
        self.store.current_feeds()
    }

    /// The current feed set annotated with each feed's deviation tolerance.
    pub fn current_feeds_with_deviation(&self) -> CurrentFeedsWithDeviation {
        let params = self.store.params();
        let current = self.store.current_feeds();
        CurrentFeedsWithDeviation {
            feeds: current
                .feeds
                .into_iter()
                .map(|f| FeedWithDeviation {
                    deviation_basis_point: scheduler::deviation_for(&params, f.power),
                    signal_id: f.signal_id,
                    power: f.power,
                    interval: f.interval,
                })
                .collect(),
            last_update_timestamp: current.last_update_timestamp,
            last_update_block: current.last_update_block,
        }
    }

    /// Whether `validator` is bonded with an active oracle status.
    ///
    /// # Errors
    ///
    /// - [`FeedsError::NotBondedValidator`]
    /// - [`FeedsError::OracleStatusNotActive`]
    pub fn validate_validator_required_to_send(&self, validator: &str) -> Result<()> {
        if !self.staking.is_bonded(validator) {
            return Err(FeedsError::NotBondedValidator(validator.to_string()));
        }
        if !self.staking.oracle_status(validator).is_active {
            return Err(FeedsError::OracleStatusNotActive(validator.to_string()));
        }
        Ok(())
    }

    /// Whether `validator` may submit prices.
    pub fn is_valid_validator(&self, validator: &str) -> bool {
        self.validate_validator_required_to_send(validator).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staking::OracleStatus;
    use crate::store::MemoryStore;
    use crate::stub::StubStaking;
    use pricefeed_types::{Feed, Signal};

    #[test]
    fn test_missing_price_not_in_current_feeds() {
        let store = MemoryStore::new();
        let staking = StubStaking::new();
        let query = FeedsQuery::new(&store, &staking, BlockContext::new(77, 1));
        let price = query.price("A");
        assert_eq!(price.status, PriceStatus::NotInCurrentFeeds);
        assert_eq!(price.timestamp, 77);
        assert_eq!(query.prices(&["A".to_string(), "B".to_string()]).len(), 2);
    }

    #[test]
    fn test_stored_price_returned() {
        let mut store = MemoryStore::new();
        store.set_price(Price::new("A", PriceStatus::Available, 5, 10));
        let staking = StubStaking::new();
        let query = FeedsQuery::new(&store, &staking, BlockContext::new(77, 1));
        assert_eq!(query.price("A").price, 5);
        assert_eq!(query.all_prices().len(), 1);
    }

    #[test]
    fn test_validator_checks() {
        let store = MemoryStore::new();
        let mut staking = StubStaking::new().with_validator("val1", 10, 0);
        {
            let query = FeedsQuery::new(&store, &staking, BlockContext::new(0, 1));
            assert!(query.is_valid_validator("val1"));
            assert!(matches!(
                query.validate_validator_required_to_send("val2"),
                Err(FeedsError::NotBondedValidator(_))
            ));
        }
        staking.dev_set_status("val1", OracleStatus::inactive(5));
        let query = FeedsQuery::new(&store, &staking, BlockContext::new(0, 1));
        assert!(matches!(
            query.validate_validator_required_to_send("val1"),
            Err(FeedsError::OracleStatusNotActive(_))
        ));
    }

    #[test]
    fn test_feeds_with_deviation() {
        let mut store = MemoryStore::new();
        store.set_current_feeds(CurrentFeeds {
            feeds: vec![
                Feed::new("A", 10_000_000_000, 360),
                Feed::new("B", 1_000_000_000, 3600),
            ],
            last_update_timestamp: 5,
            last_update_block: 2,
        });
        store.set_vote(Vote::new("alice", vec![Signal::new("A", 1)]));
        let staking = StubStaking::new();
        let query = FeedsQuery::new(&store, &staking, BlockContext::new(0, 1));
        let feeds = query.current_feeds_with_deviation();
        assert_eq!(feeds.feeds[0].deviation_basis_point, 300);
        assert_eq!(feeds.feeds[1].deviation_basis_point, 3000);
        assert_eq!(feeds.last_update_timestamp, 5);
        assert!(query.vote("alice").is_some());
    }
}
