//! Feeds state storage.
//!
//! [`FeedsStore`] is the key/value surface the keeper reads and writes.
//! The host application backs it with whatever persistence it has;
//! [`MemoryStore`] keeps everything in ordered maps for tests and simulation.

use std::collections::BTreeMap;

use pricefeed_types::{CurrentFeeds, Params, Price, SignalTotalPower, ValidatorPrice, Vote};

/// Storage interface for the feeds module.
///
/// Iteration methods return entries in key order so results are
/// deterministic across implementations.
pub trait FeedsStore {
    /// Current parameters.
    fn params(&self) -> Params;
    /// Replace parameters.
    fn set_params(&mut self, params: Params);

    /// A voter's stored vote.
    fn vote(&self, voter: &str) -> Option<Vote>;
    /// Store a vote, keyed by its voter.
    fn set_vote(&mut self, vote: Vote);
    /// Remove a voter's vote.
    fn delete_vote(&mut self, voter: &str);

    /// A signal's aggregate voted power.
    fn signal_total_power(&self, signal_id: &str) -> Option<SignalTotalPower>;
    /// Store a signal's aggregate power.
    fn set_signal_total_power(&mut self, power: SignalTotalPower);
    /// Remove a signal's aggregate power.
    fn delete_signal_total_power(&mut self, signal_id: &str);
    /// Every stored signal total power.
    fn signal_total_powers(&self) -> Vec<SignalTotalPower>;

    /// The current feed set.
    fn current_feeds(&self) -> CurrentFeeds;
    /// Replace the current feed set.
    fn set_current_feeds(&mut self, feeds: CurrentFeeds);

    /// A validator's latest price for one signal.
    fn validator_price(&self, validator: &str, signal_id: &str) -> Option<ValidatorPrice>;
    /// Store a validator price, keyed by (validator, signal).
    fn set_validator_price(&mut self, price: ValidatorPrice);
    /// Remove a validator price.
    fn delete_validator_price(&mut self, validator: &str, signal_id: &str);
    /// Every stored price of one validator.
    fn validator_prices(&self, validator: &str) -> Vec<ValidatorPrice>;

    /// The aggregated price of a signal.
    fn price(&self, signal_id: &str) -> Option<Price>;
    /// Store an aggregated price.
    fn set_price(&mut self, price: Price);
    /// Every stored aggregated price.
    fn prices(&self) -> Vec<Price>;
    /// Remove every aggregated price.
    fn delete_all_prices(&mut self);
}

/// In-memory [`FeedsStore`] backed by `BTreeMap`s.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    params: Params,
    votes: BTreeMap<String, Vote>,
    signal_total_powers: BTreeMap<String, SignalTotalPower>,
    current_feeds: CurrentFeeds,
    validator_prices: BTreeMap<(String, String), ValidatorPrice>,
    prices: BTreeMap<String, Price>,
}

impl MemoryStore {
    /// Create an empty store with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Number of stored votes.
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

impl FeedsStore for MemoryStore {
    fn params(&self) -> Params {
        self.params.clone()
    }

    fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    fn vote(&self, voter: &str) -> Option<Vote> {
        self.votes.get(voter).cloned()
    }

    fn set_vote(&mut self, vote: Vote) {
        self.votes.insert(vote.voter.clone(), vote);
    }

    fn delete_vote(&mut self, voter: &str) {
        self.votes.remove(voter);
    }

    fn signal_total_power(&self, signal_id: &str) -> Option<SignalTotalPower> {
        self.signal_total_powers.get(signal_id).cloned()
    }

    fn set_signal_total_power(&mut self, power: SignalTotalPower) {
        self.signal_total_powers.insert(power.id.clone(), power);
    }

    fn delete_signal_total_power(&mut self, signal_id: &str) {
        self.signal_total_powers.remove(signal_id);
    }

    fn signal_total_powers(&self) -> Vec<SignalTotalPower> {
        self.signal_total_powers.values().cloned().collect()
    }

    fn current_feeds(&self) -> CurrentFeeds {
        self.current_feeds.clone()
    }

    fn set_current_feeds(&mut self, feeds: CurrentFeeds) {
        self.current_feeds = feeds;
    }

    fn validator_price(&self, validator: &str, signal_id: &str) -> Option<ValidatorPrice> {
        self.validator_prices
            .get(&(validator.to_string(), signal_id.to_string()))
            .cloned()
    }

    fn set_validator_price(&mut self, price: ValidatorPrice) {
        self.validator_prices
            .insert((price.validator.clone(), price.signal_id.clone()), price);
    }

    fn delete_validator_price(&mut self, validator: &str, signal_id: &str) {
        self.validator_prices
            .remove(&(validator.to_string(), signal_id.to_string()));
    }

    fn validator_prices(&self, validator: &str) -> Vec<ValidatorPrice> {
        self.validator_prices
            .iter()
            .filter(|((v, _), _)| v == validator)
            .map(|(_, price)| price.clone())
            .collect()
    }

    fn price(&self, signal_id: &str) -> Option<Price> {
        self.prices.get(signal_id).cloned()
    }

    fn set_price(&mut self, price: Price) {
        self.prices.insert(price.signal_id.clone(), price);
    }

    fn prices(&self) -> Vec<Price> {
        self.prices.values().cloned().collect()
    }

    fn delete_all_prices(&mut self) {
        self.prices.clear();
    }
}
