//! Due-feed selection.
//!
//! A feed is due when the validator has never reported it, or when the
//! chain cooldown (plus a small buffer) has passed and either
//!
//! - the validator's assigned time within the feed interval has passed, or
//! - the fresh quote moved at least the feed's deviation tolerance.
//!
//! Assigned times spread validators across `[start%, start% + offset%)` of
//! the interval, keyed on a hash of the validator and its last timestamp,
//! so reports do not all land in the same block.

use std::collections::{BTreeMap, BTreeSet};

use pricefeed_types::{
    CurrentFeedsWithDeviation, FeedWithDeviation, Params, SignalPrice, SignalPriceStatus,
    ValidatorPrice, BASIS_POINT_DENOMINATOR,
};

use crate::config::SubmitterConfig;

/// Time at which `validator` should refresh a price last reported at `timestamp`.
pub fn calculate_assigned_time(
    validator: &str,
    interval: i64,
    timestamp: i64,
    start_pct: u64,
    offset_pct: u64,
) -> i64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(validator.as_bytes());
    hasher.update(&(timestamp as u64).to_be_bytes());
    let hash = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&hash.as_bytes()[..8]);
    let spread = u64::from_be_bytes(head) % offset_pct.max(1) + start_pct;

    let offset = i128::from(interval) * i128::from(spread) / 100;
    timestamp.saturating_add(i64::try_from(offset).unwrap_or(i64::MAX))
}

/// Whether `new` differs from `old` by at least `deviation_bp` basis points.
pub fn is_deviated(deviation_bp: i64, old: u64, new: u64) -> bool {
    if old == 0 {
        return new != 0;
    }
    let diff = u128::from(old.abs_diff(new));
    let moved_bp = diff * u128::from(BASIS_POINT_DENOMINATOR) / u128::from(old);
    moved_bp >= u128::try_from(deviation_bp).unwrap_or(0)
}

/// Chain state the checker decides against.
#[derive(Clone, Debug, Default)]
pub struct ChainSnapshot {
    /// Feeds parameters.
    pub params: Params,
    /// Current feeds with deviation tolerances.
    pub feeds: CurrentFeedsWithDeviation,
    /// The validator's latest accepted prices.
    pub validator_prices: Vec<ValidatorPrice>,
}

/// Decides which quotes should be submitted now.
#[derive(Clone, Debug)]
pub struct Checker {
    validator: String,
    start_pct: u64,
    offset_pct: u64,
    cooldown_buffer: i64,
    unavailable_window: i64,
}

impl Checker {
    /// Build a checker from the client configuration.
    pub fn new(config: &SubmitterConfig) -> Self {
        Self {
            validator: config.validator.clone(),
            start_pct: config.distribution_start_pct,
            offset_pct: config.distribution_offset_pct,
            cooldown_buffer: config.cooldown_buffer_secs,
            unavailable_window: config.unavailable_window_secs,
        }
    }

    /// Current feed ids not already being submitted.
    pub fn candidate_ids(
        &self,
        snapshot: &ChainSnapshot,
        in_progress: &BTreeSet<String>,
    ) -> Vec<String> {
        snapshot
            .feeds
            .feeds
            .iter()
            .map(|f| f.signal_id.clone())
            .filter(|id| !in_progress.contains(id))
            .collect()
    }

    /// The quotes that should be submitted at `now`, in quote order.
    pub fn due_prices(
        &self,
        snapshot: &ChainSnapshot,
        quotes: Vec<SignalPrice>,
        in_progress: &BTreeSet<String>,
        now: i64,
    ) -> Vec<SignalPrice> {
        let feeds: BTreeMap<&str, &FeedWithDeviation> = snapshot
            .feeds
            .feeds
            .iter()
            .map(|f| (f.signal_id.as_str(), f))
            .collect();
        let last: BTreeMap<&str, &ValidatorPrice> = snapshot
            .validator_prices
            .iter()
            .map(|p| (p.signal_id.as_str(), p))
            .collect();

        let mut seen = BTreeSet::new();
        quotes
            .into_iter()
            .filter(|quote| {
                if in_progress.contains(&quote.signal_id) || !seen.insert(quote.signal_id.clone()) {
                    return false;
                }
                let Some(feed) = feeds.get(quote.signal_id.as_str()) else {
                    return false;
                };
                let previous = last.get(quote.signal_id.as_str()).copied();

                if !self.should_update(feed, previous, quote, &snapshot.params, now) {
                    return false;
                }
                if self.is_non_urgent_unavailable(feed, previous, quote, now) {
                    tracing::debug!(signal_id = %quote.signal_id, "holding back unavailable price");
                    return false;
                }
                true
            })
            .collect()
    }

    fn should_update(
        &self,
        feed: &FeedWithDeviation,
        previous: Option<&ValidatorPrice>,
        quote: &SignalPrice,
        params: &Params,
        now: i64,
    ) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        let threshold = previous
            .timestamp
            .saturating_add(params.cooldown_time)
            .saturating_add(self.cooldown_buffer);
        if now < threshold {
            return false;
        }

        let assigned = calculate_assigned_time(
            &self.validator,
            feed.interval,
            previous.timestamp,
            self.start_pct,
            self.offset_pct,
        );
        if assigned < now {
            return true;
        }

        is_deviated(feed.deviation_basis_point, previous.price, quote.price)
    }

    fn is_non_urgent_unavailable(
        &self,
        feed: &FeedWithDeviation,
        previous: Option<&ValidatorPrice>,
        quote: &SignalPrice,
        now: i64,
    ) -> bool {
        if quote.status != SignalPriceStatus::Unavailable {
            return false;
        }
        let last = previous.map(|p| p.timestamp).unwrap_or(0);
        let deadline = last.saturating_add(feed.interval);
        now <= deadline.saturating_sub(self.unavailable_window)
    }
}
