//! Validator price submission gate.
//!
//! A submission is accepted as a whole or not at all. It must:
//!
//! - carry no more entries than there are current feeds
//! - be stamped within `allowable_block_time_discrepancy` of block time
//! - name each current feed at most once, with a well-formed entry
//! - respect `cooldown_time` since the validator's last accepted price
//!   for each signal
//!
//! On acceptance the validator's stored prices for signals that left the
//! current feed set are pruned.

use std::collections::BTreeSet;

use pricefeed_types::{CurrentFeeds, Params, SignalPrice, TypesError, ValidatorPrice};

use crate::store::FeedsStore;
use crate::{FeedsError, Result};

/// Reporting state of one (validator, signal) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportState {
    /// Nothing accepted yet.
    NoRecord,
    /// Last accepted at `timestamp`.
    Recorded {
        /// Block time of the last accepted price.
        timestamp: i64,
    },
}

impl ReportState {
    /// State derived from the stored validator price, if any.
    pub fn of(price: Option<&ValidatorPrice>) -> Self {
        match price {
            Some(p) => Self::Recorded {
                timestamp: p.timestamp,
            },
            None => Self::NoRecord,
        }
    }

    /// Earliest block time at which a new price is accepted.
    pub fn next_allowed(self, cooldown: i64) -> Option<i64> {
        match self {
            Self::NoRecord => None,
            Self::Recorded { timestamp } => Some(timestamp.saturating_add(cooldown)),
        }
    }
}

/// Block-level inputs to a submission check.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionContext<'a> {
    /// Current parameters.
    pub params: &'a Params,
    /// Current feed set.
    pub current_feeds: &'a CurrentFeeds,
    /// Current block time.
    pub block_time: i64,
    /// Current block height.
    pub block_height: i64,
}

/// Check a submission and build the prices to store.
///
/// Reads the store but never writes it.
///
/// # Errors
///
/// - [`FeedsError::SignalPricesTooLarge`]
/// - [`FeedsError::InvalidTimestamp`]
/// - [`FeedsError::Types`] for malformed or duplicate entries
/// - [`FeedsError::SignalIdNotSupported`]
/// - [`FeedsError::PriceSubmitTooEarly`]
pub fn validate_submission<S: FeedsStore + ?Sized>(
    store: &S,
    ctx: &SubmissionContext<'_>,
    validator: &str,
    timestamp: i64,
    signal_prices: &[SignalPrice],
) -> Result<Vec<ValidatorPrice>> {
    let feed_count = ctx.current_feeds.len();
    if signal_prices.len() > feed_count {
        return Err(FeedsError::SignalPricesTooLarge {
            count: signal_prices.len(),
            max: feed_count,
        });
    }

    let max_discrepancy = ctx.params.allowable_block_time_discrepancy;
    if timestamp.abs_diff(ctx.block_time) > max_discrepancy.unsigned_abs() {
        return Err(FeedsError::InvalidTimestamp {
            timestamp,
            block_time: ctx.block_time,
            max_discrepancy,
        });
    }

    let mut seen = BTreeSet::new();
    let mut accepted = Vec::with_capacity(signal_prices.len());
    for sp in signal_prices {
        sp.validate()?;
        if !seen.insert(sp.signal_id.as_str()) {
            return Err(TypesError::DuplicateSignalId(sp.signal_id.clone()).into());
        }
        if !ctx.current_feeds.contains(&sp.signal_id) {
            return Err(FeedsError::SignalIdNotSupported(sp.signal_id.clone()));
        }

        let state = ReportState::of(store.validator_price(validator, &sp.signal_id).as_ref());
        if let Some(next_allowed) = state.next_allowed(ctx.params.cooldown_time) {
            if ctx.block_time < next_allowed {
                return Err(FeedsError::PriceSubmitTooEarly {
                    signal_id: sp.signal_id.clone(),
                    next_allowed,
                });
            }
        }

        accepted.push(ValidatorPrice {
            validator: validator.to_string(),
            signal_id: sp.signal_id.clone(),
            status: sp.status,
            price: sp.price,
            timestamp: ctx.block_time,
            block_height: ctx.block_height,
        });
    }

    Ok(accepted)
}

/// Store accepted prices and prune the validator's stale entries.
///
/// Returns the number of pruned entries.
pub fn commit_submission<S: FeedsStore + ?Sized>(
    store: &mut S,
    validator: &str,
    current_feeds: &CurrentFeeds,
    accepted: Vec<ValidatorPrice>,
) -> usize {
    for price in accepted {
        store.set_validator_price(price);
    }

    let stale: Vec<String> = store
        .validator_prices(validator)
        .into_iter()
        .filter(|p| !current_feeds.contains(&p.signal_id))
        .map(|p| p.signal_id)
        .collect();
    for signal_id in &stale {
        store.delete_validator_price(validator, signal_id);
    }
    stale.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pricefeed_types::{Feed, SignalPriceStatus};

    fn feeds(ids: &[&str]) -> CurrentFeeds {
        CurrentFeeds {
            feeds: ids.iter().map(|id| Feed::new(*id, 1_000_000_000, 3600)).collect(),
            last_update_timestamp: 0,
            last_update_block: 0,
        }
    }

    fn stored(validator: &str, signal_id: &str, timestamp: i64) -> ValidatorPrice {
        ValidatorPrice {
            validator: validator.to_string(),
            signal_id: signal_id.to_string(),
            status: SignalPriceStatus::Available,
            price: 1,
            timestamp,
            block_height: 1,
        }
    }

    fn check(
        store: &MemoryStore,
        current: &CurrentFeeds,
        block_time: i64,
        timestamp: i64,
        prices: &[SignalPrice],
    ) -> Result<Vec<ValidatorPrice>> {
        let params = Params::default();
        let ctx = SubmissionContext {
            params: &params,
            current_feeds: current,
            block_time,
            block_height: 10,
        };
        validate_submission(store, &ctx, "val1", timestamp, prices)
    }

    #[test]
    fn test_accepts_valid_submission() {
        let store = MemoryStore::new();
        let current = feeds(&["A", "B"]);
        let accepted = check(
            &store,
            &current,
            1000,
            990,
            &[
                SignalPrice::available("A", 5),
                SignalPrice::without_price("B", SignalPriceStatus::Unavailable),
            ],
        )
        .expect("valid");
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].timestamp, 1000);
        assert_eq!(accepted[0].block_height, 10);
        assert_eq!(accepted[1].status, SignalPriceStatus::Unavailable);
    }

    #[test]
    fn test_too_many_prices() {
        let store = MemoryStore::new();
        let current = feeds(&["A"]);
        let err = check(
            &store,
            &current,
            1000,
            1000,
            &[SignalPrice::available("A", 1), SignalPrice::available("B", 1)],
        )
        .expect_err("two prices for one feed");
        assert!(matches!(err, FeedsError::SignalPricesTooLarge { count: 2, max: 1 }));
    }

    #[test]
    fn test_timestamp_skew() {
        let store = MemoryStore::new();
        let current = feeds(&["A"]);
        let prices = [SignalPrice::available("A", 1)];
        assert!(check(&store, &current, 1000, 940, &prices).is_ok());
        assert!(check(&store, &current, 1000, 1060, &prices).is_ok());
        assert!(matches!(
            check(&store, &current, 1000, 939, &prices),
            Err(FeedsError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            check(&store, &current, 1000, 1061, &prices),
            Err(FeedsError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_unknown_signal() {
        let store = MemoryStore::new();
        let current = feeds(&["A"]);
        let err = check(&store, &current, 1000, 1000, &[SignalPrice::available("Z", 1)])
            .expect_err("not a feed");
        assert!(matches!(err, FeedsError::SignalIdNotSupported(id) if id == "Z"));
    }

    #[test]
    fn test_duplicate_signal() {
        let store = MemoryStore::new();
        let current = feeds(&["A", "B"]);
        let err = check(
            &store,
            &current,
            1000,
            1000,
            &[SignalPrice::available("A", 1), SignalPrice::available("A", 2)],
        )
        .expect_err("duplicate");
        assert!(matches!(
            err,
            FeedsError::Types(TypesError::DuplicateSignalId(_))
        ));
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut store = MemoryStore::new();
        store.set_validator_price(stored("val1", "A", 1000));
        let current = feeds(&["A"]);
        let prices = [SignalPrice::available("A", 2)];

        let err = check(&store, &current, 1029, 1029, &prices).expect_err("too early");
        assert!(matches!(
            err,
            FeedsError::PriceSubmitTooEarly { next_allowed: 1030, .. }
        ));
        assert!(check(&store, &current, 1030, 1030, &prices).is_ok());
    }

    #[test]
    fn test_report_state() {
        assert_eq!(ReportState::of(None), ReportState::NoRecord);
        assert_eq!(ReportState::NoRecord.next_allowed(30), None);
        let price = stored("val1", "A", 70);
        let state = ReportState::of(Some(&price));
        assert_eq!(state, ReportState::Recorded { timestamp: 70 });
        assert_eq!(state.next_allowed(30), Some(100));
    }

    #[test]
    fn test_commit_prunes_stale() {
        let mut store = MemoryStore::new();
        store.set_validator_price(stored("val1", "OLD", 500));
        store.set_validator_price(stored("val2", "OLD", 500));
        let current = feeds(&["A"]);

        let pruned = commit_submission(&mut store, "val1", &current, vec![stored("val1", "A", 1000)]);
        assert_eq!(pruned, 1);
        assert!(store.validator_price("val1", "OLD").is_none());
        assert!(store.validator_price("val1", "A").is_some());
        // Other validators' entries are left alone.
        assert!(store.validator_price("val2", "OLD").is_some());
    }
}
