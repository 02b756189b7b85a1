//! Per-feed price resolution.
//!
//! Wraps the median with the rules deciding whether a price can be
//! published at all: which observations are fresh enough to count, whether
//! enough power reported, and which validators missed their deadline.

use pricefeed_types::{
    CurrentFeeds, Feed, Price, PriceStatus, ValidatorPrice, EXPECTED_BLOCK_TIME,
};

use crate::keeper::BlockContext;
use crate::median::{calculate_prices_powers, median_validator_price_infos, ValidatorPriceInfo};
use crate::staking::ValidatorInfo;
use crate::Result;

/// Whether a stored validator price is fresh enough to count for `feed`.
pub fn check_have_price(feed: &Feed, price: Option<&ValidatorPrice>, block_time: i64) -> bool {
    price.is_some_and(|p| p.timestamp >= block_time.saturating_sub(feed.interval))
}

/// The time and block by which a validator must have reported a feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportDeadline {
    /// Block time deadline.
    pub time: i64,
    /// Block height deadline.
    pub block: i64,
}

impl ReportDeadline {
    /// Compute the deadline for `validator` on `feed`.
    ///
    /// The time deadline is the latest of the feed-set update plus grace,
    /// the validator's activation plus grace, and its last price plus the
    /// feed interval. The block deadline converts the same durations into
    /// blocks at [`EXPECTED_BLOCK_TIME`], so a slow chain does not push
    /// validators past a deadline measured in seconds alone.
    pub fn compute(
        feed: &Feed,
        current_feeds: &CurrentFeeds,
        price: Option<&ValidatorPrice>,
        validator: &ValidatorInfo,
        grace_period: i64,
    ) -> Self {
        let mut time = current_feeds.last_update_timestamp.saturating_add(grace_period);
        let mut block = current_feeds
            .last_update_block
            .saturating_add(grace_period / EXPECTED_BLOCK_TIME);

        time = time.max(validator.status.since.saturating_add(grace_period));

        if let Some(p) = price {
            time = time.max(p.timestamp.saturating_add(feed.interval));
            block = block.max(p.block_height.saturating_add(feed.interval / EXPECTED_BLOCK_TIME));
        }

        Self { time, block }
    }

    /// Whether both the time and the block deadline have passed.
    pub fn is_missed(&self, ctx: BlockContext) -> bool {
        self.time < ctx.block_time && self.block < ctx.block_height
    }
}

/// Resolve the published price of `feed` from fresh observations.
///
/// `power_quorum` is the minimum total reporting power.
///
/// # Errors
///
/// Propagates median errors, which cannot occur once the quorum checks pass.
pub fn calculate_price(
    feed: &Feed,
    infos: &[ValidatorPriceInfo],
    power_quorum: u128,
    block_time: i64,
) -> Result<Price> {
    let powers = calculate_prices_powers(infos);
    let not_published = |status| Price::new(feed.signal_id.clone(), status, 0, block_time);

    if powers.unsupported * 2 > powers.total {
        return Ok(not_published(PriceStatus::UnknownSignalId));
    }
    if powers.total < power_quorum || powers.available * 2 < powers.total || powers.available == 0 {
        return Ok(not_published(PriceStatus::NotReady));
    }

    let price = median_validator_price_infos(infos)?;
    Ok(Price::new(
        feed.signal_id.clone(),
        PriceStatus::Available,
        price,
        block_time,
    ))
}
