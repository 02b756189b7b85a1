//! Feeds keeper: message handlers, block hooks and queries.
//!
//! A [`FeedsKeeper`] borrows the store and the staking view for the span of
//! one message or one block. Handlers validate fully before writing, so a
//! rejected message leaves the store untouched.

use std::collections::{BTreeMap, BTreeSet};

use pricefeed_types::signal::validate_signals;
use pricefeed_types::{
    CurrentFeeds, Encoder, Params, Price, Signal, SignalPrice, TypesError, Vote,
    BASIS_POINT_DENOMINATOR,
};
use tracing::{debug, info, warn};

use crate::ledger;
use crate::median::ValidatorPriceInfo;
use crate::pricing::{calculate_price, check_have_price, ReportDeadline};
use crate::query::FeedsQuery;
use crate::relay::encode_relay;
use crate::selector::select_current_feeds;
use crate::staking::{StakingView, ValidatorInfo};
use crate::store::FeedsStore;
use crate::submission::{commit_submission, validate_submission, SubmissionContext};
use crate::{FeedsError, Result};

/// Time and height of the block being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Block time in unix seconds.
    pub block_time: i64,
    /// Block height.
    pub block_height: i64,
}

impl BlockContext {
    /// Create a block context.
    pub fn new(block_time: i64, block_height: i64) -> Self {
        Self {
            block_time,
            block_height,
        }
    }
}

/// Outcome of a price recalculation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceRecalculation {
    /// One price per current feed, in feed order.
    pub prices: Vec<Price>,
    /// Active validators past their reporting deadline on any feed.
    pub missed_validators: Vec<String>,
}

/// Entry point for every feeds operation.
pub struct FeedsKeeper<'a, S: FeedsStore, K: StakingView> {
    store: &'a mut S,
    staking: &'a K,
    ctx: BlockContext,
}

impl<'a, S: FeedsStore, K: StakingView> FeedsKeeper<'a, S, K> {
    /// Bind a keeper to a store, a staking view and the current block.
    pub fn new(store: &'a mut S, staking: &'a K, ctx: BlockContext) -> Self {
        Self {
            store,
            staking,
            ctx,
        }
    }

    /// The block this keeper operates on.
    pub fn block(&self) -> BlockContext {
        self.ctx
    }

    /// Read-only view of the state this keeper operates on.
    pub fn query(&self) -> FeedsQuery<'_, S, K> {
        FeedsQuery::new(&*self.store, self.staking, self.ctx)
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    /// Replace parameters. Only the current admin may do so.
    ///
    /// # Errors
    ///
    /// - [`FeedsError::InvalidSigner`] if `signer` is not the admin
    /// - [`FeedsError::Types`] if `params` fail validation
    pub fn update_params(&mut self, signer: &str, params: Params) -> Result<()> {
        let admin = self.store.params().admin;
        if signer != admin {
            return Err(FeedsError::InvalidSigner {
                expected: admin,
                got: signer.to_string(),
            });
        }
        params.validate()?;
        info!(admin = %params.admin, "feeds params updated");
        self.store.set_params(params);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Votes
    // -----------------------------------------------------------------------

    /// Replace `voter`'s vote with `signals`.
    ///
    /// Returns the per-signal power changes that were applied.
    ///
    /// # Errors
    ///
    /// - [`FeedsError::Types`] for malformed, duplicate or non-positive signals
    /// - [`FeedsError::NotEnoughDelegation`] if the vote exceeds delegated power
    /// - [`FeedsError::PowerNegative`] / [`FeedsError::PowerOverflow`] from the ledger
    pub fn vote(&mut self, voter: &str, signals: Vec<Signal>) -> Result<BTreeMap<String, i64>> {
        let params = self.store.params();
        validate_signals(&signals, params.max_current_feeds)?;

        let vote = Vote::new(voter, signals);
        let requested = vote.total_power();
        let available = self.staking.delegated_power(voter);
        if requested > i128::from(available) {
            return Err(FeedsError::NotEnoughDelegation {
                delegator: voter.to_string(),
                requested,
                available,
            });
        }

        let staged = ledger::stage_vote(&*self.store, voter, vote.signals)?;
        let diff = staged.commit(&mut *self.store);
        info!(voter, changed = diff.len(), "vote accepted");
        for (signal_id, delta) in &diff {
            debug!(voter, signal_id = %signal_id, delta, "signal power changed");
        }
        Ok(diff)
    }

    // -----------------------------------------------------------------------
    // Submissions
    // -----------------------------------------------------------------------

    /// Accept a validator's price submission.
    ///
    /// # Errors
    ///
    /// Any error from [`FeedsQuery::validate_validator_required_to_send`]
    /// or [`validate_submission`]. Nothing is stored on error.
    pub fn submit_prices(
        &mut self,
        validator: &str,
        timestamp: i64,
        signal_prices: &[SignalPrice],
    ) -> Result<()> {
        self.query().validate_validator_required_to_send(validator)?;

        let params = self.store.params();
        let current_feeds = self.store.current_feeds();
        let ctx = SubmissionContext {
            params: &params,
            current_feeds: &current_feeds,
            block_time: self.ctx.block_time,
            block_height: self.ctx.block_height,
        };
        let accepted = validate_submission(&*self.store, &ctx, validator, timestamp, signal_prices)?;
        let count = accepted.len();
        let pruned = commit_submission(&mut *self.store, validator, &current_feeds, accepted);

        info!(validator, count, pruned, "prices submitted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Block hooks
    // -----------------------------------------------------------------------

    /// Rebuild the current feed set from signal total powers.
    pub fn recalculate_current_feeds(&mut self) -> CurrentFeeds {
        let params = self.store.params();
        let feeds = select_current_feeds(
            self.store.signal_total_powers(),
            &params,
            self.ctx.block_time,
            self.ctx.block_height,
        );
        info!(
            count = feeds.len(),
            block_height = self.ctx.block_height,
            "current feeds recalculated"
        );
        self.store.set_current_feeds(feeds.clone());
        feeds
    }

    /// Recompute one price per current feed, replacing every stored price.
    ///
    /// # Errors
    ///
    /// Propagates aggregation errors; no price is written in that case.
    pub fn recalculate_prices(&mut self) -> Result<PriceRecalculation> {
        let params = self.store.params();
        let current_feeds = self.store.current_feeds();
        let validators: Vec<ValidatorInfo> = self
            .staking
            .bonded_validators_by_power()
            .into_iter()
            .filter(|v| v.status.is_active)
            .collect();

        let total_bonded = u128::from(self.staking.total_bonded_power());
        let power_quorum =
            total_bonded * u128::from(params.price_quorum_basis_point) / u128::from(BASIS_POINT_DENOMINATOR);

        let mut missed = BTreeSet::new();
        let mut prices = Vec::with_capacity(current_feeds.len());
        for feed in &current_feeds.feeds {
            let mut infos = Vec::new();
            for validator in &validators {
                let stored = self.store.validator_price(&validator.address, &feed.signal_id);

                let deadline = ReportDeadline::compute(
                    feed,
                    &current_feeds,
                    stored.as_ref(),
                    validator,
                    params.grace_period,
                );
                if deadline.is_missed(self.ctx) && missed.insert(validator.address.clone()) {
                    warn!(
                        validator = %validator.address,
                        signal_id = %feed.signal_id,
                        deadline_time = deadline.time,
                        deadline_block = deadline.block,
                        "validator missed price report"
                    );
                }

                if check_have_price(feed, stored.as_ref(), self.ctx.block_time) {
                    if let Some(p) = stored {
                        infos.push(ValidatorPriceInfo {
                            status: p.status,
                            power: validator.power,
                            price: p.price,
                            deviation: 0,
                            timestamp: p.timestamp,
                        });
                    }
                }
            }

            let price = calculate_price(feed, &infos, power_quorum, self.ctx.block_time)?;
            debug!(
                signal_id = %price.signal_id,
                status = ?price.status,
                price = price.price,
                reporters = infos.len(),
                "price computed"
            );
            prices.push(price);
        }

        self.store.delete_all_prices();
        for price in &prices {
            self.store.set_price(price.clone());
        }

        Ok(PriceRecalculation {
            prices,
            missed_validators: missed.into_iter().collect(),
        })
    }

    /// Per-block hook: refresh the feed set on epoch boundaries, then prices.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::recalculate_prices`].
    pub fn end_block(&mut self) -> Result<PriceRecalculation> {
        let interval = self.store.params().current_feeds_update_interval;
        if interval > 0 && self.ctx.block_height % interval == 0 {
            self.recalculate_current_feeds();
        }
        self.recalculate_prices()
    }

    // -----------------------------------------------------------------------
    // Relay
    // -----------------------------------------------------------------------

    /// Encode the stored prices of `signal_ids` for relay at block time.
    ///
    /// # Errors
    ///
    /// - [`FeedsError::EmptySignalIds`] / [`FeedsError::TooManySignalIds`]
    /// - [`FeedsError::Types`] on a duplicate or oversized id
    /// - [`FeedsError::Tick`] if a price cannot be converted
    pub fn encode_for_relay(&self, signal_ids: &[String], encoder: Encoder) -> Result<Vec<u8>> {
        if signal_ids.is_empty() {
            return Err(FeedsError::EmptySignalIds);
        }
        let max = self.store.params().max_signal_ids_per_signing;
        if signal_ids.len() as u64 > max {
            return Err(FeedsError::TooManySignalIds {
                count: signal_ids.len(),
                max,
            });
        }

        let mut seen = BTreeSet::new();
        for id in signal_ids {
            if !seen.insert(id.as_str()) {
                return Err(TypesError::DuplicateSignalId(id.clone()).into());
            }
        }

        let prices = self.query().prices(signal_ids);
        encode_relay(&prices, self.ctx.block_time, encoder)
    }
}
