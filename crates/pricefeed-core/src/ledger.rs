//! Vote ledger.
//!
//! Each voter holds at most one vote (a list of signal/power pairs). A new
//! vote replaces the old one, and every signal's aggregate power moves by
//! the difference. Applying a vote is staged: the new aggregates are
//! computed and checked first, and only a fully valid [`StagedVote`] touches
//! the store.

use std::collections::BTreeMap;

use pricefeed_types::{Signal, SignalTotalPower, Vote};

use crate::store::FeedsStore;
use crate::{FeedsError, Result};

/// Per-signal power change from `old` to `new`.
///
/// Signals absent from one side count as power 0. Only nonzero deltas are
/// returned.
pub fn power_diff(old: &[Signal], new: &[Signal]) -> BTreeMap<String, i64> {
    let mut diff: BTreeMap<String, i64> = BTreeMap::new();
    for signal in old {
        *diff.entry(signal.id.clone()).or_default() -= signal.power;
    }
    for signal in new {
        *diff.entry(signal.id.clone()).or_default() += signal.power;
    }
    diff.retain(|_, delta| *delta != 0);
    diff
}

/// A vote whose effect on the aggregates has been computed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVote {
    vote: Vote,
    power_diff: BTreeMap<String, i64>,
    totals: Vec<SignalTotalPower>,
}

impl StagedVote {
    /// Per-signal power changes this vote applies.
    pub fn power_diff(&self) -> &BTreeMap<String, i64> {
        &self.power_diff
    }

    /// Write the vote and the new aggregates.
    ///
    /// An empty vote deletes the voter's record, and an aggregate that
    /// reaches zero is deleted.
    pub fn commit<S: FeedsStore + ?Sized>(self, store: &mut S) -> BTreeMap<String, i64> {
        if self.vote.signals.is_empty() {
            store.delete_vote(&self.vote.voter);
        } else {
            store.set_vote(self.vote);
        }
        for total in self.totals {
            if total.power == 0 {
                store.delete_signal_total_power(&total.id);
            } else {
                store.set_signal_total_power(total);
            }
        }
        self.power_diff
    }
}

/// Compute the effect of replacing `voter`'s vote with `signals`.
///
/// # Errors
///
/// - [`FeedsError::PowerOverflow`] if an aggregate would overflow
/// - [`FeedsError::PowerNegative`] if an aggregate would drop below zero
pub fn stage_vote<S: FeedsStore + ?Sized>(
    store: &S,
    voter: &str,
    signals: Vec<Signal>,
) -> Result<StagedVote> {
    let old = store.vote(voter).map(|v| v.signals).unwrap_or_default();
    let diff = power_diff(&old, &signals);

    let mut totals = Vec::with_capacity(diff.len());
    for (signal_id, delta) in &diff {
        let current = store
            .signal_total_power(signal_id)
            .map(|s| s.power)
            .unwrap_or(0);
        let power = current
            .checked_add(*delta)
            .ok_or_else(|| FeedsError::PowerOverflow(signal_id.clone()))?;
        if power < 0 {
            return Err(FeedsError::PowerNegative {
                signal_id: signal_id.clone(),
                power,
            });
        }
        totals.push(SignalTotalPower::new(signal_id.clone(), power));
    }

    Ok(StagedVote {
        vote: Vote::new(voter, signals),
        power_diff: diff,
        totals,
    })
}

/// Replace `voter`'s vote and return the per-signal power changes.
///
/// Nothing is written if any aggregate would become invalid.
///
/// # Errors
///
/// Any error from [`stage_vote`].
pub fn update_vote_and_return_power_diff<S: FeedsStore + ?Sized>(
    store: &mut S,
    voter: &str,
    signals: Vec<Signal>,
) -> Result<BTreeMap<String, i64>> {
    let staged = stage_vote(store, voter, signals)?;
    Ok(staged.commit(store))
}
