//! Current feed selection.

use pricefeed_types::{CurrentFeeds, Feed, Params, SignalTotalPower};

use crate::scheduler;

/// Pick the tracked feed set from every signal's total power.
///
/// Signals are ordered by power descending with ties broken by signal id
/// ascending, truncated to `params.max_current_feeds`, and any signal whose
/// interval is 0 (below one power step) is dropped.
pub fn select_current_feeds(
    mut powers: Vec<SignalTotalPower>,
    params: &Params,
    timestamp: i64,
    block_height: i64,
) -> CurrentFeeds {
    powers.sort_by(|a, b| b.power.cmp(&a.power).then_with(|| a.id.cmp(&b.id)));

    let limit = usize::try_from(params.max_current_feeds).unwrap_or(usize::MAX);
    let feeds = powers
        .into_iter()
        .take(limit)
        .filter_map(|stp| {
            let interval = scheduler::interval_for(params, stp.power);
            (interval > 0).then(|| Feed::new(stp.id, stp.power, interval))
        })
        .collect();

    CurrentFeeds {
        feeds,
        last_update_timestamp: timestamp,
        last_update_block: block_height,
    }
}
