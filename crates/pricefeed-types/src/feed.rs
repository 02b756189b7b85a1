//! Current feed set.

use serde::{Deserialize, Serialize};

/// One actively tracked signal for the current epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Signal id.
    pub signal_id: String,
    /// Signal total power at selection time.
    pub power: i64,
    /// Required refresh interval in seconds.
    pub interval: i64,
}

impl Feed {
    /// Create a feed.
    pub fn new(signal_id: impl Into<String>, power: i64, interval: i64) -> Self {
        Self {
            signal_id: signal_id.into(),
            power,
            interval,
        }
    }
}

/// The bounded feed set, replaced wholesale on every recalculation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFeeds {
    /// Feeds ordered by power descending, then signal id ascending.
    pub feeds: Vec<Feed>,
    /// Block time of the recalculation.
    pub last_update_timestamp: i64,
    /// Block height of the recalculation.
    pub last_update_block: i64,
}

impl CurrentFeeds {
    /// Look up a feed by signal id.
    pub fn get(&self, signal_id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.signal_id == signal_id)
    }

    /// Whether `signal_id` is currently tracked.
    pub fn contains(&self, signal_id: &str) -> bool {
        self.get(signal_id).is_some()
    }

    /// Number of tracked feeds.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Whether no feed is tracked.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

/// A feed annotated with the deviation tolerance its power earns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedWithDeviation {
    /// Signal id.
    pub signal_id: String,
    /// Signal total power at selection time.
    pub power: i64,
    /// Required refresh interval in seconds.
    pub interval: i64,
    /// Price move (in basis points) that warrants an early refresh.
    pub deviation_basis_point: i64,
}

/// Current feeds as served to off-chain submitters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFeedsWithDeviation {
    /// Annotated feeds.
    pub feeds: Vec<FeedWithDeviation>,
    /// Block time of the recalculation.
    pub last_update_timestamp: i64,
    /// Block height of the recalculation.
    pub last_update_block: i64,
}
