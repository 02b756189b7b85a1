//! # pricefeed-types
//!
//! Shared domain types for the pricefeed workspace: votes and signals,
//! current feeds, submitted and aggregated prices, module parameters and
//! the relay encoder selector.

pub mod encoder;
pub mod feed;
pub mod params;
pub mod price;
pub mod signal;

pub use encoder::Encoder;
pub use feed::{CurrentFeeds, CurrentFeedsWithDeviation, Feed, FeedWithDeviation};
pub use params::Params;
pub use price::{Price, PriceStatus, SignalPrice, SignalPriceStatus, ValidatorPrice};
pub use signal::{Signal, SignalTotalPower, Vote};

/// Expected block time in seconds, used to turn durations into block counts.
pub const EXPECTED_BLOCK_TIME: i64 = 3;

/// Basis-point denominator (100% = 10000).
pub const BASIS_POINT_DENOMINATOR: u64 = 10_000;

/// Error types for domain validation and configuration.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Signal id is empty.
    #[error("invalid signal id: {0:?}")]
    InvalidSignalId(String),

    /// Signal id does not fit in 32 bytes.
    #[error("signal id {id} is {len} bytes, max {max}")]
    SignalIdTooLong {
        /// The offending id.
        id: String,
        /// Its byte length.
        len: usize,
        /// Maximum length.
        max: usize,
    },

    /// The same signal id appears twice in one message.
    #[error("duplicate signal id: {0}")]
    DuplicateSignalId(String),

    /// Signal power must be positive.
    #[error("signal {signal_id} has non-positive power {power}")]
    NonPositivePower {
        /// Signal id.
        signal_id: String,
        /// Submitted power.
        power: i64,
    },

    /// Too many signals in one message.
    #[error("too many signals: got {count}, max {max}")]
    TooManySignals {
        /// Number submitted.
        count: usize,
        /// Allowed maximum.
        max: u64,
    },

    /// A non-available signal price carried a nonzero price.
    #[error("signal {signal_id} has status {status:?} but price {price}")]
    InvalidSignalPrice {
        /// Signal id.
        signal_id: String,
        /// Submitted status.
        status: SignalPriceStatus,
        /// Submitted price.
        price: u64,
    },

    /// Parameter set failed validation.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience result type for domain validation.
pub type Result<T> = std::result::Result<T, TypesError>;
