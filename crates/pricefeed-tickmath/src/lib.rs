//! # pricefeed-tickmath
//!
//! Deterministic conversion between 1e9-scaled fixed-point prices and ticks
//! on a geometric ladder of ratio 1.0001.
//!
//! Every node must produce bit-identical results, so no floating point is
//! used anywhere. Wide intermediates are carried in [`ethnum::U256`].
//!
//! ## Modules
//!
//! - [`ladder`] — Q96 ladder constants and the raw tick → price walk
//! - [`convert`] — Public price ↔ tick conversions

pub mod convert;
pub mod ladder;

pub use convert::{price_to_tick, tick_to_price};

/// Largest signed tick (2^18 - 1).
pub const MAX_TICK: i64 = 262_143;

/// Smallest signed tick.
pub const MIN_TICK: i64 = -MAX_TICK;

/// Offset added to signed ticks so relayed ticks are always positive (2^18).
pub const OFFSET: i64 = 262_144;

/// Fixed-point scale of prices (1e9).
pub const PRICE_SCALE: u64 = 1_000_000_000;

/// Error types for tick conversions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// Price 0 has no tick.
    #[error("price must be greater than 0")]
    ZeroPrice,

    /// Tick outside `[MIN_TICK, MAX_TICK]`.
    #[error("tick out of range")]
    TickOutOfRange,

    /// Converted price is zero or does not fit in a `u64`.
    #[error("price out of range")]
    PriceOutOfRange,
}

/// Convenience result type for tick conversions.
pub type Result<T> = std::result::Result<T, TickError>;
