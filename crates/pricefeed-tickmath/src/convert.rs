//! Price ↔ tick conversions.
//!
//! `tick_to_price` rounds up, matching the UniswapV3 convention, so that
//! `price_to_tick(tick_to_price(t))` lands back on `t` wherever adjacent
//! ticks map to distinct integer prices.
//!
//! `price_to_tick` estimates the tick from an integer binary logarithm and
//! then settles the answer by re-deriving the exact ladder price of the
//! candidates. The returned tick is offset by [`OFFSET`] so it is always
//! positive.

use ethnum::U256;

use crate::ladder::{tick_to_price_x96, Q96};
use crate::{Result, TickError, MAX_TICK, MIN_TICK, OFFSET};

/// `log2(1e9) * 2^16`, truncated.
const LOG2_PRICE_SCALE_X16: i64 = 1_959_352;

/// `2^32 / (log2(1.0001) * 2^16)`: converts a Q16 log2 into Q32 ticks.
const INV_LOG2_1P0001_X16: i64 = 454_283_648;

/// Fractional bits extracted from the iterative log2.
const LOG2_FRACTION_BITS: u32 = 16;

/// Convert a signed tick into a 1e9-scaled price, rounded up.
///
/// # Errors
///
/// - [`TickError::TickOutOfRange`] if `tick` is outside `[MIN_TICK, MAX_TICK]`
/// - [`TickError::PriceOutOfRange`] if the price rounds to 0 or exceeds `u64::MAX`
///
/// # Examples
///
/// ```
/// use pricefeed_tickmath::tick_to_price;
///
/// assert_eq!(tick_to_price(0).unwrap(), 1_000_000_000);
/// assert_eq!(tick_to_price(1).unwrap(), 1_000_100_000);
/// assert_eq!(tick_to_price(-1).unwrap(), 999_900_010);
/// ```
pub fn tick_to_price(tick: i64) -> Result<u64> {
    let price_x96 = tick_to_price_x96(tick)?;

    let mut price = price_x96 >> 96u32;
    if price == U256::ZERO {
        return Err(TickError::PriceOutOfRange);
    }

    // Only round up when the next tick is at least one unit away; otherwise
    // the rounded price would already belong to the next tick.
    if price_x96 % Q96 > U256::ZERO {
        let next_tick_x96 = price_x96 * U256::new(10_001) / U256::new(10_000);
        if (next_tick_x96 >> 96u32) > price {
            price += U256::ONE;
        }
    }

    let (high, low) = price.into_words();
    if high != 0 || low > u64::MAX as u128 {
        return Err(TickError::PriceOutOfRange);
    }
    Ok(low as u64)
}

/// Convert a 1e9-scaled price into the greatest offset tick whose price is
/// less than or equal to `price`.
///
/// The result lies in `[1, 2 * OFFSET - 1]`.
///
/// # Errors
///
/// - [`TickError::ZeroPrice`] if `price` is 0
/// - [`TickError::TickOutOfRange`] if the estimated tick leaves the ladder
///
/// # Examples
///
/// ```
/// use pricefeed_tickmath::price_to_tick;
///
/// assert_eq!(price_to_tick(1_000_000_000).unwrap(), 262_144);
/// assert_eq!(price_to_tick(10_000_000_000).unwrap(), 285_171);
/// ```
pub fn price_to_tick(price: u64) -> Result<u64> {
    if price == 0 {
        return Err(TickError::ZeroPrice);
    }

    let tick = estimate_tick(price);
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(TickError::TickOutOfRange);
    }

    // The estimate undershoots by at most one tick, so check tick + 1 first.
    let target_x96 = U256::new(price as u128) * Q96;
    for candidate in [tick + 1, tick] {
        if let Ok(candidate_x96) = tick_to_price_x96(candidate) {
            if candidate_x96 <= target_x96 {
                return Ok((candidate + OFFSET) as u64);
            }
        }
    }

    Ok((tick - 1 + OFFSET) as u64)
}

/// Approximate signed tick of `price` from a Q16 binary logarithm.
fn estimate_tick(price: u64) -> i64 {
    let msb = 63 - price.leading_zeros();

    // Normalize the mantissa into [2^31, 2^32).
    let mut r = if msb >= 32 {
        price >> (msb - 31)
    } else {
        price << (31 - msb)
    };

    let mut log2 = (msb as i64) << LOG2_FRACTION_BITS;
    for i in 0..LOG2_FRACTION_BITS {
        r = (r * r) >> 31;
        let f = r >> 32;
        log2 |= (f as i64) << (LOG2_FRACTION_BITS - 1 - i);
        r >>= f;
    }

    ((log2 - LOG2_PRICE_SCALE_X16) * INV_LOG2_1P0001_X16) >> 32
}
