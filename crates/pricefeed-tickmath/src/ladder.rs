//! Binary tick ladder.
//!
//! `PRICES_X96_AT_BINARY_TICKS[i]` holds `1.0001^-(2^i) * 2^96`, truncated.
//! Any tick magnitude is a sum of powers of two, so its ratio is a product of
//! at most 18 ladder entries.

use ethnum::U256;

use crate::{Result, TickError, MAX_TICK, MIN_TICK, PRICE_SCALE};

/// 2^96.
pub const Q96: U256 = U256::from_words(0, 1 << 96);

/// 2^192 - 1, the numerator used to invert a Q96 ratio.
pub const MAX_UINT192: U256 = U256::from_words(u64::MAX as u128, u128::MAX);

const BILLION: U256 = U256::new(PRICE_SCALE as u128);

/// `1.0001^-(2^i)` in Q96 for `i` in `0..18`.
pub const PRICES_X96_AT_BINARY_TICKS: [U256; 18] = [
    U256::new(0xfff97272373d413259a46990),
    U256::new(0xfff2e50f5f656932ef12357c),
    U256::new(0xffe5caca7e10e4e61c3624ea),
    U256::new(0xffcb9843d60f6159c9db5883),
    U256::new(0xff973b41fa98c081472e6896),
    U256::new(0xff2ea16466c96a3843ec78b3),
    U256::new(0xfe5dee046a99a2a811c461f1),
    U256::new(0xfcbe86c7900a88aedcffc83b),
    U256::new(0xf987a7253ac413176f2b074c),
    U256::new(0xf3392b0822b70005940c7a39),
    U256::new(0xe7159475a2c29b7443b29c7f),
    U256::new(0xd097f3bdfd2022b8845ad8f7),
    U256::new(0xa9f746462d870fdf8a65dc1f),
    U256::new(0x70d869a156d2a1b890bb3df6),
    U256::new(0x31be135f97d08fd981231505),
    U256::new(0x09aa508b5b7a84e1c677de54),
    U256::new(0x005d6af8dedb81196699c329),
    U256::new(0x00002216e584f5fa1ea92604),
];

/// Multiply two Q96 values, keeping Q96.
fn mul_shift(value: U256, mul_by: U256) -> U256 {
    (value * mul_by) >> 96u32
}

/// Price of `tick` as `1.0001^tick * 2^96 * 1e9`.
///
/// The walk multiplies ladder entries for every set bit of `|tick|`, which
/// yields the ratio for a negative tick; positive ticks are inverted against
/// `2^192 - 1`.
///
/// # Errors
///
/// [`TickError::TickOutOfRange`] if `tick` is outside `[MIN_TICK, MAX_TICK]`.
pub fn tick_to_price_x96(tick: i64) -> Result<U256> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(TickError::TickOutOfRange);
    }

    let abs_tick = tick.unsigned_abs();

    let mut price_x96 = Q96;
    for (i, ratio) in PRICES_X96_AT_BINARY_TICKS.iter().enumerate() {
        if abs_tick & (1 << i) != 0 {
            price_x96 = mul_shift(price_x96, *ratio);
        }
    }

    if tick > 0 {
        price_x96 = MAX_UINT192 / price_x96;
    }

    Ok(price_x96 * BILLION)
}
