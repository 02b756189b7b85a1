//! Relay payload encoding.
//!
//! A payload is a 4-byte encoder prefix followed by the ABI encoding of
//! `(tuple(bytes32 signalId, uint64 price)[] prices, int64 timestamp)`:
//!
//! ```text
//! prefix(4) | 0x40 | timestamp | len | (signalId | price) * len
//! ```
//!
//! Every word is 32 bytes big-endian. Signal ids are right-aligned in their
//! word and the timestamp is sign-extended.

use pricefeed_tickmath::price_to_tick;
use pricefeed_types::signal::signal_id_to_bytes32;
use pricefeed_types::{Encoder, Price};

use crate::Result;

const WORD: usize = 32;

/// One relay entry: padded signal id and encoded price.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayPrice {
    /// Signal id, left zero-padded to 32 bytes.
    pub signal_id: [u8; 32],
    /// Fixed-point price or offset tick.
    pub price: u64,
}

/// Relay entries carrying 1e9-scaled prices.
///
/// # Errors
///
/// Fails if any signal id does not fit in 32 bytes.
pub fn to_relay_prices(prices: &[Price]) -> Result<Vec<RelayPrice>> {
    prices
        .iter()
        .map(|p| {
            Ok(RelayPrice {
                signal_id: signal_id_to_bytes32(&p.signal_id)?,
                price: p.price,
            })
        })
        .collect()
}

/// Relay entries carrying offset ticks.
///
/// A zero price stays 0; any other price is converted with
/// [`price_to_tick`].
///
/// # Errors
///
/// Fails on an oversized signal id or a price outside the tick range. The
/// whole batch is rejected; no entry is dropped.
pub fn to_relay_tick_prices(prices: &[Price]) -> Result<Vec<RelayPrice>> {
    prices
        .iter()
        .map(|p| {
            let tick = if p.price == 0 { 0 } else { price_to_tick(p.price)? };
            Ok(RelayPrice {
                signal_id: signal_id_to_bytes32(&p.signal_id)?,
                price: tick,
            })
        })
        .collect()
}

/// Encode `prices` for relay at `timestamp`.
///
/// # Errors
///
/// Any error from [`to_relay_prices`] or [`to_relay_tick_prices`].
pub fn encode_relay(prices: &[Price], timestamp: i64, encoder: Encoder) -> Result<Vec<u8>> {
    let relay_prices = match encoder {
        Encoder::FixedPoint => to_relay_prices(prices)?,
        Encoder::Tick => to_relay_tick_prices(prices)?,
    };

    let mut out = Vec::with_capacity(4 + WORD * (3 + 2 * relay_prices.len()));
    out.extend_from_slice(&encoder.prefix());
    encode_abi(&mut out, &relay_prices, timestamp);
    Ok(out)
}

fn encode_abi(out: &mut Vec<u8>, prices: &[RelayPrice], timestamp: i64) {
    out.extend_from_slice(&uint_word(2 * WORD as u64));
    out.extend_from_slice(&int_word(timestamp));
    out.extend_from_slice(&uint_word(prices.len() as u64));
    for p in prices {
        out.extend_from_slice(&p.signal_id);
        out.extend_from_slice(&uint_word(p.price));
    }
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn int_word(value: i64) -> [u8; WORD] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}
