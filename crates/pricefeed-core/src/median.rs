//! Power- and recency-weighted median.
//!
//! Observations are ordered newest first (then by power) and their power is
//! poured into five consecutive sections of the total power budget. Power
//! landing in an earlier section earns a larger multiplier, so fresh prices
//! from large validators dominate without stale ones being discarded:
//!
//! | Section | Cumulative share | Multiplier |
//! |---------|------------------|------------|
//! | 1       | 1/32             | 60         |
//! | 2       | 3/32             | 40         |
//! | 3       | 7/32             | 20         |
//! | 4       | 15/32            | 11         |
//! | 5       | 32/32            | 10         |
//!
//! Each observation then contributes its price (and its price ± deviation)
//! at the earned weight, and the weighted median of those points is
//! returned. All weight arithmetic is in `u128`.

use pricefeed_types::SignalPriceStatus;

use crate::{FeedsError, Result};

/// Power is scaled by this before being poured into sections.
pub const POWER_SCALING_FACTOR: u128 = 32;

/// Cumulative section limits, in units of total power.
pub const SECTIONS: [u128; 5] = [1, 3, 7, 15, 32];

/// Weight multiplier per section.
pub const MULTIPLIERS: [u128; 5] = [60, 40, 20, 11, 10];

/// One validator's observation of a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatorPriceInfo {
    /// Reported status.
    pub status: SignalPriceStatus,
    /// Validator power.
    pub power: u64,
    /// 1e9-scaled price.
    pub price: u64,
    /// Spread added on both sides of `price`.
    pub deviation: u64,
    /// Block time the observation was accepted.
    pub timestamp: i64,
}

/// Reported power split by status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PricePowers {
    /// Power across all statuses.
    pub total: u128,
    /// Power reporting an available price.
    pub available: u128,
    /// Power reporting unavailable.
    pub unavailable: u128,
    /// Power reporting unsupported.
    pub unsupported: u128,
}

/// Sum observation power by status.
pub fn calculate_prices_powers(infos: &[ValidatorPriceInfo]) -> PricePowers {
    let mut powers = PricePowers::default();
    for info in infos {
        let power = u128::from(info.power);
        powers.total += power;
        match info.status {
            SignalPriceStatus::Available => powers.available += power,
            SignalPriceStatus::Unavailable => powers.unavailable += power,
            SignalPriceStatus::Unsupported => powers.unsupported += power,
        }
    }
    powers
}

/// A price point with its aggregation weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightedPrice {
    /// Weight.
    pub weight: u128,
    /// Price.
    pub price: u64,
}

/// Weighted median of the available observations in `infos`.
///
/// Non-available observations are ignored.
///
/// # Errors
///
/// [`FeedsError::EmptyObservations`] if no observation is available or the
/// available power is zero.
pub fn median_validator_price_infos(infos: &[ValidatorPriceInfo]) -> Result<u64> {
    let mut available: Vec<ValidatorPriceInfo> = infos
        .iter()
        .filter(|info| info.status == SignalPriceStatus::Available)
        .copied()
        .collect();

    let total_power: u128 = available.iter().map(|info| u128::from(info.power)).sum();
    if total_power == 0 {
        return Err(FeedsError::EmptyObservations);
    }

    // Stable: observations with equal (timestamp, power) keep input order.
    available.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.power.cmp(&a.power))
    });

    let weights = section_weights(&available, total_power);
    let mut points = Vec::with_capacity(available.len() * 3);
    for (info, weight) in available.iter().zip(weights) {
        points.push(WeightedPrice {
            weight,
            price: info.price,
        });
        points.push(WeightedPrice {
            weight,
            price: info.price.saturating_sub(info.deviation),
        });
        points.push(WeightedPrice {
            weight,
            price: info.price.saturating_add(info.deviation),
        });
    }

    median_weighted_price(points)
}

/// Pour each observation's scaled power into the sections, in order.
///
/// `sorted` must already be in aggregation order and sum to `total_power`.
fn section_weights(sorted: &[ValidatorPriceInfo], total_power: u128) -> Vec<u128> {
    let limits = SECTIONS.map(|s| s * total_power);
    let mut section = 0usize;
    let mut filled: u128 = 0;
    let mut weights = Vec::with_capacity(sorted.len());

    for info in sorted {
        let mut left = u128::from(info.power) * POWER_SCALING_FACTOR;
        let mut weight: u128 = 0;

        while section < SECTIONS.len() {
            let room = limits[section] - filled;
            let take = left.min(room);
            weight += take * MULTIPLIERS[section];
            filled += take;
            left -= take;
            if filled == limits[section] {
                section += 1;
            }
            if left == 0 {
                break;
            }
        }
        weights.push(weight);
    }
    weights
}

/// First price at which cumulative weight reaches half the total.
///
/// Points are ordered by price ascending, then weight ascending.
///
/// # Errors
///
/// [`FeedsError::EmptyObservations`] if `points` is empty.
pub fn median_weighted_price(mut points: Vec<WeightedPrice>) -> Result<u64> {
    points.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.weight.cmp(&b.weight)));

    let total: u128 = points.iter().map(|p| p.weight).sum();
    let mut cumulative: u128 = 0;
    for point in &points {
        cumulative += point.weight;
        if cumulative * 2 >= total {
            return Ok(point.price);
        }
    }
    Err(FeedsError::EmptyObservations)
}
