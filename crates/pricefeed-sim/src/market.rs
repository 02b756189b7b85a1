//! Simulated price sources.
//!
//! [`Market`] holds one reference price per signal and moves it by a bounded
//! random step each block. Every validator quotes through its own
//! [`Quotes`], which adds a small per-validator spread so submissions differ
//! the way independent sources do.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pricefeed_submitter::{PriceService, Result};
use pricefeed_types::{SignalPrice, SignalPriceStatus, BASIS_POINT_DENOMINATOR};

use crate::scenario::SignalSpec;

#[derive(Debug, Clone)]
struct Asset {
    price: u64,
    volatility_bp: u64,
    status: SignalPriceStatus,
}

/// Reference prices for every simulated signal.
#[derive(Debug)]
pub struct Market {
    rng: StdRng,
    assets: BTreeMap<String, Asset>,
}

impl Market {
    /// Open the market at each signal's base price.
    pub fn new(signals: &[SignalSpec], seed: u64) -> Self {
        let assets = signals
            .iter()
            .map(|s| {
                (
                    s.id.clone(),
                    Asset {
                        price: s.base_price,
                        volatility_bp: s.volatility_bp,
                        status: s.status,
                    },
                )
            })
            .collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            assets,
        }
    }

    /// Move every available price by up to its volatility.
    pub fn tick(&mut self) {
        for asset in self.assets.values_mut() {
            if asset.status != SignalPriceStatus::Available {
                continue;
            }
            asset.price = nudge(&mut self.rng, asset.price, asset.volatility_bp);
        }
    }

    /// Reference price of `signal_id`, if it is available.
    pub fn price(&self, signal_id: &str) -> Option<u64> {
        self.assets
            .get(signal_id)
            .filter(|a| a.status == SignalPriceStatus::Available)
            .map(|a| a.price)
    }

    fn quote(&self, rng: &mut StdRng, signal_id: &str, noise_bp: u64) -> SignalPrice {
        match self.assets.get(signal_id) {
            None => SignalPrice::without_price(signal_id, SignalPriceStatus::Unsupported),
            Some(a) if a.status != SignalPriceStatus::Available => {
                SignalPrice::without_price(signal_id, a.status)
            }
            Some(a) => SignalPrice::available(signal_id, nudge(rng, a.price, noise_bp)),
        }
    }
}

/// Move `price` by a uniform step in `[-bp, +bp]` basis points, never below 1.
fn nudge(rng: &mut StdRng, price: u64, bp: u64) -> u64 {
    if bp == 0 {
        return price;
    }
    let bp = i128::from(bp.min(BASIS_POINT_DENOMINATOR));
    let step: i128 = rng.gen_range(-bp..=bp);
    let delta = i128::from(price) * step / i128::from(BASIS_POINT_DENOMINATOR);
    let moved = (i128::from(price) + delta).max(1);
    u64::try_from(moved).unwrap_or(u64::MAX)
}

/// One validator's price source.
pub struct Quotes<'a> {
    market: &'a Market,
    rng: &'a mut StdRng,
    noise_bp: u64,
}

impl<'a> Quotes<'a> {
    /// Quote from `market` with a spread of up to `noise_bp`.
    pub fn new(market: &'a Market, rng: &'a mut StdRng, noise_bp: u64) -> Self {
        Self {
            market,
            rng,
            noise_bp,
        }
    }
}

impl PriceService for Quotes<'_> {
    fn query(&mut self, signal_ids: &[String]) -> Result<Vec<SignalPrice>> {
        Ok(signal_ids
            .iter()
            .map(|id| self.market.quote(self.rng, id, self.noise_bp))
            .collect())
    }
}
