//! Submitted, stored and aggregated prices.

use serde::{Deserialize, Serialize};

use crate::signal::validate_signal_id;
use crate::{Result, TypesError};

/// Status a validator attaches to each submitted price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPriceStatus {
    /// The validator's price source does not know the signal.
    Unsupported,
    /// The signal is known but no price could be fetched.
    Unavailable,
    /// A price is attached.
    Available,
}

/// One entry of a validator's price submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPrice {
    /// Signal id.
    pub signal_id: String,
    /// Submission status.
    pub status: SignalPriceStatus,
    /// 1e9-scaled price; must be 0 unless `status` is `Available`.
    pub price: u64,
}

impl SignalPrice {
    /// An available price.
    pub fn available(signal_id: impl Into<String>, price: u64) -> Self {
        Self {
            signal_id: signal_id.into(),
            status: SignalPriceStatus::Available,
            price,
        }
    }

    /// A price with a non-available status (price 0).
    pub fn without_price(signal_id: impl Into<String>, status: SignalPriceStatus) -> Self {
        Self {
            signal_id: signal_id.into(),
            status,
            price: 0,
        }
    }

    /// Validate id format and status/price consistency.
    ///
    /// # Errors
    ///
    /// - any error from [`validate_signal_id`]
    /// - [`TypesError::InvalidSignalPrice`] if a non-available entry has a price
    pub fn validate(&self) -> Result<()> {
        validate_signal_id(&self.signal_id)?;
        if self.status != SignalPriceStatus::Available && self.price != 0 {
            return Err(TypesError::InvalidSignalPrice {
                signal_id: self.signal_id.clone(),
                status: self.status,
                price: self.price,
            });
        }
        Ok(())
    }
}

/// A validator's latest accepted price for one signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPrice {
    /// Validator address.
    pub validator: String,
    /// Signal id.
    pub signal_id: String,
    /// Submission status.
    pub status: SignalPriceStatus,
    /// 1e9-scaled price.
    pub price: u64,
    /// Block time at acceptance.
    pub timestamp: i64,
    /// Block height at acceptance.
    pub block_height: i64,
}

/// Status of an aggregated price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    /// Most reporting power does not recognise the signal.
    UnknownSignalId,
    /// Not enough power reported an available price.
    NotReady,
    /// A consensus price was computed.
    Available,
    /// The signal is not in the current feed set.
    NotInCurrentFeeds,
}

/// The consensus price of one signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Signal id.
    pub signal_id: String,
    /// Aggregation status.
    pub status: PriceStatus,
    /// 1e9-scaled price, 0 unless `status` is `Available`.
    pub price: u64,
    /// Block time of the computation.
    pub timestamp: i64,
}

impl Price {
    /// Create a price.
    pub fn new(signal_id: impl Into<String>, status: PriceStatus, price: u64, timestamp: i64) -> Self {
        Self {
            signal_id: signal_id.into(),
            status,
            price,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_price_validates() {
        SignalPrice::available("CS:BTC-USD", 60_000_000_000_000)
            .validate()
            .expect("available price");
    }

    #[test]
    fn test_unavailable_with_price_rejected() {
        let mut sp = SignalPrice::without_price("CS:BTC-USD", SignalPriceStatus::Unavailable);
        sp.validate().expect("zero price is fine");
        sp.price = 1;
        assert!(matches!(
            sp.validate(),
            Err(TypesError::InvalidSignalPrice { price: 1, .. })
        ));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&PriceStatus::NotInCurrentFeeds).expect("serialize");
        assert_eq!(json, "\"not_in_current_feeds\"");
        let status: SignalPriceStatus = serde_json::from_str("\"unsupported\"").expect("parse");
        assert_eq!(status, SignalPriceStatus::Unsupported);
    }
}
