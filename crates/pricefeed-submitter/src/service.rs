//! Interfaces to the outside world: chain queries, price quotes and
//! transaction broadcast.

use serde::{Deserialize, Serialize};

use pricefeed_types::{CurrentFeedsWithDeviation, Params, SignalPrice, ValidatorPrice};

use crate::Result;

/// Read access to feeds state on chain.
pub trait ChainClient {
    /// Whether `validator` is currently required to submit prices.
    fn is_valid_validator(&self, validator: &str) -> Result<bool>;
    /// Current feeds parameters.
    fn params(&self) -> Result<Params>;
    /// Current feeds with their deviation tolerances.
    fn current_feeds(&self) -> Result<CurrentFeedsWithDeviation>;
    /// The validator's latest accepted prices.
    fn validator_prices(&self, validator: &str) -> Result<Vec<ValidatorPrice>>;
}

/// Source of fresh price quotes.
pub trait PriceService {
    /// Quote `signal_ids`. Unknown ids may be omitted or returned as
    /// unsupported.
    fn query(&mut self, signal_ids: &[String]) -> Result<Vec<SignalPrice>>;
}

/// A price submission message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTx {
    /// Validator the prices are submitted for.
    pub validator: String,
    /// Submission timestamp, unix seconds.
    pub timestamp: i64,
    /// Prices in the batch.
    pub signal_prices: Vec<SignalPrice>,
}

/// Immediate result of a broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Accepted into the mempool.
    Accepted {
        /// Transaction hash.
        tx_hash: String,
    },
    /// Rejected for running out of gas during simulation or check.
    OutOfGas,
    /// Rejected with a nonzero code.
    Rejected {
        /// Rejection code.
        code: u32,
        /// Raw log.
        log: String,
    },
}

/// Final result of an included transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxResult {
    /// Executed successfully.
    Success,
    /// Ran out of gas during execution.
    OutOfGas,
    /// Failed with a nonzero code.
    Failed {
        /// Failure code.
        code: u32,
        /// Raw log.
        log: String,
    },
}

/// Transaction submission.
pub trait Broadcaster {
    /// Sign with `key` and broadcast `tx` using `gas_adjustment`.
    fn broadcast(&mut self, key: &str, tx: &PriceTx, gas_adjustment: f64) -> Result<BroadcastOutcome>;
    /// Result of `tx_hash`, or `None` while it is not yet included.
    fn query_tx(&mut self, tx_hash: &str) -> Result<Option<TxResult>>;
}
