//! # pricefeed-core
//!
//! Deterministic kernel of the stake-weighted price oracle.
//!
//! Delegators vote power onto signals, the most powerful signals become the
//! current feed set, validators submit prices for those feeds, and one
//! consensus price per feed is recomputed every block and serialized for
//! relay to external consumers.
//!
//! All state lives behind [`store::FeedsStore`] and stake comes from
//! [`staking::StakingView`]; both are injected into a [`keeper::FeedsKeeper`]
//! per message or per block. Nothing here keeps process-wide state.
//!
//! ## Modules
//!
//! - [`scheduler`] — Power → refresh interval / deviation step functions
//! - [`selector`] — Top-N current feed selection
//! - [`ledger`] — Per-voter signal bookkeeping and power deltas
//! - [`submission`] — Price submission gate (skew, membership, cooldown)
//! - [`median`] — Power- and recency-weighted median
//! - [`pricing`] — Quorum, freshness and miss-report rules around the median
//! - [`relay`] — ABI relay payload encoding
//! - [`store`] — Storage interface and in-memory store
//! - [`staking`] — Read-only view of stake and oracle status
//! - [`stub`] — Fixed stake table for tests and simulation
//! - [`query`] — Read-only queries over feeds state
//! - [`keeper`] — Message and block entry points

pub mod keeper;
pub mod ledger;
pub mod median;
pub mod pricing;
pub mod query;
pub mod relay;
pub mod scheduler;
pub mod selector;
pub mod staking;
pub mod store;
pub mod stub;
pub mod submission;

pub use keeper::{BlockContext, FeedsKeeper, PriceRecalculation};
pub use query::FeedsQuery;
pub use store::{FeedsStore, MemoryStore};
pub use staking::{OracleStatus, StakingView, ValidatorInfo};
pub use stub::StubStaking;

use pricefeed_tickmath::TickError;
use pricefeed_types::TypesError;

/// Error types for feeds operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedsError {
    /// Malformed input (signal id, duplicate, power, params).
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Tick conversion failed while encoding.
    #[error("tick conversion failed: {0}")]
    Tick(#[from] TickError),

    /// Voter asked for more power than it has delegated.
    #[error("not enough delegation: {delegator} requested {requested}, has {available}")]
    NotEnoughDelegation {
        /// Voter address.
        delegator: String,
        /// Sum of requested signal powers.
        requested: i128,
        /// Delegated power available.
        available: u64,
    },

    /// Applying a vote would drive a signal's total power below zero.
    #[error("signal {signal_id} total power would become negative: {power}")]
    PowerNegative {
        /// Signal id.
        signal_id: String,
        /// Resulting total.
        power: i64,
    },

    /// Applying a vote would overflow a signal's total power.
    #[error("signal {0} total power overflow")]
    PowerOverflow(String),

    /// Submitter is not a bonded validator.
    #[error("not bonded validator: {0}")]
    NotBondedValidator(String),

    /// Validator's oracle status is inactive.
    #[error("oracle status not active: {0}")]
    OracleStatusNotActive(String),

    /// Signer is not the params admin.
    #[error("invalid signer: expected {expected}, got {got}")]
    InvalidSigner {
        /// Configured admin.
        expected: String,
        /// Actual signer.
        got: String,
    },

    /// More signal prices than there are current feeds.
    #[error("too many signal prices: got {count}, max {max}")]
    SignalPricesTooLarge {
        /// Number submitted.
        count: usize,
        /// Current feed count.
        max: usize,
    },

    /// Submission timestamp too far from block time.
    #[error("invalid timestamp {timestamp}: block time {block_time}, allowed discrepancy {max_discrepancy}")]
    InvalidTimestamp {
        /// Submitted timestamp.
        timestamp: i64,
        /// Current block time.
        block_time: i64,
        /// Allowed discrepancy in seconds.
        max_discrepancy: i64,
    },

    /// Signal is not in the current feed set.
    #[error("signal id not supported: {0}")]
    SignalIdNotSupported(String),

    /// Cooldown for (validator, signal) has not elapsed.
    #[error("price submitted too early for {signal_id}: next allowed at {next_allowed}")]
    PriceSubmitTooEarly {
        /// Signal id.
        signal_id: String,
        /// Earliest block time a new price is accepted.
        next_allowed: i64,
    },

    /// The median was asked for over an empty observation set.
    #[error("no observations to aggregate")]
    EmptyObservations,

    /// Relay request named no signal ids.
    #[error("no signal ids to encode")]
    EmptySignalIds,

    /// Relay request named too many signal ids.
    #[error("too many signal ids: got {count}, max {max}")]
    TooManySignalIds {
        /// Number requested.
        count: usize,
        /// Allowed maximum.
        max: u64,
    },
}

/// Convenience result type for feeds operations.
pub type Result<T> = std::result::Result<T, FeedsError>;
