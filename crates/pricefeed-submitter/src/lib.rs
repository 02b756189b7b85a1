//! # pricefeed-submitter
//!
//! Off-chain price submission client run by each validator.
//!
//! The client polls the chain for the current feeds and its own last
//! prices, asks a price service for fresh quotes, decides which feeds are
//! due, and pushes batches through a per-key transaction state machine.
//! Everything is driven by explicit `poll`/`step` calls against an injected
//! [`clock::Clock`], so a host can run it on a timer and tests can run it
//! against a manual clock.
//!
//! ## Modules
//!
//! - [`clock`] — Time source abstraction
//! - [`config`] — TOML-backed client configuration
//! - [`checker`] — Due-feed selection (cooldown, assigned time, deviation)
//! - [`service`] — Chain, price service and broadcaster interfaces
//! - [`tx`] — Per-batch transaction state machine
//! - [`submitter`] — Key pool, in-progress set and batch dispatch

pub mod checker;
pub mod clock;
pub mod config;
pub mod service;
pub mod submitter;
pub mod tx;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SubmitterConfig;
pub use service::{BroadcastOutcome, Broadcaster, ChainClient, PriceService, PriceTx, TxResult};
pub use submitter::{BatchOutcome, Submitter};
pub use tx::TxState;

/// Error types for the submission client.
#[derive(Debug, thiserror::Error)]
pub enum SubmitterError {
    /// Configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// The chain could not be queried.
    #[error("chain query failed: {0}")]
    Chain(String),

    /// The price service could not be queried.
    #[error("price service failed: {0}")]
    PriceService(String),

    /// A broadcast or inclusion query failed.
    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// Convenience result type for the submission client.
pub type Result<T> = std::result::Result<T, SubmitterError>;
