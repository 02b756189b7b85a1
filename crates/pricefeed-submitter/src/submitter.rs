//! Batch dispatch.
//!
//! [`Submitter::poll`] collects due prices into a batch and marks their ids
//! in progress. [`Submitter::step`] hands queued batches to idle keys and
//! advances every in-flight batch by one transition. When a batch ends, its
//! key returns to the idle pool and its ids leave the in-progress set.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, info, warn};

use pricefeed_types::SignalPrice;

use crate::checker::{ChainSnapshot, Checker};
use crate::clock::Clock;
use crate::config::SubmitterConfig;
use crate::service::{Broadcaster, ChainClient, PriceService};
use crate::tx::{InFlight, RetryPolicy, TxState};
use crate::Result;

/// How a batch ended.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOutcome {
    /// Batch id.
    pub id: u64,
    /// Key that signed it.
    pub key: String,
    /// Signal ids in the batch.
    pub signal_ids: Vec<String>,
    /// Terminal state.
    pub state: TxState,
}

/// The submission client.
pub struct Submitter<C: Clock> {
    config: SubmitterConfig,
    clock: C,
    checker: Checker,
    policy: RetryPolicy,
    idle_keys: VecDeque<String>,
    in_progress: BTreeSet<String>,
    queued: VecDeque<Vec<SignalPrice>>,
    in_flight: Vec<InFlight>,
    next_id: u64,
}

impl<C: Clock> Submitter<C> {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Any error from [`SubmitterConfig::validate`].
    pub fn new(config: SubmitterConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let policy = RetryPolicy {
            max_try: config.max_try,
            broadcast_timeout: config.broadcast_timeout_secs,
            gas_adjust_start: config.gas_adjust_start,
            gas_adjust_step: config.gas_adjust_step,
        };
        Ok(Self {
            checker: Checker::new(&config),
            idle_keys: config.keys.iter().cloned().collect(),
            config,
            clock,
            policy,
            in_progress: BTreeSet::new(),
            queued: VecDeque::new(),
            in_flight: Vec::new(),
            next_id: 0,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Signal ids queued or in flight.
    pub fn in_progress(&self) -> &BTreeSet<String> {
        &self.in_progress
    }

    /// Keys with no batch in flight.
    pub fn idle_key_count(&self) -> usize {
        self.idle_keys.len()
    }

    /// Batches waiting for a key.
    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    /// Batches bound to a key.
    pub fn in_flight(&self) -> &[InFlight] {
        &self.in_flight
    }

    /// Query chain and prices, and queue one batch of due prices.
    ///
    /// Returns the number of prices queued.
    ///
    /// # Errors
    ///
    /// [`crate::SubmitterError::Chain`] or [`crate::SubmitterError::PriceService`]
    /// from the collaborators. Nothing is queued on error.
    pub fn poll<Q, P>(&mut self, chain: &Q, prices: &mut P) -> Result<usize>
    where
        Q: ChainClient + ?Sized,
        P: PriceService + ?Sized,
    {
        let validator = self.config.validator.clone();
        if !chain.is_valid_validator(&validator)? {
            info!(validator = %validator, "validator is not required to feed prices");
            return Ok(0);
        }

        let snapshot = ChainSnapshot {
            params: chain.params()?,
            feeds: chain.current_feeds()?,
            validator_prices: chain.validator_prices(&validator)?,
        };

        let ids = self.checker.candidate_ids(&snapshot, &self.in_progress);
        if ids.is_empty() {
            debug!("no signal ids to process");
            return Ok(0);
        }

        let quotes = prices.query(&ids)?;
        let due = self
            .checker
            .due_prices(&snapshot, quotes, &self.in_progress, self.clock.now());
        if due.is_empty() {
            debug!("no prices to submit");
            return Ok(0);
        }

        for p in &due {
            if !self.in_progress.insert(p.signal_id.clone()) {
                warn!(signal_id = %p.signal_id, "signal already in progress");
            }
        }
        let count = due.len();
        info!(count, "queued prices for submission");
        self.queued.push_back(due);
        Ok(count)
    }

    /// Dispatch queued batches and advance every in-flight batch once.
    ///
    /// Returns the batches that finished in this step.
    pub fn step<B: Broadcaster + ?Sized>(&mut self, broadcaster: &mut B) -> Vec<BatchOutcome> {
        while !self.queued.is_empty() {
            let Some(key) = self.idle_keys.pop_front() else {
                break;
            };
            let Some(prices) = self.queued.pop_front() else {
                self.idle_keys.push_front(key);
                break;
            };
            self.next_id += 1;
            debug!(batch = self.next_id, key = %key, "batch bound to key");
            self.in_flight
                .push(InFlight::new(self.next_id, key, prices, &self.policy));
        }

        let now = self.clock.now();
        for batch in &mut self.in_flight {
            batch.advance(broadcaster, &self.policy, &self.config.validator, now);
        }

        let (done, active): (Vec<InFlight>, Vec<InFlight>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|b| b.state().is_terminal());
        self.in_flight = active;

        done.into_iter()
            .map(|batch| {
                let signal_ids: Vec<String> = batch.signal_ids().map(str::to_string).collect();
                for id in &signal_ids {
                    self.in_progress.remove(id);
                }
                self.idle_keys.push_back(batch.key.clone());
                BatchOutcome {
                    id: batch.id,
                    key: batch.key.clone(),
                    signal_ids,
                    state: batch.state().clone(),
                }
            })
            .collect()
    }
}
