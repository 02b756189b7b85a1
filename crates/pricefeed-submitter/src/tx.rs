//! Per-batch transaction state machine.
//!
//! ```text
//! Signing ─▶ Broadcasting ─▶ AwaitingInclusion ─▶ Confirmed
//!                ▲   │              │
//!                │   ▼              ▼
//!             OutOfGasRetry ◀───────┘
//!
//! Broadcasting ─(max_try reached)─▶ Failed
//! AwaitingInclusion ─(timeout)────▶ Failed
//! ```
//!
//! Each [`InFlight::advance`] call performs at most one transition.

use tracing::{debug, error, info, warn};

use pricefeed_types::SignalPrice;

use crate::service::{BroadcastOutcome, Broadcaster, PriceTx, TxResult};

/// State of one batch.
#[derive(Clone, Debug, PartialEq)]
pub enum TxState {
    /// Waiting to build the message.
    Signing,
    /// Ready to (re)broadcast.
    Broadcasting,
    /// Broadcast accepted, waiting for a block to include it.
    AwaitingInclusion {
        /// Transaction hash.
        tx_hash: String,
        /// Time the broadcast was accepted.
        since: i64,
    },
    /// Out of gas; the next broadcast uses a larger gas adjustment.
    OutOfGasRetry,
    /// Given up.
    Failed {
        /// Why.
        reason: String,
    },
    /// Included and executed successfully.
    Confirmed {
        /// Transaction hash.
        tx_hash: String,
    },
}

impl TxState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Confirmed { .. })
    }
}

/// Retry policy for a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum broadcasts.
    pub max_try: u32,
    /// Seconds to wait for inclusion.
    pub broadcast_timeout: i64,
    /// Initial gas adjustment.
    pub gas_adjust_start: f64,
    /// Gas adjustment increment.
    pub gas_adjust_step: f64,
}

/// A batch bound to a signing key.
#[derive(Clone, Debug)]
pub struct InFlight {
    /// Batch id, unique per submitter.
    pub id: u64,
    /// Signing key.
    pub key: String,
    /// Prices in the batch.
    pub signal_prices: Vec<SignalPrice>,
    state: TxState,
    tx: Option<PriceTx>,
    attempts: u32,
    gas_adjustment: f64,
}

impl InFlight {
    /// A new batch in [`TxState::Signing`].
    pub fn new(id: u64, key: String, signal_prices: Vec<SignalPrice>, policy: &RetryPolicy) -> Self {
        Self {
            id,
            key,
            signal_prices,
            state: TxState::Signing,
            tx: None,
            attempts: 0,
            gas_adjustment: policy.gas_adjust_start,
        }
    }

    /// Current state.
    pub fn state(&self) -> &TxState {
        &self.state
    }

    /// Broadcasts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Gas adjustment the next broadcast uses.
    pub fn gas_adjustment(&self) -> f64 {
        self.gas_adjustment
    }

    /// Signal ids in the batch.
    pub fn signal_ids(&self) -> impl Iterator<Item = &str> {
        self.signal_prices.iter().map(|p| p.signal_id.as_str())
    }

    /// Perform one transition.
    pub fn advance<B: Broadcaster + ?Sized>(
        &mut self,
        broadcaster: &mut B,
        policy: &RetryPolicy,
        validator: &str,
        now: i64,
    ) -> &TxState {
        let next = match std::mem::replace(&mut self.state, TxState::Signing) {
            TxState::Signing => {
                self.tx = Some(PriceTx {
                    validator: validator.to_string(),
                    timestamp: now,
                    signal_prices: self.signal_prices.clone(),
                });
                TxState::Broadcasting
            }
            TxState::Broadcasting => self.broadcast(broadcaster, policy, now),
            TxState::OutOfGasRetry => {
                self.gas_adjustment += policy.gas_adjust_step;
                info!(
                    batch = self.id,
                    gas_adjustment = self.gas_adjustment,
                    "out of gas, retrying with increased gas adjustment"
                );
                TxState::Broadcasting
            }
            TxState::AwaitingInclusion { tx_hash, since } => {
                self.await_inclusion(broadcaster, policy, tx_hash, since, now)
            }
            terminal @ (TxState::Failed { .. } | TxState::Confirmed { .. }) => terminal,
        };
        self.state = next;
        &self.state
    }

    fn broadcast<B: Broadcaster + ?Sized>(
        &mut self,
        broadcaster: &mut B,
        policy: &RetryPolicy,
        now: i64,
    ) -> TxState {
        if self.attempts >= policy.max_try {
            error!(batch = self.id, attempts = self.attempts, "failed to submit prices");
            return TxState::Failed {
                reason: format!("gave up after {} broadcasts", self.attempts),
            };
        }
        let Some(tx) = self.tx.as_ref() else {
            return TxState::Signing;
        };

        self.attempts += 1;
        match broadcaster.broadcast(&self.key, tx, self.gas_adjustment) {
            Ok(BroadcastOutcome::Accepted { tx_hash }) => {
                debug!(batch = self.id, tx_hash = %tx_hash, "broadcast accepted");
                TxState::AwaitingInclusion { tx_hash, since: now }
            }
            Ok(BroadcastOutcome::OutOfGas) => TxState::OutOfGasRetry,
            Ok(BroadcastOutcome::Rejected { code, log }) => {
                warn!(batch = self.id, code, log = %log, "broadcast rejected");
                TxState::Broadcasting
            }
            Err(e) => {
                warn!(batch = self.id, error = %e, "broadcast failed");
                TxState::Broadcasting
            }
        }
    }

    fn await_inclusion<B: Broadcaster + ?Sized>(
        &mut self,
        broadcaster: &mut B,
        policy: &RetryPolicy,
        tx_hash: String,
        since: i64,
        now: i64,
    ) -> TxState {
        match broadcaster.query_tx(&tx_hash) {
            Ok(Some(TxResult::Success)) => {
                info!(batch = self.id, tx_hash = %tx_hash, "prices submitted");
                TxState::Confirmed { tx_hash }
            }
            Ok(Some(TxResult::OutOfGas)) => TxState::OutOfGasRetry,
            Ok(Some(TxResult::Failed { code, log })) => {
                warn!(batch = self.id, tx_hash = %tx_hash, code, log = %log, "transaction failed");
                TxState::Broadcasting
            }
            Ok(None) | Err(_) if now.saturating_sub(since) >= policy.broadcast_timeout => {
                error!(batch = self.id, tx_hash = %tx_hash, "timed out waiting for inclusion");
                TxState::Failed {
                    reason: format!("tx {tx_hash} not included within {}s", policy.broadcast_timeout),
                }
            }
            Ok(None) | Err(_) => TxState::AwaitingInclusion { tx_hash, since },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubmitterError;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedBroadcaster {
        broadcasts: VecDeque<crate::Result<BroadcastOutcome>>,
        results: VecDeque<Option<TxResult>>,
        gas_seen: Vec<f64>,
    }

    impl Broadcaster for ScriptedBroadcaster {
        fn broadcast(
            &mut self,
            _key: &str,
            _tx: &PriceTx,
            gas_adjustment: f64,
        ) -> crate::Result<BroadcastOutcome> {
            self.gas_seen.push(gas_adjustment);
            self.broadcasts
                .pop_front()
                .unwrap_or(Ok(BroadcastOutcome::Accepted {
                    tx_hash: "HASH".to_string(),
                }))
        }

        fn query_tx(&mut self, _tx_hash: &str) -> crate::Result<Option<TxResult>> {
            Ok(self.results.pop_front().unwrap_or(None))
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_try: 3,
            broadcast_timeout: 60,
            gas_adjust_start: 2.0,
            gas_adjust_step: 0.5,
        }
    }

    fn batch() -> InFlight {
        InFlight::new(1, "k1".to_string(), vec![SignalPrice::available("A", 1)], &policy())
    }

    fn run(tx: &mut InFlight, b: &mut ScriptedBroadcaster, steps: usize, now: i64) {
        for _ in 0..steps {
            tx.advance(b, &policy(), "val1", now);
        }
    }

    #[test]
    fn test_happy_path() {
        let mut b = ScriptedBroadcaster::default();
        b.results.push_back(Some(TxResult::Success));
        let mut tx = batch();

        assert_eq!(tx.advance(&mut b, &policy(), "val1", 10), &TxState::Broadcasting);
        assert!(matches!(
            tx.advance(&mut b, &policy(), "val1", 10),
            TxState::AwaitingInclusion { since: 10, .. }
        ));
        assert_eq!(
            tx.advance(&mut b, &policy(), "val1", 13),
            &TxState::Confirmed {
                tx_hash: "HASH".to_string()
            }
        );
        assert!(tx.state().is_terminal());
        assert_eq!(tx.attempts(), 1);
    }

    #[test]
    fn test_out_of_gas_raises_adjustment() {
        let mut b = ScriptedBroadcaster::default();
        b.broadcasts.push_back(Ok(BroadcastOutcome::OutOfGas));
        b.results.push_back(Some(TxResult::Success));
        let mut tx = batch();

        run(&mut tx, &mut b, 2, 0);
        assert_eq!(tx.state(), &TxState::OutOfGasRetry);
        run(&mut tx, &mut b, 1, 0);
        assert_eq!(tx.state(), &TxState::Broadcasting);
        assert!((tx.gas_adjustment() - 2.5).abs() < 1e-9);
        run(&mut tx, &mut b, 2, 0);
        assert!(matches!(tx.state(), TxState::Confirmed { .. }));
        assert_eq!(b.gas_seen, vec![2.0, 2.5]);
    }

    #[test]
    fn test_execution_out_of_gas_retries() {
        let mut b = ScriptedBroadcaster::default();
        b.results.push_back(Some(TxResult::OutOfGas));
        b.results.push_back(Some(TxResult::Success));
        let mut tx = batch();

        run(&mut tx, &mut b, 3, 0);
        assert_eq!(tx.state(), &TxState::OutOfGasRetry);
        run(&mut tx, &mut b, 3, 0);
        assert!(matches!(tx.state(), TxState::Confirmed { .. }));
        assert_eq!(tx.attempts(), 2);
    }

    #[test]
    fn test_fails_after_max_try() {
        let mut b = ScriptedBroadcaster::default();
        for _ in 0..3 {
            b.broadcasts.push_back(Err(SubmitterError::Broadcast("down".to_string())));
        }
        let mut tx = batch();

        run(&mut tx, &mut b, 4, 0);
        assert_eq!(tx.attempts(), 3);
        assert_eq!(tx.state(), &TxState::Broadcasting);
        run(&mut tx, &mut b, 1, 0);
        assert!(matches!(tx.state(), TxState::Failed { .. }));
    }

    #[test]
    fn test_rejected_rebroadcasts() {
        let mut b = ScriptedBroadcaster::default();
        b.broadcasts.push_back(Ok(BroadcastOutcome::Rejected {
            code: 5,
            log: "insufficient funds".to_string(),
        }));
        b.results.push_back(Some(TxResult::Success));
        let mut tx = batch();

        run(&mut tx, &mut b, 2, 0);
        assert_eq!(tx.state(), &TxState::Broadcasting);
        run(&mut tx, &mut b, 2, 0);
        assert!(matches!(tx.state(), TxState::Confirmed { .. }));
    }

    #[test]
    fn test_inclusion_timeout() {
        let mut b = ScriptedBroadcaster::default();
        let mut tx = batch();

        run(&mut tx, &mut b, 2, 100);
        run(&mut tx, &mut b, 1, 159);
        assert!(matches!(tx.state(), TxState::AwaitingInclusion { .. }));
        run(&mut tx, &mut b, 1, 160);
        assert!(matches!(tx.state(), TxState::Failed { .. }));
    }

    #[test]
    fn test_message_stamped_at_signing() {
        let mut b = ScriptedBroadcaster::default();
        let mut tx = batch();
        tx.advance(&mut b, &policy(), "val1", 42);
        assert_eq!(tx.tx.as_ref().map(|t| t.timestamp), Some(42));
        assert_eq!(tx.tx.as_ref().map(|t| t.validator.as_str()), Some("val1"));
    }
}
