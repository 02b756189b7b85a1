//! Integration test: submission client against the keeper.
//!
//! A single-validator chain runs the real keeper over a `MemoryStore`.
//! The submitter polls it, broadcasts into a mempool, and confirms once the
//! block that executes its transaction is produced. Time only moves with
//! the blocks.

use std::collections::BTreeMap;

use pricefeed_core::{
    BlockContext, FeedsKeeper, FeedsQuery, MemoryStore, OracleStatus, StubStaking,
};
use pricefeed_submitter::{
    BatchOutcome, BroadcastOutcome, Broadcaster, ChainClient, ManualClock, PriceService, PriceTx,
    Result, Submitter, SubmitterConfig, TxResult, TxState,
};
use pricefeed_types::{
    CurrentFeedsWithDeviation, Params, PriceStatus, Signal, SignalPrice, ValidatorPrice,
};

const STEP: i64 = 1_000_000_000;
const BTC: &str = "CS:BTC-USD";
const BLOCK_TIME: i64 = 3;

struct LocalChain {
    store: MemoryStore,
    staking: StubStaking,
    ctx: BlockContext,
    min_gas: f64,
    mempool: Vec<(String, PriceTx)>,
    results: BTreeMap<String, TxResult>,
    rejected: usize,
}

impl LocalChain {
    fn new(min_gas: f64) -> Self {
        let staking = StubStaking::new()
            .with_delegation("alice", 10 * STEP as u64)
            .with_validator("val1", 1000, 0);
        let mut store = MemoryStore::with_params(Params {
            admin: "admin".to_string(),
            current_feeds_update_interval: 10_000,
            ..Params::default()
        });
        let ctx = BlockContext::new(1000, 1);
        {
            let mut keeper = FeedsKeeper::new(&mut store, &staking, ctx);
            keeper
                .vote("alice", vec![Signal::new(BTC, 10 * STEP)])
                .expect("genesis vote");
            keeper.recalculate_current_feeds();
        }
        Self {
            store,
            staking,
            ctx,
            min_gas,
            mempool: Vec::new(),
            results: BTreeMap::new(),
            rejected: 0,
        }
    }

    fn query(&self) -> FeedsQuery<'_, MemoryStore, StubStaking> {
        FeedsQuery::new(&self.store, &self.staking, self.ctx)
    }

    fn produce_block(&mut self) {
        let mut keeper = FeedsKeeper::new(&mut self.store, &self.staking, self.ctx);
        for (tx_hash, tx) in std::mem::take(&mut self.mempool) {
            let result = match keeper.submit_prices(&tx.validator, tx.timestamp, &tx.signal_prices) {
                Ok(()) => TxResult::Success,
                Err(e) => {
                    self.rejected += 1;
                    TxResult::Failed {
                        code: 1,
                        log: e.to_string(),
                    }
                }
            };
            self.results.insert(tx_hash, result);
        }
        keeper.end_block().expect("end block");
    }

    fn advance(&mut self, clock: &ManualClock) {
        self.ctx = BlockContext::new(self.ctx.block_time + BLOCK_TIME, self.ctx.block_height + 1);
        clock.set(self.ctx.block_time);
    }

    fn last_report(&self) -> Option<ValidatorPrice> {
        self.query().validator_prices("val1").into_iter().next()
    }
}

impl ChainClient for LocalChain {
    fn is_valid_validator(&self, validator: &str) -> Result<bool> {
        Ok(self.query().is_valid_validator(validator))
    }

    fn params(&self) -> Result<Params> {
        Ok(self.query().params())
    }

    fn current_feeds(&self) -> Result<CurrentFeedsWithDeviation> {
        Ok(self.query().current_feeds_with_deviation())
    }

    fn validator_prices(&self, validator: &str) -> Result<Vec<ValidatorPrice>> {
        Ok(self.query().validator_prices(validator))
    }
}

impl Broadcaster for LocalChain {
    fn broadcast(&mut self, _key: &str, tx: &PriceTx, gas_adjustment: f64) -> Result<BroadcastOutcome> {
        if gas_adjustment < self.min_gas {
            return Ok(BroadcastOutcome::OutOfGas);
        }
        let tx_hash = format!("TX{}", self.results.len() + self.mempool.len());
        self.mempool.push((tx_hash.clone(), tx.clone()));
        Ok(BroadcastOutcome::Accepted { tx_hash })
    }

    fn query_tx(&mut self, tx_hash: &str) -> Result<Option<TxResult>> {
        Ok(self.results.get(tx_hash).cloned())
    }
}

struct Quote(u64);

impl PriceService for Quote {
    fn query(&mut self, signal_ids: &[String]) -> Result<Vec<SignalPrice>> {
        Ok(signal_ids
            .iter()
            .map(|id| SignalPrice::available(id.clone(), self.0))
            .collect())
    }
}

fn submitter(clock: &ManualClock) -> Submitter<ManualClock> {
    let config = SubmitterConfig::new("val1", vec!["feeder1".to_string()]);
    Submitter::new(config, clock.clone()).expect("submitter")
}

/// Poll, broadcast, produce the block, confirm.
fn run_block(
    chain: &mut LocalChain,
    submitter: &mut Submitter<ManualClock>,
    quote: &mut Quote,
    steps_before_block: usize,
) -> Vec<BatchOutcome> {
    submitter.poll(&*chain, quote).expect("poll");
    let mut done = Vec::new();
    for _ in 0..steps_before_block {
        done.extend(submitter.step(&mut *chain));
    }
    chain.produce_block();
    done.extend(submitter.step(&mut *chain));
    done
}

#[test]
fn first_report_confirms_in_one_block() {
    let clock = ManualClock::new(1000);
    let mut chain = LocalChain::new(1.0);
    let mut s = submitter(&clock);
    let mut quote = Quote(65_000_000_000_000);

    let done = run_block(&mut chain, &mut s, &mut quote, 2);
    assert_eq!(done.len(), 1);
    assert!(matches!(done[0].state, TxState::Confirmed { .. }));
    assert_eq!(done[0].signal_ids, vec![BTC]);
    assert!(s.in_progress().is_empty());
    assert_eq!(s.idle_key_count(), 1);

    let price = chain.query().price(BTC);
    assert_eq!(price.status, PriceStatus::Available);
    assert_eq!(price.price, 65_000_000_000_000);
}

#[test]
fn steady_price_waits_for_assigned_time() {
    let clock = ManualClock::new(1000);
    let mut chain = LocalChain::new(1.0);
    let mut s = submitter(&clock);
    let mut quote = Quote(65_000_000_000_000);
    run_block(&mut chain, &mut s, &mut quote, 2);

    // Interval 360 s: a steady quote is not resent for at least half of it.
    for _ in 0..50 {
        chain.advance(&clock);
        assert!(run_block(&mut chain, &mut s, &mut quote, 2).is_empty());
    }
    assert_eq!(chain.last_report().expect("report").timestamp, 1000);

    // By 80% of the interval the assigned time has passed.
    let mut refreshed = false;
    for _ in 0..60 {
        chain.advance(&clock);
        if !run_block(&mut chain, &mut s, &mut quote, 2).is_empty() {
            refreshed = true;
            break;
        }
    }
    assert!(refreshed);
    assert!(chain.last_report().expect("report").timestamp > 1000);
    assert_eq!(chain.rejected, 0);
}

#[test]
fn deviation_refreshes_after_cooldown() {
    let clock = ManualClock::new(1000);
    let mut chain = LocalChain::new(1.0);
    let mut s = submitter(&clock);
    let mut quote = Quote(65_000_000_000_000);
    run_block(&mut chain, &mut s, &mut quote, 2);

    // 10% move, far above the 300 bp tolerance. Cooldown 30 s + 3 s buffer.
    quote.0 = 71_500_000_000_000;
    let mut confirmed_at = None;
    for _ in 0..20 {
        chain.advance(&clock);
        if !run_block(&mut chain, &mut s, &mut quote, 2).is_empty() {
            confirmed_at = Some(chain.ctx.block_time);
            break;
        }
    }
    assert_eq!(confirmed_at, Some(1033));
    assert_eq!(chain.query().price(BTC).price, 71_500_000_000_000);
    assert_eq!(chain.rejected, 0);
}

#[test]
fn out_of_gas_retries_with_bumped_adjustment() {
    let clock = ManualClock::new(1000);
    // Start 2.0, step 0.1: the third broadcast at 2.2 is the first to fit.
    let mut chain = LocalChain::new(2.15);
    let mut s = submitter(&clock);
    let mut quote = Quote(1_000_000_000);

    // Sign, two out-of-gas rounds (broadcast + bump each), final broadcast.
    let done = run_block(&mut chain, &mut s, &mut quote, 6);
    assert_eq!(done.len(), 1);
    assert!(matches!(done[0].state, TxState::Confirmed { .. }));
    assert_eq!(chain.query().price(BTC).price, 1_000_000_000);
}

#[test]
fn gives_up_after_max_try() {
    let clock = ManualClock::new(1000);
    let mut chain = LocalChain::new(f64::MAX);
    let mut s = submitter(&clock);
    let mut quote = Quote(1_000_000_000);

    let done = run_block(&mut chain, &mut s, &mut quote, 20);
    assert_eq!(done.len(), 1);
    assert!(matches!(done[0].state, TxState::Failed { .. }));
    // The ids are free again for the next poll.
    assert!(s.in_progress().is_empty());
    assert_eq!(chain.query().price(BTC).status, PriceStatus::NotReady);
}

#[test]
fn inactive_validator_sends_nothing() {
    let clock = ManualClock::new(1000);
    let mut chain = LocalChain::new(1.0);
    chain
        .staking
        .dev_set_status("val1", OracleStatus::inactive(900));
    let mut s = submitter(&clock);

    assert_eq!(s.poll(&chain, &mut Quote(1)).expect("poll"), 0);
    assert_eq!(s.queued_count(), 0);
    assert!(s.step(&mut chain).is_empty());
}
