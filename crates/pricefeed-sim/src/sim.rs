//! Block loop.
//!
//! Each block: move the market, let every validator's submitter poll and
//! broadcast, execute the mempool with the end-of-block hook, confirm
//! included batches, and encode the resulting prices for relay.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use pricefeed_core::{BlockContext, OracleStatus, StubStaking};
use pricefeed_submitter::{BatchOutcome, ManualClock, Submitter, SubmitterConfig, TxState};
use pricefeed_types::{Encoder, Price};

use crate::chain::{BlockReport, SimChain};
use crate::market::{Market, Quotes};
use crate::scenario::Scenario;

/// Submitter steps run before each block: sign, broadcast, one out-of-gas
/// retry, rebroadcast.
const STEPS_BEFORE_BLOCK: usize = 4;

/// Running totals over a simulation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Blocks produced.
    pub blocks: u64,
    /// Transactions executed.
    pub included: u64,
    /// Transactions the keeper rejected.
    pub rejected: u64,
    /// Batches confirmed.
    pub confirmed_batches: u64,
    /// Batches given up on.
    pub failed_batches: u64,
    /// Validator miss reports.
    pub missed_reports: u64,
}

/// End-of-run dump.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Running totals.
    pub stats: RunStats,
    /// Last produced block.
    pub block_height: i64,
    /// Time of the last produced block.
    pub block_time: i64,
    /// Every stored price.
    pub prices: Vec<Price>,
    /// Market reference price of each stored price, where available.
    pub reference_prices: BTreeMap<String, u64>,
    /// Last relay payload, hex.
    pub relay_hex: Option<String>,
}

struct ValidatorNode {
    address: String,
    submitter: Submitter<ManualClock>,
    rng: StdRng,
    noise_bp: u64,
}

/// A running simulation.
pub struct Simulation {
    blocks: u64,
    tick: Duration,
    encoder: Encoder,
    relay_signal_ids: Vec<String>,
    clock: ManualClock,
    chain: SimChain,
    market: Market,
    nodes: Vec<ValidatorNode>,
    stats: RunStats,
    last_block: Option<BlockContext>,
    last_relay: Option<Vec<u8>>,
}

impl Simulation {
    /// Build the chain at genesis and one submitter per validator.
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let mut staking = StubStaking::new();
        for d in &scenario.delegators {
            staking = staking.with_delegation(d.address.clone(), d.power);
        }
        for v in &scenario.validators {
            staking = staking.with_validator(v.address.clone(), v.power, scenario.start_time);
        }
        for v in scenario.validators.iter().filter(|v| !v.active) {
            staking.dev_set_status(&v.address, OracleStatus::inactive(scenario.start_time));
        }

        let genesis = BlockContext::new(scenario.start_time, 1);
        let mut chain = SimChain::new(
            scenario.params.clone(),
            staking,
            genesis,
            scenario.block_time_secs,
            scenario.min_gas_adjustment,
        );
        chain.genesis(
            scenario
                .delegators
                .iter()
                .map(|d| (d.address.as_str(), d.votes.clone())),
        )?;

        let clock = ManualClock::new(scenario.start_time);
        let mut nodes = Vec::with_capacity(scenario.validators.len());
        for (i, v) in scenario.validators.iter().enumerate() {
            let config = SubmitterConfig::new(v.address.clone(), v.keys.clone());
            nodes.push(ValidatorNode {
                address: v.address.clone(),
                submitter: Submitter::new(config, clock.clone())?,
                rng: StdRng::seed_from_u64(scenario.seed.wrapping_add(i as u64 + 1)),
                noise_bp: v.noise_bp,
            });
        }

        Ok(Self {
            blocks: scenario.blocks,
            tick: Duration::from_millis(scenario.tick_millis),
            encoder: scenario.encoder,
            relay_signal_ids: scenario.relay_signal_ids.clone(),
            clock,
            chain,
            market: Market::new(&scenario.signals, scenario.seed),
            nodes,
            stats: RunStats::default(),
            last_block: None,
            last_relay: None,
        })
    }

    /// Running totals so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Produce one block.
    pub fn step_block(&mut self) -> anyhow::Result<BlockReport> {
        let block = self.chain.block();
        self.clock.set(block.block_time);
        self.market.tick();

        for node in &mut self.nodes {
            let mut quotes = Quotes::new(&self.market, &mut node.rng, node.noise_bp);
            if let Err(e) = node.submitter.poll(&self.chain, &mut quotes) {
                warn!(validator = %node.address, error = %e, "poll failed");
            }
            for _ in 0..STEPS_BEFORE_BLOCK {
                let done = node.submitter.step(&mut self.chain);
                tally(&mut self.stats, &done);
            }
        }

        debug!(pending = self.chain.mempool_len(), "mempool ready");
        let report = self.chain.produce_block()?;
        self.stats.blocks += 1;
        self.stats.included += report.included as u64;
        self.stats.rejected += report.rejected as u64;
        self.stats.missed_reports += report.recalculation.missed_validators.len() as u64;

        for node in &mut self.nodes {
            let done = node.submitter.step(&mut self.chain);
            tally(&mut self.stats, &done);
        }

        let relay_ids: Vec<String> = if self.relay_signal_ids.is_empty() {
            report
                .recalculation
                .prices
                .iter()
                .map(|p| p.signal_id.clone())
                .collect()
        } else {
            self.relay_signal_ids.clone()
        };
        if !relay_ids.is_empty() {
            match self.chain.encode_for_relay(&relay_ids, self.encoder) {
                Ok(bytes) => self.last_relay = Some(bytes),
                Err(e) => warn!(error = %e, "relay encoding failed"),
            }
        }

        debug!(
            block_height = report.block.block_height,
            included = report.included,
            rejected = report.rejected,
            "block produced"
        );
        if block.block_height % 100 == 0 {
            info!(
                block_height = block.block_height,
                confirmed = self.stats.confirmed_batches,
                failed = self.stats.failed_batches,
                "progress"
            );
        }

        self.last_block = Some(block);
        self.chain.advance();
        Ok(report)
    }

    /// Produce every scenario block, pausing `tick_millis` between blocks.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        for _ in 0..self.blocks {
            self.step_block()?;
            if self.tick.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.tick).await;
            }
        }
        info!(blocks = self.stats.blocks, "simulation complete");
        Ok(())
    }

    /// Current totals, prices and relay payload.
    pub fn summary(&self) -> Summary {
        let block = self.last_block.unwrap_or_else(|| self.chain.block());
        let prices = self.chain.query().all_prices();
        Summary {
            stats: self.stats.clone(),
            block_height: block.block_height,
            block_time: block.block_time,
            reference_prices: prices
                .iter()
                .filter_map(|p| {
                    self.market
                        .price(&p.signal_id)
                        .map(|r| (p.signal_id.clone(), r))
                })
                .collect(),
            prices,
            relay_hex: self.last_relay.as_ref().map(hex::encode),
        }
    }
}

fn tally(stats: &mut RunStats, done: &[BatchOutcome]) {
    for outcome in done {
        match &outcome.state {
            TxState::Confirmed { .. } => stats.confirmed_batches += 1,
            TxState::Failed { reason } => {
                warn!(batch = outcome.id, key = %outcome.key, reason = %reason, "batch failed");
                stats.failed_batches += 1;
            }
            _ => {}
        }
    }
}
