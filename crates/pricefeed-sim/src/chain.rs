//! In-process chain.
//!
//! [`SimChain`] owns a [`MemoryStore`] and a [`StubStaking`] table and
//! advances them one block at a time. Broadcast transactions wait in a
//! mempool until the next block delivers them to the keeper, so submitters
//! see the same accept, include, confirm cycle as against a real node.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use pricefeed_core::{
    BlockContext, FeedsError, FeedsKeeper, FeedsQuery, MemoryStore, PriceRecalculation,
    StubStaking,
};
use pricefeed_submitter::{
    BroadcastOutcome, Broadcaster, ChainClient, PriceTx, Result as SubmitterResult, TxResult,
};
use pricefeed_types::{
    CurrentFeedsWithDeviation, Encoder, Params, Signal, ValidatorPrice,
};

/// Code attached to transactions the keeper rejects.
pub const TX_REJECTED_CODE: u32 = 1;

/// What happened in one block.
#[derive(Debug, Clone)]
pub struct BlockReport {
    /// Block that was produced.
    pub block: BlockContext,
    /// Transactions executed successfully.
    pub included: usize,
    /// Transactions the keeper rejected.
    pub rejected: usize,
    /// Prices written by the end-of-block hook.
    pub recalculation: PriceRecalculation,
}

/// A single-node chain running the feeds keeper.
pub struct SimChain {
    store: MemoryStore,
    staking: StubStaking,
    ctx: BlockContext,
    block_time_secs: i64,
    min_gas_adjustment: f64,
    mempool: Vec<(String, PriceTx)>,
    results: BTreeMap<String, TxResult>,
    nonce: u64,
}

impl SimChain {
    /// Start a chain at `genesis` with `params` and a fixed stake table.
    pub fn new(
        params: Params,
        staking: StubStaking,
        genesis: BlockContext,
        block_time_secs: i64,
        min_gas_adjustment: f64,
    ) -> Self {
        Self {
            store: MemoryStore::with_params(params),
            staking,
            ctx: genesis,
            block_time_secs,
            min_gas_adjustment,
            mempool: Vec::new(),
            results: BTreeMap::new(),
            nonce: 0,
        }
    }

    /// The block being built.
    pub fn block(&self) -> BlockContext {
        self.ctx
    }

    /// Read-only view at the block being built.
    pub fn query(&self) -> FeedsQuery<'_, MemoryStore, StubStaking> {
        FeedsQuery::new(&self.store, &self.staking, self.ctx)
    }

    /// Transactions waiting for the next block.
    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    /// Apply genesis votes and select the first feed set.
    pub fn genesis<'v, I>(&mut self, votes: I) -> Result<(), FeedsError>
    where
        I: IntoIterator<Item = (&'v str, Vec<Signal>)>,
    {
        let mut keeper = FeedsKeeper::new(&mut self.store, &self.staking, self.ctx);
        for (voter, signals) in votes {
            keeper.vote(voter, signals)?;
        }
        let feeds = keeper.recalculate_current_feeds();
        info!(feeds = feeds.len(), "genesis applied");
        Ok(())
    }

    /// Execute the mempool and run the end-of-block hook.
    ///
    /// The block context does not move; call [`Self::advance`] afterwards.
    pub fn produce_block(&mut self) -> Result<BlockReport, FeedsError> {
        let txs = std::mem::take(&mut self.mempool);
        let mut keeper = FeedsKeeper::new(&mut self.store, &self.staking, self.ctx);

        let mut included = 0;
        let mut rejected = 0;
        for (tx_hash, tx) in txs {
            let result = match keeper.submit_prices(&tx.validator, tx.timestamp, &tx.signal_prices) {
                Ok(()) => {
                    included += 1;
                    TxResult::Success
                }
                Err(e) => {
                    rejected += 1;
                    debug!(tx_hash = %tx_hash, error = %e, "tx rejected");
                    TxResult::Failed {
                        code: TX_REJECTED_CODE,
                        log: e.to_string(),
                    }
                }
            };
            self.results.insert(tx_hash, result);
        }

        let recalculation = keeper.end_block()?;
        Ok(BlockReport {
            block: self.ctx,
            included,
            rejected,
            recalculation,
        })
    }

    /// Encode stored prices for relay at the block being built.
    pub fn encode_for_relay(&mut self, signal_ids: &[String], encoder: Encoder) -> Result<Vec<u8>, FeedsError> {
        FeedsKeeper::new(&mut self.store, &self.staking, self.ctx).encode_for_relay(signal_ids, encoder)
    }

    /// Move to the next block.
    pub fn advance(&mut self) {
        self.ctx = BlockContext::new(
            self.ctx.block_time + self.block_time_secs,
            self.ctx.block_height + 1,
        );
    }

    fn tx_hash(&mut self, key: &str, tx: &PriceTx) -> String {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(key.as_bytes());
        hasher.update(&self.nonce.to_be_bytes());
        if let Ok(body) = serde_json::to_vec(tx) {
            hasher.update(&body);
        }
        hex::encode_upper(&hasher.finalize().as_bytes()[..16])
    }
}

impl ChainClient for SimChain {
    fn is_valid_validator(&self, validator: &str) -> SubmitterResult<bool> {
        Ok(self.query().is_valid_validator(validator))
    }

    fn params(&self) -> SubmitterResult<Params> {
        Ok(self.query().params())
    }

    fn current_feeds(&self) -> SubmitterResult<CurrentFeedsWithDeviation> {
        Ok(self.query().current_feeds_with_deviation())
    }

    fn validator_prices(&self, validator: &str) -> SubmitterResult<Vec<ValidatorPrice>> {
        Ok(self.query().validator_prices(validator))
    }
}

impl Broadcaster for SimChain {
    fn broadcast(&mut self, key: &str, tx: &PriceTx, gas_adjustment: f64) -> SubmitterResult<BroadcastOutcome> {
        if gas_adjustment < self.min_gas_adjustment {
            warn!(key, gas_adjustment, "broadcast ran out of gas");
            return Ok(BroadcastOutcome::OutOfGas);
        }
        let tx_hash = self.tx_hash(key, tx);
        debug!(key, tx_hash = %tx_hash, prices = tx.signal_prices.len(), "tx entered mempool");
        self.mempool.push((tx_hash.clone(), tx.clone()));
        Ok(BroadcastOutcome::Accepted { tx_hash })
    }

    fn query_tx(&mut self, tx_hash: &str) -> SubmitterResult<Option<TxResult>> {
        Ok(self.results.get(tx_hash).cloned())
    }
}
