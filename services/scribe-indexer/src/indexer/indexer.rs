//! Per-contract-set log indexer: enrichment, dedup, cursor advancement.
//!
//! [`Indexer`] drains a [`LogFetcher`]'s channel, enriches each log's
//! transaction (receipt, raw bytes, block time) through a `ChainProvider`,
//! persists through an `EventStore`, and only advances the `LastIndexed`
//! cursor once every log up to a block number has resolved to `Stored` or
//! `StoredWithoutTx`.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use rpc_backend::ChainProvider;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};

use crate::error::{AppError, InfraError, Result};
use crate::indexer::log_fetcher::{self, FetchParams, LogFetcher};
use crate::ports::{Cache, EventStore};
use crate::types::entities::{BlockTime, LastIndexed, Log, Receipt, Transaction};
use crate::types::enums::IndexerStateKind;
use crate::types::primitives::{BlockNumber, EthAddress, TxHash};

/// Attempts waiting for a transaction the node has not seen yet, before the
/// enrichment step gives up and fails the whole `index` call.
const TX_NOT_FOUND_RETRY_TOLERANCE: u32 = log_fetcher::RETRY_TOLERANCE;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOME / STATE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of enriching and persisting one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Log, receipt, transaction and block time all persisted.
    Stored,
    /// Log, receipt and block time persisted; the raw transaction could not
    /// be recovered (permanent decode error), so no `Transaction` row exists.
    StoredWithoutTx,
    /// Persistence failed outright; the containing block is not eligible for
    /// cursor advancement.
    Failed,
}

impl StoreOutcome {
    /// Whether a block whose logs all resolved to outcomes like this one may
    /// have its `LastIndexed` cursor advanced past it.
    #[must_use]
    pub const fn advances_cursor(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Whether an indexer is tracking a fixed historical range or following the
/// chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Indexing a bounded `[start, end]` range below the livefill threshold.
    Backfilling,
    /// Within `livefill_threshold` of the tip; wakes every `refresh_rate`.
    Livefilling,
}

/// Result of a single not-found/permanent-error classified RPC fetch.
enum Enriched<T> {
    Found(T),
    /// A permanent error (e.g. unsupported tx type) — the caller should
    /// proceed without this piece of data rather than retry.
    Unavailable,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables for one [`Indexer`] run.
#[derive(Debug, Clone)]
pub struct IndexerParams {
    /// Max logs enriched/stored before a cursor-flush barrier.
    pub store_concurrency: usize,
    /// Below this many remaining blocks, flush every batch instead of
    /// waiting for `store_concurrency` logs to accumulate.
    pub concurrency_threshold: u64,
    /// Distance from the confirmed tip at which an indexer should switch to
    /// [`IndexerState::Livefilling`].
    pub livefill_threshold: u64,
    /// How often a livefilling indexer checks for new blocks.
    pub refresh_rate: Duration,
}

impl Default for IndexerParams {
    fn default() -> Self {
        Self {
            store_concurrency: 16,
            concurrency_threshold: 50,
            livefill_threshold: 50,
            refresh_rate: Duration::from_secs(2),
        }
    }
}

/// Per-tx-hash async locks so concurrent logs from the same transaction
/// share one enrichment call instead of racing duplicate RPC work.
#[derive(Debug, Default)]
struct TxLocks {
    inner: DashMap<TxHash, Arc<AsyncMutex<()>>>,
}

impl TxLocks {
    fn entry(&self, tx_hash: TxHash) -> Arc<AsyncMutex<()>> {
        Arc::clone(&self.inner.entry(tx_hash).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INDEXER
// ═══════════════════════════════════════════════════════════════════════════════

/// Enriches and persists logs for a fixed contract set on one chain.
pub struct Indexer<P, S, C> {
    provider: Arc<P>,
    store: Arc<S>,
    cache: Arc<C>,
    chain_id: u64,
    contracts: Vec<EthAddress>,
    fetch_params: FetchParams,
    params: IndexerParams,
    locks: TxLocks,
}

impl<P, S, C> Indexer<P, S, C>
where
    P: ChainProvider + 'static,
    S: EventStore + 'static,
    C: Cache + 'static,
{
    /// Build an indexer for a fixed contract set.
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        cache: Arc<C>,
        chain_id: u64,
        contracts: Vec<EthAddress>,
        fetch_params: FetchParams,
        params: IndexerParams,
    ) -> Self {
        Self {
            provider,
            store,
            cache,
            chain_id,
            contracts,
            fetch_params,
            params,
            locks: TxLocks::default(),
        }
    }

    /// The contract addresses this indexer tracks.
    #[must_use]
    pub fn contracts(&self) -> &[EthAddress] {
        &self.contracts
    }

    /// Add a contract address to this indexer's tracked set (used when
    /// `ChainIndexer` hands a contract off to the shared livefill indexer).
    pub fn add_contract(&mut self, contract: EthAddress) {
        if !self.contracts.contains(&contract) {
            self.contracts.push(contract);
        }
    }

    /// Whether `last_indexed` is within `livefill_threshold` of `confirmed_tip`.
    #[must_use]
    pub const fn state_for(&self, last_indexed: BlockNumber, confirmed_tip: BlockNumber) -> IndexerState {
        if confirmed_tip.get().saturating_sub(last_indexed.get()) <= self.params.livefill_threshold {
            IndexerState::Livefilling
        } else {
            IndexerState::Backfilling
        }
    }

    /// Index `[start_block, end_block]`, writing to the confirmed tables.
    ///
    /// # Errors
    /// Returns an error if any per-log store routine fails; the caller
    /// (`ChainIndexer`) is expected to restart from the last persisted
    /// `LastIndexed`.
    #[instrument(skip(self), fields(chain_id = self.chain_id, start = %start_block, end = %end_block))]
    pub async fn index(&self, start_block: BlockNumber, end_block: BlockNumber) -> Result<()> {
        self.index_range(start_block, end_block, false).await
    }

    /// Index `[start_block, end_block]`, writing to the at-head tables
    /// (livefill path).
    ///
    /// # Errors
    /// Same as [`Indexer::index`].
    #[instrument(skip(self), fields(chain_id = self.chain_id, start = %start_block, end = %end_block))]
    pub async fn index_at_head(&self, start_block: BlockNumber, end_block: BlockNumber) -> Result<()> {
        self.index_range(start_block, end_block, true).await
    }

    /// Run the livefilling refresh loop: every `refresh_rate`, query the
    /// confirmed tip and index any new range at head.
    ///
    /// # Errors
    /// Propagates the first error from [`Indexer::index_at_head`]; the
    /// caller should restart from the last persisted `LastIndexed`.
    pub async fn run_livefill(&self, mut last_indexed: BlockNumber) -> Result<()> {
        loop {
            tokio::time::sleep(self.params.refresh_rate).await;
            let tip = self
                .provider
                .latest_block_number()
                .await
                .map_err(|e| AppError::Infra(InfraError::Rpc(Box::new(e))))?;
            let tip = BlockNumber::new(tip);
            if tip <= last_indexed {
                continue;
            }
            self.index_at_head(last_indexed.next(), tip).await?;
            last_indexed = tip;
        }
    }

    async fn index_range(&self, start_block: BlockNumber, end_block: BlockNumber, at_head: bool) -> Result<()> {
        if start_block > end_block {
            return Ok(());
        }

        let fetcher = LogFetcher::new(Arc::clone(&self.provider), self.chain_id, self.fetch_params.clone());
        let mut rx = fetcher.spawn(start_block, end_block);

        let mut batch: Vec<Log> = Vec::new();
        while let Some(item) = rx.recv().await {
            let log = item?;
            let remaining = end_block.get().saturating_sub(log.block_number.get());
            batch.push(log);

            if batch.len() >= self.params.store_concurrency || remaining < self.params.concurrency_threshold {
                let flush_to = batch.last().expect("just pushed").block_number;
                self.process_batch(&batch, at_head).await?;
                self.flush_cursor(flush_to, at_head).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.process_batch(&batch, at_head).await?;
        }
        self.flush_cursor(end_block, at_head).await
    }

    /// Enrich and persist a batch of logs concurrently, bounded by
    /// `store_concurrency`. Logs from the same transaction still serialize
    /// through [`TxLocks`], so concurrent members of a batch never duplicate
    /// the receipt/raw-tx enrichment RPCs for one tx hash.
    async fn process_batch(&self, logs: &[Log], at_head: bool) -> Result<()> {
        stream::iter(logs)
            .map(|log| async move { self.process_log(log, at_head).await })
            .buffer_unordered(self.params.store_concurrency.max(1))
            .collect::<Vec<Result<StoreOutcome>>>()
            .await
            .into_iter()
            .try_for_each(|outcome| outcome.map(|_| ()))
    }

    async fn flush_cursor(&self, block: BlockNumber, at_head: bool) -> Result<()> {
        let kind = if at_head { IndexerStateKind::Unconfirmed } else { IndexerStateKind::Confirmed };
        let entries: Vec<LastIndexed> = self
            .contracts
            .iter()
            .map(|&contract| LastIndexed {
                chain_id: self.chain_id,
                contract,
                kind,
                block_number: block,
            })
            .collect();
        self.store.store_last_indexed_multiple(&entries).await
    }

    /// Enrich and persist one log. Returns the outcome; `Err` is reserved
    /// for fatal failures that should abort the whole `index` call.
    async fn process_log(&self, log: &Log, at_head: bool) -> Result<StoreOutcome> {
        let lock = self.locks.entry(log.tx_hash);
        let _guard = lock.lock().await;

        self.store_log(log, at_head).await?;

        let tx_hash_b256: B256 = log.tx_hash.into();
        if self.cache.contains_tx_hash(&tx_hash_b256) {
            return Ok(StoreOutcome::Stored);
        }

        let block_time = self.fetch_block_time(log.block_number).await?;
        self.store.store_block_time(&block_time).await?;

        let receipt = match self.wait_for_receipt(log.tx_hash).await? {
            Enriched::Found(receipt) => receipt,
            Enriched::Unavailable => {
                self.cache.record_tx_hash(tx_hash_b256);
                return Ok(StoreOutcome::StoredWithoutTx);
            }
        };
        let domain_receipt = convert_receipt(self.chain_id, log, &receipt);
        self.store_receipt(&domain_receipt, at_head).await?;

        let outcome = match self.wait_for_raw_tx(log.tx_hash).await? {
            Enriched::Found(raw) => {
                let tx = Transaction {
                    chain_id: self.chain_id,
                    tx_hash: log.tx_hash,
                    block_hash: log.block_hash,
                    block_number: log.block_number,
                    tx_index: log.tx_index,
                    raw: raw.to_vec(),
                };
                self.store_tx(&tx, at_head).await?;
                StoreOutcome::Stored
            }
            Enriched::Unavailable => StoreOutcome::StoredWithoutTx,
        };

        self.cache.record_tx_hash(tx_hash_b256);
        Ok(outcome)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Enriched<rpc_backend::types::TransactionReceipt>> {
        let mut attempt = 0u32;
        loop {
            match self.provider.get_transaction_receipt(tx_hash.into()).await {
                Ok(Some(receipt)) => return Ok(Enriched::Found(receipt)),
                Ok(None) => {
                    attempt += 1;
                    if attempt >= TX_NOT_FOUND_RETRY_TOLERANCE {
                        return Err(AppError::Infra(InfraError::RetryExhausted {
                            attempts: attempt,
                            reason: format!("receipt not found for tx {tx_hash}"),
                        }));
                    }
                    log_fetcher::backoff(attempt).await;
                }
                Err(err) => {
                    warn!(%tx_hash, error = %err, "permanent receipt fetch error, indexing log without enrichment");
                    return Ok(Enriched::Unavailable);
                }
            }
        }
    }

    async fn wait_for_raw_tx(&self, tx_hash: TxHash) -> Result<Enriched<alloy::primitives::Bytes>> {
        let mut attempt = 0u32;
        loop {
            match self.provider.get_transaction_raw(tx_hash.into()).await {
                Ok(Some(raw)) => return Ok(Enriched::Found(raw)),
                Ok(None) => {
                    attempt += 1;
                    if attempt >= TX_NOT_FOUND_RETRY_TOLERANCE {
                        return Err(AppError::Infra(InfraError::RetryExhausted {
                            attempts: attempt,
                            reason: format!("raw transaction not found for tx {tx_hash}"),
                        }));
                    }
                    log_fetcher::backoff(attempt).await;
                }
                Err(err) => {
                    warn!(%tx_hash, error = %err, "permanent raw tx fetch error, storing receipt without tx");
                    return Ok(Enriched::Unavailable);
                }
            }
        }
    }

    async fn fetch_block_time(&self, block_number: BlockNumber) -> Result<BlockTime> {
        let ts = self
            .provider
            .get_block_timestamp(block_number.get())
            .await
            .map_err(|e| AppError::Infra(InfraError::Rpc(Box::new(e))))?
            .unwrap_or_default();
        #[allow(clippy::cast_possible_wrap)]
        let timestamp = chrono::DateTime::from_timestamp(ts as i64, 0).unwrap_or_default();
        Ok(BlockTime {
            chain_id: self.chain_id,
            block_number,
            timestamp,
        })
    }

    async fn store_log(&self, log: &Log, at_head: bool) -> Result<()> {
        if at_head {
            self.store.store_logs_at_head(self.chain_id, std::slice::from_ref(log)).await
        } else {
            self.store.store_logs(self.chain_id, std::slice::from_ref(log)).await
        }
    }

    async fn store_receipt(&self, receipt: &Receipt, at_head: bool) -> Result<()> {
        if at_head {
            self.store.store_receipt_at_head(self.chain_id, receipt).await
        } else {
            self.store.store_receipt(self.chain_id, receipt).await
        }
    }

    async fn store_tx(&self, tx: &Transaction, at_head: bool) -> Result<()> {
        if at_head {
            self.store.store_tx_at_head(self.chain_id, tx).await
        } else {
            self.store.store_tx(self.chain_id, tx).await
        }
    }
}

fn convert_receipt(chain_id: u64, log: &Log, raw: &rpc_backend::types::TransactionReceipt) -> Receipt {
    let logs = raw
        .logs
        .iter()
        .cloned()
        .filter_map(|l| log_fetcher::convert_log(chain_id)(l).ok())
        .collect();
    Receipt {
        chain_id,
        tx_hash: log.tx_hash,
        status: raw.success,
        contract_address: raw.contract_address.map(EthAddress::from),
        // rpc-backend's chain-agnostic receipt type doesn't distinguish
        // cumulative gas from per-tx gas; the two are equal here.
        cumulative_gas_used: raw.gas_used,
        gas_used: raw.gas_used,
        block_hash: log.block_hash,
        block_number: log.block_number,
        tx_index: log.tx_index,
        logs_bloom: Vec::new(),
        logs,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rpc_backend::mock::MockProvider;

    use super::*;
    use crate::ports::MockCache;
    use crate::store::mocks::MockEventStore;
    use crate::types::primitives::BlockHash;

    fn addr(byte: u8) -> EthAddress {
        EthAddress::new([byte; 20])
    }

    fn sample_log(block: u64, tx_hash: TxHash, tx_index: u64, log_index: u64) -> alloy::rpc::types::Log {
        let mut log = alloy::rpc::types::Log::default();
        log.block_number = Some(block);
        log.transaction_hash = Some(tx_hash.into());
        log.transaction_index = Some(tx_index);
        log.log_index = Some(log_index);
        log
    }

    fn make_indexer(
        provider: Arc<MockProvider>,
    ) -> Indexer<MockProvider, MockEventStore, MockCache> {
        Indexer::new(
            provider,
            Arc::new(MockEventStore::new()),
            Arc::new(MockCache::new()),
            1,
            vec![addr(1)],
            FetchParams::new(10, 2),
            IndexerParams::default(),
        )
    }

    #[tokio::test]
    async fn index_stores_log_receipt_tx_and_advances_cursor() {
        let provider = Arc::new(MockProvider::new());
        let tx_hash = TxHash::new([9; 32]);
        provider.push_log(sample_log(3, tx_hash, 0, 0));
        provider.set_block_timestamp(3, 1_700_000_000);
        provider.set_receipt(
            tx_hash.into(),
            rpc_backend::types::TransactionReceipt {
                tx_hash: tx_hash.into(),
                block_hash: alloy::primitives::B256::ZERO,
                block_number: 3,
                tx_index: 0,
                from: alloy::primitives::Address::ZERO,
                to: None,
                contract_address: None,
                gas_used: 21_000,
                success: true,
                logs: vec![],
            },
        );
        provider.set_raw_tx(tx_hash.into(), alloy::primitives::Bytes::from_static(b"\x02\xf8"));

        let indexer = make_indexer(provider);
        indexer
            .index(BlockNumber::new(0), BlockNumber::new(5))
            .await
            .unwrap();

        let cursor = indexer
            .store
            .get_last_indexed(1, addr(1), IndexerStateKind::Confirmed)
            .await
            .unwrap();
        assert_eq!(cursor, Some(BlockNumber::new(5)));
    }

    #[tokio::test]
    async fn process_log_dedups_second_log_in_same_tx_via_cache() {
        let provider = Arc::new(MockProvider::new());
        let tx_hash = TxHash::new([4; 32]);
        provider.push_log(sample_log(3, tx_hash, 0, 0));
        provider.push_log(sample_log(3, tx_hash, 0, 1));
        provider.set_block_timestamp(3, 1_700_000_000);
        provider.set_receipt(
            tx_hash.into(),
            rpc_backend::types::TransactionReceipt {
                tx_hash: tx_hash.into(),
                block_hash: alloy::primitives::B256::ZERO,
                block_number: 3,
                tx_index: 0,
                from: alloy::primitives::Address::ZERO,
                to: None,
                contract_address: None,
                gas_used: 21_000,
                success: true,
                logs: vec![],
            },
        );
        provider.set_raw_tx(tx_hash.into(), alloy::primitives::Bytes::from_static(b"\x02\xf8"));

        let indexer = make_indexer(provider);
        indexer
            .index(BlockNumber::new(0), BlockNumber::new(5))
            .await
            .unwrap();

        assert!(indexer.cache.contains_tx_hash(&tx_hash.into()));
    }

    #[tokio::test]
    async fn flush_cursor_applies_to_every_tracked_contract() {
        let provider = Arc::new(MockProvider::new());
        let mut indexer = make_indexer(provider);
        indexer.add_contract(addr(2));

        indexer.flush_cursor(BlockNumber::new(42), false).await.unwrap();

        for contract in [addr(1), addr(2)] {
            let cursor = indexer
                .store
                .get_last_indexed(1, contract, IndexerStateKind::Confirmed)
                .await
                .unwrap();
            assert_eq!(cursor, Some(BlockNumber::new(42)));
        }
    }

    #[test]
    fn store_outcome_advances_cursor_except_when_failed() {
        assert!(StoreOutcome::Stored.advances_cursor());
        assert!(StoreOutcome::StoredWithoutTx.advances_cursor());
        assert!(!StoreOutcome::Failed.advances_cursor());
    }

    #[tokio::test]
    async fn index_range_fans_out_batches_bounded_by_store_concurrency() {
        let provider = Arc::new(MockProvider::new());
        for i in 0..5u8 {
            let tx_hash = TxHash::new([i; 32]);
            provider.push_log(sample_log(u64::from(i), tx_hash, 0, 0));
            provider.set_block_timestamp(u64::from(i), 1_700_000_000);
            provider.set_receipt(
                tx_hash.into(),
                rpc_backend::types::TransactionReceipt {
                    tx_hash: tx_hash.into(),
                    block_hash: alloy::primitives::B256::ZERO,
                    block_number: u64::from(i),
                    tx_index: 0,
                    from: alloy::primitives::Address::ZERO,
                    to: None,
                    contract_address: None,
                    gas_used: 21_000,
                    success: true,
                    logs: vec![],
                },
            );
            provider.set_raw_tx(tx_hash.into(), alloy::primitives::Bytes::from_static(b"\x02\xf8"));
        }

        let indexer = Indexer::new(
            provider,
            Arc::new(MockEventStore::new()),
            Arc::new(MockCache::new()),
            1,
            vec![addr(1)],
            FetchParams::new(10, 2),
            IndexerParams {
                store_concurrency: 2,
                ..IndexerParams::default()
            },
        );
        indexer.index(BlockNumber::new(0), BlockNumber::new(4)).await.unwrap();

        let cursor = indexer
            .store
            .get_last_indexed(1, addr(1), IndexerStateKind::Confirmed)
            .await
            .unwrap();
        assert_eq!(cursor, Some(BlockNumber::new(4)));
        for i in 0..5u8 {
            assert!(indexer.cache.contains_tx_hash(&TxHash::new([i; 32]).into()));
        }
    }

    #[test]
    fn state_for_transitions_to_livefilling_within_threshold() {
        let provider = Arc::new(MockProvider::new());
        let indexer = make_indexer(provider);
        assert_eq!(
            indexer.state_for(BlockNumber::new(950), BlockNumber::new(1000)),
            IndexerState::Livefilling
        );
        assert_eq!(
            indexer.state_for(BlockNumber::new(900), BlockNumber::new(1000)),
            IndexerState::Backfilling
        );
    }
}
