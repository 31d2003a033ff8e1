//! Storage ports: the `EventStore` the Indexer writes through and callers
//! read from, independent of any particular backend.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::{BlockTime, LastIndexed, Log, Receipt, Transaction};
use crate::types::enums::IndexerStateKind;
use crate::types::primitives::{BlockNumber, EthAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter for `retrieve_logs_with_filter`/`retrieve_receipts_with_filter`.
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Chain to query.
    pub chain_id: u64,
    /// Restrict to this contract address, or `None` for all tracked contracts.
    pub address: Option<EthAddress>,
    /// Inclusive start of the block range.
    pub from_block: BlockNumber,
    /// Inclusive end of the block range.
    pub to_block: BlockNumber,
    /// Optional topic0 filter (event signature hash).
    pub topic0: Option<[u8; 32]>,
}

/// Fixed-size pagination cursor.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Maximum rows to return; implementations cap this at a fixed page size.
    pub limit: u32,
    /// Rows to skip before the first returned row.
    pub offset: u32,
}

impl Page {
    /// The page size enforced by every `EventStore` implementation.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page, clamping `limit` to [`Page::MAX_LIMIT`].
    #[must_use]
    pub const fn new(limit: u32, offset: u32) -> Self {
        let limit = if limit > Self::MAX_LIMIT {
            Self::MAX_LIMIT
        } else {
            limit
        };
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::MAX_LIMIT, 0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Persistence port for indexed chain data.
///
/// `EventStore` owns all event data: logs, receipts,
/// transactions, block timestamps, and the per-contract `LastIndexed`
/// cursors, each split into a confirmed table and a parallel "at head" table
/// that the livefill path writes to and that can be mass-deleted by
/// [`EventStore::flush_from_head_tables`].
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Upsert logs into the confirmed table. Duplicates (same key) are ignored.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_logs(&self, chain_id: u64, logs: &[Log]) -> Result<()>;

    /// Upsert a receipt (and its embedded logs) into the confirmed table.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_receipt(&self, chain_id: u64, receipt: &Receipt) -> Result<()>;

    /// Upsert a raw transaction into the confirmed table.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_tx(&self, chain_id: u64, tx: &Transaction) -> Result<()>;

    /// Upsert a block timestamp.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_block_time(&self, block_time: &BlockTime) -> Result<()>;

    /// Upsert logs into the at-head table (livefill path).
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_logs_at_head(&self, chain_id: u64, logs: &[Log]) -> Result<()>;

    /// Upsert a receipt into the at-head table (livefill path).
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_receipt_at_head(&self, chain_id: u64, receipt: &Receipt) -> Result<()>;

    /// Upsert a raw transaction into the at-head table (livefill path).
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_tx_at_head(&self, chain_id: u64, tx: &Transaction) -> Result<()>;

    /// Delete every at-head row inserted before `before_timestamp_ns`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn flush_from_head_tables(&self, before_timestamp_ns: i64) -> Result<u64>;

    /// Paginated confirmed-log query, ordered by `(block_number desc, tx_index
    /// desc, log_index desc)`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn retrieve_logs_with_filter(&self, filter: &LogFilter, page: Page) -> Result<Vec<Log>>;

    /// Paginated confirmed-receipt query, same ordering as
    /// [`EventStore::retrieve_logs_with_filter`].
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn retrieve_receipts_with_filter(
        &self,
        filter: &LogFilter,
        page: Page,
    ) -> Result<Vec<Receipt>>;

    /// Paginated log query over an explicit block range, spanning both the
    /// confirmed and at-head tables so a range straddling the confirmation
    /// cutover returns every matching log exactly once regardless of which
    /// table currently holds it.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn retrieve_logs_from_head_range_query(
        &self,
        filter: &LogFilter,
        start_block: BlockNumber,
        end_block: BlockNumber,
        page: Page,
    ) -> Result<Vec<Log>>;

    /// Monotonically advance the `LastIndexed` cursor for one contract.
    ///
    /// Implementations MUST ignore writes with a block number lower than the
    /// currently persisted value.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
        block_number: BlockNumber,
    ) -> Result<()>;

    /// Batch form of [`EventStore::store_last_indexed`] for a concurrency-batch flush.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn store_last_indexed_multiple(&self, entries: &[LastIndexed]) -> Result<()>;

    /// Read the current `LastIndexed` cursor for one contract, if any.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
    ) -> Result<Option<BlockNumber>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_max_limit() {
        let page = Page::new(10_000, 0);
        assert_eq!(page.limit, Page::MAX_LIMIT);
    }

    #[test]
    fn page_default_uses_max_limit_from_zero_offset() {
        let page = Page::default();
        assert_eq!(page.limit, Page::MAX_LIMIT);
        assert_eq!(page.offset, 0);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    fn check_event_store<T: EventStore>() {
        assert_send_sync::<T>();
    }

    #[test]
    fn event_store_trait_requires_send_sync() {
        fn compile_time_check<T: EventStore>() {
            check_event_store::<T>();
        }
        let _ = compile_time_check::<crate::store::mocks::MockEventStore>;
    }
}
