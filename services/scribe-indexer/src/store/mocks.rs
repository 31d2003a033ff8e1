//! In-memory `EventStore` for unit tests that don't need a real database.
//!
//! Mirrors the confirmed/at-head table split of [`crate::store::PostgresStore`]
//! with plain `Mutex`-guarded `Vec`s and `HashMap`s, so the same write-order
//! and cursor-monotonicity behavior can be asserted without `testcontainers`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::ports::store::{EventStore, LogFilter, Page};
use crate::types::entities::{BlockTime, LastIndexed, Log, Receipt, Transaction};
use crate::types::enums::IndexerStateKind;
use crate::types::primitives::{BlockNumber, EthAddress};

type CursorKey = (u64, EthAddress, IndexerStateKind);

#[derive(Debug, Default)]
struct Tables {
    logs: Vec<Log>,
    receipts: Vec<Receipt>,
    txs: Vec<Transaction>,
    logs_at_head: Vec<Log>,
    receipts_at_head: Vec<Receipt>,
    txs_at_head: Vec<Transaction>,
    block_times: Vec<BlockTime>,
    last_indexed: HashMap<CursorKey, BlockNumber>,
}

/// In-memory [`EventStore`] implementation, guarded by a single mutex.
///
/// Not meant to scale: every operation locks the whole table set. Fine for
/// the unit tests it's built for.
#[derive(Debug, Default)]
pub struct MockEventStore {
    tables: Mutex<Tables>,
}

impl MockEventStore {
    /// Create an empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(log: &Log, filter: &LogFilter) -> bool {
    log.chain_id == filter.chain_id
        && log.block_number >= filter.from_block
        && log.block_number <= filter.to_block
        && filter.address.is_none_or(|a| a == log.address)
        && filter
            .topic0
            .is_none_or(|t| log.topics.first() == Some(&t))
}

fn paginate<T: Clone>(mut items: Vec<T>, page: Page) -> Vec<T> {
    let page = Page::new(page.limit, page.offset);
    let start = page.offset as usize;
    if start >= items.len() {
        return Vec::new();
    }
    let end = (start + page.limit as usize).min(items.len());
    items.drain(start..end).collect()
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn store_logs(&self, _chain_id: u64, logs: &[Log]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for log in logs {
            if !tables
                .logs
                .iter()
                .any(|l| l.block_hash == log.block_hash && l.log_index == log.log_index)
            {
                tables.logs.push(log.clone());
            }
        }
        Ok(())
    }

    async fn store_receipt(&self, chain_id: u64, receipt: &Receipt) -> Result<()> {
        {
            let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if !tables.receipts.iter().any(|r| r.tx_hash == receipt.tx_hash) {
                tables.receipts.push(receipt.clone());
            }
        }
        self.store_logs(chain_id, &receipt.logs).await
    }

    async fn store_tx(&self, _chain_id: u64, tx: &Transaction) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !tables.txs.iter().any(|t| t.tx_hash == tx.tx_hash) {
            tables.txs.push(tx.clone());
        }
        Ok(())
    }

    async fn store_block_time(&self, block_time: &BlockTime) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !tables
            .block_times
            .iter()
            .any(|b| b.chain_id == block_time.chain_id && b.block_number == block_time.block_number)
        {
            tables.block_times.push(*block_time);
        }
        Ok(())
    }

    async fn store_logs_at_head(&self, _chain_id: u64, logs: &[Log]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for log in logs {
            if !tables
                .logs_at_head
                .iter()
                .any(|l| l.block_hash == log.block_hash && l.log_index == log.log_index)
            {
                tables.logs_at_head.push(log.clone());
            }
        }
        Ok(())
    }

    async fn store_receipt_at_head(&self, chain_id: u64, receipt: &Receipt) -> Result<()> {
        {
            let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if !tables
                .receipts_at_head
                .iter()
                .any(|r| r.tx_hash == receipt.tx_hash)
            {
                tables.receipts_at_head.push(receipt.clone());
            }
        }
        self.store_logs_at_head(chain_id, &receipt.logs).await
    }

    async fn store_tx_at_head(&self, _chain_id: u64, tx: &Transaction) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !tables.txs_at_head.iter().any(|t| t.tx_hash == tx.tx_hash) {
            tables.txs_at_head.push(tx.clone());
        }
        Ok(())
    }

    async fn flush_from_head_tables(&self, _before_timestamp_ns: i64) -> Result<u64> {
        // The mock doesn't track insertion timestamps; callers that need
        // that precision should assert against `PostgresStore` instead.
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let removed = tables.logs_at_head.len() + tables.receipts_at_head.len() + tables.txs_at_head.len();
        tables.logs_at_head.clear();
        tables.receipts_at_head.clear();
        tables.txs_at_head.clear();
        Ok(removed as u64)
    }

    async fn retrieve_logs_with_filter(&self, filter: &LogFilter, page: Page) -> Result<Vec<Log>> {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matched: Vec<Log> = tables
            .logs
            .iter()
            .filter(|l| matches_filter(l, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.ordering_key().cmp(&a.ordering_key()));
        Ok(paginate(matched, page))
    }

    async fn retrieve_receipts_with_filter(
        &self,
        filter: &LogFilter,
        page: Page,
    ) -> Result<Vec<Receipt>> {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matched: Vec<Receipt> = tables
            .receipts
            .iter()
            .filter(|r| {
                r.chain_id == filter.chain_id
                    && r.block_number >= filter.from_block
                    && r.block_number <= filter.to_block
                    && filter.address.is_none_or(|a| r.contract_address == Some(a))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| (b.block_number, b.tx_index).cmp(&(a.block_number, a.tx_index)));
        Ok(paginate(matched, page))
    }

    async fn retrieve_logs_from_head_range_query(
        &self,
        filter: &LogFilter,
        start_block: BlockNumber,
        end_block: BlockNumber,
        page: Page,
    ) -> Result<Vec<Log>> {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let ranged = LogFilter {
            from_block: start_block,
            to_block: end_block,
            ..filter.clone()
        };

        // Confirmed logs take priority over at-head ones at the same
        // (tx_hash, log_index) — a log flushed to `logs` but not yet pruned
        // from `logs_at_head` must only be counted once.
        let mut seen = std::collections::HashSet::new();
        let mut matched: Vec<Log> = Vec::new();
        for log in tables.logs.iter().filter(|l| matches_filter(l, &ranged)) {
            seen.insert((log.tx_hash, log.log_index));
            matched.push(log.clone());
        }
        for log in tables.logs_at_head.iter().filter(|l| matches_filter(l, &ranged)) {
            if seen.insert((log.tx_hash, log.log_index)) {
                matched.push(log.clone());
            }
        }

        matched.sort_by(|a, b| (b.block_number, b.tx_index, b.log_index).cmp(&(a.block_number, a.tx_index, a.log_index)));
        Ok(paginate(matched, page))
    }

    async fn store_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
        block_number: BlockNumber,
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = (chain_id, contract, kind);
        let current = tables.last_indexed.get(&key).copied();
        if current.is_none_or(|c| block_number >= c) {
            tables.last_indexed.insert(key, block_number);
        }
        Ok(())
    }

    async fn store_last_indexed_multiple(&self, entries: &[LastIndexed]) -> Result<()> {
        for entry in entries {
            self.store_last_indexed(entry.chain_id, entry.contract, entry.kind, entry.block_number)
                .await?;
        }
        Ok(())
    }

    async fn get_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
    ) -> Result<Option<BlockNumber>> {
        let tables = self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(tables.last_indexed.get(&(chain_id, contract, kind)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> EthAddress {
        EthAddress::new([byte; 20])
    }

    fn sample_log(block: u64, log_index: u64) -> Log {
        Log {
            chain_id: 1,
            address: addr(1),
            block_number: BlockNumber::new(block),
            block_hash: crate::types::primitives::BlockHash::new([block as u8; 32]),
            tx_hash: crate::types::primitives::TxHash::new([1; 32]),
            tx_index: 0,
            log_index,
            topics: vec![],
            data: vec![],
            removed: false,
        }
    }

    #[tokio::test]
    async fn store_and_retrieve_logs_round_trip() {
        let store = MockEventStore::new();
        store.store_logs(1, &[sample_log(10, 0), sample_log(10, 1)]).await.unwrap();

        let filter = LogFilter {
            chain_id: 1,
            address: None,
            from_block: BlockNumber::new(0),
            to_block: BlockNumber::new(100),
            topic0: None,
        };
        let logs = store.retrieve_logs_with_filter(&filter, Page::default()).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[tokio::test]
    async fn store_logs_ignores_duplicates() {
        let store = MockEventStore::new();
        let log = sample_log(10, 0);
        store.store_logs(1, &[log.clone(), log]).await.unwrap();

        let filter = LogFilter {
            chain_id: 1,
            address: None,
            from_block: BlockNumber::new(0),
            to_block: BlockNumber::new(100),
            topic0: None,
        };
        let logs = store.retrieve_logs_with_filter(&filter, Page::default()).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn last_indexed_cursor_is_monotonic() {
        let store = MockEventStore::new();
        let contract = addr(2);
        store
            .store_last_indexed(1, contract, IndexerStateKind::Confirmed, BlockNumber::new(100))
            .await
            .unwrap();
        store
            .store_last_indexed(1, contract, IndexerStateKind::Confirmed, BlockNumber::new(50))
            .await
            .unwrap();

        let cursor = store
            .get_last_indexed(1, contract, IndexerStateKind::Confirmed)
            .await
            .unwrap();
        assert_eq!(cursor, Some(BlockNumber::new(100)));
    }

    fn log_with_distinct_tx(block: u64) -> Log {
        Log {
            tx_hash: crate::types::primitives::TxHash::new([block as u8; 32]),
            ..sample_log(block, 0)
        }
    }

    #[tokio::test]
    async fn head_range_query_spans_confirmed_and_at_head_tables() {
        let store = MockEventStore::new();
        let confirmed: Vec<Log> = (0..5).map(log_with_distinct_tx).collect();
        let at_head: Vec<Log> = (5..8).map(log_with_distinct_tx).collect();
        store.store_logs(1, &confirmed).await.unwrap();
        store.store_logs_at_head(1, &at_head).await.unwrap();

        let filter = LogFilter {
            chain_id: 1,
            address: None,
            from_block: BlockNumber::new(0),
            to_block: BlockNumber::new(100),
            topic0: None,
        };
        let logs = store
            .retrieve_logs_from_head_range_query(&filter, BlockNumber::new(0), BlockNumber::new(100), Page::default())
            .await
            .unwrap();

        assert_eq!(logs.len(), 8, "expected rows from both the confirmed and at-head tables");
        assert!(logs.windows(2).all(|w| w[0].block_number >= w[1].block_number), "expected descending block order");
    }

    #[tokio::test]
    async fn head_range_query_prefers_confirmed_over_at_head_duplicate() {
        let store = MockEventStore::new();
        let log = log_with_distinct_tx(10);
        store.store_logs(1, &[log.clone()]).await.unwrap();
        // Not yet pruned from the at-head table after confirmation.
        store.store_logs_at_head(1, &[log]).await.unwrap();

        let filter = LogFilter {
            chain_id: 1,
            address: None,
            from_block: BlockNumber::new(0),
            to_block: BlockNumber::new(100),
            topic0: None,
        };
        let logs = store
            .retrieve_logs_from_head_range_query(&filter, BlockNumber::new(0), BlockNumber::new(100), Page::default())
            .await
            .unwrap();

        assert_eq!(logs.len(), 1, "the same (tx_hash, log_index) must be counted once");
    }

    #[tokio::test]
    async fn flush_from_head_tables_clears_head_rows() {
        let store = MockEventStore::new();
        store.store_logs_at_head(1, &[sample_log(10, 0)]).await.unwrap();
        let removed = store.flush_from_head_tables(0).await.unwrap();
        assert_eq!(removed, 1);

        let filter = LogFilter {
            chain_id: 1,
            address: None,
            from_block: BlockNumber::new(0),
            to_block: BlockNumber::new(100),
            topic0: None,
        };
        let logs = store
            .retrieve_logs_from_head_range_query(&filter, BlockNumber::new(0), BlockNumber::new(100), Page::default())
            .await
            .unwrap();
        assert!(logs.is_empty());
    }
}
