//! PostgreSQL implementation of the [`crate::ports::EventStore`] port using SQLx.
//!
//! Logs, receipts, and transactions each have a confirmed table and a
//! parallel "at head" table; `LastIndexed`
//! cursors are keyed by `(chain_id, contract, kind)` and writes are clamped
//! to be monotonic in the query itself
//! (`GREATEST(block_number, excluded.block_number)`), so a stale concurrent
//! write can never roll a cursor backwards.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]

use async_trait::async_trait;
use sqlx::{FromRow, postgres::PgPool};
use tracing::instrument;

use crate::error::{InfraError, Result};
use crate::ports::{EventStore, LogFilter, Page};
use crate::types::entities::{BlockTime, LastIndexed, Log, Receipt, Transaction};
use crate::types::enums::IndexerStateKind;
use crate::types::primitives::{BlockHash, BlockNumber, EthAddress, TxHash};

// ═══════════════════════════════════════════════════════════════════════════════
// POSTGRES STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// PostgreSQL-based implementation of [`EventStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations.
    ///
    /// # Errors
    /// Returns an error if migrations fail to apply.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| InfraError::Internal(format!("migration error: {e}")))?;
        Ok(())
    }

    /// Roll back the most recently applied migration.
    ///
    /// # Errors
    /// Returns an error if no migration has been applied or the rollback fails.
    pub async fn revert_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("./migrations");
        let mut conn = self.pool.acquire().await.map_err(InfraError::Database)?;
        let applied = sqlx::migrate::Migrate::list_applied_migrations(&mut *conn)
            .await
            .map_err(|e| InfraError::Internal(format!("migration error: {e}")))?;
        let Some(last) = applied.last() else {
            return Err(InfraError::Internal("no applied migrations to revert".into()).into());
        };
        migrator
            .undo(&self.pool, last.version)
            .await
            .map_err(|e| InfraError::Internal(format!("migration error: {e}")))?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROW TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, FromRow)]
struct LogRow {
    chain_id: i64,
    address: Vec<u8>,
    block_number: i64,
    block_hash: Vec<u8>,
    tx_hash: Vec<u8>,
    tx_index: i64,
    log_index: i64,
    topics: Vec<Vec<u8>>,
    data: Vec<u8>,
    removed: bool,
}

impl TryFrom<LogRow> for Log {
    type Error = InfraError;

    fn try_from(row: LogRow) -> std::result::Result<Self, Self::Error> {
        let topics = row
            .topics
            .into_iter()
            .map(|t| {
                let arr: [u8; 32] = t
                    .try_into()
                    .map_err(|_| InfraError::Internal("invalid topic length in DB".into()))?;
                Ok(arr)
            })
            .collect::<std::result::Result<Vec<_>, InfraError>>()?;

        Ok(Self {
            chain_id: row.chain_id as u64,
            address: EthAddress::from_slice(&row.address)
                .map_err(|e| InfraError::Internal(format!("invalid address in DB: {e}")))?,
            block_number: BlockNumber::new(row.block_number as u64),
            block_hash: BlockHash::from_slice(&row.block_hash)
                .map_err(|e| InfraError::Internal(format!("invalid block hash in DB: {e}")))?,
            tx_hash: TxHash::from_slice(&row.tx_hash)
                .map_err(|e| InfraError::Internal(format!("invalid tx hash in DB: {e}")))?,
            tx_index: row.tx_index as u64,
            log_index: row.log_index as u64,
            topics,
            data: row.data,
            removed: row.removed,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl EventStore for PostgresStore {
    #[instrument(skip(self, logs), fields(chain_id, count = logs.len()))]
    async fn store_logs(&self, chain_id: u64, logs: &[Log]) -> Result<()> {
        store_logs_into(&self.pool, "logs", chain_id, logs).await
    }

    #[instrument(skip(self, receipt), fields(chain_id, tx_hash = %receipt.tx_hash))]
    async fn store_receipt(&self, chain_id: u64, receipt: &Receipt) -> Result<()> {
        store_receipt_into(&self.pool, "receipts", chain_id, receipt).await
    }

    #[instrument(skip(self, tx), fields(chain_id, tx_hash = %tx.tx_hash))]
    async fn store_tx(&self, chain_id: u64, tx: &Transaction) -> Result<()> {
        store_tx_into(&self.pool, "transactions", chain_id, tx).await
    }

    #[instrument(skip(self), fields(chain_id = block_time.chain_id, block_number = %block_time.block_number))]
    async fn store_block_time(&self, block_time: &BlockTime) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO block_times (chain_id, block_number, timestamp)
            VALUES ($1, $2, $3)
            ON CONFLICT (chain_id, block_number) DO NOTHING
            ",
        )
        .bind(block_time.chain_id as i64)
        .bind(i64::from(block_time.block_number))
        .bind(block_time.timestamp)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self, logs), fields(chain_id, count = logs.len()))]
    async fn store_logs_at_head(&self, chain_id: u64, logs: &[Log]) -> Result<()> {
        store_logs_into(&self.pool, "logs_at_head", chain_id, logs).await
    }

    #[instrument(skip(self, receipt), fields(chain_id, tx_hash = %receipt.tx_hash))]
    async fn store_receipt_at_head(&self, chain_id: u64, receipt: &Receipt) -> Result<()> {
        store_receipt_into(&self.pool, "receipts_at_head", chain_id, receipt).await
    }

    #[instrument(skip(self, tx), fields(chain_id, tx_hash = %tx.tx_hash))]
    async fn store_tx_at_head(&self, chain_id: u64, tx: &Transaction) -> Result<()> {
        store_tx_into(&self.pool, "transactions_at_head", chain_id, tx).await
    }

    #[instrument(skip(self))]
    async fn flush_from_head_tables(&self, before_timestamp_ns: i64) -> Result<u64> {
        let mut total = 0_u64;
        for table in ["logs_at_head", "receipts_at_head", "transactions_at_head"] {
            let result = sqlx::query(&format!(
                "DELETE FROM {table} WHERE inserted_at_ns < $1"
            ))
            .bind(before_timestamp_ns)
            .execute(&self.pool)
            .await
            .map_err(InfraError::Database)?;
            total += result.rows_affected();
        }
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn retrieve_logs_with_filter(&self, filter: &LogFilter, page: Page) -> Result<Vec<Log>> {
        retrieve_logs_from(&self.pool, "logs", filter, page).await
    }

    #[instrument(skip(self))]
    async fn retrieve_receipts_with_filter(
        &self,
        filter: &LogFilter,
        page: Page,
    ) -> Result<Vec<Receipt>> {
        #[allow(clippy::type_complexity)]
        let rows: Vec<(Vec<u8>, bool, Option<Vec<u8>>, i64, i64, Vec<u8>, i64, i64, Vec<u8>)> =
            sqlx::query_as(
                r"
                SELECT tx_hash, status, contract_address, cumulative_gas_used, gas_used,
                       block_hash, block_number, tx_index, logs_bloom
                FROM receipts
                WHERE chain_id = $1
                  AND block_number BETWEEN $2 AND $3
                  AND ($4::bytea IS NULL OR contract_address = $4)
                ORDER BY block_number DESC, tx_index DESC
                LIMIT $5 OFFSET $6
                ",
            )
            .bind(filter.chain_id as i64)
            .bind(i64::from(filter.from_block))
            .bind(i64::from(filter.to_block))
            .bind(filter.address.map(|a| a.as_bytes().to_vec()))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(InfraError::Database)?;

        let mut receipts = Vec::with_capacity(rows.len());
        for (
            tx_hash,
            status,
            contract_address,
            cumulative_gas_used,
            gas_used,
            block_hash,
            block_number,
            tx_index,
            logs_bloom,
        ) in rows
        {
            let tx_hash = TxHash::from_slice(&tx_hash)
                .map_err(|e| InfraError::Internal(format!("invalid tx hash in DB: {e}")))?;
            let logs = retrieve_logs_from(
                &self.pool,
                "logs",
                &LogFilter {
                    chain_id: filter.chain_id,
                    address: None,
                    from_block: BlockNumber::new(block_number as u64),
                    to_block: BlockNumber::new(block_number as u64),
                    topic0: None,
                },
                Page::new(Page::MAX_LIMIT, 0),
            )
            .await?
            .into_iter()
            .filter(|log| log.tx_hash == tx_hash)
            .collect();

            receipts.push(Receipt {
                chain_id: filter.chain_id,
                tx_hash,
                status,
                contract_address: contract_address
                    .map(|a| EthAddress::from_slice(&a))
                    .transpose()
                    .map_err(|e| InfraError::Internal(format!("invalid address in DB: {e}")))?,
                cumulative_gas_used: cumulative_gas_used as u64,
                gas_used: gas_used as u64,
                block_hash: BlockHash::from_slice(&block_hash)
                    .map_err(|e| InfraError::Internal(format!("invalid block hash in DB: {e}")))?,
                block_number: BlockNumber::new(block_number as u64),
                tx_index: tx_index as u64,
                logs_bloom,
                logs,
            });
        }
        Ok(receipts)
    }

    #[instrument(skip(self))]
    async fn retrieve_logs_from_head_range_query(
        &self,
        filter: &LogFilter,
        start_block: BlockNumber,
        end_block: BlockNumber,
        page: Page,
    ) -> Result<Vec<Log>> {
        let ranged = LogFilter {
            from_block: start_block,
            to_block: end_block,
            ..filter.clone()
        };
        retrieve_logs_from_confirmed_and_head(&self.pool, &ranged, page).await
    }

    #[instrument(skip(self), fields(chain_id, %contract, block_number = %block_number))]
    async fn store_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
        block_number: BlockNumber,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO last_indexed (chain_id, contract, kind, block_number)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (chain_id, contract, kind)
            DO UPDATE SET block_number = GREATEST(last_indexed.block_number, excluded.block_number)
            ",
        )
        .bind(chain_id as i64)
        .bind(contract.as_bytes().as_slice())
        .bind(kind as i16)
        .bind(i64::from(block_number))
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn store_last_indexed_multiple(&self, entries: &[LastIndexed]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(InfraError::Database)?;
        for entry in entries {
            sqlx::query(
                r"
                INSERT INTO last_indexed (chain_id, contract, kind, block_number)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (chain_id, contract, kind)
                DO UPDATE SET block_number = GREATEST(last_indexed.block_number, excluded.block_number)
                ",
            )
            .bind(entry.chain_id as i64)
            .bind(entry.contract.as_bytes().as_slice())
            .bind(entry.kind as i16)
            .bind(i64::from(entry.block_number))
            .execute(&mut *tx)
            .await
            .map_err(InfraError::Database)?;
        }
        tx.commit().await.map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id, %contract))]
    async fn get_last_indexed(
        &self,
        chain_id: u64,
        contract: EthAddress,
        kind: IndexerStateKind,
    ) -> Result<Option<BlockNumber>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT block_number FROM last_indexed
            WHERE chain_id = $1 AND contract = $2 AND kind = $3
            ",
        )
        .bind(chain_id as i64)
        .bind(contract.as_bytes().as_slice())
        .bind(kind as i16)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfraError::Database)?;

        Ok(row.map(|(block_number,)| BlockNumber::new(block_number as u64)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED HELPERS (confirmed/at-head tables share the same column layout)
// ═══════════════════════════════════════════════════════════════════════════════

async fn store_logs_into(pool: &PgPool, table: &str, chain_id: u64, logs: &[Log]) -> Result<()> {
    if logs.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await.map_err(InfraError::Database)?;
    for log in logs {
        let topics: Vec<Vec<u8>> = log.topics.iter().map(|t| t.to_vec()).collect();
        sqlx::query(&format!(
            r"
            INSERT INTO {table}
                (chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
                 topics, data, removed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (chain_id, block_hash, log_index) DO NOTHING
            "
        ))
        .bind(chain_id as i64)
        .bind(log.address.as_bytes().as_slice())
        .bind(i64::from(log.block_number))
        .bind(log.block_hash.as_bytes().as_slice())
        .bind(log.tx_hash.as_bytes().as_slice())
        .bind(log.tx_index as i64)
        .bind(log.log_index as i64)
        .bind(&topics)
        .bind(&log.data)
        .bind(log.removed)
        .execute(&mut *tx)
        .await
        .map_err(InfraError::Database)?;
    }
    tx.commit().await.map_err(InfraError::Database)?;
    Ok(())
}

async fn store_receipt_into(
    pool: &PgPool,
    table: &str,
    chain_id: u64,
    receipt: &Receipt,
) -> Result<()> {
    sqlx::query(&format!(
        r"
        INSERT INTO {table}
            (chain_id, tx_hash, status, contract_address, cumulative_gas_used, gas_used,
             block_hash, block_number, tx_index, logs_bloom)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (chain_id, tx_hash) DO NOTHING
        "
    ))
    .bind(chain_id as i64)
    .bind(receipt.tx_hash.as_bytes().as_slice())
    .bind(receipt.status)
    .bind(receipt.contract_address.map(|a| a.as_bytes().to_vec()))
    .bind(receipt.cumulative_gas_used as i64)
    .bind(receipt.gas_used as i64)
    .bind(receipt.block_hash.as_bytes().as_slice())
    .bind(i64::from(receipt.block_number))
    .bind(receipt.tx_index as i64)
    .bind(&receipt.logs_bloom)
    .execute(pool)
    .await
    .map_err(InfraError::Database)?;

    let logs_table = if table == "receipts_at_head" {
        "logs_at_head"
    } else {
        "logs"
    };
    store_logs_into(pool, logs_table, chain_id, &receipt.logs).await
}

async fn store_tx_into(pool: &PgPool, table: &str, chain_id: u64, tx: &Transaction) -> Result<()> {
    sqlx::query(&format!(
        r"
        INSERT INTO {table} (chain_id, tx_hash, block_hash, block_number, tx_index, raw)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (chain_id, tx_hash) DO NOTHING
        "
    ))
    .bind(chain_id as i64)
    .bind(tx.tx_hash.as_bytes().as_slice())
    .bind(tx.block_hash.as_bytes().as_slice())
    .bind(i64::from(tx.block_number))
    .bind(tx.tx_index as i64)
    .bind(&tx.raw)
    .execute(pool)
    .await
    .map_err(InfraError::Database)?;
    Ok(())
}

async fn retrieve_logs_from(
    pool: &PgPool,
    table: &str,
    filter: &LogFilter,
    page: Page,
) -> Result<Vec<Log>> {
    let rows: Vec<LogRow> = sqlx::query_as(&format!(
        r"
        SELECT chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
               topics, data, removed
        FROM {table}
        WHERE chain_id = $1
          AND block_number BETWEEN $2 AND $3
          AND ($4::bytea IS NULL OR address = $4)
          AND ($5::bytea IS NULL OR topics[1] = $5)
        ORDER BY block_number DESC, tx_index DESC, log_index DESC
        LIMIT $6 OFFSET $7
        "
    ))
    .bind(filter.chain_id as i64)
    .bind(i64::from(filter.from_block))
    .bind(i64::from(filter.to_block))
    .bind(filter.address.map(|a| a.as_bytes().to_vec()))
    .bind(filter.topic0.map(|t| t.to_vec()))
    .bind(i64::from(page.limit))
    .bind(i64::from(page.offset))
    .fetch_all(pool)
    .await
    .map_err(InfraError::Database)?;

    Ok(rows
        .into_iter()
        .map(Log::try_from)
        .collect::<std::result::Result<Vec<_>, InfraError>>()?)
}

/// Retrieves logs spanning both the confirmed `logs` table and the at-head
/// `logs_at_head` table within `filter`'s block range, so a query straddling
/// the confirmation cutover (part of the range already flushed to `logs`,
/// the rest still only in `logs_at_head`) sees every row exactly once.
/// `logs_at_head` is deduplicated against `logs` by `(tx_hash, log_index)` —
/// a log that has been confirmed and flushed but not yet pruned from the
/// at-head table is counted once, from `logs`.
async fn retrieve_logs_from_confirmed_and_head(pool: &PgPool, filter: &LogFilter, page: Page) -> Result<Vec<Log>> {
    let rows: Vec<LogRow> = sqlx::query_as(
        r"
        SELECT chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
               topics, data, removed
        FROM (
            SELECT DISTINCT ON (tx_hash, log_index)
                   chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
                   topics, data, removed
            FROM (
                SELECT chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
                       topics, data, removed, 0 AS source_priority
                FROM logs
                WHERE chain_id = $1
                  AND block_number BETWEEN $2 AND $3
                  AND ($4::bytea IS NULL OR address = $4)
                  AND ($5::bytea IS NULL OR topics[1] = $5)
                UNION ALL
                SELECT chain_id, address, block_number, block_hash, tx_hash, tx_index, log_index,
                       topics, data, removed, 1 AS source_priority
                FROM logs_at_head
                WHERE chain_id = $1
                  AND block_number BETWEEN $2 AND $3
                  AND ($4::bytea IS NULL OR address = $4)
                  AND ($5::bytea IS NULL OR topics[1] = $5)
            ) both_tables
            ORDER BY tx_hash, log_index, source_priority
        ) combined
        ORDER BY block_number DESC, tx_index DESC, log_index DESC
        LIMIT $6 OFFSET $7
        ",
    )
    .bind(filter.chain_id as i64)
    .bind(i64::from(filter.from_block))
    .bind(i64::from(filter.to_block))
    .bind(filter.address.map(|a| a.as_bytes().to_vec()))
    .bind(filter.topic0.map(|t| t.to_vec()))
    .bind(i64::from(page.limit))
    .bind(i64::from(page.offset))
    .fetch_all(pool)
    .await
    .map_err(InfraError::Database)?;

    Ok(rows
        .into_iter()
        .map(Log::try_from)
        .collect::<std::result::Result<Vec<_>, InfraError>>()?)
}
