//! Test fixtures for integration tests.

use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;

use super::containers::{TestPostgres, build_connection_string};
use scribe_indexer::store::PostgresStore;

/// A test database instance backed by a disposable Postgres container.
pub struct TestDb {
    pub pool: PgPool,
    pub store: PostgresStore,
    _container: ContainerAsync<TestPostgres>,
}

impl TestDb {
    pub async fn new() -> Self {
        let container = TestPostgres::default()
            .start()
            .await
            .expect("failed to start postgres container");
        let host = container.get_host().await.expect("failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("failed to get port");
        let connection_string = build_connection_string(&host.to_string(), port);
        let pool = connect_with_retries(&connection_string, 30)
            .await
            .expect("failed to connect to database");
        let store = PostgresStore::new(pool.clone());
        store
            .run_migrations()
            .await
            .expect("failed to run migrations");
        Self {
            pool,
            store,
            _container: container,
        }
    }
}

async fn connect_with_retries(url: &str, max_attempts: u32) -> Result<PgPool, sqlx::Error> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match PgPool::connect(url).await {
            Ok(pool) => match sqlx::query("SELECT 1").execute(&pool).await {
                Ok(_) => return Ok(pool),
                Err(e) if attempts < max_attempts => {
                    tracing::debug!("connection verify failed (attempt {attempts}): {e}");
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e),
            },
            Err(e) if attempts < max_attempts => {
                tracing::debug!("connection failed (attempt {attempts}): {e}");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Builders for the chain-level entities (`Log`, `Receipt`, `Transaction`, `BlockTime`).
pub mod chain_fixtures {
    use chrono::Utc;
    use scribe_indexer::types::entities::{BlockTime, Log, Receipt, Transaction};
    use scribe_indexer::types::primitives::{BlockHash, BlockNumber, EthAddress, TxHash};

    /// Build a log for `chain_id` at `block_number`, with the given `(tx_index, log_index)`.
    pub fn log(chain_id: u64, block_number: u64, tx_index: u64, log_index: u64) -> Log {
        Log {
            chain_id,
            address: EthAddress::new([0xAA; 20]),
            block_number: BlockNumber::new(block_number),
            block_hash: BlockHash::new([block_number as u8; 32]),
            tx_hash: TxHash::new([tx_index as u8; 32]),
            tx_index,
            log_index,
            topics: vec![[0x01; 32]],
            data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            removed: false,
        }
    }

    /// Same as [`log`] but tagged with an explicit contract `address`.
    pub fn log_from(
        chain_id: u64,
        address: EthAddress,
        block_number: u64,
        tx_index: u64,
        log_index: u64,
    ) -> Log {
        Log {
            address,
            ..log(chain_id, block_number, tx_index, log_index)
        }
    }

    /// Build a receipt carrying `logs`, keyed by the first log's transaction.
    pub fn receipt(chain_id: u64, block_number: u64, tx_index: u64, logs: Vec<Log>) -> Receipt {
        Receipt {
            chain_id,
            tx_hash: TxHash::new([tx_index as u8; 32]),
            status: true,
            contract_address: Some(EthAddress::new([0xAA; 20])),
            cumulative_gas_used: 100_000,
            gas_used: 21_000,
            block_hash: BlockHash::new([block_number as u8; 32]),
            block_number: BlockNumber::new(block_number),
            tx_index,
            logs_bloom: vec![0; 256],
            logs,
        }
    }

    /// Build a raw transaction.
    pub fn transaction(chain_id: u64, block_number: u64, tx_index: u64) -> Transaction {
        Transaction {
            chain_id,
            tx_hash: TxHash::new([tx_index as u8; 32]),
            block_hash: BlockHash::new([block_number as u8; 32]),
            block_number: BlockNumber::new(block_number),
            tx_index,
            raw: vec![0x02, 0xf8, 0x6c],
        }
    }

    /// Build a block timestamp record, offset from now by `block_number` seconds.
    pub fn block_time(chain_id: u64, block_number: u64) -> BlockTime {
        BlockTime {
            chain_id,
            block_number: BlockNumber::new(block_number),
            timestamp: Utc::now() + chrono::Duration::seconds(block_number as i64),
        }
    }
}
