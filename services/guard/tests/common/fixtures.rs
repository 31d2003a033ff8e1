//! Test fixtures for integration tests.

use sqlx::PgPool;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;

use super::containers::{TestPostgres, build_connection_string};
use guard::store::PostgresStore;

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

/// Builders for the guard domain entities (`Dispute`, `AgentTree`, `AgentRoot`, `TxAttempt`).
pub mod guard_fixtures {
    use alloy::primitives::{Address, Bytes, B256};
    use chrono::Utc;
    use guard::types::entities::{AgentRoot, AgentTree, Dispute, TxAttempt};
    use guard::types::enums::{AgentFlag, AttemptStatus, DisputeStatus};

    /// Build an opened dispute between `guard` and `notary` on `chain_id`.
    pub fn dispute(chain_id: u64, dispute_index: u64, guard: Address, notary: Address) -> Dispute {
        Dispute {
            dispute_index,
            chain_id,
            guard,
            notary,
            status: DisputeStatus::Opened,
            opened_at: Utc::now(),
        }
    }

    /// Build an agent tree snapshot with a single-node proof.
    pub fn agent_tree(chain_id: u64, agent: Address, block_number: u64) -> AgentTree {
        AgentTree {
            chain_id,
            agent,
            domain: 1,
            flag: AgentFlag::Active,
            proof: vec![B256::from([0x11; 32])],
            root: B256::from([0x22; 32]),
            block_number,
        }
    }

    /// Build a hub-wide agent root observed at `block_number`.
    pub fn agent_root(chain_id: u64, block_number: u64) -> AgentRoot {
        AgentRoot {
            chain_id,
            root: B256::from([0x33; 32]),
            block_number,
        }
    }

    /// Build a pending transaction attempt consuming `nonce`.
    pub fn tx_attempt(signer: Address, chain_id: u64, nonce: u64) -> TxAttempt {
        TxAttempt {
            attempt_id: uuid::Uuid::new_v4(),
            signer,
            chain_id,
            nonce,
            status: AttemptStatus::Submitted,
            tx_hash: Some(B256::from([0x44; 32])),
            max_fee_per_gas: 1_000_000_000,
            max_priority_fee_per_gas: 1_000_000,
            to: Address::from([0x55; 20]),
            calldata: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
            created_at: Utc::now(),
        }
    }
}
