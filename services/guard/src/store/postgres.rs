//! PostgreSQL implementation of [`GuardStore`] and [`SubmitterStore`] via SQLx.
//!
//! Mirrors the upstream indexer's store: one `PostgresStore` struct backing
//! both ports, `FromRow` row structs doing the `i64`/`Vec<u8>` <-> domain
//! type conversion, and writes that lean on Postgres's own `ON CONFLICT`
//! clauses rather than read-then-write races.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use sqlx::{FromRow, postgres::PgPool};
use tracing::instrument;

use crate::error::{InfraError, Result};
use crate::ports::store::GuardStore;
use crate::ports::submitter_store::SubmitterStore;
use crate::types::entities::{AgentRoot, AgentTree, Dispute, TxAttempt};
use crate::types::enums::{AgentFlag, AttemptStatus, DisputeStatus};

// ═══════════════════════════════════════════════════════════════════════════════
// POSTGRES STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// PostgreSQL-backed implementation of both [`GuardStore`] and [`SubmitterStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store over an already-configured connection pool.
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
struct DisputeRow {
    dispute_index: i64,
    chain_id: i64,
    guard_address: Vec<u8>,
    notary_address: Vec<u8>,
    status: i16,
    opened_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<DisputeRow> for Dispute {
    type Error = InfraError;

    fn try_from(row: DisputeRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            dispute_index: row.dispute_index as u64,
            chain_id: row.chain_id as u64,
            guard: Address::from_slice(&row.guard_address),
            notary: Address::from_slice(&row.notary_address),
            status: DisputeStatus::from_i16(row.status)
                .map_err(|e| InfraError::Internal(e.to_string()))?,
            opened_at: row.opened_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AgentTreeRow {
    chain_id: i64,
    agent: Vec<u8>,
    domain: i64,
    flag: i16,
    proof: Vec<Vec<u8>>,
    root: Vec<u8>,
    block_number: i64,
}

impl TryFrom<AgentTreeRow> for AgentTree {
    type Error = InfraError;

    fn try_from(row: AgentTreeRow) -> std::result::Result<Self, Self::Error> {
        let proof = row
            .proof
            .into_iter()
            .map(|p| {
                let arr: [u8; 32] = p
                    .try_into()
                    .map_err(|_| InfraError::Internal("invalid proof node length in DB".into()))?;
                Ok(B256::from(arr))
            })
            .collect::<std::result::Result<Vec<_>, InfraError>>()?;

        Ok(Self {
            chain_id: row.chain_id as u64,
            agent: Address::from_slice(&row.agent),
            domain: row.domain as u32,
            flag: AgentFlag::from_i16(row.flag).map_err(|e| InfraError::Internal(e.to_string()))?,
            proof,
            root: B256::from_slice(&row.root),
            block_number: row.block_number as u64,
        })
    }
}

#[derive(Debug, FromRow)]
struct AgentRootRow {
    chain_id: i64,
    root: Vec<u8>,
    block_number: i64,
}

impl From<AgentRootRow> for AgentRoot {
    fn from(row: AgentRootRow) -> Self {
        Self {
            chain_id: row.chain_id as u64,
            root: B256::from_slice(&row.root),
            block_number: row.block_number as u64,
        }
    }
}

#[derive(Debug, FromRow)]
struct TxAttemptRow {
    attempt_id: uuid::Uuid,
    signer: Vec<u8>,
    chain_id: i64,
    nonce: i64,
    status: i16,
    tx_hash: Option<Vec<u8>>,
    max_fee_per_gas: String,
    max_priority_fee_per_gas: String,
    to_address: Vec<u8>,
    calldata: Vec<u8>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<TxAttemptRow> for TxAttempt {
    type Error = InfraError;

    fn try_from(row: TxAttemptRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            attempt_id: row.attempt_id,
            signer: Address::from_slice(&row.signer),
            chain_id: row.chain_id as u64,
            nonce: row.nonce as u64,
            status: AttemptStatus::from_i16(row.status)
                .map_err(|e| InfraError::Internal(e.to_string()))?,
            tx_hash: row.tx_hash.map(|h| B256::from_slice(&h)),
            max_fee_per_gas: row
                .max_fee_per_gas
                .parse()
                .map_err(|_| InfraError::Internal("invalid max_fee_per_gas in DB".into()))?,
            max_priority_fee_per_gas: row
                .max_priority_fee_per_gas
                .parse()
                .map_err(|_| InfraError::Internal("invalid max_priority_fee_per_gas in DB".into()))?,
            to: Address::from_slice(&row.to_address),
            calldata: Bytes::from(row.calldata),
            created_at: row.created_at,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARD STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl GuardStore for PostgresStore {
    #[instrument(skip(self, dispute), fields(chain_id = dispute.chain_id, dispute_index = dispute.dispute_index))]
    async fn store_dispute(&self, dispute: &Dispute) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO disputes (dispute_index, chain_id, guard_address, notary_address, status, opened_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (chain_id, dispute_index) DO NOTHING
            ",
        )
        .bind(dispute.dispute_index as i64)
        .bind(dispute.chain_id as i64)
        .bind(dispute.guard.as_slice())
        .bind(dispute.notary.as_slice())
        .bind(dispute.status as i16)
        .bind(dispute.opened_at)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id, dispute_index, ?status))]
    async fn update_dispute_status(
        &self,
        chain_id: u64,
        dispute_index: u64,
        status: DisputeStatus,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE disputes SET status = $1
            WHERE chain_id = $2 AND dispute_index = $3
            ",
        )
        .bind(status as i16)
        .bind(chain_id as i64)
        .bind(dispute_index as i64)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id, %agent))]
    async fn get_open_dispute(&self, chain_id: u64, agent: Address) -> Result<Option<Dispute>> {
        let row = sqlx::query_as::<_, DisputeRow>(
            r"
            SELECT dispute_index, chain_id, guard_address, notary_address, status, opened_at
            FROM disputes
            WHERE chain_id = $1 AND (guard_address = $2 OR notary_address = $2) AND status = $3
            ORDER BY opened_at DESC
            LIMIT 1
            ",
        )
        .bind(chain_id as i64)
        .bind(agent.as_slice())
        .bind(DisputeStatus::Opened as i16)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        row.map(Dispute::try_from).transpose().map_err(Into::into)
    }

    #[instrument(skip(self, tree), fields(chain_id = tree.chain_id, agent = %tree.agent))]
    async fn store_agent_tree(&self, tree: &AgentTree) -> Result<()> {
        let proof: Vec<Vec<u8>> = tree.proof.iter().map(|p| p.as_slice().to_vec()).collect();
        sqlx::query(
            r"
            INSERT INTO agent_trees (chain_id, agent, domain, flag, proof, root, block_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (chain_id, agent, block_number) DO NOTHING
            ",
        )
        .bind(tree.chain_id as i64)
        .bind(tree.agent.as_slice())
        .bind(i64::from(tree.domain))
        .bind(tree.flag as i16)
        .bind(proof)
        .bind(tree.root.as_slice())
        .bind(tree.block_number as i64)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id, %agent))]
    async fn get_latest_agent_tree(&self, chain_id: u64, agent: Address) -> Result<Option<AgentTree>> {
        let row = sqlx::query_as::<_, AgentTreeRow>(
            r"
            SELECT chain_id, agent, domain, flag, proof, root, block_number
            FROM agent_trees
            WHERE chain_id = $1 AND agent = $2
            ORDER BY block_number DESC
            LIMIT 1
            ",
        )
        .bind(chain_id as i64)
        .bind(agent.as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        row.map(AgentTree::try_from).transpose().map_err(Into::into)
    }

    #[instrument(skip(self), fields(chain_id, min_block_number))]
    async fn get_agent_trees_since(&self, chain_id: u64, min_block_number: u64) -> Result<Vec<AgentTree>> {
        let rows = sqlx::query_as::<_, AgentTreeRow>(
            r"
            SELECT chain_id, agent, domain, flag, proof, root, block_number
            FROM agent_trees
            WHERE chain_id = $1 AND block_number >= $2
            ORDER BY block_number ASC
            ",
        )
        .bind(chain_id as i64)
        .bind(min_block_number as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        rows.into_iter().map(AgentTree::try_from).collect::<std::result::Result<_, _>>().map_err(Into::into)
    }

    #[instrument(skip(self, root), fields(chain_id = root.chain_id, block_number = root.block_number))]
    async fn store_agent_root(&self, root: &AgentRoot) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO agent_roots (chain_id, root, block_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (chain_id, block_number) DO NOTHING
            ",
        )
        .bind(root.chain_id as i64)
        .bind(root.root.as_slice())
        .bind(root.block_number as i64)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(chain_id))]
    async fn get_latest_agent_root(&self, chain_id: u64) -> Result<Option<AgentRoot>> {
        let row = sqlx::query_as::<_, AgentRootRow>(
            r"
            SELECT chain_id, root, block_number
            FROM agent_roots
            WHERE chain_id = $1
            ORDER BY block_number DESC
            LIMIT 1
            ",
        )
        .bind(chain_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(row.map(AgentRoot::from))
    }

    #[instrument(skip(self), fields(origin_domain, nonce))]
    async fn store_last_submitted_state(&self, origin_domain: u32, nonce: u64, block_hash: B256) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO last_submitted_state (origin_domain, nonce, block_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (origin_domain)
            DO UPDATE SET nonce = excluded.nonce, block_hash = excluded.block_hash
            WHERE excluded.nonce > last_submitted_state.nonce
            ",
        )
        .bind(i64::from(origin_domain))
        .bind(nonce as i64)
        .bind(block_hash.as_slice())
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(origin_domain))]
    async fn get_last_submitted_state(&self, origin_domain: u32) -> Result<Option<(u64, B256)>> {
        let row: Option<(i64, Vec<u8>)> = sqlx::query_as(
            r"
            SELECT nonce, block_hash FROM last_submitted_state WHERE origin_domain = $1
            ",
        )
        .bind(i64::from(origin_domain))
        .fetch_optional(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(row.map(|(nonce, hash)| (nonce as u64, B256::from_slice(&hash))))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBMITTER STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl SubmitterStore for PostgresStore {
    #[instrument(skip(self, attempt), fields(%attempt.signer, attempt.chain_id, attempt.nonce))]
    async fn insert_attempt(&self, attempt: &TxAttempt) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO tx_attempts
                (attempt_id, signer, chain_id, nonce, status, tx_hash, max_fee_per_gas, max_priority_fee_per_gas, to_address, calldata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(attempt.attempt_id)
        .bind(attempt.signer.as_slice())
        .bind(attempt.chain_id as i64)
        .bind(attempt.nonce as i64)
        .bind(attempt.status as i16)
        .bind(attempt.tx_hash.map(|h| h.as_slice().to_vec()))
        .bind(attempt.max_fee_per_gas.to_string())
        .bind(attempt.max_priority_fee_per_gas.to_string())
        .bind(attempt.to.as_slice())
        .bind(attempt.calldata.as_ref())
        .bind(attempt.created_at)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(%attempt_id, ?status))]
    async fn update_attempt_status(
        &self,
        attempt_id: uuid::Uuid,
        status: AttemptStatus,
        tx_hash: Option<B256>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE tx_attempts
            SET status = $1, tx_hash = COALESCE($2, tx_hash)
            WHERE attempt_id = $3
            ",
        )
        .bind(status as i16)
        .bind(tx_hash.map(|h| h.as_slice().to_vec()))
        .bind(attempt_id)
        .execute(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(())
    }

    #[instrument(skip(self), fields(%signer, chain_id, chain_reported_nonce))]
    async fn get_next_nonce(&self, signer: Address, chain_id: u64, chain_reported_nonce: u64) -> Result<u64> {
        let max_nonce: Option<i64> = sqlx::query_scalar(
            r"
            SELECT MAX(nonce) FROM tx_attempts WHERE signer = $1 AND chain_id = $2
            ",
        )
        .bind(signer.as_slice())
        .bind(chain_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        Ok(max_nonce.map_or(chain_reported_nonce, |n| (n as u64) + 1))
    }

    #[instrument(skip(self, statuses), fields(%signer, chain_id, nonce))]
    async fn get_attempts_by_nonce_and_status(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>> {
        let statuses: Vec<i16> = statuses.iter().map(|s| *s as i16).collect();
        let rows = sqlx::query_as::<_, TxAttemptRow>(
            r"
            SELECT attempt_id, signer, chain_id, nonce, status, tx_hash, max_fee_per_gas, max_priority_fee_per_gas, to_address, calldata, created_at
            FROM tx_attempts
            WHERE signer = $1 AND chain_id = $2 AND nonce = $3 AND status = ANY($4)
            ORDER BY created_at ASC
            ",
        )
        .bind(signer.as_slice())
        .bind(chain_id as i64)
        .bind(nonce as i64)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        rows.into_iter().map(TxAttempt::try_from).collect::<std::result::Result<_, _>>().map_err(Into::into)
    }

    #[instrument(skip(self, statuses), fields(%signer, chain_id))]
    async fn get_all_attempts_by_status(
        &self,
        signer: Address,
        chain_id: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>> {
        let statuses: Vec<i16> = statuses.iter().map(|s| *s as i16).collect();
        let rows = sqlx::query_as::<_, TxAttemptRow>(
            r"
            SELECT attempt_id, signer, chain_id, nonce, status, tx_hash, max_fee_per_gas, max_priority_fee_per_gas, to_address, calldata, created_at
            FROM tx_attempts
            WHERE signer = $1 AND chain_id = $2 AND status = ANY($3)
            ORDER BY nonce ASC, created_at ASC
            ",
        )
        .bind(signer.as_slice())
        .bind(chain_id as i64)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .map_err(InfraError::Database)?;
        rows.into_iter().map(TxAttempt::try_from).collect::<std::result::Result<_, _>>().map_err(Into::into)
    }

    #[instrument(skip(self), fields(%signer, chain_id, nonce, %confirmed_attempt_id))]
    async fn mark_before_or_at_nonce_replaced_or_confirmed(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        confirmed_attempt_id: uuid::Uuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(InfraError::Database)?;

        sqlx::query(
            r"
            UPDATE tx_attempts SET status = $1
            WHERE signer = $2 AND chain_id = $3 AND nonce = $4 AND attempt_id = $5
            ",
        )
        .bind(AttemptStatus::Confirmed as i16)
        .bind(signer.as_slice())
        .bind(chain_id as i64)
        .bind(nonce as i64)
        .bind(confirmed_attempt_id)
        .execute(&mut *tx)
        .await
        .map_err(InfraError::Database)?;

        sqlx::query(
            r"
            UPDATE tx_attempts SET status = $1
            WHERE signer = $2 AND chain_id = $3 AND nonce <= $4 AND attempt_id != $5
            ",
        )
        .bind(AttemptStatus::Replaced as i16)
        .bind(signer.as_slice())
        .bind(chain_id as i64)
        .bind(nonce as i64)
        .bind(confirmed_attempt_id)
        .execute(&mut *tx)
        .await
        .map_err(InfraError::Database)?;

        tx.commit().await.map_err(InfraError::Database)?;
        Ok(())
    }
}
