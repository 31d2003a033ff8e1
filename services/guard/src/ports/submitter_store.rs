//! Storage port for `TxSubmitter`'s nonce/attempt bookkeeping, independent
//! of any particular backend.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

use crate::error::Result;
use crate::types::entities::TxAttempt;
use crate::types::enums::AttemptStatus;

/// Persistence port for transaction attempts.
///
/// Every write is scoped to `(signer, chain_id)`. Callers must serialize
/// [`SubmitterStore::get_next_nonce`] against [`SubmitterStore::insert_attempt`]
/// for the same `(signer, chain_id)` themselves (`TxSubmitter` does this with
/// a per-`(signer, chain_id)` lock), since the port itself exposes no
/// transaction boundary spanning both calls.
#[async_trait]
pub trait SubmitterStore: Send + Sync {
    /// Insert a new attempt row.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn insert_attempt(&self, attempt: &TxAttempt) -> Result<()>;

    /// Update an attempt's status (and `tx_hash`, if newly known).
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn update_attempt_status(
        &self,
        attempt_id: uuid::Uuid,
        status: AttemptStatus,
        tx_hash: Option<B256>,
    ) -> Result<()>;

    /// The next nonce to allocate for `(signer, chain_id)`: one past the
    /// highest nonce across every attempt regardless of status, or the
    /// chain's reported nonce if this signer has no attempts on file yet.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_next_nonce(
        &self,
        signer: Address,
        chain_id: u64,
        chain_reported_nonce: u64,
    ) -> Result<u64>;

    /// All attempts for `(signer, chain_id, nonce)` whose status is one of
    /// `statuses`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_attempts_by_nonce_and_status(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>>;

    /// All attempts for `(signer, chain_id)` whose status is one of
    /// `statuses`, across every nonce — used by the reconciliation loop to
    /// find attempts due for a confirmation check or a gas bump.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn get_all_attempts_by_status(
        &self,
        signer: Address,
        chain_id: u64,
        statuses: &[AttemptStatus],
    ) -> Result<Vec<TxAttempt>>;

    /// Marks every open attempt at or below `nonce` as `Replaced`, except
    /// whichever one is being promoted to `Confirmed` in the same call.
    /// Invariant enforcement after a confirmation: at most one attempt per
    /// nonce is ever `Confirmed`.
    ///
    /// # Errors
    /// Returns an error if the underlying storage operation fails.
    async fn mark_before_or_at_nonce_replaced_or_confirmed(
        &self,
        signer: Address,
        chain_id: u64,
        nonce: u64,
        confirmed_attempt_id: uuid::Uuid,
    ) -> Result<()>;
}
