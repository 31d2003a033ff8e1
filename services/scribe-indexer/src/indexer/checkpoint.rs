//! Cursor management for indexer state persistence and recovery.
//!
//! Tracks the `LastIndexed` cursor for one `(chain_id, contract, kind)` triple
//! through an [`EventStore`], and decides the block to resume from on
//! startup. The cursor itself is monotonic non-decreasing: recovery
//! modes only ever choose where indexing restarts from, and
//! `EventStore::store_last_indexed` is responsible for refusing a regression.

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::ports::EventStore;
use crate::types::enums::IndexerStateKind;
use crate::types::primitives::{BlockNumber, EthAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// RECOVERY MODE
// ═══════════════════════════════════════════════════════════════════════════════

/// Mode for determining the starting block on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    /// Resume from the last checkpoint (default behavior).
    #[default]
    Resume,
    /// Reindex from a specific block number.
    ReindexFrom(BlockNumber),
    /// Start from a specific block, ignoring any existing checkpoint.
    /// Does not clear existing data; use with caution.
    StartFrom(BlockNumber),
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHECKPOINT MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Manages the `LastIndexed` cursor for one `(chain_id, contract, kind)`.
#[derive(Debug)]
pub struct CheckpointManager<S> {
    store: S,
    chain_id: u64,
    contract: EthAddress,
    kind: IndexerStateKind,
    recovery_mode: RecoveryMode,
    /// Minimum block to start indexing from (contract deployment block).
    min_block: BlockNumber,
}

impl<S> CheckpointManager<S>
where
    S: EventStore,
{
    /// Create a new checkpoint manager for one contract's cursor.
    pub fn new(store: S, chain_id: u64, contract: EthAddress, kind: IndexerStateKind) -> Self {
        Self {
            store,
            chain_id,
            contract,
            kind,
            recovery_mode: RecoveryMode::default(),
            min_block: BlockNumber::new(0),
        }
    }

    /// Set the recovery mode for startup.
    #[must_use]
    pub const fn with_recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.recovery_mode = mode;
        self
    }

    /// Set the minimum block to start indexing from.
    ///
    /// Typically the block the tracked contract was deployed at; the indexer
    /// never starts before this block.
    #[must_use]
    pub const fn with_min_block(mut self, block: BlockNumber) -> Self {
        self.min_block = block;
        self
    }

    /// Load the current cursor value from storage, if any.
    ///
    /// # Errors
    /// Returns an error if the store fails to retrieve the cursor.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<BlockNumber>> {
        let cursor = self
            .store
            .get_last_indexed(self.chain_id, self.contract, self.kind)
            .await?;
        debug!(?cursor, "loaded cursor");
        Ok(cursor)
    }

    /// Get the block number to start indexing from, honoring the recovery
    /// mode and the minimum block constraint.
    ///
    /// # Errors
    /// Returns an error if the cursor cannot be loaded.
    #[instrument(skip(self))]
    pub async fn get_start_block(&self) -> Result<BlockNumber> {
        let start = match self.recovery_mode {
            RecoveryMode::Resume => match self.load().await? {
                Some(cursor) => {
                    info!(last_block = %cursor, "resuming from cursor");
                    cursor.next()
                }
                None => {
                    info!("no cursor found, starting from min block");
                    self.min_block
                }
            },
            RecoveryMode::ReindexFrom(block) => {
                info!(%block, "reindexing from specified block");
                block
            }
            RecoveryMode::StartFrom(block) => {
                warn!(%block, "starting from specified block (ignoring cursor)");
                block
            }
        };

        let start = if start < self.min_block {
            info!(requested = %start, min = %self.min_block, "start block below minimum, using min block");
            self.min_block
        } else {
            start
        };

        info!(start_block = %start, "determined start block");
        Ok(start)
    }

    /// Advance the cursor after successfully processing a block.
    ///
    /// # Errors
    /// Returns an error if the store fails to save the cursor.
    #[instrument(skip(self), fields(block = %block))]
    pub async fn update(&self, block: BlockNumber) -> Result<()> {
        self.store
            .store_last_indexed(self.chain_id, self.contract, self.kind, block)
            .await?;
        debug!("cursor updated");
        Ok(())
    }

    /// Get a reference to the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consume the manager and return the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mocks::MockEventStore;

    fn contract() -> EthAddress {
        EthAddress::new([7; 20])
    }

    #[test]
    fn recovery_mode_default_is_resume() {
        assert_eq!(RecoveryMode::default(), RecoveryMode::Resume);
    }

    #[tokio::test]
    async fn get_start_block_resume_empty_uses_min_block() {
        let manager = CheckpointManager::new(
            MockEventStore::new(),
            1,
            contract(),
            IndexerStateKind::Confirmed,
        )
        .with_min_block(BlockNumber::new(1000));

        let start = manager.get_start_block().await.unwrap();
        assert_eq!(start, BlockNumber::new(1000));
    }

    #[tokio::test]
    async fn get_start_block_resume_with_cursor_advances_past_it() {
        let store = MockEventStore::new();
        store
            .store_last_indexed(1, contract(), IndexerStateKind::Confirmed, BlockNumber::new(500))
            .await
            .unwrap();
        let manager = CheckpointManager::new(store, 1, contract(), IndexerStateKind::Confirmed);

        let start = manager.get_start_block().await.unwrap();
        assert_eq!(start, BlockNumber::new(501));
    }

    #[tokio::test]
    async fn get_start_block_reindex_from_ignores_cursor() {
        let store = MockEventStore::new();
        store
            .store_last_indexed(1, contract(), IndexerStateKind::Confirmed, BlockNumber::new(500))
            .await
            .unwrap();
        let manager = CheckpointManager::new(store, 1, contract(), IndexerStateKind::Confirmed)
            .with_recovery_mode(RecoveryMode::ReindexFrom(BlockNumber::new(100)));

        let start = manager.get_start_block().await.unwrap();
        assert_eq!(start, BlockNumber::new(100));
    }

    #[tokio::test]
    async fn get_start_block_respects_min_block() {
        let manager = CheckpointManager::new(
            MockEventStore::new(),
            1,
            contract(),
            IndexerStateKind::Confirmed,
        )
        .with_recovery_mode(RecoveryMode::StartFrom(BlockNumber::new(10)))
        .with_min_block(BlockNumber::new(1000));

        let start = manager.get_start_block().await.unwrap();
        assert_eq!(start, BlockNumber::new(1000));
    }

    #[tokio::test]
    async fn update_then_load_round_trips() {
        let manager = CheckpointManager::new(
            MockEventStore::new(),
            1,
            contract(),
            IndexerStateKind::Confirmed,
        );

        manager.update(BlockNumber::new(100)).await.unwrap();
        assert_eq!(manager.load().await.unwrap(), Some(BlockNumber::new(100)));
    }

    #[test]
    fn manager_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CheckpointManager<MockEventStore>>();
    }
}
