//! Per-chain orchestration of backfill and livefill indexing.
//!
//! [`ChainIndexer`] starts one dedicated [`Indexer`] per contract at its
//! configured start block. As each contract's remaining distance to the
//! confirmed tip drops below `livefill_threshold`, its dedicated indexer
//! exits and the contract is folded into a single shared livefill indexer,
//! keeping per-contract RPC cost at the head low.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rpc_backend::ChainProvider;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::error::{AppError, InfraError, Result};
use crate::indexer::{FetchParams, Indexer, IndexerParams, IndexerState};
use crate::ports::{Cache, EventStore};
use crate::types::primitives::{BlockNumber, EthAddress};

/// Chunk width used by the shared livefill indexer's fetcher, typically
/// larger than a backfilling indexer's since it only ever trails the tip by
/// `livefill_threshold` blocks.
const LIVEFILL_RANGE: u64 = 5_000;

/// A tracked contract and the block it should be indexed from.
#[derive(Debug, Clone, Copy)]
pub struct ContractConfig {
    /// Contract address to index.
    pub contract: EthAddress,
    /// Block the contract was deployed at (or any earlier resume point).
    pub start_block: BlockNumber,
}

/// Owns one chain's dedicated per-contract indexers plus the shared
/// livefill indexer.
pub struct ChainIndexer<P, S, C> {
    provider: Arc<P>,
    store: Arc<S>,
    cache: Arc<C>,
    chain_id: u64,
    params: IndexerParams,
    livefill_contracts: Mutex<HashSet<EthAddress>>,
}

impl<P, S, C> ChainIndexer<P, S, C>
where
    P: ChainProvider + 'static,
    S: EventStore + 'static,
    C: Cache + 'static,
{
    /// Build a chain indexer sharing one provider/store/cache across all of
    /// its per-contract and livefill indexers.
    pub fn new(provider: Arc<P>, store: Arc<S>, cache: Arc<C>, chain_id: u64, params: IndexerParams) -> Self {
        Self {
            provider,
            store,
            cache,
            chain_id,
            params,
            livefill_contracts: Mutex::new(HashSet::new()),
        }
    }

    /// Contracts currently served by the shared livefill indexer.
    #[must_use]
    pub fn livefill_contracts(&self) -> Vec<EthAddress> {
        self.livefill_contracts.lock().iter().copied().collect()
    }

    /// Start each contract's dedicated indexer in parallel from its
    /// configured start block up to `confirmed_tip`. A contract already
    /// within `livefill_threshold` of the tip is promoted straight into the
    /// shared livefill set instead of spawning a dedicated backfill task.
    ///
    /// # Errors
    /// Returns the first error raised by any dedicated indexer's `index`
    /// call, or a join error if a backfill task panicked.
    #[instrument(skip(self, contracts), fields(chain_id = self.chain_id))]
    pub async fn run(&self, contracts: Vec<ContractConfig>, confirmed_tip: BlockNumber) -> Result<()> {
        let mut handles: Vec<(EthAddress, JoinHandle<Result<()>>)> = Vec::new();

        for config in contracts {
            let indexer = self.dedicated_indexer(config.contract);
            match indexer.state_for(config.start_block, confirmed_tip) {
                IndexerState::Livefilling => self.promote_to_livefill(config.contract),
                IndexerState::Backfilling => {
                    let contract = config.contract;
                    handles.push((
                        contract,
                        tokio::spawn(Box::pin(run_backfill(indexer, config.start_block, confirmed_tip))),
                    ));
                }
            }
        }

        for (contract, handle) in handles {
            match handle.await {
                Ok(result) => {
                    result?;
                    self.promote_to_livefill(contract);
                }
                Err(join_err) => {
                    return Err(AppError::Infra(InfraError::Internal(format!(
                        "backfill task panicked: {join_err}"
                    ))));
                }
            }
        }
        Ok(())
    }

    /// Promote a contract from its dedicated indexer into the shared
    /// livefill set, once its backfill has returned from [`ChainIndexer::run`]
    /// (or it started already within `livefill_threshold` of the tip).
    pub fn promote_to_livefill(&self, contract: EthAddress) {
        info!(chain_id = self.chain_id, %contract, "promoting contract to shared livefill indexer");
        self.livefill_contracts.lock().insert(contract);
    }

    /// Run the shared livefill indexer over whatever contracts have been
    /// promoted so far, following the tip from `last_indexed` onward. A
    /// no-op if no contract has been promoted yet.
    ///
    /// # Errors
    /// Propagates the first error from the shared indexer's refresh loop.
    pub async fn run_livefill(&self, last_indexed: BlockNumber) -> Result<()> {
        let contracts = self.livefill_contracts();
        if contracts.is_empty() {
            return Ok(());
        }
        let indexer = Indexer::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.chain_id,
            contracts,
            FetchParams::new(LIVEFILL_RANGE, 1),
            self.params.clone(),
        );
        indexer.run_livefill(last_indexed).await
    }

    fn dedicated_indexer(&self, contract: EthAddress) -> Indexer<P, S, C> {
        Indexer::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.chain_id,
            vec![contract],
            FetchParams::new(2_000, 4),
            self.params.clone(),
        )
    }
}

/// Runs one dedicated indexer's backfill to completion.
///
/// Extracted into a standalone async fn (rather than an inline `async move`
/// block in [`ChainIndexer::run`]) to work around a rustc HRTB-inference
/// quirk that otherwise makes the future spawned by `tokio::spawn` fail to
/// prove `Send` for generic `Indexer<P, S, C>` (rust-lang/rust#110338).
async fn run_backfill<P, S, C>(indexer: Indexer<P, S, C>, start_block: BlockNumber, end_block: BlockNumber) -> Result<()>
where
    P: ChainProvider + 'static,
    S: EventStore + 'static,
    C: Cache + 'static,
{
    indexer.index(start_block, end_block).await
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rpc_backend::mock::MockProvider;

    use super::*;
    use crate::ports::MockCache;
    use crate::store::mocks::MockEventStore;

    fn addr(byte: u8) -> EthAddress {
        EthAddress::new([byte; 20])
    }

    fn make_chain_indexer() -> ChainIndexer<MockProvider, MockEventStore, MockCache> {
        ChainIndexer::new(
            Arc::new(MockProvider::new()),
            Arc::new(MockEventStore::new()),
            Arc::new(MockCache::new()),
            1,
            IndexerParams::default(),
        )
    }

    #[test]
    fn livefill_contracts_starts_empty() {
        let chain_indexer = make_chain_indexer();
        assert!(chain_indexer.livefill_contracts().is_empty());
    }

    #[test]
    fn promote_to_livefill_is_idempotent() {
        let chain_indexer = make_chain_indexer();
        chain_indexer.promote_to_livefill(addr(1));
        chain_indexer.promote_to_livefill(addr(1));
        assert_eq!(chain_indexer.livefill_contracts(), vec![addr(1)]);
    }

    #[tokio::test]
    async fn run_promotes_contract_already_within_livefill_threshold() {
        let chain_indexer = make_chain_indexer();
        let contracts = vec![ContractConfig {
            contract: addr(3),
            // default livefill_threshold is 50; distance here is 10.
            start_block: BlockNumber::new(990),
        }];
        chain_indexer.run(contracts, BlockNumber::new(1000)).await.unwrap();
        assert_eq!(chain_indexer.livefill_contracts(), vec![addr(3)]);
    }

    #[tokio::test]
    async fn run_promotes_backfilled_contracts_once_they_catch_up_to_the_tip() {
        let chain_indexer = make_chain_indexer();
        let contracts = vec![
            ContractConfig {
                contract: addr(1),
                start_block: BlockNumber::new(0),
            },
            ContractConfig {
                contract: addr(2),
                start_block: BlockNumber::new(0),
            },
        ];
        chain_indexer.run(contracts, BlockNumber::new(1_000)).await.unwrap();

        let mut promoted = chain_indexer.livefill_contracts();
        promoted.sort();
        let mut expected = vec![addr(1), addr(2)];
        expected.sort();
        assert_eq!(promoted, expected);
    }

    #[tokio::test]
    async fn run_livefill_is_noop_with_no_promoted_contracts() {
        let chain_indexer = make_chain_indexer();
        chain_indexer.run_livefill(BlockNumber::new(0)).await.unwrap();
    }
}
