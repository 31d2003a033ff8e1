//! Core indexing pipeline: cursor recovery, log fetching, enrichment and
//! per-contract/livefill orchestration.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                           ChainIndexer                                │
//! │                                                                       │
//! │   per-contract Indexer ──▶ LogFetcher ──▶ enrich ──▶ EventStore       │
//! │          │                                                            │
//! │          └── within livefill_threshold of tip ──▶ shared livefill     │
//! │                                                    Indexer            │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`CheckpointManager`] resolves the block an `Indexer` should resume from;
//! [`LogFetcher`] produces logs for a range; [`Indexer`] enriches and
//! persists them and advances the `LastIndexed` cursor; [`ChainIndexer`]
//! owns the backfill/livefill handoff across a contract set.

mod checkpoint;
mod chain_indexer;
mod indexer;
mod log_fetcher;
mod retention;

pub use chain_indexer::{ChainIndexer, ContractConfig};
pub use checkpoint::{CheckpointManager, RecoveryMode};
pub use indexer::{Indexer, IndexerParams, IndexerState, StoreOutcome};
pub use log_fetcher::{FetchParams, LogFetcher};
pub use retention::{run as run_retention_sweep, sweep_once};
