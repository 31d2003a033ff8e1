//! Caching port for in-memory data access.
//!
//! The indexer's only caching need is the recent-transaction dedup cache
//! before enriching a log, the Indexer checks whether its
//! transaction hash was already processed recently and skips re-enrichment
//! if so. Capacity is fixed at 500, matching the LRU size used by the
//! reference implementation this indexer was distilled from.

use alloy::primitives::B256;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded recent-transaction-hash cache used to skip redundant enrichment
/// work when multiple logs in the same transaction arrive together.
pub trait Cache: Send + Sync {
    /// `true` if `tx_hash` was recorded recently and has not yet been evicted.
    fn contains_tx_hash(&self, tx_hash: &B256) -> bool;

    /// Record a transaction hash as processed, evicting the least recently
    /// used entry if the cache is at capacity.
    fn record_tx_hash(&self, tx_hash: B256);

    /// Number of entries currently cached.
    fn len(&self) -> usize;

    /// `true` if the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry.
    fn clear(&self);
}

/// Default cache capacity, matching the indexer's reference LRU size.
pub const RECENT_TX_CACHE_CAPACITY: u64 = 500;

// ═══════════════════════════════════════════════════════════════════════════════
// MOKA-BACKED IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

/// `moka`-backed implementation of [`Cache`], sized to
/// [`RECENT_TX_CACHE_CAPACITY`].
#[derive(Debug, Clone)]
pub struct RecentTxCache {
    inner: moka::sync::Cache<B256, ()>,
}

impl RecentTxCache {
    /// Build a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(RECENT_TX_CACHE_CAPACITY)
    }

    /// Build a cache with an explicit capacity (used by tests needing
    /// tighter eviction windows).
    #[must_use]
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            inner: moka::sync::Cache::new(capacity),
        }
    }
}

impl Default for RecentTxCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for RecentTxCache {
    fn contains_tx_hash(&self, tx_hash: &B256) -> bool {
        self.inner.contains_key(tx_hash)
    }

    fn record_tx_hash(&self, tx_hash: B256) {
        self.inner.insert(tx_hash, ());
    }

    fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        usize::try_from(self.inner.entry_count()).unwrap_or(usize::MAX)
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEST MOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory mocks usable by downstream crates under the `test-utils` feature.
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use alloy::primitives::B256;

    use super::Cache;

    /// Unbounded `HashSet`-backed cache for tests that don't need eviction.
    #[derive(Debug, Default)]
    pub struct MockCache {
        seen: Mutex<HashSet<B256>>,
    }

    impl MockCache {
        /// Create an empty mock cache.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Cache for MockCache {
        fn contains_tx_hash(&self, tx_hash: &B256) -> bool {
            self.seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner).contains(tx_hash)
        }

        fn record_tx_hash(&self, tx_hash: B256) {
            self.seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(tx_hash);
        }

        fn len(&self) -> usize {
            self.seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        }

        fn clear(&self) {
            self.seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clear();
        }
    }
}
