//! Periodic sweep of the at-head tables, keeping them from growing without
//! bound while a contract sits in livefill for a long time.
//!
//! The sweep never touches confirmed rows; it only deletes at-head rows
//! older than a retention window, per spec Testable Scenario S2.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::ports::{Clock, EventStore};

/// Delete every at-head row older than `retain` relative to `clock.now()`.
///
/// # Errors
/// Returns an error if the underlying storage operation fails.
pub async fn sweep_once<S: EventStore, C: Clock>(store: &S, clock: &C, retain: Duration) -> Result<u64> {
    #[allow(clippy::cast_possible_wrap)]
    let cutoff_ns = clock.now().timestamp_nanos_opt().unwrap_or(0) - retain.as_nanos() as i64;
    let deleted = store.flush_from_head_tables(cutoff_ns).await?;
    if deleted > 0 {
        debug!(deleted, "swept stale at-head rows");
    }
    Ok(deleted)
}

/// Run [`sweep_once`] every `interval` until the process is torn down.
///
/// # Errors
/// Propagates the first error from [`EventStore::flush_from_head_tables`];
/// the caller is expected to restart the loop.
pub async fn run<S: EventStore, C: Clock>(store: &S, clock: &C, interval: Duration, retain: Duration) -> Result<()> {
    loop {
        tokio::time::sleep(interval).await;
        let deleted = sweep_once(store, clock, retain).await?;
        if deleted > 0 {
            info!(deleted, "head table retention sweep");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::ports::FakeClock;
    use crate::store::mocks::MockEventStore;
    use crate::types::entities::Log;
    use crate::types::primitives::{BlockNumber, TxHash};

    fn sample_log(block: u64) -> Log {
        Log {
            chain_id: 1,
            address: crate::types::primitives::EthAddress::new([1; 20]),
            block_number: BlockNumber::new(block),
            block_hash: crate::types::primitives::BlockHash::ZERO,
            tx_hash: TxHash::new([block as u8; 32]),
            tx_index: 0,
            log_index: 0,
            topics: Vec::new(),
            data: Vec::new(),
            removed: false,
        }
    }

    // `MockEventStore::flush_from_head_tables` doesn't track per-row insertion
    // timestamps (see its doc comment) and always clears the head tables
    // outright, so this only exercises that `sweep_once` computes a cutoff
    // from the clock and forwards it through. Precision against the
    // retention window is covered against the real store in
    // `tests/store_integration.rs`.
    #[tokio::test]
    async fn sweep_once_forwards_a_cutoff_derived_from_the_clock() {
        let store = MockEventStore::new();
        store.store_logs_at_head(1, &[sample_log(100)]).await.unwrap();

        let clock = FakeClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap());
        let deleted = sweep_once(&store, &clock, Duration::from_secs(60)).await.unwrap();

        assert_eq!(deleted, 1);
    }
}
