//! Sliding-range `eth_getLogs` producer with adaptive chunking.
//!
//! [`LogFetcher`] walks `[start_block, end_block]` in fixed-width chunks,
//! fetching each chunk's logs through a [`ChainProvider`] and feeding them
//! into a bounded output channel in ascending `(block, tx_index, log_index)`
//! order. A chunk that fails is retried with a halved width (down to a
//! 1-block floor) and exponential backoff, up to a fixed retry tolerance.

use std::cmp::min;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use rpc_backend::ChainProvider;
use rpc_backend::types::LogFilter as ChainLogFilter;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, InfraError, Result};
use crate::types::entities::Log;
use crate::types::primitives::{BlockHash, BlockNumber, EthAddress, TxHash};

/// Maximum attempts on the same chunk before the fetch fails outright.
pub const RETRY_TOLERANCE: u32 = 20;

/// Backoff floor between chunk retries.
const BACKOFF_MIN: Duration = Duration::from_millis(3);

/// Backoff ceiling between chunk retries.
const BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Minimum chunk width a failing fetch is allowed to shrink to.
const MIN_CHUNK_WIDTH: u64 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables for one [`LogFetcher`] run.
#[derive(Debug, Clone)]
pub struct FetchParams {
    /// Chunk width in blocks (`get_logs_range`).
    pub chunk_width: u64,
    /// Concurrent chunks per fetch wave (`get_logs_batch_amount`).
    pub batch_amount: usize,
    /// Restrict to these contract addresses; empty means "all".
    pub addresses: Vec<EthAddress>,
    /// Output channel capacity (back-pressure bound).
    pub channel_capacity: usize,
}

impl FetchParams {
    /// Build params with the given chunk width/batch amount and no address filter.
    #[must_use]
    pub fn new(chunk_width: u64, batch_amount: usize) -> Self {
        Self {
            chunk_width: chunk_width.max(1),
            batch_amount: batch_amount.max(1),
            addresses: Vec::new(),
            channel_capacity: 256,
        }
    }

    /// Restrict the fetch to a fixed set of contract addresses.
    #[must_use]
    pub fn with_addresses(mut self, addresses: Vec<EthAddress>) -> Self {
        self.addresses = addresses;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOG FETCHER
// ═══════════════════════════════════════════════════════════════════════════════

/// Lazy producer of [`Log`] values for one chain within a fixed block range.
#[derive(Debug)]
pub struct LogFetcher<P> {
    provider: Arc<P>,
    chain_id: u64,
    params: FetchParams,
}

impl<P> LogFetcher<P>
where
    P: ChainProvider + 'static,
{
    /// Build a fetcher for one chain.
    pub fn new(provider: Arc<P>, chain_id: u64, params: FetchParams) -> Self {
        Self {
            provider,
            chain_id,
            params,
        }
    }

    /// Spawn the fetch as a background task, returning the receiving half of
    /// its bounded output channel.
    ///
    /// The task runs to completion (or failure) independently; callers drain
    /// the channel to receive logs in ascending block order. A `Err` sent as
    /// the final channel item indicates the fetch could not complete.
    #[instrument(skip(self), fields(chain_id = self.chain_id, start = %start_block, end = %end_block))]
    pub fn spawn(
        self,
        start_block: BlockNumber,
        end_block: BlockNumber,
    ) -> mpsc::Receiver<Result<Log>> {
        let (tx, rx) = mpsc::channel(self.params.channel_capacity);
        tokio::spawn(async move {
            if let Err(err) = self.run(start_block, end_block, &tx).await {
                warn!(chain_id = self.chain_id, error = %err, "log fetch failed");
                let _ = tx.send(Err(err)).await;
            }
        });
        rx
    }

    async fn run(
        &self,
        start_block: BlockNumber,
        end_block: BlockNumber,
        tx: &mpsc::Sender<Result<Log>>,
    ) -> Result<()> {
        let mut cursor = start_block.get();
        let end = end_block.get();
        let mut width = self.params.chunk_width;

        while cursor <= end {
            let wave_end = min(cursor + width.saturating_mul(self.params.batch_amount as u64), end + 1);
            let mut chunks = Vec::new();
            let mut chunk_start = cursor;
            while chunk_start < wave_end {
                let chunk_end = min(chunk_start + width - 1, end);
                chunks.push((chunk_start, chunk_end));
                chunk_start = chunk_end + 1;
            }

            // Each chunk in the wave is fetched concurrently (bounded by
            // `batch_amount`), carrying its own local copy of `width` so a
            // retry shrinking one chunk's range never races another's. Chunks
            // are reassembled in range order before being sent, so the output
            // channel still sees strictly ascending `(block, tx_index,
            // log_index)` order regardless of which chunk finished first.
            let wave_width = width;
            let mut fetched: Vec<(u64, Vec<Log>, u64)> = stream::iter(chunks)
                .map(|(from, to)| async move {
                    let mut local_width = wave_width;
                    let logs = self.fetch_chunk_with_retry(from, to, &mut local_width).await?;
                    Ok::<_, AppError>((from, logs, local_width))
                })
                .buffer_unordered(self.params.batch_amount)
                .collect::<Vec<_>>()
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?;

            fetched.sort_by_key(|(from, _, _)| *from);
            width = fetched.iter().map(|(_, _, w)| *w).min().unwrap_or(width);

            for (_, logs, _) in fetched {
                for log in logs {
                    if tx.send(Ok(log)).await.is_err() {
                        debug!("log fetch receiver dropped, stopping");
                        return Ok(());
                    }
                }
            }
            cursor = wave_end;
        }
        Ok(())
    }

    /// Fetch one `[from, to]` chunk, halving `width` (down to the floor) and
    /// backing off on each failure, up to [`RETRY_TOLERANCE`] attempts.
    async fn fetch_chunk_with_retry(
        &self,
        mut from: u64,
        to: u64,
        width: &mut u64,
    ) -> Result<Vec<Log>> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_chunk(from, to).await {
                Ok(mut logs) => {
                    logs.sort_by_key(Log::ordering_key);
                    return Ok(logs);
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= RETRY_TOLERANCE {
                        return Err(AppError::Infra(InfraError::RetryExhausted {
                            attempts: attempt,
                            reason: err.to_string(),
                        }));
                    }
                    *width = (*width / 2).max(MIN_CHUNK_WIDTH);
                    from = from.min(to);
                    warn!(from, to, attempt, new_width = *width, error = %err, "chunk fetch failed, backing off");
                    backoff(attempt).await;
                }
            }
        }
    }

    async fn fetch_chunk(&self, from: u64, to: u64) -> Result<Vec<Log>> {
        let filter = ChainLogFilter {
            from_block: Some(from),
            to_block: Some(to),
            addresses: self.params.addresses.iter().map(|a| (*a).into()).collect(),
            topics: Vec::new(),
        };
        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| AppError::Infra(InfraError::Rpc(Box::new(e))))?;
        logs.into_iter().map(convert_log(self.chain_id)).collect()
    }
}

pub(crate) fn convert_log(chain_id: u64) -> impl Fn(alloy::rpc::types::Log) -> Result<Log> {
    move |raw: alloy::rpc::types::Log| {
        let topics = raw
            .topics()
            .iter()
            .map(|t| t.0)
            .collect::<Vec<[u8; 32]>>();
        Ok(Log {
            chain_id,
            address: EthAddress::from(raw.address()),
            block_number: BlockNumber::new(raw.block_number.unwrap_or_default()),
            block_hash: raw.block_hash.map(BlockHash::from).unwrap_or(BlockHash::ZERO),
            tx_hash: raw.transaction_hash.map(TxHash::from).unwrap_or(TxHash::ZERO),
            tx_index: raw.transaction_index.unwrap_or_default(),
            log_index: raw.log_index.unwrap_or_default(),
            topics,
            data: raw.data().data.to_vec(),
            removed: raw.removed,
        })
    }
}

/// Exponential backoff with jitter, factor 2, clamped to `[BACKOFF_MIN, BACKOFF_MAX]`.
pub(crate) async fn backoff(attempt: u32) {
    let exp = BACKOFF_MIN.saturating_mul(1u32 << attempt.min(16));
    let capped = exp.min(BACKOFF_MAX);
    let jitter_ms = rand::rng().random_range(0..=capped.as_millis().max(1) as u64 / 4);
    tokio::time::sleep(capped + Duration::from_millis(jitter_ms)).await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rpc_backend::mock::MockProvider;

    #[test]
    fn fetch_params_clamps_to_minimum_one() {
        let params = FetchParams::new(0, 0);
        assert_eq!(params.chunk_width, 1);
        assert_eq!(params.batch_amount, 1);
    }

    #[tokio::test]
    async fn spawn_with_no_logs_closes_channel_cleanly() {
        let provider = Arc::new(MockProvider::new());
        let fetcher = LogFetcher::new(provider, 1, FetchParams::new(10, 2));
        let mut rx = fetcher.spawn(BlockNumber::new(0), BlockNumber::new(5));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn spawn_emits_logs_in_ascending_order() {
        let provider = Arc::new(MockProvider::new());
        let mut log = alloy::rpc::types::Log::default();
        log.block_number = Some(3);
        log.transaction_index = Some(1);
        log.log_index = Some(0);
        provider.push_log(log.clone());
        let mut second = log;
        second.transaction_index = Some(0);
        second.log_index = Some(2);
        provider.push_log(second);

        let fetcher = LogFetcher::new(provider, 1, FetchParams::new(10, 2));
        let mut rx = fetcher.spawn(BlockNumber::new(0), BlockNumber::new(5));
        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.push(item.unwrap());
        }
        assert_eq!(received.len(), 2);
        assert!(received[0].ordering_key() <= received[1].ordering_key());
    }

    #[tokio::test]
    async fn spawn_orders_logs_across_concurrently_fetched_chunks() {
        // chunk_width=2 over a 10-block range with batch_amount=3 puts several
        // chunks in flight within the same wave; the channel must still see
        // every log in strictly ascending block order.
        let provider = Arc::new(MockProvider::new());
        for block in (0..10u64).rev() {
            let mut log = alloy::rpc::types::Log::default();
            log.block_number = Some(block);
            log.transaction_index = Some(0);
            log.log_index = Some(0);
            provider.push_log(log);
        }

        let fetcher = LogFetcher::new(provider, 1, FetchParams::new(2, 3));
        let mut rx = fetcher.spawn(BlockNumber::new(0), BlockNumber::new(9));
        let mut received = Vec::new();
        while let Some(item) = rx.recv().await {
            received.push(item.unwrap());
        }

        assert_eq!(received.len(), 10);
        assert!(
            received.windows(2).all(|w| w[0].ordering_key() <= w[1].ordering_key()),
            "logs from concurrently fetched chunks must still arrive in ascending order"
        );
    }
}
