//! Long-lived consumer of the upstream indexer's `/v1/stream-logs`
//! WebSocket. Decoupled from that service entirely except for this wire
//! protocol: no path dependency, no shared types.

use std::time::Duration;

use alloy::primitives::Address;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::error::{AppError, InfraError, Result};
use crate::streaming::wire::WireLog;
use crate::submitter::backoff_delay;

/// Bound on the per-chain buffer between the socket-reading task and
/// whatever drains [`ScribeStreamClient::subscribe`]'s receiver — applying
/// backpressure to a slow pipeline rather than unbounded memory growth.
const CHANNEL_CAPACITY: usize = 1000;

/// How long to wait for the initial WebSocket handshake before giving up
/// on a connection attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One log, tagged with the chain it streamed from.
#[derive(Debug, Clone)]
pub struct StreamedLog {
    /// Chain the log was reported on.
    pub chain_id: u64,
    /// The decoded log.
    pub log: alloy::rpc::types::Log,
}

/// What range of one chain's logs to stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamRequest {
    /// Chain to stream logs from.
    pub chain_id: u64,
    /// Restrict to one contract address; `None` streams every contract the
    /// upstream indexer has stored for this chain.
    pub address: Option<Address>,
    /// First block (inclusive) to resume from.
    pub from_block: u64,
    /// Last block (inclusive); `None` for an open-ended livefill stream.
    pub to_block: Option<u64>,
}

/// Subscribes to the upstream stream and reconnects with jittered backoff
/// on every disconnect, resuming from the last block it actually received.
pub struct ScribeStreamClient {
    base_url: url::Url,
}

impl ScribeStreamClient {
    /// Builds a client against `base_url` (e.g. `ws://scribe-indexer:8080`).
    #[must_use]
    pub const fn new(base_url: url::Url) -> Self {
        Self { base_url }
    }

    fn stream_url(&self, request: StreamRequest) -> url::Url {
        let mut url = self.base_url.clone();
        url.set_path("/v1/stream-logs");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("chain_id", &request.chain_id.to_string());
            query.append_pair("from_block", &request.from_block.to_string());
            if let Some(address) = request.address {
                query.append_pair("address", &address.to_string());
            }
            if let Some(to_block) = request.to_block {
                query.append_pair("to_block", &to_block.to_string());
            }
        }
        url
    }

    /// Runs forever, reconnecting with jittered backoff on every
    /// disconnect, pushing decoded logs into a bounded channel whose
    /// receiver half is returned immediately. Intended to be
    /// `tokio::spawn`'d and `.abort()`'d on shutdown, matching this crate's
    /// other long-running loops.
    #[must_use]
    pub fn subscribe(self: std::sync::Arc<Self>, mut request: StreamRequest) -> mpsc::Receiver<StreamedLog> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match self.run_once(request, &tx).await {
                    Ok(last_block) => {
                        request.from_block = last_block.map_or(request.from_block, |b| b + 1);
                        attempt = 0;
                    }
                    Err(err) => {
                        warn!(chain_id = request.chain_id, error = %err, attempt, "stream disconnected, reconnecting");
                        attempt += 1;
                    }
                }
                if tx.is_closed() {
                    return;
                }
                tokio::time::sleep(backoff_delay(
                    attempt,
                    Duration::from_millis(200),
                    Duration::from_secs(30),
                ))
                .await;
            }
        });
        rx
    }

    /// Connects once and drains frames until the socket closes or a frame
    /// fails to decode. Returns the last block number successfully
    /// forwarded, so the reconnect loop can resume from there.
    async fn run_once(&self, request: StreamRequest, tx: &mpsc::Sender<StreamedLog>) -> Result<Option<u64>> {
        let url = self.stream_url(request);
        let (socket, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| AppError::Infra(InfraError::Timeout("stream connect".into())))?
            .map_err(|err| AppError::Infra(InfraError::Streaming(Box::new(err))))?;

        info!(chain_id = request.chain_id, from_block = request.from_block, "stream connected");

        let (_write, mut read) = socket.split();
        let mut last_block = None;

        while let Some(message) = read.next().await {
            let message = message.map_err(|err| AppError::Infra(InfraError::Streaming(Box::new(err))))?;
            let Message::Text(text) = message else {
                continue;
            };
            let wire: WireLog = serde_json::from_str(&text)
                .map_err(|err| AppError::Infra(InfraError::Serialization(err)))?;
            let chain_id = wire.chain_id();
            let log = wire.into_rpc_log()?;
            last_block = log.block_number.or(last_block);
            if tx.send(StreamedLog { chain_id, log }).await.is_err() {
                return Ok(last_block);
            }
        }

        Ok(last_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_url_includes_required_query_params() {
        let client = ScribeStreamClient::new(url::Url::parse("ws://localhost:9000").unwrap());
        let url = client.stream_url(StreamRequest {
            chain_id: 7,
            address: None,
            from_block: 42,
            to_block: None,
        });
        assert_eq!(url.path(), "/v1/stream-logs");
        assert!(url.query().unwrap().contains("chain_id=7"));
        assert!(url.query().unwrap().contains("from_block=42"));
        assert!(!url.query().unwrap().contains("to_block"));
    }

    #[test]
    fn stream_url_includes_bounded_range_when_set() {
        let client = ScribeStreamClient::new(url::Url::parse("ws://localhost:9000").unwrap());
        let url = client.stream_url(StreamRequest {
            chain_id: 1,
            address: None,
            from_block: 0,
            to_block: Some(100),
        });
        assert!(url.query().unwrap().contains("to_block=100"));
    }
}
