//! Axum handlers backing the `/v1/stream-logs` WebSocket endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::ports::{EventStore, LogFilter, Page};
use crate::types::primitives::{BlockNumber, EthAddress};

/// Interval between polls of an open-ended (livefill) stream that has
/// drained everything currently stored.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shared state handed to every route.
pub struct ServerState<S> {
    store: Arc<S>,
    /// Page size used per `EventStore` round trip.
    pub default_page_size: u32,
}

impl<S> Clone for ServerState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_page_size: self.default_page_size,
        }
    }
}

impl<S> ServerState<S> {
    /// Build server state over a shared `EventStore`.
    pub fn new(store: Arc<S>, default_page_size: u32) -> Self {
        Self {
            store,
            default_page_size: default_page_size.max(1),
        }
    }
}

/// Query parameters accepted by `/v1/stream-logs`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamQuery {
    /// Chain to stream logs from.
    pub chain_id: u64,
    /// Restrict to one contract address; omit for all contracts on the chain.
    pub address: Option<String>,
    /// First block (inclusive) to stream from.
    pub from_block: u64,
    /// Last block (inclusive) to stream to. Omit for an open-ended livefill stream.
    pub to_block: Option<u64>,
}

/// Health status mirroring the original `Check()` RPC's SERVING/NOT_SERVING values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// The server is accepting stream connections.
    Serving,
    /// The server is not currently able to serve streams.
    NotServing,
}

/// Build the router exposing the streaming and health endpoints.
pub fn build_router<S>(state: ServerState<S>) -> Router
where
    S: EventStore + Send + Sync + 'static,
{
    Router::new()
        .route("/v1/stream-logs", get(stream_logs::<S>))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": HealthStatus::Serving }))
}

#[instrument(skip(ws, state), fields(chain_id = query.chain_id, from = query.from_block, to = ?query.to_block))]
async fn stream_logs<S>(
    ws: WebSocketUpgrade,
    State(state): State<ServerState<S>>,
    Query(query): Query<StreamQuery>,
) -> axum::response::Response
where
    S: EventStore + Send + Sync + 'static,
{
    ws.on_upgrade(move |socket| handle_stream(socket, state, query))
}

async fn handle_stream<S>(mut socket: WebSocket, state: ServerState<S>, query: StreamQuery)
where
    S: EventStore,
{
    let address = match query.address.as_deref().map(EthAddress::from_hex).transpose() {
        Ok(address) => address,
        Err(err) => {
            let _ = socket
                .send(Message::Text(format!("{{\"error\":\"invalid address: {err}\"}}").into()))
                .await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let bounded_end = query.to_block.map(BlockNumber::new);
    let mut cursor = BlockNumber::new(query.from_block);
    let mut last_sent_log_index: Option<u64> = None;

    loop {
        let page_end = bounded_end.unwrap_or(BlockNumber::new(u64::MAX));
        if cursor > page_end {
            break;
        }

        let filter = LogFilter {
            chain_id: query.chain_id,
            address,
            from_block: cursor,
            to_block: page_end,
            topic0: None,
        };

        let mut logs = match state
            .store
            .retrieve_logs_with_filter(&filter, Page::new(state.default_page_size, 0))
            .await
        {
            Ok(logs) => logs,
            Err(err) => {
                warn!(error = %err, "stream-logs query failed, closing socket");
                break;
            }
        };
        logs.sort_by_key(|log| (log.block_number.get(), log.tx_index, log.log_index));

        if let Some(last_index) = last_sent_log_index {
            logs.retain(|log| !(log.block_number == cursor && log.log_index <= last_index));
        }

        if logs.is_empty() {
            if bounded_end.is_some() {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            continue;
        }

        for log in &logs {
            let Ok(frame) = serde_json::to_string(log) else {
                warn!("failed to serialize log frame, skipping");
                continue;
            };
            if socket.send(Message::Text(frame.into())).await.is_err() {
                debug!("stream-logs client disconnected");
                return;
            }
            cursor = log.block_number;
            last_sent_log_index = Some(log.log_index);
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mocks::MockEventStore;

    #[test]
    fn server_state_clamps_page_size_to_one() {
        let state = ServerState::new(Arc::new(MockEventStore::new()), 0);
        assert_eq!(state.default_page_size, 1);
    }

    #[test]
    fn health_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&HealthStatus::NotServing).unwrap();
        assert_eq!(json, "\"NOT_SERVING\"");
    }
}
