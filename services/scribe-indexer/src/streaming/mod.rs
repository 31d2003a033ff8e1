//! `/v1/stream-logs` WebSocket server exposing indexed logs to downstream
//! consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │                     ScribeStreamClient (downstream)                    │
//! │                                                                        │
//! │   GET /v1/stream-logs?chain_id&address&from_block&to_block             │
//! │          │                                                             │
//! │          ▼                                                            │
//! │   ┌──────────────┐   poll + sort    ┌──────────────────────────┐       │
//! │   │  EventStore  │ ───────────────▶ │  newline-delimited JSON  │       │
//! │   │ (Postgres)   │                  │  Log frames over the WS  │       │
//! │   └──────────────┘                  └──────────────────────────┘       │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bounded `to_block` drains once and closes the socket; an open-ended
//! range (`to_block` omitted) polls indefinitely, handing off newly
//! confirmed logs as they land. A client that reconnects simply issues the
//! request again with `from_block` set to the last `(block, log_index)` it
//! received.
//!
//! `/healthz` reports `SERVING`/`NOT_SERVING`, mirroring the `Check()` RPC
//! of the original `ScribeServiceClient` contract this endpoint replaces.

mod server;

pub use server::{HealthStatus, ServerState, StreamQuery, build_router};
