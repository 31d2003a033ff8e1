//! WebSocket client consuming the upstream indexer's `/v1/stream-logs`
//! endpoint. No crate dependency on that service — only this wire format.

pub mod scribe_client;
pub mod wire;

pub use scribe_client::{ScribeStreamClient, StreamRequest, StreamedLog};
pub use wire::WireLog;
