//! Fraud-response pipeline and transaction submitter for the bridge guard
//! network.
//!
//! Consumes the upstream indexer's log stream, routes each decoded event to
//! a handler that checks the corresponding on-chain view state, and — when
//! state has diverged — signs and submits the contract call that corrects
//! it: a snapshot report, an attestation or receipt report, a dispute
//! resolution, or a status/root sync.
//!
//! # Architecture
//!
//! The crate follows a hexagonal architecture: the pipeline depends only on
//! the [`ports`] traits, with the concrete adapter living in [`store`].
//! Streaming is a one-way dependency on the upstream indexer's wire format,
//! not its crate.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          GUARD PIPELINE                           │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────┐   │
//! │  │ ScribeStream   │─▶│  GuardPipeline │─▶│   TxSubmitter      │   │
//! │  │ Client         │  │  (router +     │  │  (nonce, gas,      │   │
//! │  │ (WebSocket)    │  │  handlers)     │  │  confirmation)      │   │
//! │  └────────────────┘  └────────────────┘  └────────────────────┘   │
//! │                            │                      │                │
//! │                            ▼                      ▼                │
//! │                     ┌──────────────┐      ┌──────────────┐        │
//! │                     │  GuardStore  │      │SubmitterStore│        │
//! │                     └──────────────┘      └──────────────┘        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`abi`] - Type-safe Solidity ABI bindings for the bridge contracts
//! - [`types`] - Domain types (enums, events, entities)
//! - [`error`] - Layered error types
//! - [`config`] - Configuration loading and validation
//! - [`pipeline`] - Event routing and fraud-response reaction logic
//! - [`submitter`] - At-least-once transaction submission
//! - [`streaming`] - WebSocket client consuming the upstream log stream
//! - [`store`] - Data persistence (`PostgreSQL`)
//! - [`ports`] - Traits the pipeline and submitter depend on, independent of
//!   any adapter
//!
//! # Getting Started
//!
//! ```bash
//! # Apply migrations
//! guard migrate
//!
//! # Start the fraud-response pipeline on every configured chain
//! guard run
//! ```

pub mod abi;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod store;
pub mod streaming;
pub mod submitter;
pub mod types;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version string.
#[must_use]
pub const fn version() -> &'static str {
    VERSION
}
