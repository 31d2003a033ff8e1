//! Layered error types for the fraud-response guard.
//!
//! - [`DomainError`] - business-rule violations with no I/O cause
//! - [`InfraError`] - wraps I/O: RPC, database, streaming, signer, config
//! - [`AppError`] - top-level enum combining domain and infra, plus the
//!   operational variants the orchestration layer treats as "stop, don't
//!   crash"

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pure business-rule violations with no I/O cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DomainError {
    /// A log arrived from a contract address the guard isn't configured
    /// to watch on that chain.
    #[error("unknown contract: chain={chain_id} address={address}")]
    UnknownContract {
        /// Chain the log was observed on.
        chain_id: u64,
        /// The unrecognized contract address.
        address: String,
    },

    /// An event payload failed to decode into its expected shape.
    #[error("invalid event payload: {reason}")]
    InvalidPayload {
        /// What about the payload was invalid.
        reason: String,
    },

    /// A persisted enum column held a numeric value outside its valid range.
    #[error("invalid enum value in storage: {0}")]
    InvalidEnumValue(String),

    /// An agent status transition the contract would never emit (used to
    /// catch decode bugs, not real on-chain behavior).
    #[error("invalid agent flag transition: {from} -> {to}")]
    InvalidFlagTransition {
        /// Previous flag the guard had on file.
        from: String,
        /// New flag the event claims.
        to: String,
    },

    /// The chain's reported tip moved backwards further than the
    /// configured confirmation depth allows for, past what this guard can
    /// treat as an ordinary reorg.
    #[error("reorg too deep: chain={chain_id} observed_depth={observed_depth}")]
    ReorgTooDeep {
        /// Chain where the deep reorg was observed.
        chain_id: u64,
        /// How many blocks the tip rolled back.
        observed_depth: u64,
    },

    /// Attempted to allocate a nonce that would not be strictly greater
    /// than every nonce already allocated for this signer/chain.
    #[error("non-monotonic nonce: signer={signer} chain={chain_id} current_max={current_max} attempted={attempted}")]
    NonMonotonicNonce {
        /// Signer the nonce belongs to.
        signer: String,
        /// Chain the nonce is scoped to.
        chain_id: u64,
        /// Highest nonce already allocated.
        current_max: u64,
        /// Nonce that was rejected.
        attempted: u64,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infrastructure-level errors from external systems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Chain RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A chain RPC call failed in a way that should not be retried.
    #[error("permanent RPC error: {0}")]
    PermanentRpc(String),

    /// The `ScribeStreamClient`'s WebSocket connection failed or was reset.
    #[error("streaming error: {0}")]
    Streaming(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to sign a transaction or message.
    #[error("signer error: {0}")]
    Signer(String),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource not found in storage.
    #[error("resource not found")]
    NotFound,

    /// Timeout waiting for an operation (RPC call, stream health check).
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Exceeded the configured retry tolerance for an RPC call or stream
    /// reconnect.
    #[error("retry tolerance exceeded after {attempts} attempts: {reason}")]
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Internal error not covered by a more specific variant.
    #[error("internal error: {0}")]
    Internal(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPLICATION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// The primary error type used throughout the application.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Infrastructure error.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Initialization error.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// A deep reorg was detected mid-pipeline; the orchestration layer
    /// stops the affected chain's tasks rather than propagating a panic.
    #[error("reorg detected on chain {0}")]
    ReorgDetected(u64),

    /// Graceful shutdown requested.
    #[error("shutdown requested")]
    ShutdownRequested,
}

/// Type alias for application Results.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// CONVENIENCE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

impl From<crate::types::enums::InvalidEnumValue> for DomainError {
    fn from(err: crate::types::enums::InvalidEnumValue) -> Self {
        Self::InvalidEnumValue(err.to_string())
    }
}

impl From<crate::types::enums::InvalidEnumValue> for AppError {
    fn from(err: crate::types::enums::InvalidEnumValue) -> Self {
        Self::Domain(err.into())
    }
}

impl From<rpc_backend::ProviderError> for InfraError {
    fn from(err: rpc_backend::ProviderError) -> Self {
        Self::Rpc(Box::new(err))
    }
}

impl From<rpc_backend::ProviderError> for AppError {
    fn from(err: rpc_backend::ProviderError) -> Self {
        Self::Infra(err.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
