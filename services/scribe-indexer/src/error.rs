//! Layered error types for the bridge event indexer.
//!
//! This module provides a hierarchical error system:
//!
//! - [`DomainError`] - Business logic errors (invalid state, not found, etc.)
//! - [`InfraError`] - Infrastructure errors (database, RPC, streaming)
//! - [`AppError`] - Application-level errors combining domain and infra
//! - [`ApiError`] - HTTP API errors with status codes
//!
//! # Error Philosophy
//!
//! - Domain errors are recoverable and user-facing
//! - Infrastructure errors are logged but details hidden from users
//! - The `Result` type alias uses `AppError` for application code

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain-level errors representing business logic violations.
///
/// These errors are recoverable and should be shown to users.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DomainError {
    /// A persisted enum column held a numeric value outside its valid range.
    #[error("invalid enum value in storage: {0}")]
    InvalidEnumValue(String),

    /// Log not found for the given key.
    #[error("log not found: chain={chain_id}, block_hash={block_hash}, log_index={log_index}")]
    LogNotFound {
        /// Chain the log was expected on.
        chain_id: u64,
        /// Block hash the log was expected in.
        block_hash: String,
        /// Log index within the block.
        log_index: u64,
    },

    /// Receipt not found for the given transaction hash.
    #[error("receipt not found: chain={chain_id}, tx_hash={tx_hash}")]
    ReceiptNotFound {
        /// Chain the receipt was expected on.
        chain_id: u64,
        /// Transaction hash that was searched.
        tx_hash: String,
    },

    /// Attempted to write a `LastIndexed` cursor that would move it backwards.
    #[error("non-monotonic cursor advance: chain={chain_id} contract={contract} current={current} attempted={attempted}")]
    NonMonotonicCursor {
        /// Chain the cursor belongs to.
        chain_id: u64,
        /// Contract the cursor tracks.
        contract: String,
        /// Block number currently persisted.
        current: u64,
        /// Block number the caller attempted to write.
        attempted: u64,
    },

    /// Invalid address format.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid 32-byte hash format.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// A filter range was rejected (e.g. `fromBlock` > `toBlock`).
    #[error("invalid block range: from={from} to={to}")]
    InvalidBlockRange {
        /// Requested start block.
        from: u64,
        /// Requested end block.
        to: u64,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// INFRASTRUCTURE ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infrastructure-level errors from external systems.
///
/// These errors are typically logged but their details are hidden from users.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfraError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// RPC error (chain node communication).
    #[error("RPC error: {0}")]
    Rpc(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A chain RPC call failed in a way that should not be retried (e.g.
    /// unsupported transaction type, malformed `v,r,s`).
    #[error("permanent RPC error: {0}")]
    PermanentRpc(String),

    /// Streaming (WebSocket log stream) error.
    #[error("streaming error: {0}")]
    Streaming(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event/log decoding error.
    #[error("event decoding error: {0}")]
    EventDecoding(String),

    /// Resource not found in storage.
    #[error("resource not found")]
    NotFound,

    /// Connection pool exhausted.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Timeout waiting for operation.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Exceeded the configured retry tolerance for a chunk or RPC call.
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

/// Application-level errors combining domain and infrastructure errors.
///
/// This is the primary error type used throughout the application.
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

    /// Graceful shutdown requested.
    #[error("shutdown requested")]
    ShutdownRequested,
}

/// Type alias for application Results.
pub type Result<T> = std::result::Result<T, AppError>;

// ═══════════════════════════════════════════════════════════════════════════════
// API ERRORS (HTTP-specific)
// ═══════════════════════════════════════════════════════════════════════════════

/// API-level errors with HTTP status codes.
///
/// These errors are converted to HTTP responses via [`IntoResponse`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Wrapped application error.
    #[error(transparent)]
    App(#[from] AppError),

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds until rate limit resets.
        retry_after_secs: u64,
    },

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Authentication required or failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Internal server error (with source for logging).
    #[error("internal error")]
    Internal(#[source] eyre::Report),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::App(AppError::Domain(
                DomainError::LogNotFound { .. } | DomainError::ReceiptNotFound { .. },
            )) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),

            Self::App(AppError::Domain(
                DomainError::InvalidEnumValue(_)
                | DomainError::InvalidAddress(_)
                | DomainError::InvalidHash(_)
                | DomainError::InvalidBlockRange { .. },
            ))
            | Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string()),

            Self::App(AppError::Domain(DomainError::NonMonotonicCursor { .. })) => {
                (StatusCode::CONFLICT, "CONFLICT", self.to_string())
            }

            Self::RateLimited { retry_after_secs } => {
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after_secs.to_string())],
                    Json(json!({
                        "error": {
                            "code": "RATE_LIMITED",
                            "message": self.to_string(),
                            "retry_after_secs": retry_after_secs
                        }
                    })),
                )
                    .into_response();
            }

            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Infrastructure and internal errors: log but don't expose details
            Self::App(
                AppError::Infra(_) | AppError::Config(_) | AppError::Initialization(_)
                | AppError::ShutdownRequested,
            )
            | Self::Internal(_) => {
                tracing::error!(error = ?self, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "internal error".into(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}

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

impl From<crate::types::primitives::InvalidAddress> for DomainError {
    fn from(err: crate::types::primitives::InvalidAddress) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<crate::types::primitives::InvalidHash> for DomainError {
    fn from(err: crate::types::primitives::InvalidHash) -> Self {
        Self::InvalidHash(err.to_string())
    }
}

impl From<crate::types::primitives::InvalidAddress> for AppError {
    fn from(err: crate::types::primitives::InvalidAddress) -> Self {
        Self::Domain(err.into())
    }
}

impl From<crate::types::primitives::InvalidHash> for AppError {
    fn from(err: crate::types::primitives::InvalidHash) -> Self {
        Self::Domain(err.into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_display() {
        let err = DomainError::ReceiptNotFound {
            chain_id: 1,
            tx_hash: "0x1234".into(),
        };
        assert!(err.to_string().contains("0x1234"));
    }

    #[test]
    fn app_error_from_domain() {
        let domain = DomainError::InvalidBlockRange { from: 10, to: 5 };
        let app: AppError = domain.into();
        assert!(matches!(
            app,
            AppError::Domain(DomainError::InvalidBlockRange { .. })
        ));
    }

    #[test]
    fn app_error_from_infra() {
        let infra = InfraError::NotFound;
        let app: AppError = infra.into();
        assert!(matches!(app, AppError::Infra(InfraError::NotFound)));
    }
}
