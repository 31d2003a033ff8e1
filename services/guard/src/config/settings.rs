//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via
//! environment variables or configuration files.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Per-chain deployment addresses and submitter tunables.
    pub chains: Vec<ChainSettings>,
    /// Signer the submitter broadcasts with.
    pub signer: SignerSettings,
    /// Database configuration.
    pub database: DatabaseSettings,
    /// Upstream log stream to consume.
    pub streaming: StreamingSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Metrics configuration.
    pub metrics: MetricsSettings,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (if exists)
    /// 3. Environment variables with `GUARD__` prefix
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration is invalid or cannot be loaded.
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = Config::builder()
            .set_default("database.url", "postgres://localhost/guard")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout_ms", 5000)?
            .set_default("database.idle_timeout_ms", 600_000)?
            .set_default("streaming.base_url", "ws://localhost:8080")?
            .set_default("streaming.reconnect_min_backoff_ms", 200)?
            .set_default("streaming.reconnect_max_backoff_ms", 30_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("logging.file_path", Option::<String>::None)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.host", "0.0.0.0")?
            .set_default("metrics.port", 9090)?
            .set_default("chains", Vec::<String>::new())?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("GUARD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate settings and return every violation found, rather than
    /// failing on the first.
    ///
    /// # Errors
    /// Returns a list of validation error messages.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.chains.is_empty() {
            errors.push("chains must contain at least one entry".into());
        }
        for chain in &self.chains {
            if chain.chain_id == 0 {
                errors.push("chains[].chain_id must be non-zero".into());
            }
            if chain.rpc_url.is_empty() {
                errors.push(format!("chains[chain_id={}].rpc_url cannot be empty", chain.chain_id));
            }
            if chain.inbox_address.is_empty() {
                errors.push(format!(
                    "chains[chain_id={}].inbox_address cannot be empty",
                    chain.chain_id
                ));
            }
            if chain.is_hub && chain.bonding_manager_address.is_none() {
                errors.push(format!(
                    "chains[chain_id={}] is_hub requires bonding_manager_address",
                    chain.chain_id
                ));
            }
            if !chain.is_hub && chain.light_manager_address.is_none() {
                errors.push(format!(
                    "chains[chain_id={}] spoke chain requires light_manager_address",
                    chain.chain_id
                ));
            }
            if chain.submitter.gas_bump_percentage == 0 {
                errors.push(format!(
                    "chains[chain_id={}].submitter.gas_bump_percentage must be non-zero",
                    chain.chain_id
                ));
            }
        }

        if self.signer.private_key_env.is_empty() {
            errors.push("signer.private_key_env cannot be empty".into());
        }

        if self.database.url.is_empty() {
            errors.push("database.url cannot be empty".into());
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be non-zero".into());
        }
        if self.database.min_connections > self.database.max_connections {
            errors.push("database.min_connections cannot exceed max_connections".into());
        }

        if self.streaming.base_url.is_empty() {
            errors.push("streaming.base_url cannot be empty".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Per-chain deployment addresses and submitter tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSettings {
    /// Chain identifier; unique across `chains`.
    pub chain_id: u64,
    /// Ethereum JSON-RPC HTTP endpoint for this chain.
    pub rpc_url: String,
    /// Whether this is the hub chain (runs `BondingManager`) or a spoke
    /// (runs `LightManager`).
    pub is_hub: bool,
    /// `Inbox`/`LightInbox` address on this chain.
    pub inbox_address: String,
    /// `BondingManager` address; required when `is_hub`.
    pub bonding_manager_address: Option<String>,
    /// `LightManager` address; required on spoke chains.
    pub light_manager_address: Option<String>,
    /// `Summit` address; present only on the hub chain.
    pub summit_address: Option<String>,
    /// Block to start the log stream from on first run.
    pub stream_from_block: u64,
    /// Submitter gas and reconciliation tunables for this chain.
    pub submitter: SubmitterSettings,
}

/// `TxSubmitter` behavior tunables, loaded per chain.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterSettings {
    /// Maximum gas price (wei) a bump is allowed to reach.
    pub max_gas_price: u128,
    /// Interval between gas bumps on a stuck attempt, in milliseconds.
    pub bump_interval_ms: u64,
    /// Percentage increase applied on each gas bump.
    pub gas_bump_percentage: u64,
    /// Static gas estimate used when `dynamic_gas_estimate` is false.
    pub gas_estimate: u64,
    /// Whether to call `eth_estimateGas` instead of using `gas_estimate`.
    pub dynamic_gas_estimate: bool,
    /// Whether this chain accepts EIP-1559 fee fields.
    pub supports_eip1559: bool,
    /// How often the reconciliation loop polls for confirmations and bumps,
    /// in milliseconds.
    pub poll_interval_ms: u64,
}

impl SubmitterSettings {
    /// Get the gas bump interval as a `Duration`.
    #[must_use]
    pub const fn bump_interval(&self) -> Duration {
        Duration::from_millis(self.bump_interval_ms)
    }

    /// Get the reconciliation poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Transaction signer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SignerSettings {
    /// Name of the environment variable holding the signer's hex-encoded
    /// private key. Never read from a config file directly.
    pub private_key_env: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// Minimum connections to maintain.
    pub min_connections: u32,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Idle connection timeout in milliseconds.
    pub idle_timeout_ms: u64,
}

impl DatabaseSettings {
    /// Get the connection timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the idle timeout as a `Duration`.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Upstream log-stream client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingSettings {
    /// Base URL of the upstream indexer's `/v1/stream-logs` WebSocket
    /// (e.g. `ws://scribe-indexer:8080`).
    pub base_url: String,
    /// Floor of the jittered reconnect backoff, in milliseconds.
    pub reconnect_min_backoff_ms: u64,
    /// Ceiling of the jittered reconnect backoff, in milliseconds.
    pub reconnect_max_backoff_ms: u64,
}

impl StreamingSettings {
    /// Get the reconnect backoff bounds as `Duration`s.
    #[must_use]
    pub const fn reconnect_backoff_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.reconnect_min_backoff_ms),
            Duration::from_millis(self.reconnect_max_backoff_ms),
        )
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log format (json, pretty).
    pub format: String,
    /// Optional file path for log output.
    pub file_path: Option<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Host to bind metrics server to.
    pub host: String,
    /// Port for metrics server.
    pub port: u16,
}

impl MetricsSettings {
    /// Get the metrics socket address string.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
