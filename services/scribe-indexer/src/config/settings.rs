//! Settings structs and loading logic.
//!
//! All settings have sensible defaults and can be overridden via
//! environment variables or configuration files.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Per-chain indexing configuration.
    pub chains: Vec<ChainSettings>,
    /// Database configuration.
    pub database: DatabaseSettings,
    /// Log streaming server configuration.
    pub streaming: StreamingSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Metrics configuration.
    pub metrics: MetricsSettings,
    /// At-head table retention sweep configuration.
    pub retention: RetentionSettings,
}

impl Settings {
    /// Load settings from configuration files and environment variables.
    ///
    /// Files are loaded in this order (later overrides earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (if exists)
    /// 3. Environment variables with `BRIDGE__` prefix
    ///
    /// # Arguments
    /// * `environment` - Environment name (e.g., "development", "production")
    ///
    /// # Errors
    /// Returns `ConfigError` if configuration is invalid or cannot be loaded.
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());

        let builder = Config::builder()
            .set_default("database.url", "postgres://localhost/bridge")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout_ms", 5000)?
            .set_default("database.idle_timeout_ms", 600_000)?
            .set_default("streaming.host", "0.0.0.0")?
            .set_default("streaming.port", 8080)?
            .set_default("streaming.buffer_capacity", 1000)?
            .set_default("streaming.connect_timeout_ms", 30_000)?
            .set_default("streaming.default_page_size", 100)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("logging.file_path", Option::<String>::None)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.host", "0.0.0.0")?
            .set_default("metrics.port", 9090)?
            .set_default("retention.sweep_interval_ms", 60_000)?
            .set_default("retention.retain_secs", 3_600)?
            .set_default("chains", Vec::<String>::new())?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/{environment}")).required(false))
            .add_source(
                Environment::with_prefix("BRIDGE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load settings from a specific file path.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
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
            if chain.get_logs_range == 0 {
                errors.push(format!(
                    "chains[chain_id={}].get_logs_range must be non-zero",
                    chain.chain_id
                ));
            }
            if chain.concurrency_threshold == 0 {
                errors.push(format!(
                    "chains[chain_id={}].concurrency_threshold must be non-zero",
                    chain.chain_id
                ));
            }
            if chain.confirmations == 0 {
                errors.push(format!(
                    "chains[chain_id={}].confirmations must be non-zero",
                    chain.chain_id
                ));
            }
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

        if self.streaming.port == 0 {
            errors.push("streaming.port must be non-zero".into());
        }
        if self.streaming.default_page_size == 0 {
            errors.push("streaming.default_page_size must be non-zero".into());
        }
        if self.streaming.buffer_capacity == 0 {
            errors.push("streaming.buffer_capacity must be non-zero".into());
        }

        if self.retention.sweep_interval_ms == 0 {
            errors.push("retention.sweep_interval_ms must be non-zero".into());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Per-chain indexing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSettings {
    /// Chain identifier; unique across `chains`.
    pub chain_id: u64,
    /// Ethereum JSON-RPC HTTP endpoint for this chain.
    pub rpc_url: String,
    /// Initial chunk width for `LogFetcher` (blocks).
    pub get_logs_range: u64,
    /// Concurrent chunks per fetch wave.
    pub get_logs_batch_amount: usize,
    /// Upper bound on in-flight enrichment tasks per dedicated `Indexer`.
    pub store_concurrency: usize,
    /// Blocks-from-tip below which cursor-flush concurrency is throttled.
    pub concurrency_threshold: u64,
    /// Subtracted from tip when computing "confirmed".
    pub confirmations: u64,
    /// Distance-to-tip at which a dedicated `Indexer` is promoted to livefill.
    pub livefill_threshold: u64,
    /// Chunk width used by the shared livefill `Indexer`.
    pub livefill_range: u64,
    /// Bootstrap contracts tracked on this chain.
    pub contracts: Vec<ContractSettings>,
    /// Transaction submitter tunables, present when this chain signs and
    /// submits transactions (the `guard` pipeline).
    pub submitter: Option<SubmitterSettings>,
}

/// One contract bootstrapped on a chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractSettings {
    /// Contract address, hex-encoded with `0x` prefix.
    pub address: String,
    /// Block the contract was deployed at (or any earlier resume point).
    pub start_block: u64,
    /// Livefill polling interval in milliseconds.
    pub refresh_rate_ms: u64,
}

impl ContractSettings {
    /// Get the livefill refresh rate as a `Duration`.
    #[must_use]
    pub const fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms)
    }
}

/// `TxSubmitter` behavior tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitterSettings {
    /// Maximum gas price (wei) a bump is allowed to reach.
    pub max_gas_price: u128,
    /// Interval between gas bumps on a stuck attempt, in milliseconds.
    pub bump_interval_ms: u64,
    /// Percentage increase applied on each gas bump.
    pub gas_bump_percentage: u32,
    /// Static gas estimate used when `dynamic_gas_estimate` is false.
    pub gas_estimate: u64,
    /// Whether to call `eth_estimateGas` instead of using `gas_estimate`.
    pub dynamic_gas_estimate: bool,
    /// Whether this chain accepts EIP-1559 fee fields.
    pub supports_eip1559: bool,
    /// Whether this chain is an L2 (affects fee estimation strategy).
    pub is_l2: bool,
    /// Maximum number of events batched into one submitted transaction.
    pub max_batch_size: usize,
}

impl SubmitterSettings {
    /// Get the gas bump interval as a `Duration`.
    #[must_use]
    pub const fn bump_interval(&self) -> Duration {
        Duration::from_millis(self.bump_interval_ms)
    }
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

/// `/v1/stream-logs` WebSocket server and minimal query-RPC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Per-chain bounded buffer capacity for back-pressure.
    pub buffer_capacity: usize,
    /// Client-side dial timeout before the first `StreamLogs`-equivalent
    /// call is issued, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Default page size for the minimal query RPCs when the caller omits one.
    pub default_page_size: u32,
}

impl StreamingSettings {
    /// Get the socket address string.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
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

/// At-head table retention sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    /// How often the sweep runs, in milliseconds.
    pub sweep_interval_ms: u64,
    /// At-head rows older than this many seconds are deleted on each sweep.
    pub retain_secs: i64,
}

impl RetentionSettings {
    /// Get the sweep interval as a `Duration`.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Get the retention window as a `Duration`.
    #[must_use]
    pub const fn retain(&self) -> Duration {
        Duration::from_secs(self.retain_secs.unsigned_abs())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn streaming_socket_addr() {
        let streaming = StreamingSettings {
            host: "127.0.0.1".into(),
            port: 8080,
            buffer_capacity: 1000,
            connect_timeout_ms: 30_000,
            default_page_size: 100,
        };
        assert_eq!(streaming.socket_addr(), "127.0.0.1:8080");
        assert_eq!(streaming.connect_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn validation_catches_zero_connections() {
        let mut settings = valid_settings();
        settings.database.max_connections = 0;
        let errors = settings.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_connections")));
    }

    #[test]
    fn validation_catches_min_exceeds_max() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        settings.database.max_connections = 10;
        let errors = settings.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("min_connections")));
    }

    #[test]
    fn validation_catches_zero_chain_id() {
        let mut settings = valid_settings();
        settings.chains[0].chain_id = 0;
        let errors = settings.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("chain_id")));
    }

    #[test]
    fn validation_catches_empty_chain_list() {
        let mut settings = valid_settings();
        settings.chains.clear();
        let errors = settings.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("at least one entry")));
    }

    #[test]
    fn validation_accumulates_every_violation() {
        let mut settings = valid_settings();
        settings.chains[0].chain_id = 0;
        settings.database.max_connections = 0;
        settings.streaming.port = 0;
        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    fn valid_settings() -> Settings {
        Settings {
            chains: vec![ChainSettings {
                chain_id: 1,
                rpc_url: "http://localhost:8545".into(),
                get_logs_range: 2_000,
                get_logs_batch_amount: 4,
                store_concurrency: 16,
                concurrency_threshold: 50,
                confirmations: 12,
                livefill_threshold: 50,
                livefill_range: 5_000,
                contracts: vec![ContractSettings {
                    address: "0x0000000000000000000000000000000000000001".into(),
                    start_block: 0,
                    refresh_rate_ms: 2_000,
                }],
                submitter: None,
            }],
            database: DatabaseSettings {
                url: "postgres://localhost/test".into(),
                max_connections: 10,
                min_connections: 1,
                connect_timeout_ms: 5_000,
                idle_timeout_ms: 600_000,
            },
            streaming: StreamingSettings {
                host: "0.0.0.0".into(),
                port: 8080,
                buffer_capacity: 1000,
                connect_timeout_ms: 30_000,
                default_page_size: 100,
            },
            logging: LoggingSettings {
                level: "info".into(),
                format: "json".into(),
                file_path: None,
            },
            metrics: MetricsSettings {
                enabled: true,
                host: "0.0.0.0".into(),
                port: 9090,
            },
            retention: RetentionSettings {
                sweep_interval_ms: 60_000,
                retain_secs: 3_600,
            },
        }
    }
}
