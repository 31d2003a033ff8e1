//! Configuration loading and validation for the bridge event indexer.
//!
//! Settings are assembled by layering, in order: built-in defaults,
//! `config/default.toml`, `config/{environment}.toml`, then environment
//! variables prefixed `BRIDGE__` with `__` as the nested-key separator (e.g.
//! `BRIDGE__CHAINS__0__CONFIRMATIONS=12`).
//!
//! # Example
//!
//! ```ignore
//! use scribe_indexer::config::Settings;
//!
//! let settings = Settings::load("production")?;
//! settings.validate().map_err(|errs| eprintln!("{errs:?}"))?;
//! ```

mod settings;

pub use settings::{
    ChainSettings, ContractSettings, DatabaseSettings, LoggingSettings, MetricsSettings,
    RetentionSettings, Settings, StreamingSettings, SubmitterSettings,
};
