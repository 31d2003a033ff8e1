//! Configuration loading and validation for the fraud-response guard.
//!
//! Settings are assembled by layering, in order: built-in defaults,
//! `config/default.toml`, `config/{environment}.toml`, then environment
//! variables prefixed `GUARD__` with `__` as the nested-key separator (e.g.
//! `GUARD__CHAINS__0__SUBMITTER__MAX_GAS_PRICE=750000000000`).
//!
//! # Example
//!
//! ```ignore
//! use guard::config::Settings;
//!
//! let settings = Settings::load("production")?;
//! settings.validate().map_err(|errs| eprintln!("{errs:?}"))?;
//! ```

mod settings;

pub use settings::{
    ChainSettings, DatabaseSettings, LoggingSettings, MetricsSettings, Settings, SignerSettings,
    StreamingSettings, SubmitterSettings,
};
