//! Fraud-response guard CLI.
//!
//! - `run` — start the fraud-response pipeline on every configured chain.
//! - `migrate [--revert]` — apply or roll back database migrations.
//! - `backfill --from --to` — replay a fixed block range on every configured
//!   chain without staying subscribed afterward.
//! - `version` — print the crate version.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use guard::config::{DatabaseSettings, LoggingSettings, Settings};
use guard::error::{AppError, InfraError, Result};
use guard::pipeline::{ChainAddresses, GuardMetrics, GuardPipeline, decode_log};
use guard::store::PostgresStore;
use guard::streaming::{ScribeStreamClient, StreamRequest};
use guard::submitter::{SubmitterConfig, TxSubmitter};
use rpc_backend::StandardEvmProvider;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "guard", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Runtime environment, selects `config/{env}.toml` over `config/default.toml`.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    env: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the fraud-response pipeline on every configured chain.
    Run,
    /// Apply or roll back database migrations.
    Migrate {
        /// Roll back the most recently applied migration instead of applying new ones.
        #[arg(long)]
        revert: bool,
    },
    /// Replay a fixed block range on every configured chain without staying subscribed.
    Backfill {
        /// Starting block number (inclusive).
        #[arg(long)]
        from: u64,
        /// Ending block number (inclusive).
        #[arg(long)]
        to: u64,
    },
    /// Print the crate version.
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("guard {}", guard::VERSION);
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load(&cli.env) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(errors) = settings.validate() {
        for err in &errors {
            eprintln!("configuration error: {err}");
        }
        return ExitCode::from(2);
    }

    init_tracing(&settings.logging);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::from(70);
        }
    };

    let outcome = runtime.block_on(async move {
        match cli.command {
            Commands::Run => run(settings).await,
            Commands::Migrate { revert } => migrate(settings, revert).await,
            Commands::Backfill { from, to } => backfill(settings, from, to).await,
            Commands::Version => unreachable!("handled before runtime startup"),
        }
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal error");
            ExitCode::from(70)
        }
    }
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn connect(settings: &DatabaseSettings) -> Result<sqlx::PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout())
        .idle_timeout(settings.idle_timeout())
        .connect(&settings.url)
        .await
        .map_err(|err| AppError::Infra(InfraError::Database(err)))
}

async fn migrate(settings: Settings, revert: bool) -> Result<()> {
    let pool = connect(&settings.database).await?;
    let store = PostgresStore::new(pool);
    if revert {
        info!("reverting last migration");
        store.revert_migrations().await
    } else {
        info!("applying pending migrations");
        store.run_migrations().await
    }
}

fn load_signer(settings: &Settings) -> Result<PrivateKeySigner> {
    let raw = std::env::var(&settings.signer.private_key_env).map_err(|_| {
        AppError::Config(format!(
            "environment variable {} not set",
            settings.signer.private_key_env
        ))
    })?;
    raw.parse()
        .map_err(|err| AppError::Infra(InfraError::Signer(format!("invalid signer key: {err}"))))
}

fn parse_address(raw: &str, label: &str) -> Result<alloy::primitives::Address> {
    raw.parse()
        .map_err(|err| AppError::Config(format!("invalid {label} address {raw}: {err}")))
}

async fn run(settings: Settings) -> Result<()> {
    let pool = connect(&settings.database).await?;
    let store = Arc::new(PostgresStore::new(pool));
    let signer = load_signer(&settings)?;

    let mut providers = HashMap::new();
    let mut addresses = HashMap::new();
    let mut submitter_configs = HashMap::new();
    let mut signers = Vec::new();

    for chain in &settings.chains {
        let provider = Arc::new(
            StandardEvmProvider::new(&chain.rpc_url)
                .await
                .map_err(|err| AppError::Infra(InfraError::Rpc(Box::new(err))))?,
        );
        providers.insert(chain.chain_id, provider);

        let manager_raw = if chain.is_hub {
            chain.bonding_manager_address.as_deref()
        } else {
            chain.light_manager_address.as_deref()
        };
        let Some(manager_raw) = manager_raw else {
            return Err(AppError::Config(format!(
                "chain {} missing manager address after validation",
                chain.chain_id
            )));
        };
        addresses.insert(
            chain.chain_id,
            ChainAddresses {
                inbox: parse_address(&chain.inbox_address, "inbox")?,
                manager: parse_address(manager_raw, "manager")?,
            },
        );

        submitter_configs.insert(
            chain.chain_id,
            SubmitterConfig {
                max_gas_price: chain.submitter.max_gas_price,
                bump_interval: chain.submitter.bump_interval(),
                gas_bump_percentage: chain.submitter.gas_bump_percentage,
                gas_estimate: chain.submitter.gas_estimate,
                dynamic_gas_estimate: chain.submitter.dynamic_gas_estimate,
                supports_eip1559: chain.submitter.supports_eip1559,
                poll_interval: chain.submitter.poll_interval(),
            },
        );
        signers.push((signer.address(), chain.chain_id));
    }

    let submitter = Arc::new(TxSubmitter::new(
        providers.clone(),
        Arc::clone(&store),
        submitter_configs,
        signer.clone(),
    ));

    let metrics = Arc::new(GuardMetrics::new());
    let pipeline = Arc::new(GuardPipeline::new(
        providers,
        addresses,
        Arc::clone(&store),
        Arc::clone(&submitter),
        signer,
        Arc::clone(&metrics),
    ));

    let reconciliation = {
        let submitter = Arc::clone(&submitter);
        tokio::spawn(async move { submitter.run_reconciliation_loop(&signers).await })
    };

    let base_url = url::Url::parse(&settings.streaming.base_url)
        .map_err(|err| AppError::Config(format!("invalid streaming.base_url: {err}")))?;
    let stream_client = Arc::new(ScribeStreamClient::new(base_url));

    let mut stream_tasks = Vec::new();
    for chain in &settings.chains {
        let pipeline = Arc::clone(&pipeline);
        let stream_client = Arc::clone(&stream_client);
        let chain_id = chain.chain_id;
        let from_block = chain.stream_from_block;
        let metrics = Arc::clone(&metrics);
        stream_tasks.push(tokio::spawn(async move {
            consume_chain(stream_client, pipeline, metrics, chain_id, from_block, None).await;
        }));
    }

    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received, draining tasks");
        }
        result = reconciliation => {
            handle_task_result(result, "reconciliation loop")?;
        }
    }

    for task in stream_tasks {
        task.abort();
    }
    Ok(())
}

async fn backfill(settings: Settings, from: u64, to: u64) -> Result<()> {
    let pool = connect(&settings.database).await?;
    let store = Arc::new(PostgresStore::new(pool));
    let signer = load_signer(&settings)?;

    let mut providers = HashMap::new();
    let mut addresses = HashMap::new();
    let mut submitter_configs = HashMap::new();

    for chain in &settings.chains {
        let provider = Arc::new(
            StandardEvmProvider::new(&chain.rpc_url)
                .await
                .map_err(|err| AppError::Infra(InfraError::Rpc(Box::new(err))))?,
        );
        providers.insert(chain.chain_id, provider);

        let manager_raw = if chain.is_hub {
            chain.bonding_manager_address.as_deref()
        } else {
            chain.light_manager_address.as_deref()
        };
        let Some(manager_raw) = manager_raw else {
            return Err(AppError::Config(format!(
                "chain {} missing manager address after validation",
                chain.chain_id
            )));
        };
        addresses.insert(
            chain.chain_id,
            ChainAddresses {
                inbox: parse_address(&chain.inbox_address, "inbox")?,
                manager: parse_address(manager_raw, "manager")?,
            },
        );

        submitter_configs.insert(
            chain.chain_id,
            SubmitterConfig {
                max_gas_price: chain.submitter.max_gas_price,
                bump_interval: chain.submitter.bump_interval(),
                gas_bump_percentage: chain.submitter.gas_bump_percentage,
                gas_estimate: chain.submitter.gas_estimate,
                dynamic_gas_estimate: chain.submitter.dynamic_gas_estimate,
                supports_eip1559: chain.submitter.supports_eip1559,
                poll_interval: chain.submitter.poll_interval(),
            },
        );
    }

    let submitter = Arc::new(TxSubmitter::new(
        providers.clone(),
        Arc::clone(&store),
        submitter_configs,
        signer.clone(),
    ));
    let metrics = Arc::new(GuardMetrics::new());
    let pipeline = Arc::new(GuardPipeline::new(
        providers,
        addresses,
        Arc::clone(&store),
        Arc::clone(&submitter),
        signer,
        Arc::clone(&metrics),
    ));

    let base_url = url::Url::parse(&settings.streaming.base_url)
        .map_err(|err| AppError::Config(format!("invalid streaming.base_url: {err}")))?;
    let stream_client = Arc::new(ScribeStreamClient::new(base_url));

    let mut tasks = Vec::new();
    for chain in &settings.chains {
        let pipeline = Arc::clone(&pipeline);
        let stream_client = Arc::clone(&stream_client);
        let metrics = Arc::clone(&metrics);
        let chain_id = chain.chain_id;
        tasks.push(tokio::spawn(async move {
            consume_chain(stream_client, pipeline, metrics, chain_id, from, Some(to)).await;
        }));
    }

    for task in tasks {
        task.await.map_err(|join_err| {
            AppError::Infra(InfraError::Internal(format!("backfill task panicked: {join_err}")))
        })?;
    }
    info!(from, to, events_replayed = metrics.total_events(), "backfill complete");
    Ok(())
}

async fn consume_chain(
    stream_client: Arc<ScribeStreamClient>,
    pipeline: Arc<GuardPipeline<StandardEvmProvider, PostgresStore, PostgresStore>>,
    metrics: Arc<GuardMetrics>,
    chain_id: u64,
    from_block: u64,
    to_block: Option<u64>,
) {
    let mut rx = stream_client.subscribe(StreamRequest {
        chain_id,
        address: None,
        from_block,
        to_block,
    });

    while let Some(streamed) = rx.recv().await {
        let decoded = match decode_log(&streamed.log) {
            Ok(Some((mut ctx, event))) => {
                ctx.chain_id = chain_id;
                Some((ctx, event))
            }
            Ok(None) => None,
            Err(err) => {
                warn!(chain_id, error = %err, "failed to decode log, skipping");
                None
            }
        };

        let Some((ctx, event)) = decoded else {
            continue;
        };

        if let Err(err) = pipeline.handle_event(ctx, event).await {
            metrics.record_handler_error();
            warn!(chain_id, error = %err, "fraud-response handler failed");
        }
    }
}

fn handle_task_result<T>(result: std::result::Result<Result<T>, tokio::task::JoinError>, label: &str) -> Result<()> {
    match result {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(err),
        Err(join_err) => Err(AppError::Infra(InfraError::Internal(format!(
            "{label} task panicked: {join_err}"
        )))),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
