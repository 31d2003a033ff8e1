//! Bridge event indexer CLI.
//!
//! - `run [--from-block]` — start livefilling every configured chain.
//! - `migrate [--revert]` — apply or roll back database migrations.
//! - `backfill --from --to` — replay a fixed block range without livefill.
//! - `version` — print the crate version.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rpc_backend::{ChainProvider, StandardEvmProvider};
use scribe_indexer::config::{ChainSettings, DatabaseSettings, LoggingSettings, Settings};
use scribe_indexer::error::{AppError, InfraError, Result};
use scribe_indexer::indexer::{
    ChainIndexer, CheckpointManager, ContractConfig, IndexerParams, RecoveryMode, run_retention_sweep,
};
use scribe_indexer::ports::{RecentTxCache, SystemClock};
use scribe_indexer::store::{PgPool, PostgresStore};
use scribe_indexer::streaming::{ServerState, build_router};
use scribe_indexer::types::primitives::{BlockNumber, EthAddress};
use scribe_indexer::types::IndexerStateKind;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "scribe-indexer", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Runtime environment, selects `config/{env}.toml` over `config/default.toml`.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    env: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start livefilling every configured chain and serve `/v1/stream-logs`.
    Run {
        /// Ignore stored cursors and start every contract from this block.
        #[arg(long)]
        from_block: Option<u64>,
    },
    /// Apply or roll back database migrations.
    Migrate {
        /// Roll back the most recently applied migration instead of applying new ones.
        #[arg(long)]
        revert: bool,
    },
    /// Replay a fixed block range on every configured chain without livefilling.
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
        println!("scribe-indexer {}", scribe_indexer::VERSION);
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
            Commands::Run { from_block } => run(settings, from_block).await,
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

async fn connect(settings: &DatabaseSettings) -> Result<PgPool> {
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

async fn run(settings: Settings, from_block_override: Option<u64>) -> Result<()> {
    let pool = connect(&settings.database).await?;
    let store = Arc::new(PostgresStore::new(pool));
    let cache = Arc::new(RecentTxCache::new());

    let mut chain_tasks = Vec::new();
    for chain in settings.chains.clone() {
        let store = Arc::clone(&store);
        let cache = Arc::clone(&cache);
        chain_tasks.push(tokio::spawn(async move {
            run_chain(chain, store, cache, from_block_override).await
        }));
    }

    let streaming = {
        let store = Arc::clone(&store);
        let addr = settings.streaming.socket_addr();
        let page_size = settings.streaming.default_page_size;
        tokio::spawn(async move { serve_streaming(store, &addr, page_size).await })
    };

    let retention_task = {
        let store = Arc::clone(&store);
        let interval = settings.retention.sweep_interval();
        let retain = settings.retention.retain();
        tokio::spawn(async move { run_retention_sweep(store.as_ref(), &SystemClock::new(), interval, retain).await })
    };

    tokio::select! {
        () = shutdown_signal() => {
            info!("shutdown signal received, draining tasks");
        }
        result = streaming => {
            handle_task_result(result, "streaming server")?;
        }
        result = retention_task => {
            handle_task_result(result, "retention sweep")?;
        }
    }

    for task in chain_tasks {
        task.abort();
    }
    Ok(())
}

async fn serve_streaming(store: Arc<PostgresStore>, addr: &str, page_size: u32) -> Result<()> {
    let state = ServerState::new(store, page_size);
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Infra(InfraError::Internal(format!("bind {addr}: {err}"))))?;
    info!(%addr, "streaming server listening");
    axum::serve(listener, router)
        .await
        .map_err(|err| AppError::Infra(InfraError::Internal(format!("streaming server: {err}"))))
}

async fn run_chain(
    chain: ChainSettings,
    store: Arc<PostgresStore>,
    cache: Arc<RecentTxCache>,
    from_block_override: Option<u64>,
) -> Result<()> {
    let provider = Arc::new(
        StandardEvmProvider::new(&chain.rpc_url)
            .await
            .map_err(|err| AppError::Infra(InfraError::Rpc(Box::new(err))))?,
    );

    let refresh_rate = chain
        .contracts
        .first()
        .map(|contract| contract.refresh_rate())
        .unwrap_or_else(|| Duration::from_secs(2));
    let params = IndexerParams {
        store_concurrency: chain.store_concurrency,
        concurrency_threshold: chain.concurrency_threshold,
        livefill_threshold: chain.livefill_threshold,
        refresh_rate,
    };
    let chain_indexer = ChainIndexer::new(
        Arc::clone(&provider),
        Arc::clone(&store),
        cache,
        chain.chain_id,
        params,
    );

    let tip = provider
        .latest_block_number()
        .await
        .map_err(|err| AppError::Infra(InfraError::Rpc(Box::new(err))))?;
    let confirmed_tip = BlockNumber::new(tip.saturating_sub(chain.confirmations));

    let mut configs = Vec::with_capacity(chain.contracts.len());
    for contract in &chain.contracts {
        let address = EthAddress::from_hex(&contract.address)?;
        let mut checkpoint = CheckpointManager::new(
            (*store).clone(),
            chain.chain_id,
            address,
            IndexerStateKind::Confirmed,
        )
        .with_min_block(BlockNumber::new(contract.start_block));
        if let Some(block) = from_block_override {
            checkpoint = checkpoint.with_recovery_mode(RecoveryMode::StartFrom(BlockNumber::new(block)));
        }
        let start_block = checkpoint.get_start_block().await?;
        configs.push(ContractConfig {
            contract: address,
            start_block,
        });
    }

    chain_indexer.run(configs, confirmed_tip).await?;
    chain_indexer.run_livefill(confirmed_tip).await
}

async fn backfill(settings: Settings, from: u64, to: u64) -> Result<()> {
    let pool = connect(&settings.database).await?;
    let store = Arc::new(PostgresStore::new(pool));
    let cache = Arc::new(RecentTxCache::new());

    for chain in settings.chains {
        let provider = Arc::new(
            StandardEvmProvider::new(&chain.rpc_url)
                .await
                .map_err(|err| AppError::Infra(InfraError::Rpc(Box::new(err))))?,
        );
        let params = IndexerParams {
            store_concurrency: chain.store_concurrency,
            concurrency_threshold: chain.concurrency_threshold,
            livefill_threshold: chain.livefill_threshold,
            refresh_rate: Duration::from_secs(2),
        };
        let chain_indexer =
            ChainIndexer::new(provider, Arc::clone(&store), Arc::clone(&cache), chain.chain_id, params);

        let mut configs = Vec::with_capacity(chain.contracts.len());
        for contract in &chain.contracts {
            configs.push(ContractConfig {
                contract: EthAddress::from_hex(&contract.address)?,
                start_block: BlockNumber::new(from),
            });
        }
        chain_indexer.run(configs, BlockNumber::new(to)).await?;
    }
    Ok(())
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
