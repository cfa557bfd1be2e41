use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walletsnap::adapters::{DebankClient, HyperliquidClient, PostgresStore};
use walletsnap::cli::{self, Cli, Commands};
use walletsnap::config::AppConfig;
use walletsnap::domain::{RunSummary, WriteMode};
use walletsnap::error::{Result, SnapError};
use walletsnap::services::SnapshotRunner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config);
    if let Err(errors) = config.validate() {
        return Err(SnapError::InvalidConfig(errors.join("; ")));
    }

    let store = PostgresStore::connect(
        &config.database.url,
        config.database.max_connections,
        config.writer.batch_size,
    )
    .await?;

    match &cli.command {
        Commands::Migrate => {
            store.migrate().await?;
        }
        Commands::Debank { wallets, mode } => {
            let mode = resolve_mode(*mode, &config)?;
            let wallets =
                cli::resolve_wallets(wallets.as_deref(), &config.debank.wallets, &config.wallets);
            let client = DebankClient::new(&config.debank, config.retry.clone())?;

            let runner = SnapshotRunner::new(store, mode);
            let summary = runner
                .run_debank(&client, &config.debank.table, &wallets)
                .await?;
            report(summary)?;
        }
        Commands::Hyperliquid {
            wallets,
            mode,
            equity_path,
        } => {
            let mode = resolve_mode(*mode, &config)?;
            let wallets = cli::resolve_wallets(
                wallets.as_deref(),
                &config.hyperliquid.wallets,
                &config.wallets,
            );
            let hint = equity_path
                .clone()
                .or_else(|| config.hyperliquid.equity_path.clone())
                .filter(|h| !h.is_empty());
            let client = HyperliquidClient::new(&config.hyperliquid, config.retry.clone())?;

            let runner = SnapshotRunner::new(store, mode);
            let summary = runner
                .run_hyperliquid(&client, &config.hyperliquid.table, &wallets, hint.as_deref())
                .await?;
            report(summary)?;
        }
    }

    Ok(())
}

fn resolve_mode(cli_mode: Option<WriteMode>, config: &AppConfig) -> Result<WriteMode> {
    match cli_mode {
        Some(mode) => Ok(mode),
        None => config.writer.mode.parse().map_err(SnapError::InvalidConfig),
    }
}

fn report(summary: RunSummary) -> Result<()> {
    for failure in &summary.failures {
        warn!(address = %failure.address, error = %failure.error, "address failed");
    }
    info!(
        fetched_at = %summary.fetched_at,
        addresses_ok = summary.addresses_ok,
        rows_written = summary.rows_written,
        failed = summary.failures.len(),
        "run complete"
    );

    if summary.all_failed() {
        return Err(SnapError::RunFailed(summary.failures.len()));
    }
    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},sqlx=warn", config.logging.level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
