use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use akline_backfill::config::{bulk_credentials_from_env, BackfillConfig, BatchOptions};
use akline_backfill::{driver, registry};
use akline_vendor::HttpBulkAdapter;

#[derive(Parser, Debug)]
#[command(name = "akline-backfill", about = "Resumable A-share K-line batch backfill")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the universe, backfilling day/week/month history for each symbol.
    Backfill {
        #[arg(long)]
        start_date: String,
        #[arg(long)]
        end_date: String,
        /// Delay between symbols, in milliseconds.
        #[arg(long, default_value_t = 500)]
        delay: u64,
        #[arg(long)]
        max_stocks: Option<usize>,
        #[arg(long, default_value_t = 300)]
        relogin_interval: usize,
        #[arg(long, default_value_t = 0)]
        start_index: usize,
        #[arg(short, long, default_value = "config/akline.toml")]
        config: String,
    },
    /// Refresh the universe registry from the four exchange boards.
    RefreshUniverse {
        #[arg(short, long, default_value = "config/akline.toml")]
        config: String,
    },
}

fn load_config(path: &str) -> Result<BackfillConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    toml::from_str(&raw).context("failed to parse config")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Backfill {
            start_date,
            end_date,
            delay,
            max_stocks,
            relogin_interval,
            start_index,
            config,
        } => {
            let config = load_config(&config)?;
            let mut conn =
                akline_store::db::open(&config.store.db_path, config.store.busy_timeout_ms)
                    .context("failed to open store")?;

            let universe = akline_store::universe::all(&conn).context("failed to load universe")?;
            if universe.is_empty() {
                tracing::warn!("universe is empty; run refresh-universe first");
            }

            let credentials = bulk_credentials_from_env()
                .context("BULK_VENDOR_USERNAME/BULK_VENDOR_PASSWORD must be set")?;
            let mut bulk = HttpBulkAdapter::new(config.bulk_vendor.base_url.clone(), credentials);

            let mut opts = BatchOptions::new(
                start_date.parse().context("invalid --start-date")?,
                end_date.parse().context("invalid --end-date")?,
            );
            opts.delay_ms = delay;
            opts.max_stocks = max_stocks;
            opts.relogin_interval = relogin_interval.max(1);
            opts.start_index = start_index;

            let cancel = CancellationToken::new();
            let report = driver::run_batch(&mut conn, &mut bulk, &universe, &opts, &cancel)
                .await
                .map_err(|e| anyhow::anyhow!("backfill failed: {e}"))?;

            tracing::info!(
                symbols = report.outcomes.len(),
                login_calls = report.login_calls,
                logout_calls = report.logout_calls,
                failures = report.failures().len(),
                "backfill complete"
            );
            for failure in report.failures() {
                println!(
                    "FAILED {} - {}",
                    failure.symbol,
                    failure.error.as_deref().unwrap_or("unknown error")
                );
            }
            // Exit 0 regardless of per-symbol failures: the summary above
            // (and the failure list on stdout) is the operator-facing signal.
        }
        Command::RefreshUniverse { config } => {
            let config = load_config(&config)?;
            let mut conn =
                akline_store::db::open(&config.store.db_path, config.store.busy_timeout_ms)
                    .context("failed to open store")?;
            let feed = registry::HttpRegistryFeed::new(config.registry.base_url.clone());
            let count = registry::refresh_universe(&mut conn, &feed)
                .await
                .map_err(|e| anyhow::anyhow!("universe refresh failed: {e}"))?;
            println!("refreshed {count} universe entries");
        }
    }

    Ok(())
}
