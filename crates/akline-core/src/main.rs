use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use akline_core::config::{bulk_credentials_from_env, ReaderConfig};
use akline_core::reader::{read, ReadRequest};
use akline_models::{Resolution, Symbol};
use akline_vendor::{BulkCredentials, HttpBulkAdapter, HttpIntradayAdapter};

#[derive(Parser, Debug)]
#[command(name = "akline", about = "Read-through A-share K-line reader")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single read-through query and print the merged candle stream.
    Read {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        resolution: String,
        #[arg(long)]
        begin: String,
        #[arg(long)]
        end: String,
        #[arg(short, long, default_value = "config/akline.toml")]
        config: String,
        /// Pretty-print the output JSON.
        #[arg(long)]
        pretty: bool,
    },
}

fn parse_resolution(s: &str) -> Result<Resolution> {
    Ok(match s {
        "1m" | "min1" => Resolution::Min1,
        "5m" | "min5" => Resolution::Min5,
        "15m" | "min15" => Resolution::Min15,
        "30m" | "min30" => Resolution::Min30,
        "60m" | "min60" => Resolution::Min60,
        "day" => Resolution::Day,
        "week" => Resolution::Week,
        "month" => Resolution::Month,
        other => anyhow::bail!("unsupported resolution: {other}"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Read {
            symbol,
            resolution,
            begin,
            end,
            config,
            pretty,
        } => {
            let config_str = std::fs::read_to_string(&config)
                .with_context(|| format!("failed to read config: {config}"))?;
            let config: ReaderConfig =
                toml::from_str(&config_str).context("failed to parse config")?;

            let symbol: Symbol = symbol.parse().context("invalid symbol")?;
            let resolution = parse_resolution(&resolution)?;
            let begin = begin.parse().context("invalid --begin date")?;
            let end = end.parse().context("invalid --end date")?;

            let mut conn = akline_store::db::open(&config.store.db_path, config.store.busy_timeout_ms)
                .context("failed to open store")?;

            let credentials = bulk_credentials_from_env().unwrap_or(BulkCredentials {
                username: String::new(),
                password: String::new(),
            });
            let mut bulk = HttpBulkAdapter::new(config.bulk_vendor.base_url.clone(), credentials);
            let intraday_adapter = HttpIntradayAdapter::new(config.intraday_vendor.base_url.clone());

            let request = ReadRequest {
                symbol,
                resolution,
                begin,
                end,
            };
            let now = chrono::Local::now().naive_local();

            let candles = read(&mut conn, &mut bulk, &intraday_adapter, request, now)
                .await
                .map_err(|e| anyhow::anyhow!("read failed: {e}"))?;

            let output = if pretty {
                serde_json::to_string_pretty(&candles)?
            } else {
                serde_json::to_string(&candles)?
            };
            println!("{output}");
        }
    }

    Ok(())
}
