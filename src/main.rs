use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use rust_splitwatch::config::AppConfig;
use rust_splitwatch::constants::paths;
use rust_splitwatch::data::query::{render_json, render_table, LedgerQuery, StatusFilter};
use rust_splitwatch::data::SentLedger;
use rust_splitwatch::services::{Pipeline, RunScheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// SplitWatch - Reverse stock split discovery and notification.
#[derive(Parser, Debug)]
#[command(name = "rust_splitwatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = paths::DEFAULT_CONFIG)]
    config: PathBuf,

    /// Log level when RUST_LOG is not set (debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one discovery pass now
    Run(RunArgs),

    /// Run on the configured cron schedule until interrupted
    Schedule(ScheduleArgs),

    /// Query the sent ledger (read-only)
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Label buy alerts DRY RUN regardless of configuration
    #[arg(long)]
    dry_run: bool,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    /// Label buy alerts DRY RUN regardless of configuration
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Ledger file (defaults to the configured ledger path)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Only this symbol
    #[arg(long)]
    symbol: Option<String>,

    /// Only this exact effective date
    #[arg(long)]
    on: Option<NaiveDate>,

    /// Effective date on or after
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Effective date on or before
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only entries that can still be bought
    #[arg(long, conflicts_with = "expired")]
    still_buyable: bool,

    /// Only entries past their last buy day
    #[arg(long)]
    expired: bool,

    /// Raw JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => {
            info!("Starting SplitWatch run...");
            let config = AppConfig::load(&cli.config)?;
            let pipeline = Pipeline::from_config(&config, args.dry_run)?;

            let now = Utc::now();
            let today = args.today.unwrap_or_else(|| now.date_naive());
            let summary = pipeline.run(today, now).await?;
            info!(
                "Run {} done: {} new, {} still buyable, {} expired",
                summary.run_id,
                summary.outcome.new.len(),
                summary.outcome.still_buyable.len(),
                summary.outcome.expired_count
            );
        }
        Commands::Schedule(args) => {
            let config = AppConfig::load(&cli.config)?;
            let pipeline = Arc::new(Pipeline::from_config(&config, args.dry_run)?);

            let mut scheduler = RunScheduler::new(pipeline, config.schedule.cron.clone())
                .start()
                .await?;
            tokio::signal::ctrl_c().await?;
            info!("🛑 [SCHEDULER] Shutting down...");
            scheduler.shutdown().await?;
        }
        Commands::Query(args) => {
            let ledger_path = match args.ledger {
                Some(path) => path,
                None => AppConfig::load(&cli.config)?.ledger.path,
            };
            let ledger = SentLedger::open(ledger_path)?;

            let status = if args.still_buyable {
                Some(StatusFilter::StillBuyable)
            } else if args.expired {
                Some(StatusFilter::Expired)
            } else {
                None
            };
            let query = LedgerQuery {
                symbol: args.symbol,
                on: args.on,
                from: args.from,
                to: args.to,
                status,
            };
            let rows = query.run(&ledger, Utc::now().date_naive());

            if args.json {
                println!("{}", render_json(&rows)?);
            } else {
                println!("{}", render_table(&rows));
            }
        }
    }

    Ok(())
}
