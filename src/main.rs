//! chainwatch CLI
//!
//! Terminal watcher for Bitcoin chain and market data. Every subcommand runs
//! in one of four modes selected by `--watch` and `--json`; one-shot modes
//! exit 0/1 on success/failure, watch modes refresh until interrupted.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use chainwatch::commands::{
    BlockCommand, DifficultyCommand, FeesCommand, MempoolCommand, PriceCommand, ProvidersCommand,
};
use chainwatch::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WATCH_INTERVAL_SECS};
use chainwatch::context::{AppContext, Config};
use chainwatch::runner::{self, RunOptions};

#[derive(Parser)]
#[command(name = "chainwatch")]
#[command(version)]
#[command(about = "Watch Bitcoin chain and market data from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep refreshing instead of exiting after one poll
    #[arg(short, long, global = true)]
    watch: bool,

    /// Emit JSON documents instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Seconds between watch refreshes
    #[arg(short, long, global = true, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
    interval: u64,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout: u64,

    /// Abort a watch after this many consecutive failed refreshes
    #[arg(long, global = true, value_name = "N")]
    max_failures: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommended fee rates in sat/vB
    Fees,

    /// Mempool congestion snapshot
    Mempool,

    /// Progress toward the next difficulty retarget
    Difficulty,

    /// Summary of a block
    Block {
        /// Block hash (64 hex characters)
        hash: String,
    },

    /// BTC spot price in USD
    Price,

    /// Show the configured provider fallback chains
    Providers,
}

#[tokio::main]
async fn main() {
    // stdout carries command output; diagnostics stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chainwatch=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config {
        request_timeout: Duration::from_secs(cli.timeout),
        watch_interval: Duration::from_secs(cli.interval),
        max_consecutive_failures: cli.max_failures,
        ..Config::default()
    };
    let opts = RunOptions::from_config(&config, cli.watch, cli.json);

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("chainwatch: {err}");
            std::process::exit(1);
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    if cli.watch {
        // One-shot modes keep the default SIGINT disposition; a registered
        // handler would hold it for the rest of the process.
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = stop_tx.send(true);
            }
        });
    }

    let exit_code = match cli.command {
        Commands::Fees => runner::run(&ctx, &FeesCommand, &opts, stop_rx).await,
        Commands::Mempool => runner::run(&ctx, &MempoolCommand, &opts, stop_rx).await,
        Commands::Difficulty => runner::run(&ctx, &DifficultyCommand, &opts, stop_rx).await,
        Commands::Block { hash } => {
            runner::run(&ctx, &BlockCommand::new(hash), &opts, stop_rx).await
        }
        Commands::Price => runner::run(&ctx, &PriceCommand, &opts, stop_rx).await,
        Commands::Providers => runner::run(&ctx, &ProvidersCommand, &opts, stop_rx).await,
    };

    std::process::exit(exit_code);
}
