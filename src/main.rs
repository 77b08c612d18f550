//! MemePulse - Social sentiment trading engine
//!
//! # WARNING
//! - This engine trades with real money when wired to a live venue.
//! - Most meme tokens go to zero (rug pulls, abandonment).
//! - Social sentiment is trivially manipulated; treat every signal as hostile.
//! - Backtest success does NOT equal live success.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, warn};

// Use the library crate
use memepulse::backtest::StrategyKind;
use memepulse::cli::commands;
use memepulse::config::Config;

/// MemePulse - Social sentiment trading engine
#[derive(Parser)]
#[command(name = "memepulse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the trading engine
    Start {
        /// Run in dry-run mode (no real trades)
        #[arg(long)]
        dry_run: bool,
    },

    /// Replay a strategy over historical bars
    Backtest {
        /// Strategy to evaluate
        #[arg(value_enum)]
        strategy: StrategyKind,

        /// Symbol to backtest
        #[arg(default_value = "BTCUSD")]
        symbol: String,

        /// Number of daily bars to generate
        #[arg(long, default_value = "365")]
        days: usize,

        /// Seed for the synthetic bar generator
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Override the configured starting capital
        #[arg(long)]
        capital: Option<f64>,

        /// Include every trade and the full equity curve in the output
        #[arg(long)]
        full: bool,
    },

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("memepulse=info".parse()?),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Surface the active risk limits before doing anything else
    warn!(
        "Risk limits active: max_positions={}, position_size=${}, stop_loss={}%",
        config.risk.max_positions,
        config.risk.position_size_usd,
        config.risk.stop_loss_pct * 100.0
    );

    let result = match cli.command {
        Commands::Start { dry_run } => commands::start(&config, dry_run).await,
        Commands::Backtest {
            strategy,
            symbol,
            days,
            seed,
            capital,
            full,
        } => commands::backtest(&config, strategy, &symbol, days, seed, capital, full).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
