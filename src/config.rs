//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
}

/// Sentiment aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentConfig {
    /// Trailing window over which mentions contribute to the score (minutes)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    /// Minimum follower count for a mention to be counted at all
    #[serde(default = "default_min_source_reach")]
    pub min_source_reach: u64,
    /// Records idle longer than this are evicted entirely (minutes)
    #[serde(default = "default_record_ttl_minutes")]
    pub record_ttl_minutes: i64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window_minutes(),
            min_source_reach: default_min_source_reach(),
            record_ttl_minutes: default_record_ttl_minutes(),
        }
    }
}

/// On-chain validation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_network")]
    pub network: String,
    /// Maximum number of recent transfers fetched per validation
    #[serde(default = "default_transfer_limit")]
    pub transfer_limit: usize,
    /// Fallback USD reference price when no market feed is wired in
    #[serde(default = "default_reference_price")]
    pub reference_price_usd: f64,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            transfer_limit: default_transfer_limit(),
            reference_price_usd: default_reference_price(),
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Signal admission configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_min_sentiment_score")]
    pub min_sentiment_score: f64,
    #[serde(default = "default_min_distinct_sources")]
    pub min_distinct_sources: usize,
    #[serde(default = "default_max_market_cap")]
    pub max_market_cap_usd: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_sentiment_score: default_min_sentiment_score(),
            min_distinct_sources: default_min_distinct_sources(),
            max_market_cap_usd: default_max_market_cap(),
        }
    }
}

/// Position risk configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum concurrent open positions
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    /// Notional size of each new position, in USD
    #[serde(default = "default_position_size_usd")]
    pub position_size_usd: f64,
    /// Starting portfolio balance, in USD
    #[serde(default = "default_starting_balance")]
    pub starting_balance_usd: f64,
    /// Stop-loss distance as a fraction of entry price (0.15 = 15%)
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    /// Take-profit distance as a fraction of entry price (0.30 = 30%)
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    /// Exit when social score falls below this fraction of its entry value
    #[serde(default = "default_sentiment_decay_ratio")]
    pub sentiment_decay_ratio: f64,
    /// Position monitoring cadence (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Timeout for each price fetch inside the monitoring loop (seconds)
    #[serde(default = "default_price_timeout_secs")]
    pub price_timeout_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_positions: default_max_positions(),
            position_size_usd: default_position_size_usd(),
            starting_balance_usd: default_starting_balance(),
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            sentiment_decay_ratio: default_sentiment_decay_ratio(),
            poll_interval_secs: default_poll_interval_secs(),
            price_timeout_secs: default_price_timeout_secs(),
        }
    }
}

/// Trade execution pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_network")]
    pub network: String,
    /// Wallet address trades originate from
    #[serde(default)]
    pub from_address: String,
    /// Router / DEX contract trades go through
    #[serde(default)]
    pub router_address: String,
    /// Gas limit used when simulation yields no estimate
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    #[serde(default = "default_execution_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            from_address: String::new(),
            router_address: String::new(),
            default_gas_limit: default_gas_limit(),
            provider_timeout_secs: default_execution_timeout_secs(),
        }
    }
}

/// Backtesting defaults (overridable per run from the CLI)
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Force-close breach thresholds, as fractions
    #[serde(default = "default_backtest_stop_loss")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_backtest_take_profit")]
    pub take_profit_pct: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            stop_loss_pct: default_backtest_stop_loss(),
            take_profit_pct: default_backtest_take_profit(),
        }
    }
}

fn default_window_minutes() -> i64 { 30 }
fn default_min_source_reach() -> u64 { 50_000 }
fn default_record_ttl_minutes() -> i64 { 120 }
fn default_network() -> String { "ethereum".to_string() }
fn default_transfer_limit() -> usize { 50 }
fn default_reference_price() -> f64 { 0.001 }
fn default_provider_timeout_secs() -> u64 { 10 }
fn default_min_sentiment_score() -> f64 { 0.8 }
fn default_min_distinct_sources() -> usize { 5 }
fn default_max_market_cap() -> f64 { 10_000_000.0 }
fn default_max_positions() -> usize { 5 }
fn default_position_size_usd() -> f64 { 100.0 }
fn default_starting_balance() -> f64 { 10_000.0 }
fn default_stop_loss_pct() -> f64 { 0.15 }
fn default_take_profit_pct() -> f64 { 0.30 }
fn default_sentiment_decay_ratio() -> f64 { 0.40 }
fn default_poll_interval_secs() -> u64 { 5 }
fn default_price_timeout_secs() -> u64 { 10 }
fn default_gas_limit() -> u64 { 300_000 }
fn default_execution_timeout_secs() -> u64 { 15 }
fn default_initial_capital() -> f64 { 10_000.0 }
fn default_backtest_stop_loss() -> f64 { 0.10 }
fn default_backtest_take_profit() -> f64 { 0.20 }

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix MEMEPULSE_)
            .add_source(
                config::Environment::with_prefix("MEMEPULSE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Human-readable dump with addresses masked
    pub fn masked_display(&self) -> String {
        format!(
            "[sentiment]\n\
             window_minutes = {}\n\
             min_source_reach = {}\n\
             \n[validation]\n\
             network = {}\n\
             transfer_limit = {}\n\
             \n[gate]\n\
             min_sentiment_score = {}\n\
             min_distinct_sources = {}\n\
             max_market_cap_usd = {}\n\
             \n[risk]\n\
             max_positions = {}\n\
             position_size_usd = {}\n\
             stop_loss_pct = {}\n\
             take_profit_pct = {}\n\
             sentiment_decay_ratio = {}\n\
             \n[execution]\n\
             network = {}\n\
             from_address = {}\n\
             router_address = {}",
            self.sentiment.window_minutes,
            self.sentiment.min_source_reach,
            self.validation.network,
            self.validation.transfer_limit,
            self.gate.min_sentiment_score,
            self.gate.min_distinct_sources,
            self.gate.max_market_cap_usd,
            self.risk.max_positions,
            self.risk.position_size_usd,
            self.risk.stop_loss_pct,
            self.risk.take_profit_pct,
            self.risk.sentiment_decay_ratio,
            self.execution.network,
            mask_address(&self.execution.from_address),
            mask_address(&self.execution.router_address),
        )
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.sentiment.window_minutes <= 0 {
            anyhow::bail!("sentiment.window_minutes must be positive");
        }

        if !(0.0..=1.0).contains(&self.gate.min_sentiment_score) {
            anyhow::bail!("gate.min_sentiment_score must be within [0, 1]");
        }

        if self.risk.max_positions == 0 {
            anyhow::bail!("risk.max_positions must be at least 1");
        }

        if self.risk.position_size_usd <= 0.0 {
            anyhow::bail!("risk.position_size_usd must be positive");
        }

        if !(0.0..1.0).contains(&self.risk.stop_loss_pct) {
            anyhow::bail!("risk.stop_loss_pct must be within [0, 1)");
        }

        if self.risk.take_profit_pct <= 0.0 {
            anyhow::bail!("risk.take_profit_pct must be positive");
        }

        if !(0.0..1.0).contains(&self.risk.sentiment_decay_ratio) {
            anyhow::bail!("risk.sentiment_decay_ratio must be within [0, 1)");
        }

        if self.validation.transfer_limit == 0 {
            anyhow::bail!("validation.transfer_limit must be at least 1");
        }

        if self.backtest.initial_capital <= 0.0 {
            anyhow::bail!("backtest.initial_capital must be positive");
        }

        Ok(())
    }
}

/// Keep enough of an address to recognize it, never the whole thing
fn mask_address(address: &str) -> String {
    if address.is_empty() {
        "(unset)".to_string()
    } else if address.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}****{}", &address[..6], &address[address.len() - 2..])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sentiment: SentimentConfig::default(),
            validation: ValidationConfig::default(),
            gate: GateConfig::default(),
            risk: RiskConfig::default(),
            execution: ExecutionConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}
