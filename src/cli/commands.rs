//! CLI command implementations

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backtest::{synthetic_series, BacktestEngine, StrategyKind};
use crate::cli::sandbox::{
    SandboxBroadcaster, SandboxChain, SandboxFees, SandboxGateway, SandboxMarket,
    SandboxSimulator, SandboxSocialFeed,
};
use crate::config::Config;
use crate::events::{BroadcastSink, EngineEvent, EventSink};
use crate::execution::{DevSigner, TradeExecutionCoordinator, TradeIntent};
use crate::onchain::OnChainValidator;
use crate::position::{PositionManager, PositionRiskMonitor, Side, TradeRecord};
use crate::providers::MarketDataProvider;
use crate::signal::{GateDecision, SignalGate};
use crate::sentiment::SentimentAggregator;

/// Seconds between social feed scans
const SCAN_INTERVAL_SECS: u64 = 15;

/// Start the trading engine against the sandbox providers
pub async fn start(config: &Config, dry_run: bool) -> Result<()> {
    if dry_run {
        warn!("Running in DRY-RUN mode - no real trades will be executed");
    } else {
        warn!("No live venue adapter is wired in; running against sandbox providers");
    }

    info!("Starting sentiment trading engine...");
    info!(
        "Position size: ${}, max positions: {}, stop loss: {}%",
        config.risk.position_size_usd,
        config.risk.max_positions,
        config.risk.stop_loss_pct * 100.0
    );

    // Event bus: every state transition is observable here
    let bus = Arc::new(BroadcastSink::new(256));
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => debug!(event = %json, "engine event"),
                Err(e) => error!("Failed to serialize event: {}", e),
            }
        }
    });
    let sink: Arc<dyn EventSink> = bus.clone();

    // Sandbox providers stand in for the real feeds
    let feed = SandboxSocialFeed::new(5);
    let market = Arc::new(SandboxMarket::new(7));
    let chain = Arc::new(SandboxChain::new(7));
    let gateway = Arc::new(SandboxGateway::new());

    let aggregator = Arc::new(SentimentAggregator::new(
        config.sentiment.clone(),
        sink.clone(),
    ));
    let validator = OnChainValidator::new(config.validation.clone(), chain);
    let gate = SignalGate::new(config.gate.clone());
    let manager = Arc::new(PositionManager::new(config.risk.clone(), sink.clone()));
    let coordinator = TradeExecutionCoordinator::new(
        vec![Arc::new(SandboxFees)],
        Arc::new(SandboxSimulator),
        Arc::new(DevSigner::default()),
        Arc::new(SandboxBroadcaster),
        config.execution.clone(),
    );

    let monitor = Arc::new(PositionRiskMonitor::new(
        manager.clone(),
        market.clone(),
        gateway,
        aggregator.clone(),
        sink.clone(),
        config.risk.clone(),
    ));

    let cancel = CancellationToken::new();
    let (trade_tx, mut trade_rx) = mpsc::channel::<TradeRecord>(32);

    let monitor_task = {
        let monitor = monitor.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel, trade_tx).await })
    };

    tokio::spawn(async move {
        while let Some(record) = trade_rx.recv().await {
            info!(
                symbol = %record.symbol,
                pnl = record.realized_pnl,
                reason = ?record.exit_reason,
                "trade closed"
            );
        }
    });

    info!("Scanning social feed every {}s...", SCAN_INTERVAL_SECS);
    let mut scan = tokio::time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = scan.tick() => {
                for event in feed.next_batch() {
                    aggregator.ingest(event);
                }
                scan_for_signals(
                    config,
                    &aggregator,
                    &validator,
                    &gate,
                    &manager,
                    &coordinator,
                    market.as_ref(),
                    sink.as_ref(),
                )
                .await;
            }
        }
    }

    cancel.cancel();
    let _ = monitor_task.await;

    let portfolio = manager.portfolio().await;
    let stats = manager.daily_stats().await;
    info!(
        "Final portfolio: balance=${:.2}, realized=${:.2}, trades={}, win_rate={:.1}%",
        portfolio.available_balance,
        portfolio.realized_pnl,
        stats.total_trades,
        stats.win_rate()
    );

    Ok(())
}

/// One admission sweep over every symbol with a live sentiment record
#[allow(clippy::too_many_arguments)]
async fn scan_for_signals(
    config: &Config,
    aggregator: &SentimentAggregator,
    validator: &OnChainValidator,
    gate: &SignalGate,
    manager: &PositionManager,
    coordinator: &TradeExecutionCoordinator,
    market: &dyn MarketDataProvider,
    sink: &dyn EventSink,
) {
    for symbol in aggregator.tracked_symbols() {
        let Some(record) = aggregator.query(&symbol) else {
            continue;
        };

        let market_cap = match market.get_market_cap(&symbol).await {
            Ok(cap) => cap,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "market cap unavailable, skipping");
                continue;
            }
        };

        // Sandbox contracts are derived from the symbol
        let contract = format!("0x{}", symbol.to_lowercase());
        let assessment = validator.validate(&config.validation.network, &contract).await;

        let exposure = manager.exposure_view(&symbol).await;
        let decision = gate.evaluate(&record, &assessment, market_cap, exposure);

        let signal = match decision {
            GateDecision::Admitted(signal) => {
                sink.publish(EngineEvent::SignalAdmitted(signal.clone()));
                signal
            }
            GateDecision::Rejected(reason) => {
                debug!(symbol = %symbol, reason = reason.description(), "signal rejected");
                continue;
            }
        };

        let price = match market.get_price(&symbol).await {
            Ok(price) if price > 0.0 => price,
            Ok(_) | Err(_) => {
                warn!(symbol = %symbol, "no usable price, dropping admitted signal");
                continue;
            }
        };

        // Unconfigured addresses fall back to sandbox placeholders so the
        // pipeline stays runnable out of the box
        let intent = TradeIntent {
            symbol: symbol.clone(),
            side: Side::Long,
            network: config.execution.network.clone(),
            from_address: or_sandbox(&config.execution.from_address, "0xsandboxwallet"),
            to_contract: or_sandbox(&config.execution.router_address, "0xsandboxrouter"),
            token_address: contract,
            amount: config.risk.position_size_usd,
        };
        let report = coordinator.execute(intent).await;
        if !report.status.is_success() {
            warn!(
                symbol = %symbol,
                status = ?report.status,
                detail = %report.detail,
                "execution failed, signal dropped"
            );
            continue;
        }

        let size = config.risk.position_size_usd / price;
        match manager
            .open_position(&symbol, Side::Long, size, price, Some(signal.sentiment_score))
            .await
        {
            Ok(position) => info!(
                symbol = %symbol,
                entry = position.entry_price,
                stop = position.stop_loss_price,
                target = position.take_profit_price,
                confidence = signal.confidence,
                "position opened"
            ),
            Err(e) => warn!(symbol = %symbol, error = %e, "could not open position"),
        }
    }
}

fn or_sandbox(configured: &str, fallback: &str) -> String {
    if configured.is_empty() {
        fallback.to_string()
    } else {
        configured.to_string()
    }
}

/// Run a backtest and print the report as JSON
pub async fn backtest(
    config: &Config,
    strategy: StrategyKind,
    symbol: &str,
    days: usize,
    seed: u64,
    capital: Option<f64>,
    full: bool,
) -> Result<()> {
    let built = strategy.build();
    info!(
        "Backtesting {} on {} over {} days (seed {})",
        built.name(),
        symbol,
        days,
        seed
    );

    let bars = synthetic_series(symbol, days, seed);
    let mut settings = config.backtest.clone();
    if let Some(capital) = capital {
        settings.initial_capital = capital;
    }
    let engine = BacktestEngine::new(settings);
    let report = engine.run(built.as_ref(), symbol, &bars);

    if full {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let summary = serde_json::json!({
            "strategy": report.strategy,
            "symbol": report.symbol,
            "initial_capital": report.initial_capital,
            "final_equity": report.final_equity,
            "net_profit": report.net_profit,
            "total_trades": report.total_trades,
            "win_rate": report.win_rate,
            "max_drawdown_pct": report.max_drawdown_pct,
            "sharpe_ratio": report.sharpe_ratio,
            "profit_factor": report.profit_factor,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
