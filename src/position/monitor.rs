//! Position risk monitoring
//!
//! Evaluates exit triggers for every open position on a fixed cadence.
//! Trigger priority is fixed (stop-loss, take-profit, sentiment decay) so
//! a tick that satisfies several conditions resolves deterministically.
//! The close itself re-validates under the book lock, so a trigger racing
//! a manual close can never double-book a position.
//!
//! WARNING: stop-loss execution is best-effort, not guaranteed. At a
//! multi-second polling cadence a fast rug can gap through the stop before
//! detection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::RiskConfig;
use crate::error::Result;
use crate::events::{EngineEvent, EventSink};
use crate::position::manager::{ExitReason, Position, PositionManager, TradeRecord};
use crate::providers::{ExecutionGateway, MarketDataProvider};
use crate::sentiment::SentimentAggregator;

/// Decide whether a position must exit at the given mark.
///
/// Priority order: stop-loss, take-profit, sentiment decay. The first
/// matching trigger wins; a single tick can never fire two triggers.
pub fn check_exit(
    position: &Position,
    current_price: f64,
    social_score: Option<f64>,
    decay_ratio: f64,
) -> Option<ExitReason> {
    let adverse = match position.side {
        crate::position::Side::Long => current_price <= position.stop_loss_price,
        crate::position::Side::Short => current_price >= position.stop_loss_price,
    };
    if adverse {
        return Some(ExitReason::StopLoss);
    }

    let favorable = match position.side {
        crate::position::Side::Long => current_price >= position.take_profit_price,
        crate::position::Side::Short => current_price <= position.take_profit_price,
    };
    if favorable {
        return Some(ExitReason::TakeProfit);
    }

    if let (Some(entry_score), Some(current_score)) = (position.entry_social_score, social_score) {
        if entry_score > 0.0 && current_score < entry_score * decay_ratio {
            return Some(ExitReason::SentimentDecay);
        }
    }

    None
}

/// Monitors open positions and fires exit triggers
pub struct PositionRiskMonitor {
    manager: Arc<PositionManager>,
    market: Arc<dyn MarketDataProvider>,
    gateway: Arc<dyn ExecutionGateway>,
    aggregator: Arc<SentimentAggregator>,
    sink: Arc<dyn EventSink>,
    config: RiskConfig,
    emergency: AtomicBool,
}

impl PositionRiskMonitor {
    pub fn new(
        manager: Arc<PositionManager>,
        market: Arc<dyn MarketDataProvider>,
        gateway: Arc<dyn ExecutionGateway>,
        aggregator: Arc<SentimentAggregator>,
        sink: Arc<dyn EventSink>,
        config: RiskConfig,
    ) -> Self {
        Self {
            manager,
            market,
            gateway,
            aggregator,
            sink,
            config,
            emergency: AtomicBool::new(false),
        }
    }

    /// Request an emergency stop. The next monitoring iteration (or the
    /// current one, before its trigger pass) force-closes everything.
    pub fn trip_emergency(&self) {
        self.emergency.store(true, Ordering::SeqCst);
        warn!("emergency stop requested");
    }

    pub fn emergency_tripped(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }

    /// Run the monitoring loop until cancelled. Each iteration runs to
    /// completion before the next tick; iterations never overlap.
    pub async fn run(&self, cancel: CancellationToken, trade_tx: mpsc::Sender<TradeRecord>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.poll_interval_secs,
            "position monitor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("position monitor stopped");
                    return;
                }
                _ = interval.tick() => {
                    let closed = self.tick().await;
                    for record in closed {
                        if trade_tx.send(record).await.is_err() {
                            error!("trade channel closed, stopping monitor");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One monitoring cycle: emergency check first, then per-position
    /// price refresh and trigger evaluation.
    pub async fn tick(&self) -> Vec<TradeRecord> {
        if self.emergency_tripped() {
            return self.emergency_pass().await;
        }

        let positions = self.manager.open_positions().await;
        let results =
            futures::future::join_all(positions.iter().map(|p| self.refresh_and_check(p))).await;

        let mut closed = Vec::new();
        for (position, result) in positions.iter().zip(results) {
            match result {
                Ok(Some(record)) => closed.push(record),
                Ok(None) => {}
                Err(e) => {
                    // A stalled provider degrades this symbol only
                    warn!(symbol = %position.symbol, error = %e, "skipping position this cycle");
                }
            }
        }
        closed
    }

    async fn refresh_and_check(&self, position: &Position) -> Result<Option<TradeRecord>> {
        let timeout = Duration::from_secs(self.config.price_timeout_secs);
        let price = tokio::time::timeout(timeout, self.market.get_price(&position.symbol))
            .await
            .map_err(|_| crate::error::Error::ProviderTimeout(timeout.as_millis() as u64))??;

        self.manager.mark_price(&position.symbol, price).await;

        let social_score = self
            .aggregator
            .query(&position.symbol)
            .map(|r| r.weighted_score);

        let Some(reason) = check_exit(position, price, social_score, self.config.sentiment_decay_ratio)
        else {
            return Ok(None);
        };

        info!(symbol = %position.symbol, price, ?reason, "exit trigger fired");

        let record = self.manager.close_position(&position.symbol, price, reason).await?;
        self.submit_closing_order(&record).await;
        Ok(Some(record))
    }

    /// Force-close every open position at its last mark
    async fn emergency_pass(&self) -> Vec<TradeRecord> {
        warn!("emergency pass: closing all open positions");
        self.sink.publish(EngineEvent::EmergencyStop);

        let records = self.manager.close_all(ExitReason::Emergency).await;
        for record in &records {
            self.submit_closing_order(record).await;
        }
        records
    }

    /// Route the closing order to the venue. Failures are logged, not
    /// propagated: the book transition has already happened and an
    /// operator must reconcile manually.
    async fn submit_closing_order(&self, record: &TradeRecord) {
        let timeout = Duration::from_secs(self.config.price_timeout_secs);
        let submit = self
            .gateway
            .submit_order(&record.symbol, record.side.opposite(), record.size);

        match tokio::time::timeout(timeout, submit).await {
            Ok(Ok(order_id)) => {
                info!(symbol = %record.symbol, order_id, "closing order submitted")
            }
            Ok(Err(e)) => error!(symbol = %record.symbol, error = %e, "closing order failed"),
            Err(_) => error!(symbol = %record.symbol, "closing order timed out"),
        }
    }

    /// Manually close a position at the latest provider price
    pub async fn close_manual(&self, symbol: &str) -> Result<TradeRecord> {
        let timeout = Duration::from_secs(self.config.price_timeout_secs);
        let price = tokio::time::timeout(timeout, self.market.get_price(symbol))
            .await
            .map_err(|_| crate::error::Error::ProviderTimeout(timeout.as_millis() as u64))??;

        let record = self.manager.close_position(symbol, price, ExitReason::Manual).await?;
        self.submit_closing_order(&record).await;
        Ok(record)
    }
}
