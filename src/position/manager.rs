//! Position and portfolio accounting
//!
//! Tracks open positions and portfolio balances. All mutation goes through
//! one write lock over the book, so opening, marking and closing are atomic
//! with respect to each other: a position can never be closed twice and the
//! portfolio never observes a half-applied transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RiskConfig;
use crate::error::{Error, Result};
use crate::events::{EngineEvent, EventSink};
use crate::signal::ExposureView;

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SentimentDecay,
    Manual,
    Emergency,
}

/// A single position in a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    /// Position size in token units
    pub size: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub status: PositionStatus,
    /// Weighted sentiment score at entry, used for the decay exit trigger
    pub entry_social_score: Option<f64>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub exit_reason: Option<ExitReason>,
}

impl Position {
    /// Open a position, deriving stop-loss and take-profit levels from the
    /// entry price. For longs the stop sits below and the target above; a
    /// short inverts both.
    pub fn open(
        symbol: impl Into<String>,
        side: Side,
        size: f64,
        entry_price: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
        entry_social_score: Option<f64>,
    ) -> Self {
        let (stop_loss_price, take_profit_price) = match side {
            Side::Long => (
                entry_price * (1.0 - stop_loss_pct),
                entry_price * (1.0 + take_profit_pct),
            ),
            Side::Short => (
                entry_price * (1.0 + stop_loss_pct),
                entry_price * (1.0 - take_profit_pct),
            ),
        };

        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            size,
            entry_price,
            current_price: entry_price,
            stop_loss_price,
            take_profit_price,
            status: PositionStatus::Open,
            entry_social_score,
            opened_at: Utc::now(),
            closed_at: None,
            exit_reason: None,
        }
    }

    /// Notional value at entry, in quote currency
    pub fn notional(&self) -> f64 {
        self.size * self.entry_price
    }

    /// Unrealized P&L at the current mark
    pub fn unrealized_pnl(&self) -> f64 {
        (self.current_price - self.entry_price) * self.size * self.side.sign()
    }
}

/// Immutable record of a completed round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub position_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub realized_pnl: f64,
    pub exit_reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub holding_secs: i64,
}

/// Aggregate portfolio balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub available_balance: f64,
    pub margin_used: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub daily_pnl: f64,
}

/// Daily trading statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: String,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub total_profit: f64,
    pub total_loss: f64,
    pub net_pnl: f64,
}

impl DailyStats {
    pub fn new() -> Self {
        Self {
            date: Utc::now().format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    pub fn record_trade(&mut self, pnl: f64) {
        self.total_trades += 1;
        if pnl >= 0.0 {
            self.winning_trades += 1;
            self.total_profit += pnl;
        } else {
            self.losing_trades += 1;
            self.total_loss += pnl.abs();
        }
        self.net_pnl = self.total_profit - self.total_loss;
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / self.total_trades as f64) * 100.0
    }
}

/// Everything guarded by the single book lock
struct Book {
    positions: HashMap<String, Position>,
    portfolio: PortfolioState,
    history: Vec<TradeRecord>,
    daily_stats: DailyStats,
}

impl Book {
    fn recompute_unrealized(&mut self) {
        self.portfolio.unrealized_pnl = self.positions.values().map(|p| p.unrealized_pnl()).sum();
    }
}

/// Position manager: owns the book and enforces portfolio invariants
pub struct PositionManager {
    book: RwLock<Book>,
    config: RiskConfig,
    sink: Arc<dyn EventSink>,
}

impl PositionManager {
    pub fn new(config: RiskConfig, sink: Arc<dyn EventSink>) -> Self {
        let portfolio = PortfolioState {
            available_balance: config.starting_balance_usd,
            margin_used: 0.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            daily_pnl: 0.0,
        };
        Self {
            book: RwLock::new(Book {
                positions: HashMap::new(),
                portfolio,
                history: Vec::new(),
                daily_stats: DailyStats::new(),
            }),
            config,
            sink,
        }
    }

    /// Open a new position, enforcing the one-open-per-symbol and
    /// max-positions invariants and reserving balance.
    pub async fn open_position(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        entry_price: f64,
        entry_social_score: Option<f64>,
    ) -> Result<Position> {
        let mut book = self.book.write().await;

        if book.positions.contains_key(symbol) {
            return Err(Error::DuplicatePosition(symbol.to_string()));
        }

        if book.positions.len() >= self.config.max_positions {
            return Err(Error::MaxPositionsReached {
                current: book.positions.len(),
                max: self.config.max_positions,
            });
        }

        let notional = size * entry_price;
        if notional > book.portfolio.available_balance {
            return Err(Error::InsufficientBalance {
                available: book.portfolio.available_balance,
                required: notional,
            });
        }

        let position = Position::open(
            symbol,
            side,
            size,
            entry_price,
            self.config.stop_loss_pct,
            self.config.take_profit_pct,
            entry_social_score,
        );

        book.portfolio.available_balance -= notional;
        book.portfolio.margin_used += notional;
        book.positions.insert(symbol.to_string(), position.clone());
        book.recompute_unrealized();
        let snapshot = book.portfolio.clone();
        drop(book);

        info!(
            symbol,
            ?side,
            size,
            entry_price,
            stop_loss = position.stop_loss_price,
            take_profit = position.take_profit_price,
            "opened position"
        );

        self.sink.publish(EngineEvent::PositionOpened(position.clone()));
        self.sink.publish(EngineEvent::PortfolioSnapshot(snapshot));

        Ok(position)
    }

    /// Close an open position at `exit_price`, booking realized P&L.
    ///
    /// The existence check and the transition happen under one write lock,
    /// so a concurrent trigger or manual close can never double-book: the
    /// loser of the race sees `PositionNotFound`.
    pub async fn close_position(
        &self,
        symbol: &str,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<TradeRecord> {
        let mut book = self.book.write().await;

        let mut position = book
            .positions
            .remove(symbol)
            .ok_or_else(|| Error::PositionNotFound(symbol.to_string()))?;

        let closed_at = Utc::now();
        let realized_pnl = (exit_price - position.entry_price) * position.size * position.side.sign();
        let notional = position.notional();

        position.status = PositionStatus::Closed;
        position.current_price = exit_price;
        position.closed_at = Some(closed_at);
        position.exit_reason = Some(reason);

        let record = TradeRecord {
            position_id: position.id,
            symbol: position.symbol.clone(),
            side: position.side,
            size: position.size,
            entry_price: position.entry_price,
            exit_price,
            realized_pnl,
            exit_reason: reason,
            opened_at: position.opened_at,
            closed_at,
            holding_secs: (closed_at - position.opened_at).num_seconds(),
        };

        book.portfolio.available_balance += notional + realized_pnl;
        book.portfolio.margin_used -= notional;
        book.portfolio.realized_pnl += realized_pnl;
        book.portfolio.daily_pnl += realized_pnl;
        book.daily_stats.record_trade(realized_pnl);
        book.history.push(record.clone());
        book.recompute_unrealized();
        let snapshot = book.portfolio.clone();
        drop(book);

        info!(
            symbol,
            exit_price,
            pnl = realized_pnl,
            ?reason,
            "closed position"
        );

        self.sink.publish(EngineEvent::TradeClosed(record.clone()));
        self.sink.publish(EngineEvent::PortfolioSnapshot(snapshot));

        Ok(record)
    }

    /// Update the mark price for a symbol's open position
    pub async fn mark_price(&self, symbol: &str, price: f64) {
        let mut book = self.book.write().await;
        if let Some(position) = book.positions.get_mut(symbol) {
            position.current_price = price;
            let unrealized = position.unrealized_pnl();
            book.recompute_unrealized();
            drop(book);

            debug!(symbol, price, unrealized, "marked position");
            self.sink.publish(EngineEvent::PositionUpdate {
                symbol: symbol.to_string(),
                current_price: price,
                unrealized_pnl: unrealized,
            });
        }
    }

    /// Force-close every open position, tagging the given reason.
    /// Positions are closed at their last marked price.
    pub async fn close_all(&self, reason: ExitReason) -> Vec<TradeRecord> {
        let symbols: Vec<(String, f64)> = {
            let book = self.book.read().await;
            book.positions
                .values()
                .map(|p| (p.symbol.clone(), p.current_price))
                .collect()
        };

        let mut records = Vec::with_capacity(symbols.len());
        for (symbol, price) in symbols {
            // A concurrent close between snapshot and here is fine
            if let Ok(record) = self.close_position(&symbol, price, reason).await {
                records.push(record);
            }
        }
        records
    }

    pub async fn get_position(&self, symbol: &str) -> Option<Position> {
        self.book.read().await.positions.get(symbol).cloned()
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.book.read().await.positions.values().cloned().collect()
    }

    pub async fn open_position_count(&self) -> usize {
        self.book.read().await.positions.len()
    }

    pub async fn portfolio(&self) -> PortfolioState {
        self.book.read().await.portfolio.clone()
    }

    pub async fn trade_history(&self) -> Vec<TradeRecord> {
        self.book.read().await.history.clone()
    }

    pub async fn daily_stats(&self) -> DailyStats {
        self.book.read().await.daily_stats.clone()
    }

    /// Reset daily stats (call at UTC midnight)
    pub async fn reset_daily_stats(&self) {
        let mut book = self.book.write().await;
        book.daily_stats = DailyStats::new();
        book.portfolio.daily_pnl = 0.0;
        info!("daily stats reset");
    }

    /// Exposure facts for the signal gate
    pub async fn exposure_view(&self, symbol: &str) -> ExposureView {
        let book = self.book.read().await;
        ExposureView {
            open_position_count: book.positions.len(),
            max_positions: self.config.max_positions,
            symbol_has_open_position: book.positions.contains_key(symbol),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;

    fn manager() -> PositionManager {
        PositionManager::new(RiskConfig::default(), Arc::new(NullSink))
    }

    #[test]
    fn test_long_risk_levels() {
        let position = Position::open("DOGE", Side::Long, 10.0, 100.0, 0.15, 0.30, None);
        assert!((position.stop_loss_price - 85.0).abs() < 1e-9);
        assert!((position.take_profit_price - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_risk_levels_inverted() {
        let position = Position::open("DOGE", Side::Short, 10.0, 100.0, 0.15, 0.30, None);
        assert!((position.stop_loss_price - 115.0).abs() < 1e-9);
        assert!((position.take_profit_price - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrealized_pnl_sign() {
        let mut long = Position::open("DOGE", Side::Long, 10.0, 100.0, 0.15, 0.30, None);
        long.current_price = 110.0;
        assert!((long.unrealized_pnl() - 100.0).abs() < 1e-9);

        let mut short = Position::open("DOGE", Side::Short, 10.0, 100.0, 0.15, 0.30, None);
        short.current_price = 110.0;
        assert!((short.unrealized_pnl() + 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_open_and_close_books_pnl() {
        let mgr = manager();
        mgr.open_position("DOGE", Side::Long, 10.0, 100.0, Some(0.9))
            .await
            .unwrap();

        let record = mgr
            .close_position("DOGE", 130.0, ExitReason::TakeProfit)
            .await
            .unwrap();
        assert!((record.realized_pnl - 300.0).abs() < 1e-9);

        let portfolio = mgr.portfolio().await;
        assert!((portfolio.realized_pnl - 300.0).abs() < 1e-9);
        assert!((portfolio.available_balance - 10_300.0).abs() < 1e-9);
        assert!((portfolio.margin_used).abs() < 1e-9);
        assert_eq!(mgr.open_position_count().await, 0);
    }

    #[tokio::test]
    async fn test_double_close_rejected() {
        let mgr = manager();
        mgr.open_position("DOGE", Side::Long, 10.0, 100.0, None)
            .await
            .unwrap();
        mgr.close_position("DOGE", 90.0, ExitReason::StopLoss)
            .await
            .unwrap();

        let err = mgr
            .close_position("DOGE", 80.0, ExitReason::StopLoss)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PositionNotFound(_)));

        // P&L booked exactly once
        let portfolio = mgr.portfolio().await;
        assert!((portfolio.realized_pnl + 100.0).abs() < 1e-9);
        assert_eq!(mgr.trade_history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_position_rejected() {
        let mgr = manager();
        mgr.open_position("DOGE", Side::Long, 10.0, 100.0, None)
            .await
            .unwrap();
        let err = mgr
            .open_position("DOGE", Side::Long, 10.0, 100.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePosition(_)));
    }

    #[tokio::test]
    async fn test_max_positions_enforced() {
        let mgr = manager();
        for symbol in ["A", "B", "C", "D", "E"] {
            mgr.open_position(symbol, Side::Long, 1.0, 100.0, None)
                .await
                .unwrap();
        }
        let err = mgr
            .open_position("F", Side::Long, 1.0, 100.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MaxPositionsReached { current: 5, max: 5 }));
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected() {
        let mgr = manager();
        let err = mgr
            .open_position("DOGE", Side::Long, 1_000.0, 100.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_close_all_tags_reason() {
        let mgr = manager();
        mgr.open_position("A", Side::Long, 1.0, 100.0, None).await.unwrap();
        mgr.open_position("B", Side::Long, 1.0, 200.0, None).await.unwrap();

        let records = mgr.close_all(ExitReason::Emergency).await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.exit_reason == ExitReason::Emergency));
        assert_eq!(mgr.open_position_count().await, 0);
    }

    #[tokio::test]
    async fn test_exposure_view() {
        let mgr = manager();
        mgr.open_position("DOGE", Side::Long, 1.0, 100.0, None).await.unwrap();

        let view = mgr.exposure_view("DOGE").await;
        assert_eq!(view.open_position_count, 1);
        assert!(view.symbol_has_open_position);

        let other = mgr.exposure_view("PEPE").await;
        assert!(!other.symbol_has_open_position);
    }

    #[test]
    fn test_daily_stats_win_rate() {
        let mut stats = DailyStats::new();
        stats.record_trade(10.0);
        stats.record_trade(-5.0);
        stats.record_trade(20.0);

        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert!((stats.win_rate() - 66.67).abs() < 0.1);
        assert!((stats.net_pnl - 25.0).abs() < 1e-9);
    }
}
