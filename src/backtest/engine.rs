//! Backtest engine
//!
//! Replays a strategy over a bar series with one logical long position:
//! enter on a +1 vote while flat, exit on a -1 vote, and force-close
//! intrabar when the stop-loss or take-profit fraction is breached.
//! Execution is at the close of the signalling bar; breaches fill at
//! the threshold price, which is optimistic about intrabar ordering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::data::Bar;
use crate::backtest::strategy::Strategy;
use crate::config::BacktestConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedExit {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

/// One completed round trip in the replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub units: f64,
    pub pnl: f64,
    pub exit: SimulatedExit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Aggregate results of one backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy: String,
    pub symbol: String,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub net_profit: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Percentage of round trips with non-negative pnl
    pub win_rate: f64,
    /// Worst peak-to-trough equity decline, as a percentage
    pub max_drawdown_pct: f64,
    /// Mean over standard deviation of daily equity changes
    pub sharpe_ratio: f64,
    /// Average winning pnl over average losing pnl magnitude
    pub profit_factor: f64,
    pub trades: Vec<SimulatedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

pub struct BacktestEngine {
    config: BacktestConfig,
}

struct OpenLot {
    entry_date: NaiveDate,
    entry_price: f64,
    units: f64,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, strategy: &dyn Strategy, symbol: &str, bars: &[Bar]) -> BacktestReport {
        let mut cash = self.config.initial_capital;
        let mut lot: Option<OpenLot> = None;
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(bars.len());

        for (idx, bar) in bars.iter().enumerate() {
            // Risk exits first, evaluated against the intrabar range
            let breach = lot.as_ref().and_then(|open| {
                let stop = open.entry_price * (1.0 - self.config.stop_loss_pct);
                let target = open.entry_price * (1.0 + self.config.take_profit_pct);
                if bar.low <= stop {
                    Some((stop, SimulatedExit::StopLoss))
                } else if bar.high >= target {
                    Some((target, SimulatedExit::TakeProfit))
                } else {
                    None
                }
            });
            if let Some((price, exit)) = breach {
                if let Some(open) = lot.take() {
                    cash = Self::book(&mut trades, open, bar.date, price, exit, cash);
                }
            }

            match strategy.signal(bars, idx) {
                1 if lot.is_none() => {
                    lot = Some(OpenLot {
                        entry_date: bar.date,
                        entry_price: bar.close,
                        units: cash / bar.close,
                    });
                    cash = 0.0;
                }
                -1 => {
                    if let Some(open) = lot.take() {
                        cash = Self::book(
                            &mut trades,
                            open,
                            bar.date,
                            bar.close,
                            SimulatedExit::Signal,
                            cash,
                        );
                    }
                }
                _ => {}
            }

            let equity = cash + lot.as_ref().map_or(0.0, |l| l.units * bar.close);
            equity_curve.push(EquityPoint {
                date: bar.date,
                equity,
            });
        }

        // Whatever is still open settles at the last close
        if let (Some(open), Some(last)) = (lot.take(), bars.last()) {
            cash = Self::book(
                &mut trades,
                open,
                last.date,
                last.close,
                SimulatedExit::EndOfData,
                cash,
            );
            if let Some(point) = equity_curve.last_mut() {
                point.equity = cash;
            }
        }

        let report = self.summarize(strategy.name(), symbol, cash, trades, equity_curve);
        info!(
            strategy = %report.strategy,
            symbol = %report.symbol,
            trades = report.total_trades,
            net_profit = report.net_profit,
            "backtest complete"
        );
        report
    }

    fn book(
        trades: &mut Vec<SimulatedTrade>,
        open: OpenLot,
        date: NaiveDate,
        price: f64,
        exit: SimulatedExit,
        cash: f64,
    ) -> f64 {
        let proceeds = open.units * price;
        trades.push(SimulatedTrade {
            entry_date: open.entry_date,
            exit_date: date,
            entry_price: open.entry_price,
            exit_price: price,
            units: open.units,
            pnl: open.units * (price - open.entry_price),
            exit,
        });
        cash + proceeds
    }

    fn summarize(
        &self,
        strategy: &str,
        symbol: &str,
        final_equity: f64,
        trades: Vec<SimulatedTrade>,
        equity_curve: Vec<EquityPoint>,
    ) -> BacktestReport {
        let winning_trades = trades.iter().filter(|t| t.pnl >= 0.0).count();
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            winning_trades as f64 / trades.len() as f64 * 100.0
        };

        let mut peak = f64::MIN;
        let mut max_drawdown_pct: f64 = 0.0;
        for point in &equity_curve {
            peak = peak.max(point.equity);
            if peak > 0.0 {
                max_drawdown_pct = max_drawdown_pct.max((peak - point.equity) / peak * 100.0);
            }
        }

        let deltas: Vec<f64> = equity_curve
            .windows(2)
            .map(|w| w[1].equity - w[0].equity)
            .collect();
        let sharpe_ratio = if deltas.len() < 2 {
            0.0
        } else {
            let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
            let variance = deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>()
                / (deltas.len() - 1) as f64;
            let std = variance.sqrt();
            if std > 0.0 {
                mean / std
            } else {
                0.0
            }
        };

        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p >= 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
        let avg_win = if wins.is_empty() {
            0.0
        } else {
            wins.iter().sum::<f64>() / wins.len() as f64
        };
        let avg_loss = if losses.is_empty() {
            1.0
        } else {
            (losses.iter().sum::<f64>() / losses.len() as f64).abs()
        };
        let profit_factor = if avg_loss > 0.0 { avg_win / avg_loss } else { 0.0 };

        BacktestReport {
            strategy: strategy.to_string(),
            symbol: symbol.to_string(),
            initial_capital: self.config.initial_capital,
            final_equity,
            net_profit: final_equity - self.config.initial_capital,
            total_trades: trades.len(),
            winning_trades,
            win_rate,
            max_drawdown_pct,
            sharpe_ratio,
            profit_factor,
            trades,
            equity_curve,
        }
    }
}
