//! Historical strategy backtesting

pub mod data;
pub mod engine;
pub mod strategy;

pub use data::{synthetic_series, Bar, BarSource, SyntheticBars};
pub use engine::{BacktestEngine, BacktestReport, EquityPoint, SimulatedTrade};
pub use strategy::{
    BollingerBreakout, MacdCrossover, MovingAverageCrossover, RsiThreshold, Strategy, StrategyKind,
};
