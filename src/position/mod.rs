//! Position lifecycle and risk monitoring

pub mod manager;
pub mod monitor;

pub use manager::{
    DailyStats, ExitReason, PortfolioState, Position, PositionManager, PositionStatus, Side,
    TradeRecord,
};
pub use monitor::PositionRiskMonitor;
