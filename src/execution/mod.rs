//! Trade execution pipeline

pub mod coordinator;
pub mod signer;
pub mod types;

pub use coordinator::TradeExecutionCoordinator;
pub use signer::DevSigner;
pub use types::{
    ExecutionReport, ExecutionStatus, FeeReport, SigningReport, SimulationReport, TradeIntent,
};
