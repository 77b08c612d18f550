//! Trading signal admission

pub mod gate;

pub use gate::{ExposureView, GateDecision, RejectReason, SignalGate, TradingSignal};
