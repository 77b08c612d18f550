//! MemePulse - Social sentiment trading engine for meme tokens
//!
//! Aggregates social mention sentiment over a sliding window, corroborates
//! hot symbols against on-chain whale activity, and trades the survivors
//! through a staged execution pipeline with hard position risk limits.

pub mod backtest;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod onchain;
pub mod position;
pub mod providers;
pub mod sentiment;
pub mod signal;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
