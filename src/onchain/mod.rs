//! On-chain signal validation
//!
//! Corroborates sentiment spikes with recent transfer activity before any
//! capital is committed.

pub mod validator;

pub use validator::{OnChainAssessment, OnChainValidator, ValidationTier};
