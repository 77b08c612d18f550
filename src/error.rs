//! Error types for the trading engine

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the trading engine
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Provider errors
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider timeout after {0}ms")]
    ProviderTimeout(u64),

    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    // Sentiment errors
    #[error("No sentiment record for symbol: {0}")]
    SentimentNotFound(String),

    // Position management errors
    #[error("Position not found: {0}")]
    PositionNotFound(String),

    #[error("Position already closed: {0}")]
    PositionAlreadyClosed(String),

    #[error("Duplicate open position for symbol: {0}")]
    DuplicatePosition(String),

    // Safety limit errors
    #[error("Max positions reached: {current}/{max}")]
    MaxPositionsReached { current: usize, max: usize },

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance { available: f64, required: f64 },

    #[error("Emergency stop active")]
    EmergencyStopActive,

    // Execution pipeline errors
    #[error("Transaction simulation failed: {0}")]
    Simulation(String),

    #[error("Transaction preparation failed: {0}")]
    Preparation(String),

    #[error("Transaction signing failed: {0}")]
    Signing(String),

    #[error("Transaction broadcast failed: {0}")]
    Broadcast(String),

    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Provider(_)
                | Error::ProviderTimeout(_)
                | Error::Broadcast(_)
                | Error::OrderSubmission(_)
        )
    }

    /// Check if this error is a safety violation
    pub fn is_safety_violation(&self) -> bool {
        matches!(
            self,
            Error::MaxPositionsReached { .. }
                | Error::InsufficientBalance { .. }
                | Error::EmergencyStopActive
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Provider("timeout".into()).is_retryable());
        assert!(Error::ProviderTimeout(10_000).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
        assert!(!Error::PositionAlreadyClosed("DOGE".into()).is_retryable());
    }

    #[test]
    fn test_safety_violation_classification() {
        assert!(Error::MaxPositionsReached { current: 5, max: 5 }.is_safety_violation());
        assert!(Error::EmergencyStopActive.is_safety_violation());
        assert!(!Error::Provider("5xx".into()).is_safety_violation());
    }
}
