//! Signal admission gate
//!
//! Combines the sentiment record with the on-chain assessment and current
//! portfolio exposure into a single admit/reject decision. The predicate
//! is pure and deterministic; rejection reasons are values, never errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GateConfig;
use crate::onchain::{OnChainAssessment, ValidationTier};
use crate::sentiment::SentimentRecord;

/// Reasons a signal is refused admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InsufficientSentiment,
    InsufficientSources,
    MarketCapTooLarge,
    OnChainUnvalidated,
    MaxPositionsReached,
    DuplicatePosition,
}

impl RejectReason {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            RejectReason::InsufficientSentiment => "weighted sentiment below threshold",
            RejectReason::InsufficientSources => "not enough distinct sources in window",
            RejectReason::MarketCapTooLarge => "market cap above configured maximum",
            RejectReason::OnChainUnvalidated => "no on-chain corroboration",
            RejectReason::MaxPositionsReached => "portfolio position limit reached",
            RejectReason::DuplicatePosition => "open position already exists for symbol",
        }
    }
}

/// Admitted buy signal handed to the execution coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub token_symbol: String,
    pub sentiment_score: f64,
    pub distinct_source_count: usize,
    pub market_cap_estimate: f64,
    pub validation_tier: ValidationTier,
    /// min(1.0, score x sources / 10)
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of gate evaluation
#[derive(Debug, Clone)]
pub enum GateDecision {
    Admitted(TradingSignal),
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GateDecision::Admitted(_))
    }
}

/// Portfolio exposure facts the gate needs, snapshotted by the caller
#[derive(Debug, Clone, Copy)]
pub struct ExposureView {
    pub open_position_count: usize,
    pub max_positions: usize,
    /// True when an open position already exists for the candidate symbol
    pub symbol_has_open_position: bool,
}

/// Admission gate for new trading signals
pub struct SignalGate {
    config: GateConfig,
}

impl SignalGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Evaluate a candidate signal. Pure: identical inputs always yield
    /// the identical decision.
    pub fn evaluate(
        &self,
        sentiment: &SentimentRecord,
        assessment: &OnChainAssessment,
        market_cap_estimate: f64,
        exposure: ExposureView,
    ) -> GateDecision {
        if sentiment.weighted_score < self.config.min_sentiment_score {
            return GateDecision::Rejected(RejectReason::InsufficientSentiment);
        }

        if sentiment.distinct_source_count < self.config.min_distinct_sources {
            return GateDecision::Rejected(RejectReason::InsufficientSources);
        }

        if market_cap_estimate > self.config.max_market_cap_usd {
            return GateDecision::Rejected(RejectReason::MarketCapTooLarge);
        }

        if !assessment.validation_tier.is_validated() {
            return GateDecision::Rejected(RejectReason::OnChainUnvalidated);
        }

        if exposure.open_position_count >= exposure.max_positions {
            return GateDecision::Rejected(RejectReason::MaxPositionsReached);
        }

        if exposure.symbol_has_open_position {
            return GateDecision::Rejected(RejectReason::DuplicatePosition);
        }

        let confidence = (sentiment.weighted_score
            * (sentiment.distinct_source_count as f64 / 10.0))
            .min(1.0);

        let signal = TradingSignal {
            token_symbol: sentiment.symbol.clone(),
            sentiment_score: sentiment.weighted_score,
            distinct_source_count: sentiment.distinct_source_count,
            market_cap_estimate,
            validation_tier: assessment.validation_tier,
            confidence,
            generated_at: Utc::now(),
        };

        info!(
            symbol = %signal.token_symbol,
            score = signal.sentiment_score,
            sources = signal.distinct_source_count,
            tier = %signal.validation_tier,
            confidence = signal.confidence,
            "signal admitted"
        );

        GateDecision::Admitted(signal)
    }
}
