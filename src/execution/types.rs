//! Execution pipeline data types
//!
//! The pipeline is staged: fee estimation, simulation, preparation,
//! signing, broadcast. Every run produces an [`ExecutionReport`] that
//! records exactly how far the pipeline got and what each completed
//! stage observed, so a failed run is as auditable as a successful one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::Side;
use crate::providers::{FeeRecommendation, RawTransaction};

/// Terminal status of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    FailedFeeEstimation,
    FailedSimulation,
    FailedPreparation,
    FailedSigning,
    FailedBroadcast,
    /// Unclassified failure outside any single stage
    Error,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }
}

/// What a trade execution was asked to do
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub side: Side,
    pub network: String,
    pub from_address: String,
    /// Router or exchange contract the order goes through
    pub to_contract: String,
    pub token_address: String,
    /// Size in quote currency units
    pub amount: f64,
}

/// Fee stage outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeReport {
    pub recommendation: FeeRecommendation,
    /// True when every provider failed and the conservative fallback
    /// was used instead
    pub fallback_used: bool,
    /// Name of the provider that answered, or "fallback"
    pub source: String,
}

/// Simulation stage outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub gas_estimate: u64,
    pub log_count: usize,
}

/// Signing stage outcome. Carries the transaction hash only, never the
/// signed payload or any key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningReport {
    pub tx_hash: String,
}

/// Full audit record of one execution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub intent: TradeIntent,
    pub status: ExecutionStatus,
    pub fee: Option<FeeReport>,
    pub simulation: Option<SimulationReport>,
    pub prepared: Option<RawTransaction>,
    pub signing: Option<SigningReport>,
    pub broadcast_tx_hash: Option<String>,
    /// Diagnostic for the failing stage, empty on success
    pub detail: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub(crate) fn begin(intent: TradeIntent) -> Self {
        Self {
            intent,
            status: ExecutionStatus::Error,
            fee: None,
            simulation: None,
            prepared: None,
            signing: None,
            broadcast_tx_hash: None,
            detail: String::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self, status: ExecutionStatus, detail: impl Into<String>) -> Self {
        self.status = status;
        self.detail = detail.into();
        self.finished_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionStatus::FailedFeeEstimation).unwrap();
        assert_eq!(json, "\"failed_fee_estimation\"");
        let json = serde_json::to_string(&ExecutionStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }

    #[test]
    fn test_report_begin_records_no_stages() {
        let intent = TradeIntent {
            symbol: "PEPE".to_string(),
            side: Side::Long,
            network: "ethereum".to_string(),
            from_address: "0xfrom".to_string(),
            to_contract: "0xrouter".to_string(),
            token_address: "0xpepe".to_string(),
            amount: 100.0,
        };
        let report = ExecutionReport::begin(intent);
        assert_eq!(report.status, ExecutionStatus::Error);
        assert!(report.fee.is_none());
        assert!(report.simulation.is_none());
        assert!(report.prepared.is_none());
        assert!(report.signing.is_none());
        assert!(report.broadcast_tx_hash.is_none());
    }
}
