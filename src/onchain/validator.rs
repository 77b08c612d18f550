//! On-chain transfer analysis
//!
//! Statistically analyzes a token's recent transfer activity: whale
//! transactions are transfers exceeding mean + 2 standard deviations of
//! recent amounts. The resulting tier is advisory; a provider outage
//! degrades to a NONE-tier assessment instead of failing the pipeline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::providers::{OnChainDataProvider, TokenTransfer};

/// Discrete confidence level assigned to on-chain corroboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTier {
    None,
    Weak,
    Moderate,
    Strong,
}

impl ValidationTier {
    pub fn is_validated(&self) -> bool {
        *self != ValidationTier::None
    }
}

impl std::fmt::Display for ValidationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValidationTier::None => "NONE",
            ValidationTier::Weak => "WEAK",
            ValidationTier::Moderate => "MODERATE",
            ValidationTier::Strong => "STRONG",
        };
        write!(f, "{}", s)
    }
}

/// Result of analyzing a token's recent on-chain activity.
/// Always recomputed from the latest data, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnChainAssessment {
    pub token_symbol: String,
    pub contract_address: String,
    pub total_holders: u64,
    pub recent_transfer_count: usize,
    /// Sum of transfer amounts times the reference price, in USD
    pub recent_volume_estimate: f64,
    pub average_transfer: f64,
    /// Largest transfer amounts observed, descending (up to 5)
    pub top_transfers: Vec<f64>,
    pub whale_threshold: f64,
    pub whale_count: usize,
    pub validation_tier: ValidationTier,
}

impl OnChainAssessment {
    /// Conservative assessment used when on-chain data is unavailable
    fn degraded(contract_address: &str) -> Self {
        Self {
            token_symbol: "UNKNOWN".to_string(),
            contract_address: contract_address.to_string(),
            total_holders: 0,
            recent_transfer_count: 0,
            recent_volume_estimate: 0.0,
            average_transfer: 0.0,
            top_transfers: Vec::new(),
            whale_threshold: 0.0,
            whale_count: 0,
            validation_tier: ValidationTier::None,
        }
    }
}

/// Whale statistics over transfer amounts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhaleStats {
    pub mean: f64,
    pub stddev: f64,
    /// mean + 2 standard deviations
    pub threshold: f64,
    pub whale_count: usize,
}

/// Compute mean, sample standard deviation and the whale threshold over
/// transfer amounts.
pub fn whale_stats(amounts: &[f64]) -> WhaleStats {
    if amounts.is_empty() {
        return WhaleStats {
            mean: 0.0,
            stddev: 0.0,
            threshold: 0.0,
            whale_count: 0,
        };
    }

    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let stddev = if amounts.len() > 1 {
        let variance = amounts
            .iter()
            .map(|a| (a - mean).powi(2))
            .sum::<f64>()
            / (amounts.len() - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    let threshold = mean + 2.0 * stddev;
    let whale_count = amounts.iter().filter(|&&a| a > threshold).count();

    WhaleStats {
        mean,
        stddev,
        threshold,
        whale_count,
    }
}

/// Tier assignment: evaluated in order, first match wins.
pub fn assign_tier(transfer_count: usize, whale_count: usize, volume: f64) -> ValidationTier {
    if transfer_count > 30 && whale_count > 2 && volume > 1000.0 {
        ValidationTier::Strong
    } else if transfer_count > 20 && whale_count > 1 && volume > 500.0 {
        ValidationTier::Moderate
    } else if transfer_count > 10 && volume > 100.0 {
        ValidationTier::Weak
    } else {
        ValidationTier::None
    }
}

/// Validates sentiment signals against recent on-chain transfer activity
pub struct OnChainValidator {
    provider: Arc<dyn OnChainDataProvider>,
    config: ValidationConfig,
}

impl OnChainValidator {
    pub fn new(config: ValidationConfig, provider: Arc<dyn OnChainDataProvider>) -> Self {
        Self { provider, config }
    }

    /// Assess a contract using the configured fallback reference price.
    pub async fn validate(&self, network: &str, contract_address: &str) -> OnChainAssessment {
        self.validate_with_price(network, contract_address, self.config.reference_price_usd)
            .await
    }

    /// Assess a contract, valuing transfers at `reference_price` USD.
    ///
    /// Never fails: validation is a corroboration signal, so an unreachable
    /// provider yields a NONE-tier assessment rather than an error.
    pub async fn validate_with_price(
        &self,
        network: &str,
        contract_address: &str,
        reference_price: f64,
    ) -> OnChainAssessment {
        let timeout = Duration::from_secs(self.config.provider_timeout_secs);

        let metadata = match tokio::time::timeout(
            timeout,
            self.provider.token_metadata(network, contract_address),
        )
        .await
        {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => {
                warn!(contract = contract_address, error = %e, "token metadata unavailable, degrading to NONE tier");
                return OnChainAssessment::degraded(contract_address);
            }
            Err(_) => {
                warn!(contract = contract_address, "token metadata timed out, degrading to NONE tier");
                return OnChainAssessment::degraded(contract_address);
            }
        };

        let transfers = match tokio::time::timeout(
            timeout,
            self.provider
                .recent_transfers(network, contract_address, self.config.transfer_limit),
        )
        .await
        {
            Ok(Ok(transfers)) => transfers,
            Ok(Err(e)) => {
                warn!(contract = contract_address, error = %e, "transfer fetch failed, degrading to NONE tier");
                return OnChainAssessment::degraded(contract_address);
            }
            Err(_) => {
                warn!(contract = contract_address, "transfer fetch timed out, degrading to NONE tier");
                return OnChainAssessment::degraded(contract_address);
            }
        };

        let assessment = Self::assess(&metadata.symbol, contract_address, metadata.holders_count, &transfers, reference_price);

        debug!(
            symbol = %assessment.token_symbol,
            transfers = assessment.recent_transfer_count,
            whales = assessment.whale_count,
            volume = assessment.recent_volume_estimate,
            tier = %assessment.validation_tier,
            "on-chain assessment"
        );

        assessment
    }

    /// Pure assessment over already-fetched transfer data.
    fn assess(
        symbol: &str,
        contract_address: &str,
        holders: u64,
        transfers: &[TokenTransfer],
        reference_price: f64,
    ) -> OnChainAssessment {
        let amounts: Vec<f64> = transfers
            .iter()
            .map(|t| t.amount)
            .filter(|a| a.is_finite() && *a >= 0.0)
            .collect();

        let volume: f64 = amounts.iter().map(|a| a * reference_price).sum();
        let stats = whale_stats(&amounts);

        let mut top = amounts.clone();
        top.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        top.truncate(5);

        OnChainAssessment {
            token_symbol: symbol.to_string(),
            contract_address: contract_address.to_string(),
            total_holders: holders,
            recent_transfer_count: amounts.len(),
            recent_volume_estimate: volume,
            average_transfer: stats.mean,
            top_transfers: top,
            whale_threshold: stats.threshold,
            whale_count: stats.whale_count,
            validation_tier: assign_tier(amounts.len(), stats.whale_count, volume),
        }
    }
}
