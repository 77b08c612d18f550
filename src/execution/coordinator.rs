//! Trade execution coordinator
//!
//! Runs the five-stage pipeline for a single trade intent: fee
//! estimation, pre-flight simulation, transaction preparation, signing,
//! broadcast. Stages run strictly in order and the first hard failure
//! ends the run; only fee estimation degrades instead of failing, by
//! falling back to a conservative fixed recommendation. There is no
//! automatic retry at any stage.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ExecutionConfig;
use crate::error::{Error, Result};
use crate::execution::types::{
    ExecutionReport, ExecutionStatus, FeeReport, SigningReport, SimulationReport, TradeIntent,
};
use crate::providers::{
    BroadcastProvider, FeeEstimationProvider, FeeRecommendation, RawTransaction,
    SimulationProvider, TransactionSigner,
};

pub struct TradeExecutionCoordinator {
    fee_providers: Vec<Arc<dyn FeeEstimationProvider>>,
    simulator: Arc<dyn SimulationProvider>,
    signer: Arc<dyn TransactionSigner>,
    broadcaster: Arc<dyn BroadcastProvider>,
    config: ExecutionConfig,
}

impl TradeExecutionCoordinator {
    pub fn new(
        fee_providers: Vec<Arc<dyn FeeEstimationProvider>>,
        simulator: Arc<dyn SimulationProvider>,
        signer: Arc<dyn TransactionSigner>,
        broadcaster: Arc<dyn BroadcastProvider>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            fee_providers,
            simulator,
            signer,
            broadcaster,
            config,
        }
    }

    /// Run the full pipeline. Always returns a report; stage failures
    /// are statuses, not errors.
    pub async fn execute(&self, intent: TradeIntent) -> ExecutionReport {
        let mut report = ExecutionReport::begin(intent);

        info!(
            symbol = %report.intent.symbol,
            side = ?report.intent.side,
            amount = report.intent.amount,
            "execution pipeline started"
        );

        // Stage 1: fee estimation, degrades to fallback instead of failing
        let fee = self.estimate_fees(&report.intent.network).await;
        let gas_price = fee.recommendation.fast_gas_price;
        report.fee = Some(fee);

        // Stage 2: pre-flight simulation
        let draft = self.prepare_transaction(&report.intent, gas_price, None);
        let simulation = match self.with_timeout(self.simulator.simulate(&draft)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(symbol = %report.intent.symbol, error = %e, "simulation failed");
                return report.finish(ExecutionStatus::FailedSimulation, e.to_string());
            }
        };
        report.simulation = Some(SimulationReport {
            gas_estimate: simulation.gas_estimate,
            log_count: simulation.logs.len(),
        });

        // Stage 3: preparation, now with the simulated gas estimate
        let prepared =
            self.prepare_transaction(&report.intent, gas_price, Some(simulation.gas_estimate));
        if prepared.from.is_empty() || prepared.to.is_empty() {
            return report.finish(
                ExecutionStatus::FailedPreparation,
                "missing from or router address",
            );
        }
        report.prepared = Some(prepared.clone());

        // Stage 4: signing
        let signed = match self.with_timeout(self.signer.sign(&prepared)).await {
            Ok(signed) => signed,
            Err(e) => {
                error!(symbol = %report.intent.symbol, error = %e, "signing failed");
                return report.finish(ExecutionStatus::FailedSigning, e.to_string());
            }
        };
        report.signing = Some(SigningReport {
            tx_hash: signed.hash.clone(),
        });

        // Stage 5: broadcast
        let tx_hash = match self.with_timeout(self.broadcaster.broadcast(&signed)).await {
            Ok(hash) => hash,
            Err(e) => {
                error!(symbol = %report.intent.symbol, error = %e, "broadcast failed");
                return report.finish(ExecutionStatus::FailedBroadcast, e.to_string());
            }
        };
        report.broadcast_tx_hash = Some(tx_hash.clone());

        info!(symbol = %report.intent.symbol, tx_hash = %tx_hash, "execution succeeded");
        report.finish(ExecutionStatus::Success, "")
    }

    /// Try each fee provider in order; fall back to the conservative
    /// default when all of them fail.
    async fn estimate_fees(&self, network: &str) -> FeeReport {
        for provider in &self.fee_providers {
            match self.with_timeout(provider.fee_recommendation(network)).await {
                Ok(recommendation) => {
                    return FeeReport {
                        recommendation,
                        fallback_used: false,
                        source: provider.name().to_string(),
                    };
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "fee provider failed");
                }
            }
        }

        warn!("all fee providers failed, using conservative fallback");
        FeeReport {
            recommendation: FeeRecommendation::conservative_default(),
            fallback_used: true,
            source: "fallback".to_string(),
        }
    }

    fn prepare_transaction(
        &self,
        intent: &TradeIntent,
        gas_price: u64,
        gas_estimate: Option<u64>,
    ) -> RawTransaction {
        RawTransaction {
            from: intent.from_address.clone(),
            to: intent.to_contract.clone(),
            value_wei: "0".to_string(),
            data: encode_swap_calldata(intent),
            gas_limit: gas_estimate.unwrap_or(self.config.default_gas_limit),
            gas_price,
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = Duration::from_secs(self.config.provider_timeout_secs);
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| Error::ProviderTimeout(timeout.as_millis() as u64))?
    }
}

/// Placeholder calldata encoding: token address and amount packed as a
/// hex-tagged payload. A real venue adapter supplies ABI encoding.
fn encode_swap_calldata(intent: &TradeIntent) -> String {
    format!(
        "0x{}{:016x}",
        intent.token_address.trim_start_matches("0x"),
        (intent.amount * 1e6) as u64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{SignedTransaction, SimulationOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn intent() -> TradeIntent {
        TradeIntent {
            symbol: "PEPE".to_string(),
            side: crate::position::Side::Long,
            network: "ethereum".to_string(),
            from_address: "0xfrom".to_string(),
            to_contract: "0xrouter".to_string(),
            token_address: "0xpepe".to_string(),
            amount: 100.0,
        }
    }

    struct GoodFees;

    #[async_trait]
    impl FeeEstimationProvider for GoodFees {
        fn name(&self) -> &str {
            "good"
        }
        async fn fee_recommendation(&self, _network: &str) -> Result<FeeRecommendation> {
            Ok(FeeRecommendation {
                fast_gas_price: 40_000_000_000,
                max_fee_per_gas: 45_000_000_000,
                max_priority_fee_per_gas: 3_000_000_000,
                estimated_confirmation_secs: 15,
            })
        }
    }

    struct BadFees {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeeEstimationProvider for BadFees {
        fn name(&self) -> &str {
            "bad"
        }
        async fn fee_recommendation(&self, _network: &str) -> Result<FeeRecommendation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Provider("gas oracle down".to_string()))
        }
    }

    struct GoodSimulator;

    #[async_trait]
    impl SimulationProvider for GoodSimulator {
        async fn simulate(&self, _tx: &RawTransaction) -> Result<SimulationOutcome> {
            Ok(SimulationOutcome {
                gas_estimate: 180_000,
                logs: vec!["Transfer".to_string()],
            })
        }
    }

    struct RevertingSimulator;

    #[async_trait]
    impl SimulationProvider for RevertingSimulator {
        async fn simulate(&self, _tx: &RawTransaction) -> Result<SimulationOutcome> {
            Err(Error::Simulation("execution reverted: TRANSFER_FROM_FAILED".to_string()))
        }
    }

    struct GoodSigner;

    #[async_trait]
    impl TransactionSigner for GoodSigner {
        async fn sign(&self, _tx: &RawTransaction) -> Result<SignedTransaction> {
            Ok(SignedTransaction {
                raw_hex: "0xdeadbeef".to_string(),
                hash: "0xhash".to_string(),
            })
        }
    }

    struct GoodBroadcaster;

    #[async_trait]
    impl BroadcastProvider for GoodBroadcaster {
        async fn broadcast(&self, signed: &SignedTransaction) -> Result<String> {
            Ok(signed.hash.clone())
        }
    }

    struct FailingBroadcaster;

    #[async_trait]
    impl BroadcastProvider for FailingBroadcaster {
        async fn broadcast(&self, _signed: &SignedTransaction) -> Result<String> {
            Err(Error::Broadcast("nonce too low".to_string()))
        }
    }

    fn coordinator(
        fees: Vec<Arc<dyn FeeEstimationProvider>>,
        simulator: Arc<dyn SimulationProvider>,
        broadcaster: Arc<dyn BroadcastProvider>,
    ) -> TradeExecutionCoordinator {
        TradeExecutionCoordinator::new(
            fees,
            simulator,
            Arc::new(GoodSigner),
            broadcaster,
            ExecutionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_full_pipeline_success() {
        let c = coordinator(
            vec![Arc::new(GoodFees)],
            Arc::new(GoodSimulator),
            Arc::new(GoodBroadcaster),
        );
        let report = c.execute(intent()).await;

        assert_eq!(report.status, ExecutionStatus::Success);
        let fee = report.fee.unwrap();
        assert!(!fee.fallback_used);
        assert_eq!(fee.source, "good");
        assert_eq!(report.simulation.unwrap().gas_estimate, 180_000);
        // Prepared gas limit comes from the simulation, not the default
        assert_eq!(report.prepared.unwrap().gas_limit, 180_000);
        assert_eq!(report.broadcast_tx_hash.as_deref(), Some("0xhash"));
        assert!(report.detail.is_empty());
    }

    #[tokio::test]
    async fn test_fee_fallback_on_provider_failure() {
        let bad = Arc::new(BadFees {
            calls: AtomicUsize::new(0),
        });
        let c = coordinator(
            vec![bad.clone()],
            Arc::new(GoodSimulator),
            Arc::new(GoodBroadcaster),
        );
        let report = c.execute(intent()).await;

        // Pipeline still succeeds on the conservative fallback
        assert_eq!(report.status, ExecutionStatus::Success);
        let fee = report.fee.unwrap();
        assert!(fee.fallback_used);
        assert_eq!(fee.source, "fallback");
        assert_eq!(fee.recommendation.fast_gas_price, 25_000_000_000);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fee_providers_tried_in_order() {
        let bad = Arc::new(BadFees {
            calls: AtomicUsize::new(0),
        });
        let c = coordinator(
            vec![bad.clone(), Arc::new(GoodFees)],
            Arc::new(GoodSimulator),
            Arc::new(GoodBroadcaster),
        );
        let report = c.execute(intent()).await;

        let fee = report.fee.unwrap();
        assert_eq!(fee.source, "good");
        assert!(!fee.fallback_used);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_simulation_failure_short_circuits() {
        let c = coordinator(
            vec![Arc::new(GoodFees)],
            Arc::new(RevertingSimulator),
            Arc::new(GoodBroadcaster),
        );
        let report = c.execute(intent()).await;

        assert_eq!(report.status, ExecutionStatus::FailedSimulation);
        assert!(report.detail.contains("TRANSFER_FROM_FAILED"));
        // Fee stage completed, nothing after simulation did
        assert!(report.fee.is_some());
        assert!(report.simulation.is_none());
        assert!(report.prepared.is_none());
        assert!(report.signing.is_none());
        assert!(report.broadcast_tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_failure_keeps_earlier_stages() {
        let c = coordinator(
            vec![Arc::new(GoodFees)],
            Arc::new(GoodSimulator),
            Arc::new(FailingBroadcaster),
        );
        let report = c.execute(intent()).await;

        assert_eq!(report.status, ExecutionStatus::FailedBroadcast);
        assert!(report.detail.contains("nonce too low"));
        assert!(report.fee.is_some());
        assert!(report.simulation.is_some());
        assert!(report.prepared.is_some());
        assert!(report.signing.is_some());
        assert!(report.broadcast_tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_preparation_rejects_missing_addresses() {
        let c = coordinator(
            vec![Arc::new(GoodFees)],
            Arc::new(GoodSimulator),
            Arc::new(GoodBroadcaster),
        );
        let mut blank = intent();
        blank.from_address = String::new();
        let report = c.execute(blank).await;

        assert_eq!(report.status, ExecutionStatus::FailedPreparation);
        assert!(report.prepared.is_none());
    }
}
