//! Abstract provider capabilities
//!
//! The engine never talks to an exchange, a blockchain API or a price feed
//! directly. Every external dependency sits behind one of these traits so
//! the pipeline can be driven by real clients, sandboxes or test doubles
//! interchangeably.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::position::Side;

/// Market price and capitalization source.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current price for a symbol, in USD.
    async fn get_price(&self, symbol: &str) -> Result<f64>;

    /// Current market capitalization for a symbol, in USD.
    async fn get_market_cap(&self, symbol: &str) -> Result<f64>;
}

/// Token metadata as reported by a blockchain data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub total_supply: f64,
    pub holders_count: u64,
}

/// A single token transfer observed on chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Transfer amount in token units
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// On-chain token data source (holders, supply, recent transfers).
#[async_trait]
pub trait OnChainDataProvider: Send + Sync {
    async fn token_metadata(&self, network: &str, contract: &str) -> Result<TokenMetadata>;

    /// Up to `limit` most recent transfer transactions for a contract.
    async fn recent_transfers(
        &self,
        network: &str,
        contract: &str,
        limit: usize,
    ) -> Result<Vec<TokenTransfer>>;
}

/// Order routing capability (exchange / brokerage adapter).
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Submit an order and return the venue's order id.
    async fn submit_order(&self, symbol: &str, side: Side, size: f64) -> Result<String>;

    async fn cancel_order(&self, order_id: &str) -> Result<()>;
}

/// Network fee recommendation (EIP-1559 style).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRecommendation {
    /// Gas price for fast confirmation, in wei
    pub fast_gas_price: u64,
    pub max_fee_per_gas: u64,
    pub max_priority_fee_per_gas: u64,
    pub estimated_confirmation_secs: u64,
}

impl FeeRecommendation {
    /// Conservative fixed fallback used when every fee provider is down.
    pub fn conservative_default() -> Self {
        Self {
            fast_gas_price: 25_000_000_000,         // 25 gwei
            max_fee_per_gas: 30_000_000_000,        // 30 gwei
            max_priority_fee_per_gas: 2_000_000_000, // 2 gwei
            estimated_confirmation_secs: 30,
        }
    }
}

/// One fee estimation strategy. The coordinator holds an ordered list of
/// these and tries them in sequence.
#[async_trait]
pub trait FeeEstimationProvider: Send + Sync {
    /// Short name used in logs and execution reports.
    fn name(&self) -> &str;

    async fn fee_recommendation(&self, network: &str) -> Result<FeeRecommendation>;
}

/// Unsigned transaction payload assembled by the execution pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub from: String,
    pub to: String,
    /// Value in wei, as a decimal string for interop
    pub value_wei: String,
    /// ABI-encoded calldata, hex
    pub data: String,
    pub gas_limit: u64,
    pub gas_price: u64,
}

/// Successful dry-run outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub gas_estimate: u64,
    pub logs: Vec<String>,
}

/// Pre-flight transaction simulation capability.
#[async_trait]
pub trait SimulationProvider: Send + Sync {
    /// Dry-run a transaction. A revert or provider failure is an `Err`
    /// carrying the provider's diagnostic.
    async fn simulate(&self, tx: &RawTransaction) -> Result<SimulationOutcome>;
}

/// Signed transaction artifact. Never contains key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub raw_hex: String,
    pub hash: String,
}

/// Transaction signing capability.
///
/// Production deployments must plug in real offline key custody here. The
/// engine treats signing as fully delegated and never sees a private key.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(&self, tx: &RawTransaction) -> Result<SignedTransaction>;
}

/// Signed transaction submission capability.
#[async_trait]
pub trait BroadcastProvider: Send + Sync {
    /// Submit a signed transaction, returning the network tx hash.
    async fn broadcast(&self, signed: &SignedTransaction) -> Result<String>;
}
