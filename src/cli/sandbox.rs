//! Sandbox providers
//!
//! Self-contained stand-ins for the social feed, market data, chain data
//! and venue adapters, so the whole pipeline can run end to end with no
//! credentials and no network. Prices follow a small seeded random walk;
//! chain activity is generated hot enough to clear the whale tiers for
//! the demo symbols.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::position::Side;
use crate::providers::{
    BroadcastProvider, ExecutionGateway, FeeEstimationProvider, FeeRecommendation,
    MarketDataProvider, OnChainDataProvider, RawTransaction, SignedTransaction,
    SimulationOutcome, SimulationProvider, TokenMetadata, TokenTransfer,
};
use crate::sentiment::MentionEvent;

/// Canned social posts cycled through by the sandbox feed
const SAMPLE_POSTS: &[(&str, u64, u64, u64, u64, &str)] = &[
    ("crypto_whale_alerts", 890_000, 1_200, 450, 89, "$PEPE is amazing, best gem on the moon pump"),
    ("meme_coin_hunter", 340_000, 800, 320, 45, "Huge $PEPE momentum, great setup, smart money loading"),
    ("degen_trader_x", 150_000, 400, 150, 30, "$PEPE breakout incoming, chart looks amazing"),
    ("onchain_sleuth", 520_000, 950, 380, 60, "Whale wallets accumulating $PEPE, awesome bullish surge"),
    ("altcoin_daily_x", 260_000, 600, 210, 38, "$PEPE gaining serious traction, great entry here"),
    ("shib_army_hq", 410_000, 700, 260, 52, "$DOGE and $PEPE both pumping, good moon mission"),
    ("bear_market_bob", 95_000, 120, 30, 14, "$DOGE looks bad here, possible dump ahead"),
];

/// Cycles through the canned posts, restamping them at ingest time
pub struct SandboxSocialFeed {
    cursor: Mutex<usize>,
    batch_size: usize,
}

impl SandboxSocialFeed {
    pub fn new(batch_size: usize) -> Self {
        Self {
            cursor: Mutex::new(0),
            batch_size,
        }
    }

    /// Next batch of mention events, stamped over the last few minutes
    pub fn next_batch(&self) -> Vec<MentionEvent> {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let mut batch = Vec::with_capacity(self.batch_size);

        for i in 0..self.batch_size {
            let (author, reach, likes, retweets, replies, text) =
                SAMPLE_POSTS[(*cursor + i) % SAMPLE_POSTS.len()];
            for symbol in crate::sentiment::extract_symbols(text) {
                batch.push(MentionEvent::new(
                    symbol,
                    author,
                    reach,
                    likes,
                    retweets,
                    replies,
                    text,
                    now - Duration::minutes((i % 5) as i64),
                ));
            }
        }

        *cursor = (*cursor + self.batch_size) % SAMPLE_POSTS.len();
        batch
    }
}

/// Seeded random-walk price feed
pub struct SandboxMarket {
    prices: Mutex<HashMap<String, f64>>,
    rng: Mutex<StdRng>,
}

impl SandboxMarket {
    pub fn new(seed: u64) -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn step(&self, symbol: &str) -> f64 {
        let shock = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.gen_range(-0.03..0.03)
        };
        let mut prices = self.prices.lock().unwrap_or_else(|e| e.into_inner());
        let price = prices.entry(symbol.to_string()).or_insert(0.001);
        *price *= 1.0 + shock;
        *price
    }
}

#[async_trait]
impl MarketDataProvider for SandboxMarket {
    async fn get_price(&self, symbol: &str) -> Result<f64> {
        Ok(self.step(symbol))
    }

    async fn get_market_cap(&self, symbol: &str) -> Result<f64> {
        // Cap tracks the walk so gate decisions stay coherent
        let price = {
            let prices = self.prices.lock().unwrap_or_else(|e| e.into_inner());
            prices.get(symbol).copied().unwrap_or(0.001)
        };
        Ok(price * 4_000_000_000.0)
    }
}

/// Chain data generator producing whale-grade activity
pub struct SandboxChain {
    rng: Mutex<StdRng>,
}

impl SandboxChain {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl OnChainDataProvider for SandboxChain {
    async fn token_metadata(&self, _network: &str, contract: &str) -> Result<TokenMetadata> {
        Ok(TokenMetadata {
            name: format!("Sandbox Token {}", contract),
            symbol: contract.trim_start_matches("0x").to_uppercase(),
            total_supply: 1_000_000_000.0,
            holders_count: 12_000,
        })
    }

    async fn recent_transfers(
        &self,
        _network: &str,
        _contract: &str,
        limit: usize,
    ) -> Result<Vec<TokenTransfer>> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let count = limit.min(40);
        let mut transfers = Vec::with_capacity(count);
        for i in 0..count {
            // Every tenth transfer is a whale-sized outlier
            let amount = if i % 10 == 0 {
                rng.gen_range(2_000_000.0..5_000_000.0)
            } else {
                rng.gen_range(1_000.0..80_000.0)
            };
            transfers.push(TokenTransfer {
                amount,
                timestamp: now - Duration::minutes(i as i64),
            });
        }
        Ok(transfers)
    }
}

/// Fixed-fee oracle
pub struct SandboxFees;

#[async_trait]
impl FeeEstimationProvider for SandboxFees {
    fn name(&self) -> &str {
        "sandbox"
    }

    async fn fee_recommendation(&self, _network: &str) -> Result<FeeRecommendation> {
        Ok(FeeRecommendation {
            fast_gas_price: 20_000_000_000,
            max_fee_per_gas: 24_000_000_000,
            max_priority_fee_per_gas: 1_500_000_000,
            estimated_confirmation_secs: 12,
        })
    }
}

/// Always-successful transaction simulator
pub struct SandboxSimulator;

#[async_trait]
impl SimulationProvider for SandboxSimulator {
    async fn simulate(&self, tx: &RawTransaction) -> Result<SimulationOutcome> {
        Ok(SimulationOutcome {
            gas_estimate: tx.gas_limit.min(210_000),
            logs: vec!["Transfer".to_string(), "Swap".to_string()],
        })
    }
}

/// Accepts every signed transaction and echoes its hash
pub struct SandboxBroadcaster;

#[async_trait]
impl BroadcastProvider for SandboxBroadcaster {
    async fn broadcast(&self, signed: &SignedTransaction) -> Result<String> {
        Ok(signed.hash.clone())
    }
}

/// Order sink that only logs; nothing reaches a venue
pub struct SandboxGateway {
    counter: Mutex<u64>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self {
            counter: Mutex::new(0),
        }
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionGateway for SandboxGateway {
    async fn submit_order(&self, symbol: &str, side: Side, size: f64) -> Result<String> {
        let id = {
            let mut counter = self.counter.lock().unwrap_or_else(|e| e.into_inner());
            *counter += 1;
            *counter
        };
        let order_id = format!("sandbox-{}", id);
        info!(symbol, ?side, size, order_id = %order_id, "sandbox order accepted");
        Ok(order_id)
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_cycles_and_extracts_symbols() {
        let feed = SandboxSocialFeed::new(7);
        let batch = feed.next_batch();
        assert!(!batch.is_empty());
        assert!(batch.iter().any(|m| m.token_symbol == "PEPE"));
        assert!(batch.iter().any(|m| m.token_symbol == "DOGE"));
    }

    #[tokio::test]
    async fn test_market_walk_stays_positive() {
        let market = SandboxMarket::new(7);
        for _ in 0..200 {
            let price = market.get_price("PEPE").await.unwrap();
            assert!(price > 0.0);
        }
    }

    #[tokio::test]
    async fn test_chain_activity_clears_strong_tier() {
        let chain = SandboxChain::new(7);
        let transfers = chain.recent_transfers("ethereum", "0xpepe", 50).await.unwrap();
        assert_eq!(transfers.len(), 40);
        // Outliers every tenth slot give the validator whales to find
        let whales = transfers.iter().filter(|t| t.amount > 1_000_000.0).count();
        assert_eq!(whales, 4);
    }
}
