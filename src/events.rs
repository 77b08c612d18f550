//! Outbound event publication
//!
//! Fire-and-forget publish points keyed by symbol. The engine never blocks
//! on subscriber presence; a sink with no listeners silently drops events.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::position::{PortfolioState, Position, TradeRecord};
use crate::signal::TradingSignal;

/// Structured event emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SentimentUpdate {
        symbol: String,
        weighted_score: f64,
        mention_count: usize,
        distinct_sources: usize,
    },
    SignalAdmitted(TradingSignal),
    PositionOpened(Position),
    PositionUpdate {
        symbol: String,
        current_price: f64,
        unrealized_pnl: f64,
    },
    TradeClosed(TradeRecord),
    PortfolioSnapshot(PortfolioState),
    EmergencyStop,
}

/// Event publication sink.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Sink backed by a tokio broadcast channel. Dropped when there are no
/// receivers, which is the expected fire-and-forget behavior.
pub struct BroadcastSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: EngineEvent) {
        // send() only fails when no receiver exists; that is fine here
        if self.tx.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }
}

/// Sink that discards everything. Used by the backtester and in tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: EngineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_sink_delivers() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.publish(EngineEvent::SentimentUpdate {
            symbol: "DOGE".to_string(),
            weighted_score: 0.9,
            mention_count: 7,
            distinct_sources: 5,
        });

        match rx.try_recv().expect("event should be delivered") {
            EngineEvent::SentimentUpdate { symbol, .. } => assert_eq!(symbol, "DOGE"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let sink = BroadcastSink::new(4);
        // Must not panic or block
        sink.publish(EngineEvent::EmergencyStop);
    }
}
