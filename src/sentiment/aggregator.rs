//! Weighted sentiment aggregation
//!
//! Keeps one record per token symbol over a trailing 30-minute window.
//! Mentions are purged before every recomputation, so the weighted score
//! always reflects the current window only. Records live in a `DashMap`;
//! the shard lock taken by `get_mut` serializes ingest/purge/recompute per
//! symbol, which is the single-writer discipline the score invariant needs.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SentimentConfig;
use crate::events::{EngineEvent, EventSink};
use crate::sentiment::mention::{score_text, MentionEvent};

/// One scored mention kept inside the window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMention {
    pub source_identity: String,
    pub sentiment: f64,
    pub weight: f64,
    pub observed_at: DateTime<Utc>,
}

/// Per-token sentiment snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub symbol: String,
    pub mentions: Vec<ScoredMention>,
    /// Engagement-and-reach-weighted average sentiment over the window
    pub weighted_score: f64,
    /// Raw mention count within the window
    pub mention_count: usize,
    /// Mentions deduplicated by source identity
    pub distinct_source_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Aggregates mention events into per-symbol sentiment records
pub struct SentimentAggregator {
    records: DashMap<String, SentimentRecord>,
    config: SentimentConfig,
    sink: Arc<dyn EventSink>,
}

impl SentimentAggregator {
    pub fn new(config: SentimentConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            records: DashMap::new(),
            config,
            sink,
        }
    }

    /// Ingest a mention at the current wall-clock time.
    pub fn ingest(&self, event: MentionEvent) -> Option<SentimentRecord> {
        self.ingest_at(event, Utc::now())
    }

    /// Ingest a mention with an explicit "now", so tests can drive
    /// virtual time through the window.
    pub fn ingest_at(&self, event: MentionEvent, now: DateTime<Utc>) -> Option<SentimentRecord> {
        if event.source_reach < self.config.min_source_reach {
            debug!(
                source = %event.source_identity,
                reach = event.source_reach,
                "mention below reach floor, ignored"
            );
            return None;
        }

        let sentiment = score_text(&event.raw_text);
        let scored = ScoredMention {
            source_identity: event.source_identity.clone(),
            sentiment,
            weight: event.weight(),
            observed_at: event.observed_at,
        };

        let symbol = event.token_symbol.clone();
        let mut entry = self
            .records
            .entry(symbol.clone())
            .or_insert_with(|| SentimentRecord {
                symbol: symbol.clone(),
                mentions: Vec::new(),
                weighted_score: 0.0,
                mention_count: 0,
                distinct_source_count: 0,
                last_updated: now,
            });

        entry.mentions.push(scored);
        let published = Self::purge_and_recompute(&mut entry, self.config.window_minutes, now);
        let snapshot = published.then(|| entry.clone());
        drop(entry);

        if let Some(record) = &snapshot {
            debug!(
                symbol = %record.symbol,
                score = record.weighted_score,
                mentions = record.mention_count,
                sources = record.distinct_source_count,
                "sentiment updated"
            );
            self.sink.publish(EngineEvent::SentimentUpdate {
                symbol: record.symbol.clone(),
                weighted_score: record.weighted_score,
                mention_count: record.mention_count,
                distinct_sources: record.distinct_source_count,
            });
        }

        snapshot
    }

    /// Drop mentions outside the window and recompute the weighted score.
    /// Returns false when total weight is zero, in which case the score is
    /// undefined and the record must not be published.
    fn purge_and_recompute(
        record: &mut SentimentRecord,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> bool {
        let cutoff = now - Duration::minutes(window_minutes);
        record.mentions.retain(|m| m.observed_at > cutoff);

        let total_weight: f64 = record.mentions.iter().map(|m| m.weight).sum();
        if total_weight <= 0.0 {
            record.weighted_score = 0.0;
            record.mention_count = record.mentions.len();
            record.distinct_source_count = 0;
            return false;
        }

        let weighted_sum: f64 = record
            .mentions
            .iter()
            .map(|m| m.sentiment * m.weight)
            .sum();

        record.weighted_score = weighted_sum / total_weight;
        record.mention_count = record.mentions.len();
        record.distinct_source_count = record
            .mentions
            .iter()
            .map(|m| m.source_identity.as_str())
            .collect::<HashSet<_>>()
            .len();
        record.last_updated = now;
        true
    }

    /// Current sentiment snapshot for a symbol, re-purged against `now`.
    pub fn query_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<SentimentRecord> {
        let mut entry = self.records.get_mut(symbol)?;
        if !Self::purge_and_recompute(&mut entry, self.config.window_minutes, now) {
            return None;
        }
        Some(entry.clone())
    }

    pub fn query(&self, symbol: &str) -> Option<SentimentRecord> {
        self.query_at(symbol, Utc::now())
    }

    /// Evict records that have not been updated within the TTL
    pub fn evict_stale(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(self.config.record_ttl_minutes);
        let before = self.records.len();
        self.records.retain(|_, record| record.last_updated > cutoff);
        let evicted = before - self.records.len();
        if evicted > 0 {
            info!(evicted, "evicted stale sentiment records");
        }
    }

    pub fn tracked_symbols(&self) -> Vec<String> {
        self.records.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use chrono::TimeZone;

    fn aggregator() -> SentimentAggregator {
        SentimentAggregator::new(SentimentConfig::default(), Arc::new(NullSink))
    }

    fn mention(source: &str, reach: u64, text: &str, at: DateTime<Utc>) -> MentionEvent {
        MentionEvent::new("DOGE", source, reach, 5_000, 2_000, 1_000, text, at)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let agg = aggregator();
        let now = t0();
        for (i, text) in ["DOGE moon rocket pump", "DOGE dump crash", "DOGE is fine"]
            .iter()
            .enumerate()
        {
            let record = agg
                .ingest_at(mention(&format!("user{}", i), 900_000, text, now), now)
                .expect("record published");
            assert!((0.0..=1.0).contains(&record.weighted_score));
        }
    }

    #[test]
    fn test_old_mentions_purged_from_score() {
        let agg = aggregator();
        let start = t0();

        // Bearish mention at t0
        agg.ingest_at(mention("bear", 900_000, "DOGE dump crash dead", start), start);

        // 31 minutes later a bullish mention arrives; the bearish one has
        // left the window and must not drag the score down.
        let later = start + Duration::minutes(31);
        let record = agg
            .ingest_at(mention("bull", 900_000, "DOGE moon rocket breakout", later), later)
            .expect("record published");

        assert_eq!(record.mention_count, 1);
        assert!(record.weighted_score > 0.5);
    }

    #[test]
    fn test_query_purges_against_virtual_time() {
        let agg = aggregator();
        let start = t0();
        agg.ingest_at(mention("a", 900_000, "DOGE moon", start), start);

        assert!(agg.query_at("DOGE", start + Duration::minutes(5)).is_some());
        // Window fully elapsed: no mentions remain, score is undefined
        assert!(agg.query_at("DOGE", start + Duration::minutes(31)).is_none());
    }

    #[test]
    fn test_distinct_sources_deduplicated() {
        let agg = aggregator();
        let now = t0();
        for _ in 0..3 {
            agg.ingest_at(mention("same_account", 900_000, "DOGE moon", now), now);
        }
        let record = agg
            .ingest_at(mention("other_account", 900_000, "DOGE moon", now), now)
            .unwrap();

        assert_eq!(record.mention_count, 4);
        assert_eq!(record.distinct_source_count, 2);
    }

    #[test]
    fn test_reach_floor_filters_small_accounts() {
        let agg = aggregator();
        let now = t0();
        assert!(agg
            .ingest_at(mention("minnow", 10_000, "DOGE moon", now), now)
            .is_none());
        assert!(agg.query_at("DOGE", now).is_none());
    }

    #[test]
    fn test_large_accounts_dominate_weighting() {
        let agg = aggregator();
        let now = t0();

        // Whale is bullish, small account is bearish
        agg.ingest_at(
            MentionEvent::new("DOGE", "whale", 150_000_000, 50_000, 25_000, 10_000, "DOGE moon rocket", now),
            now,
        );
        let record = agg
            .ingest_at(
                MentionEvent::new("DOGE", "small", 60_000, 10, 2, 1, "DOGE dump crash dead", now),
                now,
            )
            .unwrap();

        assert!(record.weighted_score > 0.5, "whale sentiment should dominate");
    }

    #[test]
    fn test_evict_stale_records() {
        let agg = aggregator();
        let start = t0();
        agg.ingest_at(mention("a", 900_000, "DOGE moon", start), start);

        agg.evict_stale(start + Duration::minutes(121));
        assert!(agg.tracked_symbols().is_empty());
    }
}
