//! Social sentiment ingestion and aggregation
//!
//! Turns a stream of influencer mentions into a weighted, time-decayed
//! sentiment score per token symbol.

pub mod aggregator;
pub mod mention;

pub use aggregator::{SentimentAggregator, SentimentRecord};
pub use mention::{extract_symbols, score_text, MentionEvent};
