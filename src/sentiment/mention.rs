//! Mention events and text scoring
//!
//! A mention is a single observed social-media reference to a token by a
//! tracked source. Scoring maps text to a valence in [0, 1] using a small
//! lexicon, then nudges the result for a handful of bullish/bearish
//! keywords common in crypto twitter.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single observed social-media reference to a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionEvent {
    pub token_symbol: String,
    /// Account that produced the mention
    pub source_identity: String,
    /// Follower / influence count of the source
    pub source_reach: u64,
    /// Derived engagement: likes + 2x retweets + replies
    pub engagement_score: u64,
    pub raw_text: String,
    pub observed_at: DateTime<Utc>,
}

impl MentionEvent {
    /// Build a mention from raw interaction counts. Retweets are weighted
    /// double since they propagate the message.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token_symbol: impl Into<String>,
        source_identity: impl Into<String>,
        source_reach: u64,
        likes: u64,
        retweets: u64,
        replies: u64,
        raw_text: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_symbol: token_symbol.into(),
            source_identity: source_identity.into(),
            source_reach,
            engagement_score: engagement_score(likes, retweets, replies),
            raw_text: raw_text.into(),
            observed_at,
        }
    }

    /// Aggregation weight: reach and engagement both contribute, and the
    /// sum is intentionally unbounded so larger accounts dominate.
    pub fn weight(&self) -> f64 {
        self.source_reach as f64 / 1_000_000.0 + self.engagement_score as f64 / 1_000.0
    }
}

/// Engagement metric with retweets weighted more heavily
pub fn engagement_score(likes: u64, retweets: u64, replies: u64) -> u64 {
    likes + retweets * 2 + replies
}

/// Valence lexicon: word -> polarity in [-1, 1]
const VALENCE: &[(&str, f64)] = &[
    ("amazing", 0.8),
    ("awesome", 0.9),
    ("bad", -0.6),
    ("best", 0.9),
    ("big", 0.3),
    ("broken", -0.7),
    ("buy", 0.4),
    ("down", -0.4),
    ("fail", -0.7),
    ("game-changing", 0.8),
    ("good", 0.6),
    ("great", 0.8),
    ("huge", 0.6),
    ("interesting", 0.4),
    ("loss", -0.6),
    ("scam", -1.0),
    ("serious", 0.3),
    ("strong", 0.6),
    ("terrible", -0.9),
    ("up", 0.4),
    ("weak", -0.5),
    ("worst", -1.0),
];

/// Keywords that bump an otherwise neutral score
const BULLISH_KEYWORDS: &[&str] = &[
    "moon", "bullish", "pump", "rocket", "gem", "breakout", "surge", "momentum", "traction",
];
const BEARISH_KEYWORDS: &[&str] = &["dump", "crash", "bearish", "sell", "exit", "dead", "rug"];

/// Score text polarity into [0, 1].
///
/// The mean valence of matched lexicon words (neutral 0.0 if none match)
/// is mapped from [-1, 1] to [0, 1], then adjusted +/-0.1 per matched
/// bullish/bearish keyword and clamped.
pub fn score_text(text: &str) -> f64 {
    let lower = text.to_lowercase();

    let mut total = 0.0;
    let mut hits = 0usize;
    for word in lower.split(|c: char| !c.is_alphanumeric() && c != '-') {
        if word.is_empty() {
            continue;
        }
        if let Ok(idx) = VALENCE.binary_search_by(|(w, _)| w.cmp(&word)) {
            total += VALENCE[idx].1;
            hits += 1;
        }
    }

    let polarity = if hits > 0 { total / hits as f64 } else { 0.0 };
    let mut score = (polarity + 1.0) / 2.0;

    for keyword in BULLISH_KEYWORDS {
        if lower.contains(keyword) {
            score = (score + 0.1).min(1.0);
        }
    }
    for keyword in BEARISH_KEYWORDS {
        if lower.contains(keyword) {
            score = (score - 0.1).max(0.0);
        }
    }

    score
}

lazy_static::lazy_static! {
    /// Default token detection patterns for well-known meme coins
    static ref TOKEN_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("DOGE", Regex::new(r"(?i)\b(?:DOGE|dogecoin)\b").unwrap()),
        ("SHIB", Regex::new(r"(?i)\b(?:SHIB|shiba)\b").unwrap()),
        ("PEPE", Regex::new(r"(?i)\b(?:PEPE|pepecoin)\b").unwrap()),
        ("FLOKI", Regex::new(r"(?i)\b(?:FLOKI|flokiinu)\b").unwrap()),
        ("BONK", Regex::new(r"(?i)\b(?:BONK|bonkcoin)\b").unwrap()),
        ("WIF", Regex::new(r"(?i)\b(?:WIF|dogwifhat)\b").unwrap()),
        ("POPCAT", Regex::new(r"(?i)\b(?:POPCAT|popcatcoin)\b").unwrap()),
        ("BRETT", Regex::new(r"(?i)\b(?:BRETT|basedpepe)\b").unwrap()),
        ("WOJAK", Regex::new(r"(?i)\b(?:WOJAK|wojaktoken)\b").unwrap()),
        ("MEME", Regex::new(r"(?i)\b(?:MEME|memecoin)\b").unwrap()),
    ];
}

/// Extract known token symbols mentioned in free text
pub fn extract_symbols(text: &str) -> Vec<String> {
    TOKEN_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(symbol, _)| symbol.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_weights_retweets_double() {
        assert_eq!(engagement_score(100, 50, 10), 210);
        assert_eq!(engagement_score(0, 0, 0), 0);
    }

    #[test]
    fn test_score_text_neutral_is_half() {
        let score = score_text("the quick brown fox");
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_score_text_bullish_keywords_bump() {
        let neutral = score_text("watching this token");
        let bullish = score_text("watching this token moon with a breakout");
        assert!(bullish > neutral);
        assert!(bullish <= 1.0);
    }

    #[test]
    fn test_score_text_bearish_clamped_at_zero() {
        let score = score_text("worst scam dump crash sell exit dead rug");
        assert!(score >= 0.0);
        assert!(score < 0.2);
    }

    #[test]
    fn test_score_text_stays_in_unit_interval() {
        for text in [
            "moon moon pump rocket gem breakout surge best awesome",
            "",
            "DOGE to the moon! #cryptocurrency",
        ] {
            let score = score_text(text);
            assert!((0.0..=1.0).contains(&score), "score {} for {:?}", score, text);
        }
    }

    #[test]
    fn test_extract_symbols() {
        let symbols = extract_symbols("DOGE to the moon, also watching shiba closely");
        assert!(symbols.contains(&"DOGE".to_string()));
        assert!(symbols.contains(&"SHIB".to_string()));
        assert!(!symbols.contains(&"PEPE".to_string()));
    }

    #[test]
    fn test_mention_weight() {
        let mention = MentionEvent::new(
            "DOGE",
            "elonmusk",
            150_000_000,
            50_000,
            25_000,
            10_000,
            "DOGE to the moon!",
            chrono::Utc::now(),
        );
        // 150M followers -> 150.0, engagement 110_000 -> 110.0
        assert!((mention.weight() - 260.0).abs() < 1e-9);
    }
}
