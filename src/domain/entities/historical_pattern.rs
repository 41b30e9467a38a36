use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOrigin {
    /// Returned by the vector store.
    Retrieved,
    /// Placeholder derived from the current observation because the store
    /// had nothing to offer.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPattern {
    pub price: f64,
    pub confidence: f64,
    pub publish_time: DateTime<Utc>,
    /// Similarity to the query embedding, clamped to 0.0–1.0.
    pub similarity_score: f64,
    pub origin: PatternOrigin,
}

impl HistoricalPattern {
    pub fn retrieved(
        price: f64,
        confidence: f64,
        publish_time: DateTime<Utc>,
        similarity_score: f64,
    ) -> Self {
        Self {
            price,
            confidence,
            publish_time,
            similarity_score: similarity_score.clamp(0.0, 1.0),
            origin: PatternOrigin::Retrieved,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.origin == PatternOrigin::Synthesized
    }
}

/// Result of a similarity lookup. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatches {
    pub patterns: Vec<HistoricalPattern>,
    pub synthesized: bool,
}

impl PatternMatches {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
