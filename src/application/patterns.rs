//! Similarity lookup over previously recorded observations.
//!
//! The matcher never returns an empty set: when the store has nothing (or
//! cannot be reached) it synthesizes three placeholder patterns around the
//! current price so the decision engine always has something to average.

use crate::domain::entities::historical_pattern::{HistoricalPattern, PatternMatches, PatternOrigin};
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::ports::vector_store::VectorStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub const DEFAULT_TOP_K: usize = 5;

/// Default spacing of synthesized patterns.
pub const DEFAULT_FALLBACK_PERIOD_HOURS: i64 = 24;
/// Largest accepted spacing: one leap year.
pub const MAX_FALLBACK_PERIOD_HOURS: i64 = 366 * 24;

/// `(price offset, similarity score)` for each synthesized pattern; the
/// pattern at index `i` is timestamped `i + 1` periods before the current
/// observation.
const FALLBACK_SHAPE: [(f64, f64); 3] = [(-0.002, 0.95), (0.002, 0.90), (-0.003, 0.85)];

pub struct PatternMatcher {
    store: Arc<dyn VectorStore>,
    timeout: Duration,
    fallback_period: ChronoDuration,
}

impl PatternMatcher {
    pub fn new(store: Arc<dyn VectorStore>, timeout: Duration, fallback_period: ChronoDuration) -> Self {
        Self {
            store,
            timeout,
            fallback_period,
        }
    }

    /// Up to `k` most similar stored observations. Store errors, timeouts and
    /// empty results all degrade to [`synthesize_patterns`].
    pub async fn find_similar(
        &self,
        current: &PriceObservation,
        vector: &[f32],
        k: usize,
    ) -> PatternMatches {
        let k = k.max(1);
        let lookup = timeout(self.timeout, self.store.search_similar(&current.id, vector, k)).await;

        let scored = match lookup {
            Ok(Ok(scored)) => scored,
            Ok(Err(e)) => {
                warn!(error = %e, "similarity query failed; using synthesized patterns");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "similarity query timed out; using synthesized patterns");
                Vec::new()
            }
        };

        if scored.is_empty() {
            let patterns = synthesize_patterns(current, self.fallback_period);
            debug!(count = patterns.len(), "synthesized fallback patterns");
            return PatternMatches {
                patterns,
                synthesized: true,
            };
        }

        let patterns: Vec<HistoricalPattern> = scored
            .into_iter()
            .take(k)
            .map(|s| {
                HistoricalPattern::retrieved(
                    s.observation.price,
                    s.observation.confidence,
                    s.observation.publish_time,
                    s.score,
                )
            })
            .collect();
        debug!(count = patterns.len(), "retrieved similar patterns");

        PatternMatches {
            patterns,
            synthesized: false,
        }
    }
}

/// Three deterministic placeholder patterns around `current`: prices offset by
/// -0.2%, +0.2% and -0.3%, scores 0.95, 0.90 and 0.85, one to three periods
/// back in time.
///
/// A non-positive `period` is replaced by the default; timestamps that would
/// fall before the representable range saturate at its minimum.
pub fn synthesize_patterns(current: &PriceObservation, period: ChronoDuration) -> Vec<HistoricalPattern> {
    let period = if period > ChronoDuration::zero() {
        period
    } else {
        ChronoDuration::hours(DEFAULT_FALLBACK_PERIOD_HOURS)
    };

    let mut at: Option<DateTime<Utc>> = Some(current.publish_time);
    FALLBACK_SHAPE
        .iter()
        .map(|(offset, score)| {
            at = at.and_then(|t| t.checked_sub_signed(period));
            HistoricalPattern {
                price: current.price * (1.0 + offset),
                confidence: current.confidence,
                publish_time: at.unwrap_or(DateTime::<Utc>::MIN_UTC),
                similarity_score: *score,
                origin: PatternOrigin::Synthesized,
            }
        })
        .collect()
}
