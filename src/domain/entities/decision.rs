use crate::domain::entities::historical_pattern::PatternMatches;
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::values::confidence::ConfidenceLevel;
use crate::domain::values::preferences::UserPreferences;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deterministic outcome of the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub current_price: f64,
    pub avg_historical_price: f64,
    pub trend_pct: f64,
    pub predicted_price: f64,
    pub profit_pct: f64,
    pub should_deposit: bool,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
}

/// How the narrative agent's recommendation was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Arguments of a schema-validated tool call.
    Structured,
    /// Keyword match over free text; unreliable.
    Keyword,
}

/// Presentation layer produced by the language-model agent. Never feeds back
/// into [`DecisionResult::should_deposit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeAnalysis {
    pub explanation: String,
    pub narrative_recommendation: Option<bool>,
    pub source: RecommendationSource,
    pub model: String,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    pub run_id: String,
    pub observation: PriceObservation,
    pub similar_patterns: PatternMatches,
    pub decision: DecisionResult,
    pub narrative: Option<NarrativeAnalysis>,
    /// Set when a narrative agent is configured but failed or timed out.
    pub degraded: bool,
    pub preferences: UserPreferences,
    pub completed_at: DateTime<Utc>,
}

impl MonitorReport {
    pub fn should_deposit(&self) -> bool {
        self.decision.should_deposit
    }

    /// Narrative explanation when present, otherwise the templated reasoning.
    pub fn analysis_text(&self) -> &str {
        self.narrative
            .as_ref()
            .map(|n| n.explanation.as_str())
            .unwrap_or(self.decision.reasoning.as_str())
    }
}
