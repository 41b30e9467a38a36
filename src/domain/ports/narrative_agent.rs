use crate::domain::entities::decision::{DecisionResult, NarrativeAnalysis};
use crate::domain::entities::historical_pattern::HistoricalPattern;
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::values::preferences::UserPreferences;
use async_trait::async_trait;

/// Inputs handed to the narrative agent. The agent sees the same numbers the
/// decision engine used.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    pub observation: PriceObservation,
    pub patterns: Vec<HistoricalPattern>,
    pub preferences: UserPreferences,
    pub decision: DecisionResult,
}

/// Tool-calling language-model agent that explains a decision.
#[async_trait]
pub trait NarrativeAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn narrate(&self, request: &NarrativeRequest) -> Result<NarrativeAnalysis, DomainError>;
}
