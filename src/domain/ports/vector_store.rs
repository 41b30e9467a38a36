use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use async_trait::async_trait;

/// A stored observation together with its similarity to the query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredObservation {
    pub observation: PriceObservation,
    pub score: f64,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the vector stored under `observation.record_id()`.
    async fn upsert(&self, observation: &PriceObservation, vector: &[f32]) -> Result<(), DomainError>;

    /// Up to `limit` stored observations of `asset_id`, most similar first.
    /// Observations of other assets never match.
    async fn search_similar(
        &self,
        asset_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredObservation>, DomainError>;

    fn stored_dimension(&self) -> Result<Option<usize>, DomainError>;
}
