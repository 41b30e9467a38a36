use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Turns observations into embeddings through the configured provider.
#[derive(Clone)]
pub struct ObservationEmbedder {
    embedder: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl ObservationEmbedder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { embedder, timeout }
    }

    /// Embeds the canonical description of `observation`. Query embeddings
    /// are used for lookups, document embeddings for storage.
    pub async fn embed(
        &self,
        observation: &PriceObservation,
        input_type: InputType,
    ) -> Result<Vec<f32>, DomainError> {
        let text = observation.canonical_description();
        debug!(text = %text, "embedding observation");

        let vectors = timeout(self.timeout, self.embedder.embed(&[text], input_type))
            .await
            .map_err(|_| {
                DomainError::Embedding(format!(
                    "embedding provider timed out after {:?}",
                    self.timeout
                ))
            })??;

        vectors
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Embedding("provider returned no vectors".into()))
    }
}
