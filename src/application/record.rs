use crate::application::embedding::ObservationEmbedder;
use crate::application::monitor::{fetch_tracked, MonitorSettings};
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::InputType;
use crate::domain::ports::price_feed::PriceFeed;
use crate::domain::ports::vector_store::VectorStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Outcome of a historical backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub requested: usize,
    pub recorded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Embeds observations as documents and stores them for later similarity
/// lookups.
pub struct RecordUseCase {
    feed: Arc<dyn PriceFeed>,
    embedder: ObservationEmbedder,
    store: Arc<dyn VectorStore>,
    settings: MonitorSettings,
}

impl RecordUseCase {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        embedder: ObservationEmbedder,
        store: Arc<dyn VectorStore>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            feed,
            embedder,
            store,
            settings,
        }
    }

    /// Returns `Ok(false)` when the provider yields an empty vector (no
    /// embedding backend configured); nothing is stored in that case.
    pub async fn record(&self, observation: &PriceObservation) -> Result<bool, DomainError> {
        let vector = self.embedder.embed(observation, InputType::Document).await?;
        if vector.is_empty() {
            return Ok(false);
        }
        timeout(self.settings.io_timeout, self.store.upsert(observation, &vector))
            .await
            .map_err(|_| DomainError::PatternStore("vector upsert timed out".into()))??;
        Ok(true)
    }

    /// Fetches the latest observation for the tracked asset and records it.
    pub async fn record_latest(&self) -> Result<PriceObservation, DomainError> {
        let observation = fetch_tracked(
            self.feed.as_ref(),
            &self.settings.asset_id,
            self.settings.io_timeout,
        )
        .await?;
        self.record(&observation).await?;
        Ok(observation)
    }

    /// Walks back from `until` in `step` increments over `span`, recording
    /// every observation of the tracked asset the feed returns. Individual
    /// failures are counted, not fatal.
    pub async fn backfill(
        &self,
        until: DateTime<Utc>,
        span: ChronoDuration,
        step: ChronoDuration,
    ) -> Result<BackfillSummary, DomainError> {
        if step <= ChronoDuration::zero() {
            return Err(DomainError::Validation("Backfill step must be positive".into()));
        }
        if span < ChronoDuration::zero() {
            return Err(DomainError::Validation("Backfill span must not be negative".into()));
        }

        let mut summary = BackfillSummary::default();
        let mut at = until - span;
        while at <= until {
            summary.requested += 1;
            match self.backfill_one(at).await {
                Ok(n) => summary.recorded += n,
                Err(e) => {
                    warn!(at = %at, error = %e, "backfill step failed");
                    summary.failed += 1;
                    summary.errors.push(format!("{at}: {e}"));
                }
            }
            at += step;
        }

        info!(
            requested = summary.requested,
            recorded = summary.recorded,
            failed = summary.failed,
            "backfill finished"
        );
        Ok(summary)
    }

    async fn backfill_one(&self, at: DateTime<Utc>) -> Result<usize, DomainError> {
        let observations = timeout(
            self.settings.io_timeout,
            self.feed.fetch_at_time(&self.settings.asset_id, at),
        )
        .await
        .map_err(|_| DomainError::Fetch(format!("{} timed out", self.feed.name())))??;

        let mut recorded = 0;
        let tracked = observations
            .iter()
            .filter(|o| o.id.eq_ignore_ascii_case(&self.settings.asset_id));
        for observation in tracked {
            if self.record(observation).await? {
                recorded += 1;
            }
        }
        Ok(recorded)
    }
}
