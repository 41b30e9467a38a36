//! The monitoring pipeline: fetch → embed → match → decide → narrate.
//!
//! [`MonitorUseCase::run`] is the single entry point shared by manual
//! triggers and scheduled ticks.

use crate::application::decision::analyze;
use crate::application::embedding::ObservationEmbedder;
use crate::application::patterns::{PatternMatcher, DEFAULT_FALLBACK_PERIOD_HOURS, DEFAULT_TOP_K};
use crate::application::record::RecordUseCase;
use crate::domain::entities::decision::{MonitorReport, NarrativeAnalysis};
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use crate::domain::ports::narrative_agent::{NarrativeAgent, NarrativeRequest};
use crate::domain::ports::price_feed::PriceFeed;
use crate::domain::ports::vector_store::VectorStore;
use crate::domain::values::preferences::UserPreferences;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Oracle feed id of the tracked asset.
    pub asset_id: String,
    pub top_k: usize,
    /// Upper bound for each external I/O call (fetch, embed, similarity).
    pub io_timeout: Duration,
    pub narrative_timeout: Duration,
    /// Spacing of synthesized fallback patterns.
    pub fallback_period: chrono::Duration,
    /// Upsert each run's observation into the vector store.
    pub record_observations: bool,
}

impl MonitorSettings {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            top_k: DEFAULT_TOP_K,
            io_timeout: Duration::from_secs(15),
            narrative_timeout: Duration::from_secs(45),
            fallback_period: chrono::Duration::hours(DEFAULT_FALLBACK_PERIOD_HOURS),
            record_observations: true,
        }
    }
}

pub struct MonitorUseCase {
    feed: Arc<dyn PriceFeed>,
    embedder: ObservationEmbedder,
    matcher: PatternMatcher,
    recorder: RecordUseCase,
    narrator: Option<Arc<dyn NarrativeAgent>>,
    settings: MonitorSettings,
}

impl MonitorUseCase {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        narrator: Option<Arc<dyn NarrativeAgent>>,
        settings: MonitorSettings,
    ) -> Self {
        let embedder = ObservationEmbedder::new(embedder, settings.io_timeout);
        Self {
            matcher: PatternMatcher::new(store.clone(), settings.io_timeout, settings.fallback_period),
            recorder: RecordUseCase::new(feed.clone(), embedder.clone(), store, settings.clone()),
            embedder,
            feed,
            narrator,
            settings,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn recorder(&self) -> &RecordUseCase {
        &self.recorder
    }

    /// Runs the full pipeline once.
    ///
    /// Validation happens before any I/O. Fetch and embedding failures abort
    /// the run; similarity and narrative failures degrade gracefully.
    #[instrument(
        skip(self, prefs),
        fields(run_id = tracing::field::Empty, risk = %prefs.risk_tolerance, margin = prefs.profit_margin)
    )]
    pub async fn run(&self, prefs: &UserPreferences) -> Result<MonitorReport, DomainError> {
        prefs.validate()?;
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let observation = self.fetch_current().await?;
        info!(
            symbol = %observation.symbol,
            price = observation.price,
            confidence = observation.confidence,
            publish_time = %observation.publish_time,
            "fetched current observation"
        );

        let query = self.embedder.embed(&observation, InputType::Query).await?;
        let similar = self
            .matcher
            .find_similar(&observation, &query, self.settings.top_k)
            .await;
        info!(
            count = similar.len(),
            synthesized = similar.synthesized,
            "matched historical patterns"
        );

        let decision = analyze(&observation, &similar.patterns, prefs)?;
        info!(
            avg = decision.avg_historical_price,
            trend_pct = decision.trend_pct,
            predicted = decision.predicted_price,
            profit_pct = decision.profit_pct,
            should_deposit = decision.should_deposit,
            confidence = %decision.confidence,
            "decision computed"
        );

        let (narrative, degraded) = match &self.narrator {
            Some(narrator) => {
                let request = NarrativeRequest {
                    observation: observation.clone(),
                    patterns: similar.patterns.clone(),
                    preferences: prefs.clone(),
                    decision: decision.clone(),
                };
                match self.narrate(narrator.as_ref(), &request).await {
                    Ok(narrative) => (Some(narrative), false),
                    Err(e) => {
                        warn!(agent = narrator.name(), error = %e, "narrative unavailable; returning numeric-only decision");
                        (None, true)
                    }
                }
            }
            None => (None, false),
        };

        if let Some(n) = &narrative {
            if n.narrative_recommendation.is_some_and(|r| r != decision.should_deposit) {
                warn!(
                    narrative = ?n.narrative_recommendation,
                    numeric = decision.should_deposit,
                    "narrative recommendation disagrees with numeric decision"
                );
            }
        }

        if self.settings.record_observations {
            match self.recorder.record(&observation).await {
                Ok(true) => debug!(id = %observation.record_id(), "recorded observation"),
                Ok(false) => debug!("empty embedding; observation not recorded"),
                Err(e) => warn!(error = %e, "could not record observation"),
            }
        }

        Ok(MonitorReport {
            run_id,
            observation,
            similar_patterns: similar,
            decision,
            narrative,
            degraded,
            preferences: prefs.clone(),
            completed_at: Utc::now(),
        })
    }

    async fn fetch_current(&self) -> Result<PriceObservation, DomainError> {
        fetch_tracked(self.feed.as_ref(), &self.settings.asset_id, self.settings.io_timeout).await
    }

    async fn narrate(
        &self,
        narrator: &dyn NarrativeAgent,
        request: &NarrativeRequest,
    ) -> Result<NarrativeAnalysis, DomainError> {
        timeout(self.settings.narrative_timeout, narrator.narrate(request))
            .await
            .map_err(|_| {
                DomainError::Narrative(format!(
                    "{} timed out after {:?}",
                    narrator.name(),
                    self.settings.narrative_timeout
                ))
            })?
    }
}

/// Latest observation of `asset_id` (case-insensitive id match), bounded by
/// `io_timeout`. Observations of other assets in the response are ignored.
pub(crate) async fn fetch_tracked(
    feed: &dyn PriceFeed,
    asset_id: &str,
    io_timeout: Duration,
) -> Result<PriceObservation, DomainError> {
    let ids = [asset_id.to_string()];
    let observations = timeout(io_timeout, feed.fetch_latest(&ids))
        .await
        .map_err(|_| DomainError::Fetch(format!("{} timed out after {:?}", feed.name(), io_timeout)))??;

    observations
        .into_iter()
        .find(|o| o.id.eq_ignore_ascii_case(asset_id))
        .ok_or_else(|| {
            DomainError::Fetch(format!("{} returned no observation for {}", feed.name(), asset_id))
        })
}
