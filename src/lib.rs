pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::api::{StartRequest, TriggerRequest, TriggerResponse};
use crate::application::monitor::{MonitorSettings, MonitorUseCase};
use crate::application::record::BackfillSummary;
use crate::application::scheduler::{JobStatus, ScheduledJob, Scheduler, TickEvent};
use crate::config::{AppConfig, EmbeddingBackend};
use crate::domain::entities::decision::MonitorReport;
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::embedding_port::EmbeddingProvider;
use crate::domain::ports::narrative_agent::NarrativeAgent;
use crate::domain::ports::price_feed::PriceFeed;
use crate::domain::ports::vector_store::VectorStore;
use crate::domain::values::preferences::UserPreferences;
use crate::infrastructure::embeddings::noop::NoopProvider;
use crate::infrastructure::embeddings::openai::OpenAiProvider;
use crate::infrastructure::feeds::pyth::PythFeed;
use crate::infrastructure::llm::openai_agent::{OpenAiAgentConfig, OpenAiToolAgent};
use crate::infrastructure::sqlite::migrations::run_migrations;
use crate::infrastructure::sqlite::vector_store::SqliteVectorStore;
use chrono::{Duration as ChronoDuration, Utc};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

pub struct TrendWatch {
    monitor: Arc<MonitorUseCase>,
    scheduler: Scheduler,
    default_schedule: String,
}

impl TrendWatch {
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let feed: Arc<dyn PriceFeed> = Arc::new(PythFeed::new(
            Some(config.feed_url.clone()),
            vec![(config.asset_id.clone(), config.asset_symbol.clone())],
        ));

        let embedder: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
            EmbeddingBackend::OpenAi => Arc::new(OpenAiProvider::new(
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_base_url.clone(),
            )),
            EmbeddingBackend::Noop => Arc::new(NoopProvider),
        };

        let narrator: Option<Arc<dyn NarrativeAgent>> = config.llm.as_ref().map(|llm| {
            Arc::new(OpenAiToolAgent::new(OpenAiAgentConfig::new(
                llm.api_key.clone(),
                llm.model.clone(),
                llm.base_url.clone(),
            ))) as Arc<dyn NarrativeAgent>
        });

        let conn = Connection::open(&config.db_path)
            .map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
        run_migrations(&conn)?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(conn));

        let provider_dim = embedder.dimension();
        if provider_dim > 0 {
            if let Ok(Some(stored_dim)) = store.stored_dimension() {
                if stored_dim != provider_dim {
                    warn!(
                        stored_dim,
                        provider_dim,
                        "stored vectors use a different dimension than the embedding provider; they will not match until re-recorded"
                    );
                }
            }
        }

        Ok(Self::with_providers(feed, embedder, store, narrator, config.monitor_settings())
            .with_default_schedule(config.schedule.clone()))
    }

    pub fn with_providers(
        feed: Arc<dyn PriceFeed>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        narrator: Option<Arc<dyn NarrativeAgent>>,
        settings: MonitorSettings,
    ) -> Self {
        let monitor = Arc::new(MonitorUseCase::new(feed, embedder, store, narrator, settings));
        Self {
            scheduler: Scheduler::new(monitor.clone()),
            monitor,
            default_schedule: crate::domain::values::schedule::DEFAULT_SCHEDULE.to_string(),
        }
    }

    /// Interval used by [`TrendWatch::start`] when the request names none.
    pub fn with_default_schedule(mut self, schedule: String) -> Self {
        self.default_schedule = schedule;
        self
    }

    pub async fn run(&self, prefs: &UserPreferences) -> Result<MonitorReport, DomainError> {
        self.monitor.run(prefs).await
    }

    pub async fn trigger(&self, request: &TriggerRequest) -> Result<TriggerResponse, DomainError> {
        let prefs = request.preferences()?;
        let report = self.scheduler.trigger(&prefs).await?;
        Ok(TriggerResponse::from(&report))
    }

    pub async fn start(&self, request: &StartRequest) -> Result<ScheduledJob, DomainError> {
        let prefs = request.preferences()?;
        self.scheduler
            .start(&request.interval_or(&self.default_schedule), prefs)
            .await
    }

    pub async fn stop(&self) -> Result<ScheduledJob, DomainError> {
        self.scheduler.stop().await
    }

    pub async fn status(&self) -> JobStatus {
        self.scheduler.status().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.scheduler.subscribe()
    }

    pub async fn record_latest(&self) -> Result<PriceObservation, DomainError> {
        self.monitor.recorder().record_latest().await
    }

    pub async fn backfill(&self, hours: u32, step_minutes: u32) -> Result<BackfillSummary, DomainError> {
        self.monitor
            .recorder()
            .backfill(
                Utc::now(),
                ChronoDuration::hours(hours as i64),
                ChronoDuration::minutes(step_minutes as i64),
            )
            .await
    }
}
