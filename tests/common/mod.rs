//! Shared test helpers: in-memory stand-ins for the external ports.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trendwatch::application::monitor::MonitorSettings;
use trendwatch::domain::entities::decision::NarrativeAnalysis;
use trendwatch::domain::entities::historical_pattern::HistoricalPattern;
use trendwatch::domain::entities::price_observation::PriceObservation;
use trendwatch::domain::error::DomainError;
use trendwatch::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use trendwatch::domain::ports::narrative_agent::{NarrativeAgent, NarrativeRequest};
use trendwatch::domain::ports::price_feed::PriceFeed;
use trendwatch::domain::ports::vector_store::{ScoredObservation, VectorStore};
use trendwatch::TrendWatch;

pub const ASSET: &str = "0xabc123";
pub const SYMBOL: &str = "LSTBTC/USD";

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn observation(price: f64) -> PriceObservation {
    PriceObservation::new(ASSET, SYMBOL, price, 0.0005, ts(1_710_000_000))
}

pub fn pattern(price: f64, secs: i64) -> HistoricalPattern {
    HistoricalPattern::retrieved(price, 0.0005, ts(secs), 0.9)
}

pub fn settings() -> MonitorSettings {
    let mut s = MonitorSettings::new(ASSET);
    s.io_timeout = Duration::from_secs(5);
    s.narrative_timeout = Duration::from_millis(500);
    s
}

// ── Price feed ───────────────────────────────────────────────────────────

pub struct MockFeed {
    pub price: Mutex<f64>,
    /// Number of upcoming calls that fail.
    pub failures_left: AtomicUsize,
    pub delay: Duration,
    pub calls: AtomicUsize,
    /// Observations of other assets returned ahead of the tracked one.
    pub unrelated: Mutex<Vec<PriceObservation>>,
}

impl MockFeed {
    pub fn new(price: f64) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            unrelated: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_first(price: f64, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            failures_left: AtomicUsize::new(failures),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            unrelated: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(price: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            price: Mutex::new(price),
            failures_left: AtomicUsize::new(0),
            delay,
            calls: AtomicUsize::new(0),
            unrelated: Mutex::new(Vec::new()),
        })
    }

    pub fn set_price(&self, price: f64) {
        *self.price.lock().unwrap() = price;
    }

    pub fn push_unrelated(&self, id: &str, price: f64) {
        self.unrelated
            .lock()
            .unwrap()
            .push(PriceObservation::new(id, "OTHER/USD", price, 0.01, ts(1_700_000_000)));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn observe(&self, at: DateTime<Utc>) -> Result<Vec<PriceObservation>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DomainError::Fetch("oracle unreachable".into()));
        }
        let price = *self.price.lock().unwrap();
        let mut observations = self.unrelated.lock().unwrap().clone();
        observations.push(PriceObservation::new(ASSET, SYMBOL, price, 0.0005, at));
        Ok(observations)
    }
}

#[async_trait]
impl PriceFeed for MockFeed {
    fn name(&self) -> &str {
        "mock_feed"
    }

    async fn fetch_latest(&self, _asset_ids: &[String]) -> Result<Vec<PriceObservation>, DomainError> {
        let now = ts(Utc::now().timestamp());
        self.observe(now).await
    }

    async fn fetch_at_time(
        &self,
        _asset_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, DomainError> {
        self.observe(timestamp).await
    }
}

// ── Embeddings ───────────────────────────────────────────────────────────

/// Deterministic 8-dimensional embedding built from byte statistics.
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Vec<f32>>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![1.0_f32; 8];
                for (i, b) in t.bytes().enumerate() {
                    v[i % 8] += b as f32 / 255.0;
                }
                v
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        8
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledEmbedder;

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, texts: &[String], _input_type: InputType) -> Result<Vec<Vec<f32>>, DomainError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(texts.iter().map(|_| vec![1.0; 8]).collect())
    }

    fn dimension(&self) -> usize {
        8
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _texts: &[String], _input_type: InputType) -> Result<Vec<Vec<f32>>, DomainError> {
        Err(DomainError::Embedding("provider down".into()))
    }

    fn dimension(&self) -> usize {
        8
    }
}

// ── Vector store ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<(PriceObservation, Vec<f32>)>>,
    /// When set, returned verbatim from every search.
    pub canned: Mutex<Option<Vec<ScoredObservation>>>,
    pub fail_search: bool,
    pub search_delay: Duration,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_search: true,
            ..Self::default()
        })
    }

    pub fn stalled(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            search_delay: delay,
            ..Self::default()
        })
    }

    pub fn with_results(results: Vec<ScoredObservation>) -> Arc<Self> {
        let store = Self::default();
        *store.canned.lock().unwrap() = Some(results);
        Arc::new(store)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, observation: &PriceObservation, vector: &[f32]) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|(o, _)| o.record_id() != observation.record_id());
        rows.push((observation.clone(), vector.to_vec()));
        Ok(())
    }

    async fn search_similar(
        &self,
        asset_id: &str,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredObservation>, DomainError> {
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        if self.fail_search {
            return Err(DomainError::PatternStore("index unavailable".into()));
        }
        if let Some(canned) = self.canned.lock().unwrap().clone() {
            return Ok(canned);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o.id == asset_id)
            .take(limit)
            .map(|(o, _)| ScoredObservation {
                observation: o.clone(),
                score: 0.99,
            })
            .collect())
    }

    fn stored_dimension(&self) -> Result<Option<usize>, DomainError> {
        Ok(self.rows.lock().unwrap().first().map(|(_, v)| v.len()))
    }
}

// ── Narrative agents ─────────────────────────────────────────────────────

pub struct FixedNarrator {
    pub recommendation: Option<bool>,
}

#[async_trait]
impl NarrativeAgent for FixedNarrator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn narrate(&self, request: &NarrativeRequest) -> Result<NarrativeAnalysis, DomainError> {
        Ok(NarrativeAnalysis {
            explanation: format!("Narrative for {:.4}", request.decision.current_price),
            narrative_recommendation: self.recommendation,
            source: trendwatch::domain::entities::decision::RecommendationSource::Structured,
            model: "test-model".into(),
        })
    }
}

pub struct StalledNarrator;

#[async_trait]
impl NarrativeAgent for StalledNarrator {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn narrate(&self, _request: &NarrativeRequest) -> Result<NarrativeAnalysis, DomainError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(DomainError::Narrative("unreachable".into()))
    }
}

// ── Facade ───────────────────────────────────────────────────────────────

pub fn setup(feed: Arc<MockFeed>, store: Arc<MemoryStore>) -> TrendWatch {
    TrendWatch::with_providers(feed, HashEmbedder::new(), store, None, settings())
}
