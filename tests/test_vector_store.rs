mod common;

use chrono::Duration as ChronoDuration;
use common::{ts, ASSET, SYMBOL};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;
use trendwatch::application::decision::analyze;
use trendwatch::application::patterns::PatternMatcher;
use trendwatch::domain::entities::price_observation::PriceObservation;
use trendwatch::domain::error::DomainError;
use trendwatch::domain::ports::vector_store::VectorStore;
use trendwatch::domain::values::preferences::UserPreferences;
use trendwatch::infrastructure::sqlite::migrations::run_migrations;
use trendwatch::infrastructure::sqlite::vector_store::SqliteVectorStore;

fn memory_store() -> SqliteVectorStore {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    SqliteVectorStore::new(conn)
}

fn obs(price: f64, secs: i64) -> PriceObservation {
    PriceObservation::new(ASSET, SYMBOL, price, 0.001, ts(secs))
}

#[tokio::test]
async fn test_search_ranks_by_cosine_similarity() {
    let store = memory_store();
    store.upsert(&obs(1.0, 100), &[1.0, 0.0, 0.0]).await.unwrap();
    store.upsert(&obs(2.0, 200), &[0.7, 0.7, 0.0]).await.unwrap();
    store.upsert(&obs(3.0, 300), &[0.0, 0.0, 1.0]).await.unwrap();

    let results = store.search_similar(ASSET, &[1.0, 0.1, 0.0], 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].observation.price, 1.0);
    assert_eq!(results[1].observation.price, 2.0);
    assert!(results[0].score > results[1].score);
    assert_eq!(results[0].observation.publish_time, ts(100));
    assert_eq!(results[0].observation.symbol, SYMBOL);
}

#[tokio::test]
async fn test_upsert_replaces_same_observation() {
    let store = memory_store();
    store.upsert(&obs(1.0, 100), &[1.0, 0.0]).await.unwrap();
    store.upsert(&obs(1.0, 100), &[0.0, 1.0]).await.unwrap();

    let results = store.search_similar(ASSET, &[0.0, 1.0], 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_search_ignores_other_dimensions() {
    let store = memory_store();
    store.upsert(&obs(1.0, 100), &[1.0, 0.0]).await.unwrap();
    store.upsert(&obs(2.0, 200), &[1.0, 0.0, 0.0]).await.unwrap();

    let results = store.search_similar(ASSET, &[1.0, 0.0, 0.0], 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].observation.price, 2.0);
}

#[tokio::test]
async fn test_empty_query_returns_nothing() {
    let store = memory_store();
    store.upsert(&obs(1.0, 100), &[1.0, 0.0]).await.unwrap();

    assert!(store.search_similar(ASSET, &[], 5).await.unwrap().is_empty());
    assert!(store.search_similar(ASSET, &[1.0, 0.0], 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_vector_is_rejected() {
    let store = memory_store();
    let err = store.upsert(&obs(1.0, 100), &[]).await.unwrap_err();
    assert!(matches!(err, DomainError::PatternStore(_)));
    assert_eq!(store.stored_dimension().unwrap(), None);
}

#[tokio::test]
async fn test_stored_dimension_follows_latest_observation() {
    let store = memory_store();
    assert_eq!(store.stored_dimension().unwrap(), None);

    store.upsert(&obs(1.0, 100), &[1.0, 0.0]).await.unwrap();
    assert_eq!(store.stored_dimension().unwrap(), Some(2));

    store.upsert(&obs(1.0, 200), &[1.0, 0.0, 0.5, 0.5]).await.unwrap();
    assert_eq!(store.stored_dimension().unwrap(), Some(4));
}

#[tokio::test]
async fn test_observations_persist_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trendwatch.db");

    {
        let conn = Connection::open(&path).unwrap();
        run_migrations(&conn).unwrap();
        let store = SqliteVectorStore::new(conn);
        store.upsert(&obs(42.0, 100), &[0.5, 0.5]).await.unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    run_migrations(&conn).unwrap();
    let store = SqliteVectorStore::new(conn);
    let results = store.search_similar(ASSET, &[0.5, 0.5], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].observation.price, 42.0);
    assert_eq!(results[0].observation.id, ASSET);
}

const BTC: &str = "0xbtc";
const ETH: &str = "0xeth";

#[tokio::test]
async fn test_search_is_scoped_to_asset() {
    let store = memory_store();
    let btc = PriceObservation::new(BTC, "BTC/USD", 60_000.0, 10.0, ts(100));
    let eth = PriceObservation::new(ETH, "ETH/USD", 3_000.0, 1.0, ts(100));
    store.upsert(&btc, &[1.0, 0.0]).await.unwrap();
    store.upsert(&eth, &[0.0, 1.0]).await.unwrap();

    let results = store.search_similar(ETH, &[1.0, 0.0], 10).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].observation.id, ETH);
    assert_eq!(results[0].observation.price, 3_000.0);

    assert!(store.search_similar("0xsol", &[1.0, 0.0], 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_asset_history_does_not_feed_decision() {
    let store = Arc::new(memory_store());
    store
        .upsert(&PriceObservation::new(BTC, "BTC/USD", 60_000.0, 10.0, ts(100)), &[1.0, 0.0])
        .await
        .unwrap();

    let matcher = PatternMatcher::new(store, Duration::from_secs(1), ChronoDuration::hours(24));
    let current = PriceObservation::new(ETH, "ETH/USD", 3_000.0, 1.0, ts(200));
    let matches = matcher.find_similar(&current, &[1.0, 0.0], 5).await;

    assert!(matches.synthesized);
    assert!(matches.patterns.iter().all(|p| (p.price - 3_000.0).abs() < 10.0));
    let decision = analyze(&current, &matches.patterns, &UserPreferences::default()).unwrap();
    assert!(decision.trend_pct.abs() < 1.0);
}
