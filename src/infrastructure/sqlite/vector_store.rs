use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::vector_store::{ScoredObservation, VectorStore};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// Brute-force cosine store over sqlite. Every query scans all rows of the
/// asset, which is fine for the few thousand observations it accumulates.
///
/// Reads and writes run on the blocking pool so a caller's timeout fires even
/// while the connection is busy.
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Arc::new(Mutex::new(conn)) }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let mut dot = 0.0_f64;
        let mut norm_a = 0.0_f64;
        let mut norm_b = 0.0_f64;
        for (x, y) in a.iter().zip(b.iter()) {
            let x = *x as f64;
            let y = *y as f64;
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom == 0.0 { 0.0 } else { dot / denom }
    }

    fn serialize_vector(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_vector(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, DomainError> {
        conn.lock().map_err(|e| DomainError::PatternStore(e.to_string()))
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DomainError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = Self::lock(&conn)?;
            work(&guard)
        })
        .await
        .map_err(|e| DomainError::PatternStore(format!("store task failed: {e}")))?
    }

    fn scan(
        conn: &Connection,
        asset_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredObservation>, DomainError> {
        let mut stmt = conn.prepare(
            "SELECT asset_id, symbol, price, confidence, publish_time, vector
             FROM observations WHERE dimension = ?1 AND asset_id = ?2",
        ).map_err(|e| DomainError::PatternStore(e.to_string()))?;

        let mut results: Vec<ScoredObservation> = stmt.query_map(params![vector.len() as i64, asset_id], |row| {
            let asset_id: String = row.get(0)?;
            let symbol: String = row.get(1)?;
            let price: f64 = row.get(2)?;
            let confidence: f64 = row.get(3)?;
            let publish_time: i64 = row.get(4)?;
            let blob: Vec<u8> = row.get(5)?;
            Ok((asset_id, symbol, price, confidence, publish_time, blob))
        }).map_err(|e| DomainError::PatternStore(e.to_string()))?
        .filter_map(|r| r.ok())
        .filter_map(|(asset_id, symbol, price, confidence, publish_time, blob)| {
            let published = Utc.timestamp_opt(publish_time, 0).single()?;
            let stored = Self::deserialize_vector(&blob);
            let score = Self::cosine_similarity(vector, &stored);
            Some(ScoredObservation {
                observation: PriceObservation::new(asset_id, symbol, price, confidence, published),
                score,
            })
        })
        .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, observation: &PriceObservation, vector: &[f32]) -> Result<(), DomainError> {
        if vector.is_empty() {
            return Err(DomainError::PatternStore("refusing to store an empty vector".into()));
        }
        let observation = observation.clone();
        let blob = Self::serialize_vector(vector);
        let dimension = vector.len() as i64;
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO observations
                    (id, asset_id, symbol, price, confidence, publish_time, dimension, vector, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    observation.record_id(),
                    observation.id,
                    observation.symbol,
                    observation.price,
                    observation.confidence,
                    observation.publish_time.timestamp(),
                    dimension,
                    blob,
                    Utc::now().to_rfc3339(),
                ],
            ).map_err(|e| DomainError::PatternStore(format!("Failed to store vector: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn search_similar(
        &self,
        asset_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredObservation>, DomainError> {
        if vector.is_empty() || limit == 0 {
            return Ok(vec![]);
        }
        let asset_id = asset_id.to_string();
        let vector = vector.to_vec();
        self.blocking(move |conn| Self::scan(conn, &asset_id, &vector, limit)).await
    }

    fn stored_dimension(&self) -> Result<Option<usize>, DomainError> {
        let conn = Self::lock(&self.conn)?;
        let dim: Option<i64> = conn.query_row(
            "SELECT dimension FROM observations ORDER BY publish_time DESC LIMIT 1",
            [],
            |r| r.get(0),
        ).optional().map_err(|e| DomainError::PatternStore(e.to_string()))?;
        Ok(dim.map(|d| d as usize))
    }
}
