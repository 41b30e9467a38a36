use super::FeedError;
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::ports::price_feed::PriceFeed;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_HERMES_URL: &str = "https://hermes.pyth.network";

/// Pyth Hermes price service client (no auth required).
pub struct PythFeed {
    base_url: String,
    /// Normalized feed id → display symbol.
    symbols: HashMap<String, String>,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct HermesResponse {
    #[serde(default)]
    parsed: Option<Vec<ParsedUpdate>>,
}

#[derive(Debug, serde::Deserialize)]
struct ParsedUpdate {
    id: String,
    price: HermesPrice,
}

#[derive(Debug, serde::Deserialize)]
struct HermesPrice {
    /// Fixed-point mantissa, sent as a decimal string.
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

impl PythFeed {
    /// `assets` pairs each feed id with the symbol used in descriptions.
    pub fn new(base_url: Option<String>, assets: Vec<(String, String)>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_HERMES_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            symbols: assets
                .into_iter()
                .map(|(id, symbol)| (normalize_id(&id), symbol))
                .collect(),
            client: reqwest::Client::builder()
                .user_agent(concat!("trendwatch/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get(&self, url: &str, asset_ids: &[String]) -> Result<Vec<PriceObservation>, FeedError> {
        let mut query: Vec<(&str, &str)> = asset_ids.iter().map(|id| ("ids[]", id.as_str())).collect();
        query.push(("parsed", "true"));

        let resp = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Network(format!("Hermes returned {status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;
        let observations = parse_updates(&body, asset_ids, &self.symbols)?;
        debug!(url, count = observations.len(), "hermes update decoded");
        Ok(observations)
    }
}

#[async_trait]
impl PriceFeed for PythFeed {
    fn name(&self) -> &str {
        "pyth_hermes"
    }

    async fn fetch_latest(&self, asset_ids: &[String]) -> Result<Vec<PriceObservation>, DomainError> {
        if asset_ids.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/v2/updates/price/latest", self.base_url);
        Ok(self.get(&url, asset_ids).await?)
    }

    async fn fetch_at_time(
        &self,
        asset_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, DomainError> {
        let url = format!("{}/v2/updates/price/{}", self.base_url, timestamp.timestamp());
        Ok(self.get(&url, &[asset_id.to_string()]).await?)
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().trim_start_matches("0x").to_ascii_lowercase()
}

/// Decodes a Hermes `parsed` payload. Observation ids echo the caller's
/// spelling of the feed id so they compare equal to the configured asset.
fn parse_updates(
    body: &str,
    requested: &[String],
    symbols: &HashMap<String, String>,
) -> Result<Vec<PriceObservation>, FeedError> {
    let response: HermesResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Parse(e.to_string()))?;
    let updates = response
        .parsed
        .ok_or_else(|| FeedError::Parse("response has no parsed price updates".into()))?;

    updates
        .into_iter()
        .map(|update| {
            let key = normalize_id(&update.id);
            let id = requested
                .iter()
                .find(|r| normalize_id(r) == key)
                .cloned()
                .unwrap_or_else(|| update.id.clone());
            let symbol = symbols.get(&key).cloned().unwrap_or_else(|| key.clone());

            let mantissa: i64 = update
                .price
                .price
                .parse()
                .map_err(|e| FeedError::Parse(format!("bad price mantissa for {key}: {e}")))?;
            let conf: i64 = update
                .price
                .conf
                .parse()
                .map_err(|e| FeedError::Parse(format!("bad confidence for {key}: {e}")))?;
            let publish_time = Utc
                .timestamp_opt(update.price.publish_time, 0)
                .single()
                .ok_or_else(|| {
                    FeedError::Parse(format!("bad publish time {}", update.price.publish_time))
                })?;

            Ok(PriceObservation::new(
                id,
                symbol,
                PriceObservation::scale(mantissa, update.price.expo),
                PriceObservation::scale(conf, update.price.expo),
                publish_time,
            ))
        })
        .collect()
}
