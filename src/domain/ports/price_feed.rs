use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of oracle price observations.
///
/// Implementations must surface transport and payload problems as
/// [`DomainError::Fetch`] and must not retry on their own.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Feed name for logging.
    fn name(&self) -> &str;

    /// Latest observation for each requested asset.
    async fn fetch_latest(&self, asset_ids: &[String]) -> Result<Vec<PriceObservation>, DomainError>;

    /// Observations published at (or closest after) `timestamp`.
    async fn fetch_at_time(
        &self,
        asset_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, DomainError>;
}
