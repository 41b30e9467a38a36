use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single normalized oracle reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    /// Oracle feed identifier the reading came from.
    pub id: String,
    pub price: f64,
    pub confidence: f64,
    pub publish_time: DateTime<Utc>,
    pub symbol: String,
}

impl PriceObservation {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
        confidence: f64,
        publish_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            price,
            confidence,
            publish_time,
            symbol: symbol.into(),
        }
    }

    /// Converts a fixed-point oracle value: `mantissa * 10^exponent`.
    pub fn scale(mantissa: i64, exponent: i32) -> f64 {
        mantissa as f64 * 10f64.powi(exponent)
    }

    /// Stable key for storing this observation in a vector index.
    pub fn record_id(&self) -> String {
        format!("{}:{}", self.id, self.publish_time.timestamp())
    }

    /// Canonical text used for embedding. Field order, precision and the
    /// timestamp format are fixed so identical observations always render
    /// identical bytes.
    pub fn canonical_description(&self) -> String {
        format!(
            "Asset {} price {:.8} confidence {:.8} at {}",
            self.symbol,
            self.price,
            self.confidence,
            self.publish_time.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scale() {
        assert!((PriceObservation::scale(6_140_993_501, -8) - 61.40993501).abs() < 1e-9);
        assert_eq!(PriceObservation::scale(5, 2), 500.0);
        assert_eq!(PriceObservation::scale(0, -8), 0.0);
    }

    #[test]
    fn test_canonical_description_is_stable() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 5).unwrap();
        let obs = PriceObservation::new("abc", "BTC/USD", 1.002, 0.0005, ts);
        assert_eq!(
            obs.canonical_description(),
            "Asset BTC/USD price 1.00200000 confidence 0.00050000 at 2024-03-09T12:00:05Z"
        );
        assert_eq!(obs.canonical_description(), obs.clone().canonical_description());
    }

    #[test]
    fn test_record_id() {
        let ts = Utc.timestamp_opt(1_710_000_000, 0).unwrap();
        let obs = PriceObservation::new("feed", "X", 1.0, 0.0, ts);
        assert_eq!(obs.record_id(), "feed:1710000000");
    }
}
