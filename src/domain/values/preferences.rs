use crate::domain::error::DomainError;
use crate::domain::values::risk_tolerance::RiskTolerance;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MONITORING_PERIOD: &str = "1 month";
pub const DEFAULT_PROFIT_MARGIN: f64 = 1.0;

/// Caller-supplied settings for a monitoring run. Construct through
/// [`UserPreferences::new`] so the margin invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub monitoring_period: String,
    pub profit_margin: f64,
    pub risk_tolerance: RiskTolerance,
}

impl UserPreferences {
    pub fn new(
        monitoring_period: impl Into<String>,
        profit_margin: f64,
        risk_tolerance: RiskTolerance,
    ) -> Result<Self, DomainError> {
        let prefs = Self {
            monitoring_period: monitoring_period.into(),
            profit_margin,
            risk_tolerance,
        };
        prefs.validate()?;
        Ok(prefs)
    }

    /// Builds preferences from optional raw request fields, applying defaults
    /// for missing ones. A present but unknown risk tolerance is rejected.
    pub fn from_raw(
        monitoring_period: Option<String>,
        profit_margin: Option<f64>,
        risk_tolerance: Option<&str>,
    ) -> Result<Self, DomainError> {
        let risk = match risk_tolerance {
            Some(raw) => raw.parse::<RiskTolerance>().map_err(DomainError::Validation)?,
            None => RiskTolerance::Medium,
        };
        Self::new(
            monitoring_period.unwrap_or_else(|| DEFAULT_MONITORING_PERIOD.to_string()),
            profit_margin.unwrap_or(DEFAULT_PROFIT_MARGIN),
            risk,
        )
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.profit_margin.is_finite() || self.profit_margin <= 0.0 {
            return Err(DomainError::Validation(format!(
                "Profit margin must be a positive number, got {}",
                self.profit_margin
            )));
        }
        if self.monitoring_period.trim().is_empty() {
            return Err(DomainError::Validation(
                "Monitoring period must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            monitoring_period: DEFAULT_MONITORING_PERIOD.to_string(),
            profit_margin: DEFAULT_PROFIT_MARGIN,
            risk_tolerance: RiskTolerance::Medium,
        }
    }
}
