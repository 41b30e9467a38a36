//! Request and response shapes for the trigger/start/stop surface. An HTTP
//! layer can deserialize straight into these and map failures through
//! [`DomainError::status_code`].

use crate::domain::entities::decision::{MonitorReport, NarrativeAnalysis};
use crate::domain::entities::historical_pattern::HistoricalPattern;
use crate::domain::error::DomainError;
use crate::domain::values::preferences::UserPreferences;
use crate::domain::values::schedule::DEFAULT_SCHEDULE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    pub monitoring_period: Option<String>,
    pub profit_margin: Option<f64>,
    pub risk_tolerance: Option<String>,
}

impl TriggerRequest {
    pub fn preferences(&self) -> Result<UserPreferences, DomainError> {
        UserPreferences::from_raw(
            self.monitoring_period.clone(),
            self.profit_margin,
            self.risk_tolerance.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub interval: Option<String>,
    pub monitoring_period: Option<String>,
    pub profit_margin: Option<f64>,
    pub risk_tolerance: Option<String>,
}

impl StartRequest {
    pub fn interval_or(&self, default: &str) -> String {
        self.interval.clone().unwrap_or_else(|| default.to_string())
    }

    pub fn interval(&self) -> String {
        self.interval_or(DEFAULT_SCHEDULE)
    }

    pub fn preferences(&self) -> Result<UserPreferences, DomainError> {
        UserPreferences::from_raw(
            self.monitoring_period.clone(),
            self.profit_margin,
            self.risk_tolerance.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerData {
    pub current_price: f64,
    pub similar_patterns: Vec<HistoricalPattern>,
    pub patterns_synthesized: bool,
    pub analysis: String,
    /// Always the deterministic decision; the narrative agent's opinion is
    /// reported separately.
    pub should_deposit_lst_btc: bool,
    pub confidence: String,
    pub narrative: Option<NarrativeAnalysis>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    pub data: TriggerData,
    pub user_preferences: UserPreferences,
}

impl From<&MonitorReport> for TriggerResponse {
    fn from(report: &MonitorReport) -> Self {
        Self {
            success: true,
            data: TriggerData {
                current_price: report.decision.current_price,
                similar_patterns: report.similar_patterns.patterns.clone(),
                patterns_synthesized: report.similar_patterns.synthesized,
                analysis: report.analysis_text().to_string(),
                should_deposit_lst_btc: report.decision.should_deposit,
                confidence: report.decision.confidence.to_string(),
                narrative: report.narrative.clone(),
                degraded: report.degraded,
            },
            user_preferences: report.preferences.clone(),
        }
    }
}

/// Body returned alongside a non-2xx status.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub status: u16,
    pub error: String,
}

impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        Self {
            success: false,
            status: err.status_code(),
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::risk_tolerance::RiskTolerance;

    #[test]
    fn test_trigger_request_defaults() {
        let req: TriggerRequest = serde_json::from_str("{}").unwrap();
        let prefs = req.preferences().unwrap();
        assert_eq!(prefs, UserPreferences::default());
    }

    #[test]
    fn test_trigger_request_camel_case() {
        let req: TriggerRequest = serde_json::from_str(
            r#"{"monitoringPeriod":"1 week","profitMargin":2.5,"riskTolerance":"high"}"#,
        )
        .unwrap();
        let prefs = req.preferences().unwrap();
        assert_eq!(prefs.monitoring_period, "1 week");
        assert_eq!(prefs.profit_margin, 2.5);
        assert_eq!(prefs.risk_tolerance, RiskTolerance::High);
    }

    #[test]
    fn test_invalid_risk_maps_to_bad_request() {
        let req: TriggerRequest = serde_json::from_str(r#"{"riskTolerance":"extreme"}"#).unwrap();
        let err = req.preferences().unwrap_err();
        assert_eq!(ErrorResponse::from(&err).status, 400);
    }

    #[test]
    fn test_start_request_default_interval() {
        let req: StartRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.interval(), "*/2 * * * *");
        assert_eq!(req.interval_or("*/5 * * * *"), "*/5 * * * *");
        let req: StartRequest = serde_json::from_str(r#"{"interval":"0 * * * *"}"#).unwrap();
        assert_eq!(req.interval(), "0 * * * *");
    }
}
