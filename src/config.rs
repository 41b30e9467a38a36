use crate::application::monitor::MonitorSettings;
use crate::application::patterns::{DEFAULT_FALLBACK_PERIOD_HOURS, MAX_FALLBACK_PERIOD_HOURS};
use crate::domain::error::DomainError;
use crate::domain::values::schedule::{CronSchedule, DEFAULT_SCHEDULE};
use crate::infrastructure::feeds::pyth::DEFAULT_HERMES_URL;
use std::str::FromStr;
use std::time::Duration;

/// Pyth BTC/USD price feed.
pub const DEFAULT_ASSET_ID: &str = "0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43";
pub const DEFAULT_ASSET_SYMBOL: &str = "BTC/USD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Noop,
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub feed_url: String,
    pub asset_id: String,
    pub asset_symbol: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_api_key: String,
    pub embedding_model: Option<String>,
    pub embedding_base_url: Option<String>,
    /// `None` disables the narrative agent.
    pub llm: Option<LlmConfig>,
    pub schedule: String,
    pub top_k: usize,
    pub io_timeout: Duration,
    pub narrative_timeout: Duration,
    pub fallback_period: chrono::Duration,
    pub record_observations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let embedding_backend = match get("TRENDWATCH_EMBEDDING_PROVIDER").as_deref() {
            None | Some("noop") => EmbeddingBackend::Noop,
            Some("openai") => EmbeddingBackend::OpenAi,
            Some(other) => {
                return Err(DomainError::Validation(format!(
                    "Unknown embedding provider: {other}"
                )))
            }
        };

        let llm = get("TRENDWATCH_LLM_API_KEY").map(|api_key| LlmConfig {
            api_key,
            model: get("TRENDWATCH_LLM_MODEL"),
            base_url: get("TRENDWATCH_LLM_BASE_URL"),
        });

        let schedule = get("TRENDWATCH_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
        CronSchedule::parse(&schedule)?;

        let top_k: usize = parse_or(&get, "TRENDWATCH_TOP_K", 5)?;
        if top_k == 0 {
            return Err(DomainError::Validation("TRENDWATCH_TOP_K must be at least 1".into()));
        }

        let fallback_hours: i64 = parse_or(
            &get,
            "TRENDWATCH_FALLBACK_PERIOD_HOURS",
            DEFAULT_FALLBACK_PERIOD_HOURS,
        )?;
        if !(1..=MAX_FALLBACK_PERIOD_HOURS).contains(&fallback_hours) {
            return Err(DomainError::Validation(format!(
                "TRENDWATCH_FALLBACK_PERIOD_HOURS must be between 1 and {MAX_FALLBACK_PERIOD_HOURS}, got {fallback_hours}"
            )));
        }

        Ok(Self {
            db_path: get("TRENDWATCH_DB").unwrap_or_else(|| "./trendwatch.db".into()),
            feed_url: get("TRENDWATCH_FEED_URL").unwrap_or_else(|| DEFAULT_HERMES_URL.into()),
            asset_id: get("TRENDWATCH_ASSET_ID").unwrap_or_else(|| DEFAULT_ASSET_ID.into()),
            asset_symbol: get("TRENDWATCH_ASSET_SYMBOL").unwrap_or_else(|| DEFAULT_ASSET_SYMBOL.into()),
            embedding_backend,
            embedding_api_key: get("TRENDWATCH_EMBEDDING_API_KEY").unwrap_or_default(),
            embedding_model: get("TRENDWATCH_EMBEDDING_MODEL"),
            embedding_base_url: get("TRENDWATCH_EMBEDDING_BASE_URL"),
            llm,
            schedule,
            top_k,
            io_timeout: Duration::from_secs(parse_or(&get, "TRENDWATCH_IO_TIMEOUT_SECS", 15)?),
            narrative_timeout: Duration::from_secs(parse_or(
                &get,
                "TRENDWATCH_NARRATIVE_TIMEOUT_SECS",
                45,
            )?),
            fallback_period: chrono::Duration::hours(fallback_hours),
            record_observations: parse_or(&get, "TRENDWATCH_RECORD_OBSERVATIONS", true)?,
        })
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            asset_id: self.asset_id.clone(),
            top_k: self.top_k,
            io_timeout: self.io_timeout,
            narrative_timeout: self.narrative_timeout,
            fallback_period: self.fallback_period,
            record_observations: self.record_observations,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| DomainError::Validation(format!("{key}={raw}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, DomainError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, "./trendwatch.db");
        assert_eq!(cfg.schedule, "*/2 * * * *");
        assert_eq!(cfg.top_k, 5);
        assert_eq!(cfg.embedding_backend, EmbeddingBackend::Noop);
        assert!(cfg.llm.is_none());
        assert!(cfg.record_observations);
        assert_eq!(cfg.io_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("TRENDWATCH_EMBEDDING_PROVIDER", "openai"),
            ("TRENDWATCH_LLM_API_KEY", "sk-test"),
            ("TRENDWATCH_TOP_K", "8"),
            ("TRENDWATCH_RECORD_OBSERVATIONS", "false"),
            ("TRENDWATCH_SCHEDULE", "*/5 * * * *"),
        ])
        .unwrap();
        assert_eq!(cfg.embedding_backend, EmbeddingBackend::OpenAi);
        assert_eq!(cfg.llm.as_ref().unwrap().api_key, "sk-test");
        assert_eq!(cfg.top_k, 8);
        assert!(!cfg.record_observations);
        assert_eq!(cfg.monitor_settings().top_k, 8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config(&[("TRENDWATCH_TOP_K", "many")]).is_err());
        assert!(config(&[("TRENDWATCH_TOP_K", "0")]).is_err());
        assert!(config(&[("TRENDWATCH_SCHEDULE", "whenever")]).is_err());
        assert!(config(&[("TRENDWATCH_EMBEDDING_PROVIDER", "voyage")]).is_err());
    }

    #[test]
    fn test_fallback_period_bounds() {
        assert_eq!(config(&[]).unwrap().fallback_period, chrono::Duration::hours(24));
        assert_eq!(
            config(&[("TRENDWATCH_FALLBACK_PERIOD_HOURS", "6")]).unwrap().fallback_period,
            chrono::Duration::hours(6)
        );
        for raw in ["-24", "0", "8785", "1000000000", "9000000000000"] {
            let err = config(&[("TRENDWATCH_FALLBACK_PERIOD_HOURS", raw)]).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{raw}");
        }
    }
}
