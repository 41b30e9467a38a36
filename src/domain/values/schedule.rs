use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SCHEDULE: &str = "*/2 * * * *";

/// A parsed cron expression. Accepts the classic five-field form (minute
/// resolution) as well as the six/seven-field form with a leading seconds
/// field.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, DomainError> {
        let expression = expression.trim();
        let fields = expression.split_whitespace().count();
        let normalized = match fields {
            5 => format!("0 {expression}"),
            6 | 7 => expression.to_string(),
            _ => {
                return Err(DomainError::Validation(format!(
                    "Invalid cron expression '{expression}': expected 5 to 7 fields, got {fields}"
                )))
            }
        };
        let schedule = Schedule::from_str(&normalized).map_err(|e| {
            DomainError::Validation(format!("Invalid cron expression '{expression}': {e}"))
        })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}
