use crate::domain::values::confidence::ConfidenceLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// Multiples of the profit margin a projected profit must exceed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub deposit: f64,
    pub high_confidence: f64,
}

impl RiskTolerance {
    pub fn thresholds(&self) -> Thresholds {
        match self {
            RiskTolerance::High => Thresholds { deposit: 0.8, high_confidence: 1.0 },
            RiskTolerance::Medium => Thresholds { deposit: 1.0, high_confidence: 1.2 },
            RiskTolerance::Low => Thresholds { deposit: 1.2, high_confidence: 1.5 },
        }
    }

    /// Applies the threshold table. Both comparisons are strict.
    pub fn evaluate(&self, profit_pct: f64, profit_margin: f64) -> (bool, ConfidenceLevel) {
        let t = self.thresholds();
        let should_deposit = profit_pct > t.deposit * profit_margin;
        let confidence = if profit_pct > t.high_confidence * profit_margin {
            ConfidenceLevel::High
        } else {
            ConfidenceLevel::Medium
        };
        (should_deposit, confidence)
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTolerance::Low => write!(f, "low"),
            RiskTolerance::Medium => write!(f, "medium"),
            RiskTolerance::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskTolerance::Low),
            "medium" => Ok(RiskTolerance::Medium),
            "high" => Ok(RiskTolerance::High),
            _ => Err(format!(
                "Invalid risk tolerance: {s}. Expected low, medium or high"
            )),
        }
    }
}
