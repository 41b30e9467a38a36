pub mod confidence;
pub mod preferences;
pub mod risk_tolerance;
pub mod schedule;
