pub mod decision;
pub mod historical_pattern;
pub mod price_observation;
