//! Trend statistics and the risk-scaled deposit rule.
//!
//! [`analyze`] is pure: identical inputs always yield an identical
//! [`DecisionResult`], including the reasoning text.

use crate::domain::entities::decision::DecisionResult;
use crate::domain::entities::historical_pattern::HistoricalPattern;
use crate::domain::entities::price_observation::PriceObservation;
use crate::domain::error::DomainError;
use crate::domain::values::preferences::UserPreferences;

/// Computes the decision for `current` against `patterns`.
///
/// Errors only on inputs that would make the statistics undefined: an empty
/// pattern set, or a non-positive current or average price.
pub fn analyze(
    current: &PriceObservation,
    patterns: &[HistoricalPattern],
    prefs: &UserPreferences,
) -> Result<DecisionResult, DomainError> {
    prefs.validate()?;
    if patterns.is_empty() {
        return Err(DomainError::Validation(
            "Cannot analyze trend without historical patterns".into(),
        ));
    }
    if !(current.price.is_finite() && current.price > 0.0) {
        return Err(DomainError::Validation(format!(
            "Current price must be positive, got {}",
            current.price
        )));
    }

    let mut ordered: Vec<&HistoricalPattern> = patterns.iter().collect();
    ordered.sort_by_key(|p| p.publish_time);

    let avg_historical_price =
        ordered.iter().map(|p| p.price).sum::<f64>() / ordered.len() as f64;
    if !(avg_historical_price.is_finite() && avg_historical_price > 0.0) {
        return Err(DomainError::Validation(format!(
            "Average historical price must be positive, got {avg_historical_price}"
        )));
    }

    let current_price = current.price;
    let trend_pct = (current_price - avg_historical_price) / avg_historical_price * 100.0;
    let predicted_price = current_price * (1.0 + trend_pct / 100.0);
    let profit_pct = (predicted_price - current_price) / current_price * 100.0;

    let (should_deposit, confidence) = prefs
        .risk_tolerance
        .evaluate(profit_pct, prefs.profit_margin);

    let reasoning = reasoning(
        trend_pct,
        avg_historical_price,
        predicted_price,
        profit_pct,
        should_deposit,
        prefs,
    );

    Ok(DecisionResult {
        current_price,
        avg_historical_price,
        trend_pct,
        predicted_price,
        profit_pct,
        should_deposit,
        confidence,
        reasoning,
    })
}

fn reasoning(
    trend_pct: f64,
    avg_historical_price: f64,
    predicted_price: f64,
    profit_pct: f64,
    should_deposit: bool,
    prefs: &UserPreferences,
) -> String {
    let direction = if trend_pct > 0.0 {
        "upward"
    } else if trend_pct < 0.0 {
        "downward"
    } else {
        "flat"
    };
    let outcome = if profit_pct >= 0.0 { "profit" } else { "loss" };
    let threshold = prefs.risk_tolerance.thresholds().deposit * prefs.profit_margin;
    let verdict = if should_deposit {
        "exceeds"
    } else {
        "does not exceed"
    };

    format!(
        "Price trend is {direction} by {:.2}% against a historical average of {avg_historical_price:.4}. \
         Predicted next-period price is {predicted_price:.4}, a potential {outcome} of {:.2}%, which {verdict} \
         the {threshold:.2}% deposit threshold for {} risk tolerance.",
        trend_pct.abs(),
        profit_pct.abs(),
        prefs.risk_tolerance,
    )
}
