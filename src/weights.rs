use crate::error::ScoringError;
use crate::models::WeightConfig;

/// Rescales the three weights so they sum to 1 while keeping their proportions.
pub fn normalize_weights(weights: &WeightConfig) -> Result<WeightConfig, ScoringError> {
    let parts = [
        ("due_date", weights.due_date),
        ("grade_weight", weights.grade_weight),
        ("impact", weights.impact),
    ];

    for (name, value) in parts {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoringError::InvalidConfiguration(format!(
                "weight {name} must be a non-negative number, got {value}"
            )));
        }
    }

    let total = weights.due_date + weights.grade_weight + weights.impact;
    if total <= 0.0 {
        return Err(ScoringError::InvalidConfiguration(
            "at least one weight must be positive".to_string(),
        ));
    }

    Ok(WeightConfig {
        due_date: weights.due_date / total,
        grade_weight: weights.grade_weight / total,
        impact: weights.impact / total,
    })
}
