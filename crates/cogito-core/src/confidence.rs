//! Confidence scoring helpers shared by the engine and the reasoning chain.

/// Clamp a score into `[0.0, 1.0]`, mapping NaN to `0.0`.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Aggregate a set of confidences into one score.
///
/// Each value is weighted by itself, so confident contributors dominate
/// weak ones: `sum(c^2) / sum(c)`. Returns `0.0` for an empty slice or
/// when every value is zero. Inputs are clamped first, so the result is
/// always in `[0.0, 1.0]`.
pub fn aggregate_confidence(values: &[f64]) -> f64 {
    let clamped: Vec<f64> = values.iter().copied().map(clamp_confidence).collect();
    let total: f64 = clamped.iter().sum();
    if total <= f64::EPSILON {
        return 0.0;
    }
    let weighted: f64 = clamped.iter().map(|c| c * c).sum();
    clamp_confidence(weighted / total)
}

/// Average where the value at index `i` has weight `1 / (i + 1)`.
///
/// Earlier entries count more. Returns `0.0` for an empty slice.
pub fn position_weighted_confidence(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut weighted = 0.0;
    let mut weights = 0.0;
    for (i, value) in values.iter().enumerate() {
        let w = 1.0 / (i as f64 + 1.0);
        weighted += clamp_confidence(*value) * w;
        weights += w;
    }
    clamp_confidence(weighted / weights)
}
