//! Heuristic validation of a partial reasoning chain.
//!
//! Four sub-scores are combined with the shared confidence aggregation:
//! consistency, completeness, relevance, and logical flow.

use std::collections::HashSet;

use cogito_core::aggregate_confidence;
use cogito_core::text::{keywords, tokenize};

use crate::types::{ReasoningStep, StepKind, ValidationScores};

/// Step categories a complete chain must contain before validation.
const REQUIRED_KINDS: [StepKind; 3] = [
    StepKind::InputAnalysis,
    StepKind::ContextIntegration,
    StepKind::ResponseAnalysis,
];

/// Relevance score used when the input has no content words to match.
const NEUTRAL_RELEVANCE: f64 = 0.5;

/// Score `steps` against the original `input`.
pub fn validate_steps(
    steps: &[ReasoningStep],
    input: &str,
    swing_threshold: f64,
) -> ValidationScores {
    let consistency = consistency(steps);
    let completeness = completeness(steps);
    let relevance = relevance(steps, input);
    let logical_flow = logical_flow(steps, swing_threshold);
    let overall = aggregate_confidence(&[consistency, completeness, relevance, logical_flow]);
    ValidationScores {
        consistency,
        completeness,
        relevance,
        logical_flow,
        overall,
    }
}

/// Fraction of adjacent step pairs where the later step consumes the
/// earlier step's output.
pub fn consistency(steps: &[ReasoningStep]) -> f64 {
    if steps.len() < 2 {
        return 1.0;
    }
    let pairs = steps.len() - 1;
    let consumed = steps
        .windows(2)
        .filter(|pair| consumes(&pair[1].input, &pair[0].output))
        .count();
    consumed as f64 / pairs as f64
}

/// Fraction of the required step categories present.
pub fn completeness(steps: &[ReasoningStep]) -> f64 {
    let present = REQUIRED_KINDS
        .iter()
        .filter(|kind| steps.iter().any(|s| s.kind == **kind))
        .count();
    present as f64 / REQUIRED_KINDS.len() as f64
}

/// Average share of the input's keywords mentioned by each step.
pub fn relevance(steps: &[ReasoningStep], input: &str) -> f64 {
    let input_keywords = keywords(input);
    if input_keywords.is_empty() || steps.is_empty() {
        return NEUTRAL_RELEVANCE;
    }
    let total: f64 = steps
        .iter()
        .map(|step| {
            let tokens = tokenize(&format!("{} {}", step.description, step.justification));
            let hits = input_keywords.iter().filter(|k| tokens.contains(*k)).count();
            hits as f64 / input_keywords.len() as f64
        })
        .sum();
    total / steps.len() as f64
}

/// Penalizes confidence swings larger than `swing_threshold` between
/// adjacent steps.
pub fn logical_flow(steps: &[ReasoningStep], swing_threshold: f64) -> f64 {
    if steps.len() < 2 {
        return 1.0;
    }
    let pairs = steps.len() - 1;
    let swings = steps
        .windows(2)
        .filter(|pair| (pair[1].confidence - pair[0].confidence).abs() > swing_threshold)
        .count();
    1.0 - swings as f64 / pairs as f64
}

/// Whether `input` uses `output`: equal values, or objects sharing a key.
fn consumes(input: &serde_json::Value, output: &serde_json::Value) -> bool {
    if input == output {
        return !output.is_null();
    }
    match (input.as_object(), output.as_object()) {
        (Some(i), Some(o)) => {
            let produced: HashSet<&String> = o.keys().collect();
            i.keys().any(|k| produced.contains(k))
        }
        _ => false,
    }
}
