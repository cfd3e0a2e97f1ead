//! Combine ranked module responses into one engine response.

use cogito_core::aggregate_confidence;
use cogito_core::types::{EngineResponse, IntentAnalysis, ModuleResponse};

/// Entities listed in the reasoning trail.
const TRAIL_ENTITIES: usize = 3;

/// Build the final answer from `responses`, which must be sorted by
/// descending confidence and non-empty.
///
/// The top response supplies the text; the confidence aggregates every
/// surviving response and never drops below `confidence_floor`.
/// `consulted` counts every module dispatched to, including those whose
/// answers were dropped.
pub fn build_response(
    responses: &[ModuleResponse],
    consulted: usize,
    analysis: &IntentAnalysis,
    confidence_floor: f64,
) -> Option<EngineResponse> {
    let primary = responses.first()?;
    let confidences: Vec<f64> = responses.iter().map(|r| r.confidence).collect();
    let confidence = aggregate_confidence(&confidences).max(confidence_floor);

    let mut reasoning = vec![
        format!(
            "Intent: {} (confidence {:.2})",
            analysis.intent, analysis.confidence
        ),
        format!(
            "Primary source: {} (confidence {:.2})",
            primary.source, primary.confidence
        ),
        format!("Consulted {} module(s)", consulted.max(responses.len())),
    ];
    if !analysis.entities.is_empty() {
        let top: Vec<String> = analysis
            .entities
            .iter()
            .take(TRAIL_ENTITIES)
            .map(|e| format!("{} ({})", e.value, e.kind))
            .collect();
        reasoning.push(format!("Entities: {}", top.join(", ")));
    }

    Some(EngineResponse {
        response: primary.payload.primary_text(),
        confidence: confidence.min(1.0),
        sources: responses.iter().map(|r| r.source.clone()).collect(),
        reasoning,
        intent: analysis.intent,
        chain_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::analyze_intent;
    use chrono::Utc;
    use cogito_core::types::{ContextSnapshot, IntentCategory, ResponsePayload};

    fn response(source: &str, confidence: f64, payload: ResponsePayload) -> ModuleResponse {
        ModuleResponse::success(source, confidence, payload, Utc::now())
    }

    #[test]
    fn test_primary_from_highest_confidence() {
        let analysis = analyze_intent("What is 15 * 8?", &ContextSnapshot::empty());
        let responses = vec![
            response(
                "mathematics",
                0.9,
                ResponsePayload::Numeric {
                    expression: Some("15 * 8".to_string()),
                    value: 120.0,
                },
            ),
            response("facts", 0.3, ResponsePayload::text("Fifteen is a number.")),
        ];
        let built = build_response(&responses, responses.len(), &analysis, 0.1).unwrap();

        assert_eq!(built.response, "15 * 8 = 120");
        assert_eq!(built.sources, vec!["mathematics", "facts"]);
        assert_eq!(built.intent, IntentCategory::Mathematics);
        // (0.81 + 0.09) / 1.2
        assert!((built.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reasoning_trail() {
        let analysis = analyze_intent("What is 15 * 8?", &ContextSnapshot::empty());
        let responses = vec![response("mathematics", 0.9, ResponsePayload::text("120"))];
        let built = build_response(&responses, responses.len(), &analysis, 0.1).unwrap();
        assert_eq!(
            built.reasoning,
            vec![
                "Intent: mathematics (confidence 0.95)",
                "Primary source: mathematics (confidence 0.90)",
                "Consulted 1 module(s)",
                "Entities: 15 (number), 8 (number), * (operator)",
            ]
        );
    }

    #[test]
    fn test_confidence_floor() {
        let analysis = analyze_intent("hello", &ContextSnapshot::empty());
        let responses = vec![response("facts", 0.05, ResponsePayload::text("maybe"))];
        let built = build_response(&responses, responses.len(), &analysis, 0.1).unwrap();
        assert_eq!(built.confidence, 0.1);
        // No entities in "hello": no entity line.
        assert_eq!(built.reasoning.len(), 3);
    }

    #[test]
    fn test_empty_responses() {
        let analysis = analyze_intent("hello", &ContextSnapshot::empty());
        assert!(build_response(&[], 0, &analysis, 0.1).is_none());
    }

    #[test]
    fn test_trail_counts_dropped_modules() {
        let analysis = analyze_intent("platypus", &ContextSnapshot::empty());
        let responses = vec![response("facts", 0.9, ResponsePayload::text("A mammal."))];
        let built = build_response(&responses, 3, &analysis, 0.1).unwrap();
        assert_eq!(built.reasoning[2], "Consulted 3 module(s)");
        assert_eq!(built.sources, vec!["facts"]);
    }

    #[test]
    fn test_definition_payload_text() {
        let analysis = analyze_intent("define ephemeral", &ContextSnapshot::empty());
        let responses = vec![response(
            "vocabulary",
            0.85,
            ResponsePayload::Definition {
                term: "ephemeral".to_string(),
                definition: "lasting for a very short time".to_string(),
            },
        )];
        let built = build_response(&responses, responses.len(), &analysis, 0.1).unwrap();
        assert_eq!(built.response, "ephemeral: lasting for a very short time");
    }
}
