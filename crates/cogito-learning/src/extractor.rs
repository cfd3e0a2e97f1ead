//! Pattern key extraction.
//!
//! The basic keys (input shape, response quality, conversation context) are
//! computed for every interaction. The deeper keys (similarity, behavior,
//! success, temporal) are only computed by the batch sweep.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use regex::Regex;

use cogito_core::text::{jaccard, keywords, tokenize, word_count};
use cogito_core::types::ContextSnapshot;

use crate::types::{InteractionRecord, PatternKind};

/// Sessions younger than this with several messages count as rapid questioning.
pub const RAPID_SESSION_SECS: i64 = 120;
/// Inputs longer than this (in characters) count as detailed.
pub const LONG_INPUT_CHARS: usize = 100;

/// An input-shape rule: key plus the patterns that select it.
struct ShapeRule {
    key: &'static str,
    patterns: Vec<Regex>,
}

fn shape_rule(key: &'static str, patterns: &[&str]) -> ShapeRule {
    ShapeRule {
        key,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("Invalid input shape regex"))
            .collect(),
    }
}

// Evaluated in order; the first matching rule wins.
static SHAPE_RULES: LazyLock<Vec<ShapeRule>> = LazyLock::new(|| {
    vec![
        shape_rule(
            "definition_request",
            &[
                r"(?i)\bdefine\b",
                r"(?i)\b(?:definition|meaning)\s+of\b",
                r"(?i)\bwhat\s+(?:does|is)\s+.+\bmean\b",
            ],
        ),
        shape_rule(
            "instruction_request",
            &[
                r"(?i)^\s*how\s+(?:do|can|should|to)\b",
                r"(?i)\bsteps?\s+to\b",
                r"(?i)\bshow\s+me\s+how\b",
            ],
        ),
        shape_rule(
            "explanation_request",
            &[r"(?i)^\s*why\b", r"(?i)\bexplain\b", r"(?i)\bwhat\s+causes\b"],
        ),
        shape_rule(
            "temporal_request",
            &[r"(?i)^\s*when\b", r"(?i)\bwhat\s+(?:time|day|date|year)\b"],
        ),
        shape_rule(
            "location_request",
            &[r"(?i)^\s*where\b", r"(?i)\blocated\b"],
        ),
        shape_rule(
            "calculation_request",
            &[
                r"\d+(?:\.\d+)?\s*[-+*/^x]\s*\d+",
                r"(?i)\b(?:calculate|compute|solve|sum\s+of)\b",
            ],
        ),
        shape_rule(
            "coding_request",
            &[r"(?i)\b(?:code|function|program|script|compile|algorithm|implement)\b"],
        ),
        shape_rule(
            "debugging_request",
            &[r"(?i)\b(?:error|bug|debug|crash|exception|broken|stack\s+trace)\b"],
        ),
        shape_rule(
            "gratitude_expression",
            &[r"(?i)\b(?:thanks|thank\s+you|appreciate)\b"],
        ),
        shape_rule(
            "greeting",
            &[r"(?i)^\s*(?:hello|hi|hey|greetings|good\s+(?:morning|afternoon|evening))\b"],
        ),
    ]
});

// =============================================================================
// Basic keys
// =============================================================================

/// Shape of the user input, or `None` when no rule applies.
pub fn input_shape_key(input: &str) -> Option<&'static str> {
    if let Some(rule) = SHAPE_RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| p.is_match(input)))
    {
        return Some(rule.key);
    }
    if word_count(input) > 10 {
        return Some("complex_query");
    }
    if input.matches('?').count() > 1 {
        return Some("multiple_questions");
    }
    None
}

/// Confidence band of the answer, suffixed with its length band when the
/// answer is unusually long or short.
pub fn response_quality_key(confidence: f64, response: &str) -> String {
    let band = if confidence > 0.9 {
        "high"
    } else if confidence > 0.7 {
        "medium"
    } else if confidence > 0.5 {
        "low"
    } else {
        "uncertain"
    };
    let len = response.chars().count();
    if len > 500 {
        format!("{}_detailed", band)
    } else if len < 50 {
        format!("{}_brief", band)
    } else {
        band.to_string()
    }
}

/// Conversation length band, suffixed with topic breadth when notable.
pub fn context_key(context: &ContextSnapshot) -> String {
    let count = context.message_count;
    let length = if count <= 2 {
        "new"
    } else if count > 10 {
        "extended"
    } else if count > 5 {
        "moderate"
    } else {
        "developing"
    };
    match context.topics.len() {
        1 => format!("{}_focused", length),
        n if n > 3 => format!("{}_multi_topic", length),
        _ => length.to_string(),
    }
}

/// All basic keys for one interaction.
pub fn basic_keys(record: &InteractionRecord) -> Vec<(PatternKind, String)> {
    let mut keys = Vec::with_capacity(3);
    if let Some(shape) = input_shape_key(&record.input) {
        keys.push((PatternKind::InputShape, shape.to_string()));
    }
    keys.push((
        PatternKind::ResponseQuality,
        response_quality_key(record.confidence, &record.response),
    ));
    keys.push((PatternKind::Context, context_key(&record.context)));
    keys
}

// =============================================================================
// Deeper keys
// =============================================================================

/// Cluster key shared with the most similar peer input above `threshold`.
pub fn similarity_key(input: &str, peers: &[&str], threshold: f64) -> Option<String> {
    let tokens = tokenize(input);
    let (best, score) = peers
        .iter()
        .map(|peer| (*peer, jaccard(&tokens, &tokenize(peer))))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if score <= threshold {
        return None;
    }
    let peer_words: HashSet<String> = keywords(best).into_iter().collect();
    let mut shared: Vec<String> = keywords(input)
        .into_iter()
        .filter(|k| peer_words.contains(k))
        .collect();
    if shared.is_empty() {
        return Some("similar_phrasing".to_string());
    }
    shared.sort();
    shared.truncate(3);
    Some(format!("cluster_{}", shared.join("_")))
}

/// Conversational behaviors visible in the interaction's context.
pub fn behavior_keys(record: &InteractionRecord) -> Vec<&'static str> {
    let ctx = &record.context;
    let mut keys = Vec::new();
    if ctx.message_count > 3 && ctx.session_duration_secs < RAPID_SESSION_SECS {
        keys.push("rapid_questioning");
    }
    if ctx.message_count > 5 && record.input.chars().count() > LONG_INPUT_CHARS {
        keys.push("detailed_exploration");
    }
    if ctx.topics.len() > 2 {
        keys.push("topic_jumping");
    }
    keys
}

/// Source reliability and answer shape combinations.
pub fn success_keys(record: &InteractionRecord) -> Vec<String> {
    let len = record.response.chars().count();
    let mut keys = Vec::new();
    if record.confidence > 0.8 {
        keys.push(format!("reliable_{}", record.source));
        if len > 200 {
            keys.push("thorough_answer".to_string());
        } else if len < 50 {
            keys.push("concise_answer".to_string());
        }
    } else if record.confidence < 0.5 {
        keys.push(format!("weak_{}", record.source));
    }
    keys
}

/// Hour-of-day bucket combined with weekday / weekend.
pub fn temporal_key(at: DateTime<Utc>) -> String {
    let bucket = match at.hour() {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=21 => "evening",
        _ => "night",
    };
    let day = match at.weekday() {
        Weekday::Sat | Weekday::Sun => "weekend",
        _ => "weekday",
    };
    format!("{}_{}", bucket, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(
        input: &str,
        response: &str,
        confidence: f64,
        context: ContextSnapshot,
    ) -> InteractionRecord {
        InteractionRecord {
            input: input.to_string(),
            response: response.to_string(),
            confidence,
            source: "facts".to_string(),
            context,
            recorded_at: Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap(),
            extracted: false,
        }
    }

    fn context_with(messages: usize, topics: &[&str], secs: i64) -> ContextSnapshot {
        let mut ctx = ContextSnapshot::empty();
        ctx.message_count = messages;
        ctx.topics = topics.iter().map(|t| t.to_string()).collect();
        ctx.session_duration_secs = secs;
        ctx
    }

    #[test]
    fn test_input_shape_rules_in_order() {
        assert_eq!(input_shape_key("Define entropy"), Some("definition_request"));
        assert_eq!(input_shape_key("What does ubiquitous mean?"), Some("definition_request"));
        assert_eq!(input_shape_key("How do I boil an egg"), Some("instruction_request"));
        assert_eq!(input_shape_key("Why is the sky blue?"), Some("explanation_request"));
        assert_eq!(input_shape_key("When did the war end?"), Some("temporal_request"));
        assert_eq!(input_shape_key("Where is Lisbon?"), Some("location_request"));
        assert_eq!(input_shape_key("What is 15 * 8?"), Some("calculation_request"));
        assert_eq!(input_shape_key("write a function that sorts"), Some("coding_request"));
        assert_eq!(input_shape_key("I keep getting an error"), Some("debugging_request"));
        assert_eq!(input_shape_key("thanks a lot"), Some("gratitude_expression"));
        assert_eq!(input_shape_key("hello there"), Some("greeting"));
    }

    #[test]
    fn test_first_matching_shape_wins() {
        // Matches both definition and calculation; definition is earlier.
        assert_eq!(input_shape_key("define 2 + 2"), Some("definition_request"));
    }

    #[test]
    fn test_input_shape_fallbacks() {
        assert_eq!(
            input_shape_key("tell me everything you know about the history of the roman empire"),
            Some("complex_query")
        );
        assert_eq!(input_shape_key("cats? dogs?"), Some("multiple_questions"));
        assert_eq!(input_shape_key("cats"), None);
    }

    #[test]
    fn test_response_quality_bands() {
        let medium_text = "x".repeat(100);
        assert_eq!(response_quality_key(0.95, &medium_text), "high");
        assert_eq!(response_quality_key(0.8, &medium_text), "medium");
        assert_eq!(response_quality_key(0.6, &medium_text), "low");
        assert_eq!(response_quality_key(0.5, &medium_text), "uncertain");
        assert_eq!(response_quality_key(0.95, "120"), "high_brief");
        assert_eq!(response_quality_key(0.3, &"y".repeat(600)), "uncertain_detailed");
    }

    #[test]
    fn test_context_key_bands() {
        assert_eq!(context_key(&context_with(2, &[], 0)), "new");
        assert_eq!(context_key(&context_with(4, &["science"], 0)), "developing_focused");
        assert_eq!(context_key(&context_with(6, &[], 0)), "moderate");
        assert_eq!(
            context_key(&context_with(12, &["a", "b", "c", "d"], 0)),
            "extended_multi_topic"
        );
    }

    #[test]
    fn test_basic_keys_skip_missing_shape() {
        let rec = record(
            "cats",
            "Cats are small carnivorous mammals kept as pets worldwide.",
            0.95,
            context_with(1, &[], 0),
        );
        let keys = basic_keys(&rec);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], (PatternKind::ResponseQuality, "high".to_string()));
        assert_eq!(keys[1], (PatternKind::Context, "new".to_string()));
    }

    #[test]
    fn test_similarity_key_clusters_shared_keywords() {
        let key = similarity_key(
            "what is the boiling point of water",
            &["what is the freezing point of water", "tell me a joke"],
            0.6,
        );
        assert_eq!(key, Some("cluster_point_water".to_string()));
    }

    #[test]
    fn test_similarity_key_below_threshold() {
        assert_eq!(similarity_key("rust traits", &["python decorators"], 0.6), None);
        assert_eq!(similarity_key("rust traits", &[], 0.6), None);
    }

    #[test]
    fn test_behavior_keys() {
        let rapid = record("next?", "", 0.5, context_with(4, &[], 60));
        assert_eq!(behavior_keys(&rapid), vec!["rapid_questioning"]);

        let long_input = "a".repeat(120);
        let detailed = record(&long_input, "", 0.5, context_with(6, &["a", "b", "c"], 900));
        assert_eq!(behavior_keys(&detailed), vec!["detailed_exploration", "topic_jumping"]);
    }

    #[test]
    fn test_success_keys() {
        let good = record("q", "short", 0.9, ContextSnapshot::empty());
        assert_eq!(success_keys(&good), vec!["reliable_facts", "concise_answer"]);

        let weak = record("q", "hmm", 0.3, ContextSnapshot::empty());
        assert_eq!(success_keys(&weak), vec!["weak_facts"]);

        let middling = record("q", "hmm", 0.6, ContextSnapshot::empty());
        assert!(success_keys(&middling).is_empty());
    }

    #[test]
    fn test_temporal_key() {
        // 2024-05-06 is a Monday, 2024-05-11 a Saturday.
        let monday_morning = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        let saturday_night = Utc.with_ymd_and_hms(2024, 5, 11, 23, 30, 0).unwrap();
        assert_eq!(temporal_key(monday_morning), "morning_weekday");
        assert_eq!(temporal_key(saturday_night), "night_weekend");
    }
}
