//! Deterministic, module-independent responses.
//!
//! Used when no module produced a confident answer, when the input is
//! rejected, or when the pipeline itself failed. Nothing here can fail.

use std::sync::LazyLock;

use regex::Regex;

use cogito_core::types::{format_number, EngineResponse, IntentCategory};

/// Source name reported for every fallback response.
pub const FALLBACK_SOURCE: &str = "cognitive-engine";

const GREETING_CONFIDENCE: f64 = 0.9;
const HELP_CONFIDENCE: f64 = 0.9;
const STATUS_CONFIDENCE: f64 = 0.9;
const ARITHMETIC_CONFIDENCE: f64 = 0.95;
const GENERIC_CONFIDENCE: f64 = 0.2;

const GREETING_TEXT: &str = concat!(
    "Hello! I can help with arithmetic, word definitions, facts, and coding questions. ",
    "What would you like to know?"
);
const GENERIC_TEXT: &str = concat!(
    "I'm not sure how to answer that yet. Try asking me to calculate something, ",
    "define a word, or tell you about a topic."
);
const NO_MODULES_STATUS: &str = concat!(
    "All systems operational. No knowledge modules are loaded; ",
    "answering from built-in responses."
);

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:hello|hi|hey|greetings|good\s+(?:morning|afternoon|evening))\b")
        .expect("Invalid greeting regex")
});

static HELP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:help|commands)\b",
        r"|\bwhat\s+can\s+you\s+do\b",
        r"|\bhow\s+do\s+i\s+use\s+you\b",
    ))
    .expect("Invalid help regex")
});

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:status|stats)\b|\bsystem\s+status\b|\bhow\s+are\s+you\b")
        .expect("Invalid status regex")
});

static ARITHMETIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:what\s+is\s+|calculate\s+|compute\s+)?",
        r"(-?\d+(?:\.\d+)?)\s*([-+*/x×÷])\s*(-?\d+(?:\.\d+)?)",
        r"\s*[?=.!]*\s*$",
    ))
    .expect("Invalid arithmetic regex")
});

/// Answer `input` without any module.
///
/// `reason` explains why the fallback path was taken and is recorded in
/// the reasoning trail. `modules` lists the available module names for the
/// status reply.
pub fn create_fallback_response(
    input: &str,
    reason: &str,
    intent: IntentCategory,
    modules: &[String],
) -> EngineResponse {
    let (kind, response, confidence) = if GREETING_RE.is_match(input) {
        ("greeting", GREETING_TEXT.to_string(), GREETING_CONFIDENCE)
    } else if HELP_RE.is_match(input) {
        ("help", help_text(), HELP_CONFIDENCE)
    } else if STATUS_RE.is_match(input) {
        ("status", status_text(modules), STATUS_CONFIDENCE)
    } else if let Some((text, confidence)) = evaluate_arithmetic(input) {
        ("arithmetic", text, confidence)
    } else {
        ("generic", GENERIC_TEXT.to_string(), GENERIC_CONFIDENCE)
    };

    EngineResponse {
        response,
        confidence,
        sources: vec![FALLBACK_SOURCE.to_string()],
        reasoning: vec![
            format!("Fallback: {}", reason),
            format!("Fallback kind: {}", kind),
        ],
        intent,
        chain_id: None,
    }
}

fn help_text() -> String {
    [
        "I can help with:",
        "- arithmetic, e.g. \"12 + 5\" or \"What is 15 * 8?\"",
        "- word definitions, e.g. \"Define ephemeral\"",
        "- facts, e.g. \"Who was Ada Lovelace?\"",
        "- coding questions, e.g. \"How do I write a function in Rust?\"",
    ]
    .join("\n")
}

fn status_text(modules: &[String]) -> String {
    if modules.is_empty() {
        NO_MODULES_STATUS.to_string()
    } else {
        format!(
            "All systems operational. {} knowledge module(s) loaded: {}.",
            modules.len(),
            modules.join(", ")
        )
    }
}

/// Evaluate a single-operator arithmetic expression such as `12 + 5`.
///
/// Returns the response text and its confidence, or `None` when `input`
/// is not such an expression.
pub fn evaluate_arithmetic(input: &str) -> Option<(String, f64)> {
    let caps = ARITHMETIC_RE.captures(input)?;
    let lhs: f64 = caps.get(1)?.as_str().parse().ok()?;
    let op = caps.get(2)?.as_str();
    let rhs: f64 = caps.get(3)?.as_str().parse().ok()?;

    let (symbol, value) = match op {
        "+" => ("+", lhs + rhs),
        "-" => ("-", lhs - rhs),
        "*" | "x" | "X" | "×" => ("*", lhs * rhs),
        "/" | "÷" => {
            if rhs == 0.0 {
                let text = format!(
                    "{} / {} is undefined: division by zero.",
                    format_number(lhs),
                    format_number(rhs)
                );
                return Some((text, ARITHMETIC_CONFIDENCE));
            }
            ("/", lhs / rhs)
        }
        _ => return None,
    };
    Some((
        format!(
            "{} {} {} = {}",
            format_number(lhs),
            symbol,
            format_number(rhs),
            format_number(value)
        ),
        ARITHMETIC_CONFIDENCE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback(input: &str) -> EngineResponse {
        create_fallback_response(input, "no confident answer", IntentCategory::General, &[])
    }

    #[test]
    fn test_greeting() {
        let r = fallback("hello");
        assert!(r.response.starts_with("Hello!"));
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.sources, vec!["cognitive-engine"]);
        assert_eq!(r.reasoning[0], "Fallback: no confident answer");
        assert_eq!(r.reasoning[1], "Fallback kind: greeting");
    }

    #[test]
    fn test_help_and_status() {
        assert!(fallback("help").response.starts_with("I can help with:"));
        let status = create_fallback_response(
            "status",
            "no module",
            IntentCategory::System,
            &["facts".to_string(), "mathematics".to_string()],
        );
        assert_eq!(
            status.response,
            "All systems operational. 2 knowledge module(s) loaded: facts, mathematics."
        );
        assert_eq!(status.intent, IntentCategory::System);
    }

    #[test]
    fn test_arithmetic_matches_direct_evaluation() {
        assert_eq!(fallback("12 + 5").response, "12 + 5 = 17");
        assert_eq!(fallback("What is 15 * 8?").response, "15 * 8 = 120");
        assert_eq!(fallback("20 - 30").response, "20 - 30 = -10");
        assert_eq!(fallback("7 / 2").response, "7 / 2 = 3.5");
        assert_eq!(fallback("3 x 4").response, "3 * 4 = 12");
        assert_eq!(fallback("1.5 + 1.25").response, "1.5 + 1.25 = 2.75");
        assert_eq!(fallback("12 + 5").confidence, 0.95);
    }

    #[test]
    fn test_division_by_zero() {
        let r = fallback("8 / 0");
        assert_eq!(r.response, "8 / 0 is undefined: division by zero.");
    }

    #[test]
    fn test_multi_operator_is_not_evaluated() {
        assert!(evaluate_arithmetic("1 + 2 + 3").is_none());
        assert!(evaluate_arithmetic("one plus two").is_none());
    }

    #[test]
    fn test_generic_fallback() {
        let r = fallback("blorptastic");
        assert!(r.response.starts_with("I'm not sure"));
        assert_eq!(r.reasoning[1], "Fallback kind: generic");
    }
}
