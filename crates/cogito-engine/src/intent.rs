//! Declarative, ordered intent rule table.
//!
//! Rules are evaluated in priority order and the first match wins. Each
//! rule carries its own confidence, the modules it suggests, and the
//! entity extractor applied to matching inputs.

use std::sync::LazyLock;

use regex::Regex;

use cogito_core::text::{extract_entities, extract_numbers, extract_proper_nouns};
use cogito_core::types::{ContextSnapshot, Entity, EntityKind, IntentAnalysis, IntentCategory};

/// Confidence assigned when no rule matches.
pub const GENERAL_CONFIDENCE: f64 = 0.4;
/// Modules consulted when no rule matches.
pub const GENERAL_MODULES: &[&str] = &["vocabulary", "facts", "mathematics"];

/// One intent classification rule.
pub struct IntentRule {
    pub category: IntentCategory,
    pub confidence: f64,
    pub modules: &'static [&'static str],
    pub patterns: Vec<Regex>,
    pub extractor: fn(&str) -> Vec<Entity>,
}

impl IntentRule {
    pub fn matches(&self, input: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(input))
    }
}

impl std::fmt::Debug for IntentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRule")
            .field("category", &self.category)
            .field("confidence", &self.confidence)
            .field("modules", &self.modules)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

fn mk(pats: &[&str]) -> Vec<Regex> {
    pats.iter()
        .map(|p| Regex::new(p).expect("Invalid intent regex"))
        .collect()
}

// =============================================================================
// Rule table (priority order)
// =============================================================================

static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        IntentRule {
            category: IntentCategory::Mathematics,
            confidence: 0.95,
            modules: &["mathematics"],
            patterns: mk(&[
                r"\d+(?:\.\d+)?\s*[-+*/^×÷%x]\s*-?\d+",
                r"(?i)\b(?:calculate|compute|solve|evaluate)\b",
                r"(?i)\b(?:square\s+root|sqrt|factorial)\b",
                r"(?i)\b(?:plus|minus|times|multiplied\s+by|divided\s+by)\b",
            ]),
            extractor: extract_math,
        },
        IntentRule {
            category: IntentCategory::Vocabulary,
            confidence: 0.9,
            modules: &["vocabulary"],
            patterns: mk(&[
                r"(?i)\bdefine\b",
                r"(?i)\bdefinition\s+of\b",
                r"(?i)\bmeaning\s+of\s+(?:the\s+)?word\b",
                r"(?i)\bwhat\s+does\s+\S+\s+mean\b",
                r"(?i)\b(?:synonyms?|antonyms?)\s+(?:of|for)\b",
                r"(?i)\bhow\s+(?:do\s+you|to)\s+spell\b",
            ]),
            extractor: extract_vocabulary,
        },
        IntentRule {
            category: IntentCategory::Facts,
            confidence: 0.8,
            modules: &["facts"],
            patterns: mk(&[
                r"(?i)^\s*(?:who|where|when)\s+(?:is|was|are|were|did)\b",
                r"(?i)\bwhat\s+is\s+the\s+(?:capital|population|height|distance|size)\b",
                r"(?i)\bwhat\s+is\s+the\s+(?:largest|smallest|tallest|longest)\b",
                r"(?i)\b(?:tell\s+me\s+about|facts?\s+about|history\s+of)\b",
            ]),
            extractor: extract_facts,
        },
        IntentRule {
            category: IntentCategory::Coding,
            confidence: 0.85,
            modules: &["coding"],
            patterns: mk(&[
                r"(?i)\b(?:code|coding|function|compile|compiler|syntax)\b",
                r"(?i)\b(?:algorithm|programming|debug|refactor)\b",
                r"(?i)\b(?:rust|python|javascript|typescript|java|golang)\b",
                r"(?i)\b(?:ruby|sql|haskell|kotlin)\b",
                r"(?i)\bc\+\+",
            ]),
            extractor: extract_coding,
        },
        IntentRule {
            category: IntentCategory::Personal,
            confidence: 0.9,
            modules: &["user-info"],
            patterns: mk(&[
                r"(?i)\bmy\s+name\s+is\b",
                r"(?i)\bcall\s+me\b",
                r"(?i)\bwhat(?:'s|\s+is)\s+my\s+name\b",
                r"(?i)\bi\s+(?:like|love|prefer|hate|enjoy)\b",
                r"(?i)\bremember\s+that\s+i\b",
            ]),
            extractor: extract_personal,
        },
        IntentRule {
            category: IntentCategory::Philosophy,
            confidence: 0.75,
            modules: &["philosophy"],
            patterns: mk(&[
                r"(?i)\bmeaning\s+of\s+life\b",
                r"(?i)\b(?:consciousness|free\s+will|existence|morality|ethics)\b",
                r"(?i)\b(?:philosophy|metaphysics|soul)\b",
                r"(?i)\bwhat\s+is\s+(?:truth|reality|justice|love|happiness)\b",
            ]),
            extractor: extract_philosophy,
        },
        IntentRule {
            category: IntentCategory::System,
            confidence: 0.95,
            modules: &["system"],
            patterns: mk(&[
                r"(?i)^\s*(?:help|status|stats|reset|clear|version)\s*[.!?]*\s*$",
                r"(?i)\bwhat\s+can\s+you\s+do\b",
                r"(?i)\bsystem\s+status\b",
            ]),
            extractor: extract_system,
        },
    ]
});

/// The rule table in evaluation order.
pub fn rules() -> &'static [IntentRule] {
    &RULES
}

/// First rule matching `input`, if any.
pub fn classify(input: &str) -> Option<&'static IntentRule> {
    RULES.iter().find(|rule| rule.matches(input))
}

/// Classify `input` and extract its entities.
///
/// Falls back to [`IntentCategory::General`] at [`GENERAL_CONFIDENCE`] with
/// a multi-module candidate set when no rule matches.
pub fn analyze_intent(input: &str, context: &ContextSnapshot) -> IntentAnalysis {
    match classify(input) {
        Some(rule) => IntentAnalysis {
            intent: rule.category,
            confidence: rule.confidence,
            entities: (rule.extractor)(input),
            suggested_modules: rule.modules.iter().map(|m| m.to_string()).collect(),
            context: context.clone(),
        },
        None => IntentAnalysis {
            intent: IntentCategory::General,
            confidence: GENERAL_CONFIDENCE,
            entities: extract_entities(input),
            suggested_modules: GENERAL_MODULES.iter().map(|m| m.to_string()).collect(),
            context: context.clone(),
        },
    }
}

// =============================================================================
// Entity extractors
// =============================================================================

static OPERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)[+*/^×÷%]|\s-\s",
        r"|\b(?:plus|minus|times|multiplied\s+by|divided\s+by)\b",
        r"|\b(?:squared|square\s+root|sqrt|factorial)\b",
    ))
    .expect("Invalid operator regex")
});

static TERM_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    mk(&[
        r#"(?i)\bdefine\s+["']?([a-z][\w'-]*)"#,
        r#"(?i)\bwhat\s+does\s+["']?([a-z][\w'-]*)["']?\s+mean\b"#,
        r#"(?i)\b(?:definition|meaning)\s+of\s+(?:the\s+word\s+)?["']?([a-z][\w'-]*)"#,
        r#"(?i)\b(?:synonyms?|antonyms?)\s+(?:of|for)\s+["']?([a-z][\w'-]*)"#,
        r#"(?i)\bspell\s+["']?([a-z][\w'-]*)"#,
    ])
});

static SUBJECT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    mk(&[
        concat!(
            r"(?i)^\s*(?:who|what|where|when)\s+(?:is|was|are|were|did)\s+",
            r"(?:the\s+)?(.+?)\s*[?.!]*\s*$",
        ),
        r"(?i)\b(?:tell\s+me\s+about|facts?\s+about|history\s+of)\s+(?:the\s+)?(.+?)\s*[?.!]*\s*$",
    ])
});

static LANGUAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:rust|python|javascript|typescript|java|golang|ruby|sql|haskell|kotlin)\b",
        r"|\bc\+\+",
    ))
    .expect("Invalid language regex")
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:my\s+name\s+is|call\s+me)\s+([A-Z][a-z]+)").expect("Invalid name regex")
});

static CONCEPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:meaning\s+of\s+life|consciousness|free\s+will|existence|morality|ethics",
        r"|truth|reality|justice|happiness|soul|purpose)\b",
    ))
    .expect("Invalid concept regex")
});

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:help|status|stats|reset|clear|version)\b").expect("Invalid command regex")
});

fn first_capture(patterns: &[Regex], input: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(input))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_math(input: &str) -> Vec<Entity> {
    let mut entities = extract_numbers(input);
    entities.extend(
        OPERATOR_RE
            .find_iter(input)
            .map(|m| Entity::new(EntityKind::Operator, m.as_str().trim().to_lowercase(), 0.9)),
    );
    entities
}

fn extract_vocabulary(input: &str) -> Vec<Entity> {
    first_capture(&TERM_RES, input)
        .map(|term| vec![Entity::new(EntityKind::Term, term.to_lowercase(), 0.85)])
        .unwrap_or_default()
}

fn extract_facts(input: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    if let Some(subject) = first_capture(&SUBJECT_RES, input) {
        entities.push(Entity::new(EntityKind::Subject, subject, 0.8));
    }
    entities.extend(extract_proper_nouns(input));
    entities
}

fn extract_coding(input: &str) -> Vec<Entity> {
    let mut seen = Vec::new();
    for m in LANGUAGE_RE.find_iter(input) {
        let lang = m.as_str().to_lowercase();
        if !seen.contains(&lang) {
            seen.push(lang);
        }
    }
    seen.into_iter()
        .map(|lang| Entity::new(EntityKind::Language, lang, 0.9))
        .collect()
}

fn extract_personal(input: &str) -> Vec<Entity> {
    NAME_RE
        .captures_iter(input)
        .filter_map(|caps| caps.get(1))
        .map(|m| Entity::new(EntityKind::Name, m.as_str(), 0.85))
        .collect()
}

fn extract_philosophy(input: &str) -> Vec<Entity> {
    CONCEPT_RE
        .find_iter(input)
        .map(|m| Entity::new(EntityKind::Concept, m.as_str().to_lowercase(), 0.8))
        .collect()
}

fn extract_system(input: &str) -> Vec<Entity> {
    COMMAND_RE
        .find_iter(input)
        .map(|m| Entity::new(EntityKind::Command, m.as_str().to_lowercase(), 0.95))
        .collect()
}
