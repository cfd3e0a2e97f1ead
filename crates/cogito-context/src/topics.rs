//! Keyword-driven topic detection.

use cogito_core::text::tokenize;

/// Fixed keyword table: a message mentioning any keyword belongs to the topic.
static TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "mathematics",
        &[
            "math", "maths", "mathematics", "calculate", "calculation", "equation", "number",
            "plus", "minus", "multiply", "times", "divide", "divided", "sum", "product",
            "algebra", "geometry", "calculus", "fraction", "percent", "sqrt",
        ],
    ),
    (
        "science",
        &[
            "science", "physics", "chemistry", "biology", "atom", "molecule", "energy",
            "gravity", "experiment", "planet", "cell", "evolution", "quantum",
        ],
    ),
    (
        "technology",
        &[
            "technology", "computer", "software", "hardware", "programming", "code",
            "coding", "internet", "algorithm", "database", "rust", "python", "javascript",
            "compiler", "network",
        ],
    ),
    (
        "philosophy",
        &[
            "philosophy", "existence", "ethics", "morality", "moral", "consciousness",
            "truth", "purpose", "metaphysics", "soul", "mind",
        ],
    ),
    (
        "vocabulary",
        &[
            "word", "words", "define", "definition", "meaning", "mean", "synonym",
            "antonym", "spell", "spelling", "vocabulary", "grammar",
        ],
    ),
];

/// Topics mentioned in `text`, in table order, without duplicates.
pub fn derive_topics(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| tokens.contains(*k)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}
