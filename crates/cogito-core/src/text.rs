//! Lightweight text utilities: tokenizing, token-Jaccard similarity,
//! keyword extraction, and the number / proper-noun entity passes.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Entity, EntityKind};

/// Confidence assigned to numbers found by [`extract_numbers`].
pub const NUMBER_CONFIDENCE: f64 = 0.9;
/// Confidence assigned to capitalized sequences found by [`extract_proper_nouns`].
pub const PROPER_NOUN_CONFIDENCE: f64 = 0.7;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\b\d+\b").expect("Invalid number regex"));

static PROPER_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("Invalid proper noun regex")
});

// Capitalized words that are almost always sentence starters, not names.
static LEADING_WORDS: &[&str] = &[
    "What", "Who", "Where", "When", "Why", "How", "Which", "Is", "Are", "Can", "Could",
    "Would", "Should", "Do", "Does", "Did", "The", "A", "An", "I", "Tell", "Please",
    "Define", "Explain", "Hello", "Hi", "Hey", "Thanks", "Thank",
];

static STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "am", "be", "been", "being", "have", "has",
    "had", "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must",
    "can", "could", "i", "me", "my", "we", "our", "you", "your", "he", "she", "it", "they",
    "them", "his", "her", "its", "their", "what", "which", "who", "whom", "this", "that",
    "these", "those", "of", "in", "to", "for", "with", "on", "at", "from", "by", "about",
    "as", "into", "and", "but", "or", "not", "no", "so", "if", "then", "than", "too", "very",
    "just", "also", "how", "when", "where", "why", "tell", "please", "there", "here",
];

/// Lowercased alphanumeric tokens of `text`, as a set.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Jaccard similarity of two token sets. Two empty sets score `0.0`.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Token-Jaccard similarity between two strings.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokenize(a), &tokenize(b))
}

/// Content words of `text`: longer than three characters and not a stop word,
/// in order of first appearance.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() > 3 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Integer literals in `text`.
pub fn extract_numbers(text: &str) -> Vec<Entity> {
    NUMBER_RE
        .find_iter(text)
        .map(|m| Entity::new(EntityKind::Number, m.as_str(), NUMBER_CONFIDENCE))
        .collect()
}

/// Capitalized word sequences that look like proper nouns.
///
/// A leading question word or filler ("What", "Tell") is stripped from the
/// front of a match; matches consisting solely of such words are dropped.
pub fn extract_proper_nouns(text: &str) -> Vec<Entity> {
    PROPER_NOUN_RE
        .find_iter(text)
        .filter_map(|m| {
            let words: Vec<&str> = m
                .as_str()
                .split_whitespace()
                .skip_while(|w| LEADING_WORDS.contains(w))
                .collect();
            if words.is_empty() {
                None
            } else {
                Some(Entity::new(
                    EntityKind::ProperNoun,
                    words.join(" "),
                    PROPER_NOUN_CONFIDENCE,
                ))
            }
        })
        .collect()
}

/// Both entity passes over `text`, numbers first.
pub fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = extract_numbers(text);
    entities.extend(extract_proper_nouns(text));
    entities
}
