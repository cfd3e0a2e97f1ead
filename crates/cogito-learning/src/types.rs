use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cogito_core::types::ContextSnapshot;

// =============================================================================
// Patterns
// =============================================================================

/// Family a learned pattern belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    InputShape,
    ResponseQuality,
    Context,
    Similarity,
    Behavior,
    Success,
    Temporal,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::InputShape => "input_shape",
            PatternKind::ResponseQuality => "response_quality",
            PatternKind::Context => "context",
            PatternKind::Similarity => "similarity",
            PatternKind::Behavior => "behavior",
            PatternKind::Success => "success",
            PatternKind::Temporal => "temporal",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring interaction pattern and its running statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    pub id: Uuid,
    pub kind: PatternKind,
    pub key: String,
    /// Mean of every confidence sample observed for this pattern.
    pub confidence: f64,
    pub occurrences: u64,
    /// Most recent example inputs, oldest first.
    pub examples: VecDeque<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LearningPattern {
    pub fn new(
        kind: PatternKind,
        key: impl Into<String>,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            key: key.into(),
            confidence: cogito_core::clamp_confidence(confidence),
            occurrences: 1,
            examples: VecDeque::new(),
            first_seen: now,
            last_seen: now,
        }
    }

    /// Table key: `"<kind>:<key>"`.
    pub fn table_key(&self) -> String {
        table_key(self.kind, &self.key)
    }

    /// Fold one more observation into the pattern.
    ///
    /// Occurrences only grow and the confidence stays the arithmetic mean
    /// of all samples seen so far.
    pub fn observe(&mut self, confidence: f64, now: DateTime<Utc>) {
        let sample = cogito_core::clamp_confidence(confidence);
        self.occurrences += 1;
        self.confidence += (sample - self.confidence) / self.occurrences as f64;
        self.confidence = cogito_core::clamp_confidence(self.confidence);
        if now > self.last_seen {
            self.last_seen = now;
        }
    }

    /// Remember `input` as an example, evicting the oldest beyond `cap`.
    pub fn push_example(&mut self, input: &str, cap: usize) {
        if cap == 0 {
            return;
        }
        self.examples.push_back(input.to_string());
        while self.examples.len() > cap {
            self.examples.pop_front();
        }
    }
}

pub(crate) fn table_key(kind: PatternKind, key: &str) -> String {
    format!("{}:{}", kind, key)
}

// =============================================================================
// Interactions
// =============================================================================

/// One answered request, as handed to the learning engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub input: String,
    pub response: String,
    pub confidence: f64,
    pub source: String,
    pub context: ContextSnapshot,
    pub recorded_at: DateTime<Utc>,
    /// Set when the basic pattern keys were already extracted on arrival.
    #[serde(default)]
    pub extracted: bool,
}

// =============================================================================
// Reports
// =============================================================================

/// Result of one pass of the fast pattern sweep.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
    pub observations: usize,
    pub pruned: usize,
}

/// Outcome of a single persistence attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Saved,
    Failed { error: String },
}

/// Record of one flush of the pattern table to the durable store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistReport {
    pub attempted_at: DateTime<Utc>,
    pub patterns: usize,
    pub outcome: PersistOutcome,
}

impl PersistReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PersistOutcome::Saved)
    }
}

/// Summary statistics over the pattern table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_patterns: usize,
    pub total_interactions: u64,
    pub queued_interactions: usize,
    pub patterns_by_kind: BTreeMap<String, usize>,
    pub average_confidence: f64,
    /// Table key of the most frequently observed pattern.
    pub most_frequent: Option<String>,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub last_persist: Option<PersistReport>,
    pub consecutive_persist_failures: u32,
}

/// Serialized form of the pattern table written to the durable store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub patterns: BTreeMap<String, LearningPattern>,
    pub stats: LearningStats,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_observe_keeps_running_mean() {
        let samples = [0.9, 0.8, 0.85, 0.7, 0.95];
        let mut pattern =
            LearningPattern::new(PatternKind::InputShape, "greeting", samples[0], t0());
        for s in &samples[1..] {
            pattern.observe(*s, t0());
        }
        assert_eq!(pattern.occurrences, 5);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((pattern.confidence - mean).abs() < 1e-9);
    }

    #[test]
    fn test_observe_never_moves_last_seen_backwards() {
        let later = t0() + chrono::Duration::hours(1);
        let mut pattern =
            LearningPattern::new(PatternKind::Temporal, "morning_weekday", 0.5, later);
        pattern.observe(0.5, t0());
        assert_eq!(pattern.last_seen, later);
        assert_eq!(pattern.first_seen, later);
    }

    #[test]
    fn test_examples_are_capped() {
        let mut pattern = LearningPattern::new(PatternKind::Context, "new", 0.5, t0());
        for i in 0..15 {
            pattern.push_example(&format!("input {}", i), 10);
        }
        assert_eq!(pattern.examples.len(), 10);
        assert_eq!(pattern.examples.front().map(String::as_str), Some("input 5"));
        assert_eq!(pattern.examples.back().map(String::as_str), Some("input 14"));
    }

    #[test]
    fn test_table_key_format() {
        let pattern = LearningPattern::new(PatternKind::ResponseQuality, "high_brief", 0.95, t0());
        assert_eq!(pattern.table_key(), "response_quality:high_brief");
    }

    #[test]
    fn test_persist_outcome_serialization() {
        let report = PersistReport {
            attempted_at: t0(),
            patterns: 3,
            outcome: PersistOutcome::Failed {
                error: "store offline".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert!(!report.is_success());
    }
}
