use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a reasoning step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    InputAnalysis,
    ContextIntegration,
    ResponseAnalysis,
    Validation,
    Conclusion,
}

/// One judgment in a reasoning chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub kind: StepKind,
    pub description: String,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub confidence: f64,
    pub justification: String,
}

/// Sub-scores produced by the validation step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationScores {
    pub consistency: f64,
    pub completeness: f64,
    pub relevance: f64,
    pub logical_flow: f64,
    /// Aggregate of the four sub-scores.
    pub overall: f64,
}

/// Ordered trace explaining how an answer was reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReasoningChain {
    pub id: Uuid,
    pub input: String,
    pub steps: Vec<ReasoningStep>,
    pub conclusion: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ReasoningChain {
    /// One line per step, suitable for a user-facing reasoning trail.
    pub fn summary_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| format!("{} ({:.2}): {}", s.description, s.confidence, s.justification))
            .collect()
    }
}
