//! Reasoning chain construction.
//!
//! Chains are purely heuristic and live only in a bounded in-memory history
//! kept for debugging and explainability.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use cogito_core::config::ReasoningConfig;
use cogito_core::text::{extract_entities, keywords, text_similarity};
use cogito_core::{position_weighted_confidence, Clock, ContextSnapshot, ModuleResponse};

use crate::types::{ReasoningChain, ReasoningStep, StepKind};
use crate::validation::validate_steps;

/// Confidence of the conclusion when no module answered.
const NO_ANSWER_CONFIDENCE: f64 = 0.1;

/// Builds and remembers reasoning chains.
pub struct ReasoningEngine {
    config: ReasoningConfig,
    clock: Arc<dyn Clock>,
    history: Mutex<VecDeque<ReasoningChain>>,
}

impl ReasoningEngine {
    pub fn new(config: ReasoningConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Build a reasoning chain for `input` and record it in the history.
    ///
    /// Steps, in order: input analysis, context integration, module ranking
    /// (only when `responses` holds a successful answer), validation, and
    /// conclusion. An empty response set yields an explicit "no confident
    /// answer" conclusion.
    pub fn create_reasoning_chain(
        &self,
        input: &str,
        context: &ContextSnapshot,
        responses: &[ModuleResponse],
    ) -> ReasoningChain {
        let mut steps = Vec::with_capacity(5);

        let analysis = self.analyze_input(input);
        let input_keywords = analysis.output["keywords"].clone();
        steps.push(analysis);

        let integration = self.integrate_context(input, &input_keywords, context);
        let relevance = integration.output["relevance"].clone();
        steps.push(integration);

        let mut ranked: Vec<&ModuleResponse> = responses.iter().filter(|r| r.success).collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        if !ranked.is_empty() {
            steps.push(rank_modules(&ranked, &input_keywords, &relevance));
        }

        let validation = self.validate(input, &steps);
        let score = validation.output["score"].clone();
        steps.push(validation);

        let (conclusion, conclusion_step) = conclude(ranked.first().copied(), &score);
        steps.push(conclusion_step);

        let confidences: Vec<f64> = steps.iter().map(|s| s.confidence).collect();
        let chain = ReasoningChain {
            id: Uuid::new_v4(),
            input: input.to_string(),
            steps,
            conclusion,
            confidence: position_weighted_confidence(&confidences),
            sources: ranked.iter().map(|r| r.source.clone()).collect(),
            created_at: self.clock.now(),
        };
        debug!(
            chain_id = %chain.id,
            steps = chain.steps.len(),
            confidence = chain.confidence,
            "Reasoning chain created"
        );
        self.remember(chain.clone());
        chain
    }

    /// All retained chains, oldest first.
    pub fn history(&self) -> Vec<ReasoningChain> {
        self.lock_history().iter().cloned().collect()
    }

    /// The most recently built chain.
    pub fn latest(&self) -> Option<ReasoningChain> {
        self.lock_history().back().cloned()
    }

    /// Look up a retained chain by id.
    pub fn get(&self, id: Uuid) -> Option<ReasoningChain> {
        self.lock_history().iter().find(|c| c.id == id).cloned()
    }

    pub fn clear_history(&self) {
        self.lock_history().clear();
    }

    // -- Steps --

    fn analyze_input(&self, input: &str) -> ReasoningStep {
        let kw = keywords(input);
        let entities: Vec<String> = extract_entities(input).into_iter().map(|e| e.value).collect();
        let intent = question_type(input);
        let confidence = if kw.is_empty() && entities.is_empty() {
            0.6
        } else {
            0.9
        };
        ReasoningStep {
            kind: StepKind::InputAnalysis,
            description: "Analyze input".to_string(),
            input: json!({ "text": input }),
            justification: format!(
                "Identified a {} request; keywords: {}; entities: {}",
                intent,
                list_or_none(&kw),
                list_or_none(&entities)
            ),
            output: json!({ "intent": intent, "keywords": kw, "entities": entities }),
            confidence,
        }
    }

    fn integrate_context(
        &self,
        input: &str,
        input_keywords: &serde_json::Value,
        context: &ContextSnapshot,
    ) -> ReasoningStep {
        let window_start = context
            .recent_messages
            .len()
            .saturating_sub(self.config.context_window);
        let window = &context.recent_messages[window_start..];
        let relevance = if window.is_empty() {
            0.0
        } else {
            window
                .iter()
                .map(|m| text_similarity(input, &m.content))
                .sum::<f64>()
                / window.len() as f64
        };
        let (confidence, justification) = if window.is_empty() {
            (0.6, "No prior conversation to relate the input to".to_string())
        } else {
            (
                0.6 + 0.4 * relevance,
                format!(
                    "Compared input with {} recent message(s); average similarity {:.2}; flow {}",
                    window.len(),
                    relevance,
                    context.flow
                ),
            )
        };
        ReasoningStep {
            kind: StepKind::ContextIntegration,
            description: "Integrate conversation context".to_string(),
            input: json!({ "keywords": input_keywords, "context_id": context.context_id }),
            output: json!({
                "keywords": input_keywords,
                "relevance": relevance,
                "compared_messages": window.len(),
                "topics": context.topics,
                "flow": context.flow,
            }),
            confidence,
            justification,
        }
    }

    fn validate(&self, input: &str, steps: &[ReasoningStep]) -> ReasoningStep {
        let scores = validate_steps(steps, input, self.config.flow_swing_threshold);
        let previous = steps.last().map(|s| s.output.clone()).unwrap_or_default();
        ReasoningStep {
            kind: StepKind::Validation,
            description: "Validate reasoning".to_string(),
            input: previous,
            output: json!({
                "consistency": scores.consistency,
                "completeness": scores.completeness,
                "relevance": scores.relevance,
                "logical_flow": scores.logical_flow,
                "score": scores.overall,
            }),
            confidence: scores.overall,
            justification: format!(
                "consistency {:.2}, completeness {:.2}, relevance {:.2}, logical flow {:.2}",
                scores.consistency, scores.completeness, scores.relevance, scores.logical_flow
            ),
        }
    }

    fn remember(&self, chain: ReasoningChain) {
        let mut history = self.lock_history();
        history.push_back(chain);
        while history.len() > self.config.max_history {
            history.pop_front();
        }
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, VecDeque<ReasoningChain>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn rank_modules(
    ranked: &[&ModuleResponse],
    input_keywords: &serde_json::Value,
    relevance: &serde_json::Value,
) -> ReasoningStep {
    let top = ranked[0];
    let ranking: Vec<serde_json::Value> = ranked
        .iter()
        .map(|r| json!({ "source": r.source, "confidence": r.confidence }))
        .collect();
    ReasoningStep {
        kind: StepKind::ResponseAnalysis,
        description: "Rank module responses".to_string(),
        input: json!({
            "keywords": input_keywords,
            "relevance": relevance,
            "responses": ranked.len(),
        }),
        output: json!({
            "ranking": ranking,
            "top_source": top.source,
            "top_confidence": top.confidence,
        }),
        confidence: top.confidence,
        justification: format!(
            "{} of {} response(s) ranked first with confidence {:.2}",
            top.source,
            ranked.len(),
            top.confidence
        ),
    }
}

fn conclude(top: Option<&ModuleResponse>, score: &serde_json::Value) -> (String, ReasoningStep) {
    let (conclusion, source, confidence) = match top {
        Some(r) => (
            format!(
                "{} provided the strongest answer (confidence {:.2})",
                r.source, r.confidence
            ),
            Some(r.source.clone()),
            r.confidence,
        ),
        None => (
            "No confident answer: no module produced a usable response".to_string(),
            None,
            NO_ANSWER_CONFIDENCE,
        ),
    };
    let step = ReasoningStep {
        kind: StepKind::Conclusion,
        description: "Draw conclusion".to_string(),
        input: json!({ "score": score }),
        output: json!({ "score": score, "conclusion": conclusion, "source": source }),
        confidence,
        justification: conclusion.clone(),
    };
    (conclusion, step)
}

/// Coarse question type from the leading word of the input.
fn question_type(input: &str) -> &'static str {
    let lower = input.trim().to_lowercase();
    let first = lower.split_whitespace().next().unwrap_or("");
    match first {
        "what" | "what's" => "what",
        "how" => "how",
        "why" => "why",
        "when" => "when",
        "where" => "where",
        "who" => "who",
        _ if input.chars().any(|c| c.is_ascii_digit())
            && input.chars().any(|c| "+-*/".contains(c)) =>
        {
            "calculation"
        }
        _ if lower.ends_with('?') => "question",
        _ => "statement",
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
