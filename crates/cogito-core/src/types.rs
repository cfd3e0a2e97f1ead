use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Messages
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Optional annotations attached to an assistant message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub confidence: Option<f64>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// A single conversation message. Immutable once appended to a context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

// =============================================================================
// Entities
// =============================================================================

/// Kind of entity pulled out of an utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Number,
    ProperNoun,
    Operator,
    Term,
    Subject,
    Language,
    Name,
    Concept,
    Command,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Number => "number",
            EntityKind::ProperNoun => "proper_noun",
            EntityKind::Operator => "operator",
            EntityKind::Term => "term",
            EntityKind::Subject => "subject",
            EntityKind::Language => "language",
            EntityKind::Name => "name",
            EntityKind::Concept => "concept",
            EntityKind::Command => "command",
        };
        f.write_str(s)
    }
}

/// An extracted entity with its extraction confidence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
    pub confidence: f64,
}

impl Entity {
    pub fn new(kind: EntityKind, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence: crate::confidence::clamp_confidence(confidence),
        }
    }
}

// =============================================================================
// Conversation context
// =============================================================================

/// How the latest message relates to the conversation so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    New,
    Continuing,
    FollowUp,
    TopicChange,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowState::New => "new",
            FlowState::Continuing => "continuing",
            FlowState::FollowUp => "follow_up",
            FlowState::TopicChange => "topic_change",
        };
        f.write_str(s)
    }
}

/// Rolling, bounded state of one chat session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub id: Uuid,
    pub messages: Vec<Message>,
    /// Distinct topics in first-seen order.
    pub topics: Vec<String>,
    pub entities: Vec<Entity>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub flow: FlowState,
}

impl ConversationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
            topics: Vec::new(),
            entities: Vec::new(),
            started_at: now,
            last_activity: now,
            flow: FlowState::New,
        }
    }
}

/// Read-only view of the conversation handed to modules and engines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub context_id: Uuid,
    pub topics: Vec<String>,
    pub entities: Vec<Entity>,
    pub flow: FlowState,
    pub session_duration_secs: i64,
    pub message_count: usize,
    pub recent_messages: Vec<Message>,
}

impl ContextSnapshot {
    /// Snapshot of a conversation that has not started yet.
    pub fn empty() -> Self {
        Self {
            context_id: Uuid::nil(),
            topics: Vec::new(),
            entities: Vec::new(),
            flow: FlowState::New,
            session_duration_secs: 0,
            message_count: 0,
            recent_messages: Vec::new(),
        }
    }
}

// =============================================================================
// Intent
// =============================================================================

/// Coarse category assigned to an utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Mathematics,
    Vocabulary,
    Facts,
    Coding,
    Personal,
    Philosophy,
    System,
    General,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Mathematics => "mathematics",
            IntentCategory::Vocabulary => "vocabulary",
            IntentCategory::Facts => "facts",
            IntentCategory::Coding => "coding",
            IntentCategory::Personal => "personal",
            IntentCategory::Philosophy => "philosophy",
            IntentCategory::System => "system",
            IntentCategory::General => "general",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one input. Created per request, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: IntentCategory,
    pub confidence: f64,
    pub entities: Vec<Entity>,
    pub suggested_modules: Vec<String>,
    pub context: ContextSnapshot,
}

// =============================================================================
// Module responses
// =============================================================================

/// Closed set of answer shapes a knowledge module can return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePayload {
    Text {
        text: String,
    },
    Numeric {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
        value: f64,
    },
    Definition {
        term: String,
        definition: String,
    },
    Raw {
        value: serde_json::Value,
    },
}

impl ResponsePayload {
    pub fn text(text: impl Into<String>) -> Self {
        ResponsePayload::Text { text: text.into() }
    }

    /// Normalize a loosely shaped JSON answer into the closed set.
    ///
    /// Recognizes a plain string, `{answer}`, `{content}`, `{definition}`
    /// (with optional `word`/`term`), and `{result}`; anything else is
    /// kept as [`ResponsePayload::Raw`].
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match &value {
            Value::String(s) => return ResponsePayload::text(s.clone()),
            Value::Object(map) => {
                if let Some(Value::String(answer)) = map.get("answer") {
                    return ResponsePayload::text(answer.clone());
                }
                if let Some(Value::String(definition)) = map.get("definition") {
                    let term = map
                        .get("term")
                        .or_else(|| map.get("word"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    return ResponsePayload::Definition {
                        term,
                        definition: definition.clone(),
                    };
                }
                match map.get("result") {
                    Some(Value::Number(n)) => {
                        if let Some(v) = n.as_f64() {
                            let expression = map
                                .get("expression")
                                .and_then(Value::as_str)
                                .map(str::to_string);
                            return ResponsePayload::Numeric {
                                expression,
                                value: v,
                            };
                        }
                    }
                    Some(Value::String(s)) => return ResponsePayload::text(s.clone()),
                    _ => {}
                }
                if let Some(Value::String(content)) = map.get("content") {
                    return ResponsePayload::text(content.clone());
                }
            }
            _ => {}
        }
        ResponsePayload::Raw { value }
    }

    /// Human-readable text for this payload.
    pub fn primary_text(&self) -> String {
        match self {
            ResponsePayload::Text { text } => text.clone(),
            ResponsePayload::Numeric { expression, value } => {
                let formatted = format_number(*value);
                match expression {
                    Some(expr) => format!("{} = {}", expr, formatted),
                    None => formatted,
                }
            }
            ResponsePayload::Definition { term, definition } => {
                if term.is_empty() {
                    definition.clone()
                } else {
                    format!("{}: {}", term, definition)
                }
            }
            ResponsePayload::Raw { value } => {
                serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Format a float without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.6}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Answer produced by a knowledge module. Read-only to the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleResponse {
    pub source: String,
    pub success: bool,
    pub confidence: f64,
    pub payload: ResponsePayload,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ModuleResponse {
    /// Successful response with the confidence clamped into `[0, 1]`.
    pub fn success(
        source: impl Into<String>,
        confidence: f64,
        payload: ResponsePayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            success: true,
            confidence: crate::confidence::clamp_confidence(confidence),
            payload,
            timestamp,
            metadata: None,
        }
    }

    /// Unsuccessful response carrying a reason.
    pub fn failure(
        source: impl Into<String>,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            success: false,
            confidence: 0.0,
            payload: ResponsePayload::text(reason),
            timestamp,
            metadata: None,
        }
    }
}

// =============================================================================
// Engine output
// =============================================================================

/// Final answer returned by the cognitive engine for one input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub response: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub reasoning: Vec<String>,
    pub intent: IntentCategory,
    /// Id of the reasoning chain built for this answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_plain_string() {
        let p = ResponsePayload::from_json(json!("hello"));
        assert_eq!(p, ResponsePayload::text("hello"));
    }

    #[test]
    fn test_payload_from_answer_object() {
        let p = ResponsePayload::from_json(json!({"answer": "Paris", "extra": 1}));
        assert_eq!(p.primary_text(), "Paris");
    }

    #[test]
    fn test_payload_from_definition_object() {
        let p = ResponsePayload::from_json(
            json!({"word": "ephemeral", "definition": "lasting a short time"}),
        );
        assert_eq!(p.primary_text(), "ephemeral: lasting a short time");
    }

    #[test]
    fn test_payload_from_numeric_result() {
        let p = ResponsePayload::from_json(json!({"result": 120, "expression": "15 * 8"}));
        assert_eq!(
            p,
            ResponsePayload::Numeric {
                expression: Some("15 * 8".to_string()),
                value: 120.0
            }
        );
        assert_eq!(p.primary_text(), "15 * 8 = 120");
    }

    #[test]
    fn test_payload_from_content_object() {
        let p = ResponsePayload::from_json(json!({"content": "Rust is a systems language"}));
        assert_eq!(p.primary_text(), "Rust is a systems language");
    }

    #[test]
    fn test_payload_unknown_shape_is_raw() {
        let p = ResponsePayload::from_json(json!({"items": [1, 2]}));
        assert!(matches!(p, ResponsePayload::Raw { .. }));
        assert_eq!(p.primary_text(), r#"{"items":[1,2]}"#);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(17.0), "17");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
    }

    #[test]
    fn test_module_response_clamps_confidence() {
        let r = ModuleResponse::success("facts", 1.7, ResponsePayload::text("x"), Utc::now());
        assert_eq!(r.confidence, 1.0);
        assert!(r.success);

        let f = ModuleResponse::failure("facts", "offline", Utc::now());
        assert!(!f.success);
        assert_eq!(f.confidence, 0.0);
    }

    #[test]
    fn test_flow_state_serde_names() {
        let s = serde_json::to_string(&FlowState::FollowUp).unwrap();
        assert_eq!(s, "\"follow_up\"");
        assert_eq!(FlowState::TopicChange.to_string(), "topic_change");
    }

    #[test]
    fn test_intent_category_names() {
        assert_eq!(IntentCategory::Mathematics.as_str(), "mathematics");
        assert_eq!(IntentCategory::General.to_string(), "general");
    }
}
