//! Conversation context management.
//!
//! Tracks the active session, maintains bounded message/topic/entity
//! windows, derives the flow state of each user turn, and archives ended
//! sessions into a small history ring.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use cogito_core::config::ContextConfig;
use cogito_core::text::{extract_entities, text_similarity};
use cogito_core::{
    Clock, ContextSnapshot, ConversationContext, FlowState, Message, MessageMetadata, Role,
};

use crate::topics::derive_topics;

/// Serializable snapshot of the manager's full state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextExport {
    pub current: Option<ConversationContext>,
    #[serde(default)]
    pub history: Vec<ConversationContext>,
}

// =============================================================================
// ContextManager
// =============================================================================

/// Owns the rolling state of one conversation.
///
/// A missing or expired session is never an error: every entry point
/// creates a fresh context on demand.
pub struct ContextManager {
    config: ContextConfig,
    clock: Arc<dyn Clock>,
    current: Option<ConversationContext>,
    history: VecDeque<ConversationContext>,
}

impl ContextManager {
    /// Create a manager with no active session.
    pub fn new(config: ContextConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            current: None,
            history: VecDeque::new(),
        }
    }

    /// Start a new session.
    ///
    /// A previous session that holds messages is archived first.
    pub fn create_context(&mut self) -> Uuid {
        if let Some(previous) = self.current.take() {
            if !previous.messages.is_empty() {
                self.archive(previous);
            }
        }
        let context = ConversationContext::new(self.clock.now());
        let id = context.id;
        debug!(context_id = %id, "Conversation context created");
        self.current = Some(context);
        id
    }

    /// Append a message and recompute topics, entities, and flow.
    ///
    /// The flow state is only re-derived for user messages; assistant
    /// replies leave it untouched. Returns the flow state after the append.
    pub fn add_message(
        &mut self,
        role: Role,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> FlowState {
        let now = self.clock.now();
        self.ensure_active(now);

        let follow_up_window = Duration::seconds(i64::from(self.config.follow_up_window_secs));
        let follow_up_similarity = self.config.follow_up_similarity;
        let max_messages = self.config.max_messages;
        let max_topics = self.config.max_topics;
        let max_entities = self.config.max_entities;

        let Some(context) = self.current.as_mut() else {
            return FlowState::New;
        };

        let derived_topics = derive_topics(content);
        let prior_user = context
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| (m.timestamp, m.content.clone()));

        context.messages.push(Message {
            role,
            content: content.to_string(),
            timestamp: now,
            metadata,
        });

        if role == Role::User {
            context.flow = if context.messages.len() <= 2 {
                FlowState::New
            } else if prior_user.as_ref().is_some_and(|(at, text)| {
                now - *at < follow_up_window
                    && text_similarity(text, content) > follow_up_similarity
            }) {
                FlowState::FollowUp
            } else if !derived_topics.iter().all(|t| context.topics.contains(t)) {
                FlowState::TopicChange
            } else {
                FlowState::Continuing
            };
        }

        for topic in derived_topics {
            if !context.topics.contains(&topic) {
                context.topics.push(topic);
            }
        }
        context.entities.extend(extract_entities(content));

        trim_front(&mut context.messages, max_messages);
        trim_front(&mut context.topics, max_topics);
        trim_front(&mut context.entities, max_entities);

        context.last_activity = now;
        context.flow
    }

    /// Read the current conversation state for `input`.
    ///
    /// Creates a context if none is active.
    pub fn extract_context(&mut self, input: &str) -> ContextSnapshot {
        let now = self.clock.now();
        self.ensure_active(now);

        let Some(context) = self.current.as_ref() else {
            return ContextSnapshot::empty();
        };
        debug!(
            context_id = %context.id,
            input_len = input.len(),
            messages = context.messages.len(),
            "Extracting conversation context"
        );

        let recent_start = context
            .messages
            .len()
            .saturating_sub(self.config.recent_messages);
        ContextSnapshot {
            context_id: context.id,
            topics: tail(&context.topics, self.config.max_topics),
            entities: tail(&context.entities, self.config.max_entities),
            flow: context.flow,
            session_duration_secs: (now - context.started_at).num_seconds().max(0),
            message_count: context.messages.len(),
            recent_messages: context.messages[recent_start..].to_vec(),
        }
    }

    /// Whether a session exists and has seen activity within the timeout.
    pub fn is_session_active(&self) -> bool {
        match &self.current {
            Some(context) => !self.is_expired(context, self.clock.now()),
            None => false,
        }
    }

    /// End the active session and archive it. Returns the archived id.
    pub fn end_session(&mut self) -> Option<Uuid> {
        let context = self.current.take()?;
        let id = context.id;
        self.archive(context);
        Some(id)
    }

    /// The active session, if any.
    pub fn current(&self) -> Option<&ConversationContext> {
        self.current.as_ref()
    }

    /// Archived sessions, oldest first.
    pub fn history(&self) -> Vec<ConversationContext> {
        self.history.iter().cloned().collect()
    }

    /// Snapshot the full state for an external persistence collaborator.
    pub fn export_context(&self) -> ContextExport {
        ContextExport {
            current: self.current.clone(),
            history: self.history(),
        }
    }

    /// Restore state produced by [`export_context`](Self::export_context).
    ///
    /// Bounds are re-applied so an oversized export cannot break invariants.
    pub fn import_context(&mut self, data: ContextExport) {
        self.current = data.current.map(|mut context| {
            trim_front(&mut context.messages, self.config.max_messages);
            trim_front(&mut context.topics, self.config.max_topics);
            trim_front(&mut context.entities, self.config.max_entities);
            context
        });
        self.history = data.history.into_iter().collect();
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
    }

    // -- Private helpers --

    fn is_expired(&self, context: &ConversationContext, now: DateTime<Utc>) -> bool {
        let timeout = Duration::minutes(i64::from(self.config.session_timeout_minutes));
        now - context.last_activity > timeout
    }

    /// Make sure a live context exists, discarding an expired one.
    fn ensure_active(&mut self, now: DateTime<Utc>) {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|context| self.is_expired(context, now));
        if expired {
            if let Some(stale) = self.current.take() {
                debug!(context_id = %stale.id, "Session timed out, discarding context");
            }
        }
        if self.current.is_none() {
            self.create_context();
        }
    }

    fn archive(&mut self, context: ConversationContext) {
        debug!(context_id = %context.id, messages = context.messages.len(), "Archiving session");
        self.history.push_back(context);
        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }
    }
}

/// Drop the oldest entries until at most `max` remain.
fn trim_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}

fn tail<T: Clone>(items: &[T], max: usize) -> Vec<T> {
    items[items.len().saturating_sub(max)..].to_vec()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cogito_core::ManualClock;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
    }

    fn make_manager() -> (ContextManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let mgr = ContextManager::new(ContextConfig::default(), clock.clone());
        (mgr, clock)
    }

    // ---- Creation ----

    #[test]
    fn test_create_context_has_uuid_and_timestamps() {
        let (mut mgr, _) = make_manager();
        let id = mgr.create_context();
        assert_ne!(id, Uuid::nil());
        let ctx = mgr.current().unwrap();
        assert_eq!(ctx.started_at, start());
        assert_eq!(ctx.flow, FlowState::New);
        assert!(ctx.topics.is_empty());
        assert!(ctx.entities.is_empty());
    }

    #[test]
    fn test_create_context_archives_previous_session() {
        let (mut mgr, _) = make_manager();
        let first = mgr.create_context();
        mgr.add_message(Role::User, "hello", None);
        mgr.create_context();
        let history = mgr.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first);
    }

    #[test]
    fn test_extract_context_auto_creates() {
        let (mut mgr, _) = make_manager();
        assert!(mgr.current().is_none());
        let snap = mgr.extract_context("anything");
        assert_ne!(snap.context_id, Uuid::nil());
        assert_eq!(snap.message_count, 0);
        assert!(mgr.current().is_some());
    }

    // ---- Flow state ----

    #[test]
    fn test_first_messages_are_new() {
        let (mut mgr, _) = make_manager();
        assert_eq!(mgr.add_message(Role::User, "hello", None), FlowState::New);
        assert_eq!(
            mgr.add_message(Role::Assistant, "Hi! How can I help?", None),
            FlowState::New
        );
    }

    #[test]
    fn test_similar_message_within_window_is_follow_up() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "what is rust programming", None);
        mgr.add_message(Role::Assistant, "A systems language.", None);
        clock.advance(Duration::seconds(10));
        let flow = mgr.add_message(Role::User, "what is rust programming language", None);
        assert_eq!(flow, FlowState::FollowUp);
    }

    #[test]
    fn test_similar_message_outside_window_is_not_follow_up() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "what is rust programming", None);
        mgr.add_message(Role::Assistant, "A systems language.", None);
        clock.advance(Duration::seconds(45));
        let flow = mgr.add_message(Role::User, "what is rust programming language", None);
        assert_eq!(flow, FlowState::Continuing);
    }

    #[test]
    fn test_new_topic_is_topic_change() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "calculate the sum of 2 and 3", None);
        mgr.add_message(Role::Assistant, "5", None);
        clock.advance(Duration::seconds(60));
        let flow = mgr.add_message(Role::User, "explain quantum physics", None);
        assert_eq!(flow, FlowState::TopicChange);
    }

    #[test]
    fn test_known_topic_is_continuing() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "calculate the sum of 2 and 3", None);
        mgr.add_message(Role::Assistant, "5", None);
        clock.advance(Duration::seconds(60));
        let flow = mgr.add_message(Role::User, "now multiply 4 by 9", None);
        assert_eq!(flow, FlowState::Continuing);
    }

    #[test]
    fn test_assistant_message_keeps_flow() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "calculate 2 plus 3", None);
        mgr.add_message(Role::Assistant, "5", None);
        clock.advance(Duration::seconds(60));
        mgr.add_message(Role::User, "tell me about gravity in physics", None);
        let flow = mgr.add_message(Role::Assistant, "Gravity attracts masses.", None);
        assert_eq!(flow, FlowState::TopicChange);
    }

    // ---- Topics and entities ----

    #[test]
    fn test_topics_and_entities_extracted() {
        let (mut mgr, _) = make_manager();
        mgr.add_message(Role::User, "Ask about Marie Curie and chemistry with 42 atoms", None);
        let snap = mgr.extract_context("");
        assert_eq!(snap.topics, vec!["science"]);
        let values: Vec<&str> = snap.entities.iter().map(|e| e.value.as_str()).collect();
        assert!(values.contains(&"42"));
        assert!(values.contains(&"Marie Curie"));
    }

    #[test]
    fn test_bounds_are_enforced() {
        let (mut mgr, clock) = make_manager();
        for i in 0..120 {
            clock.advance(Duration::seconds(1));
            mgr.add_message(Role::User, &format!("number {} and {} and Item{}", i, i + 1, i), None);
        }
        let ctx = mgr.current().unwrap();
        assert_eq!(ctx.messages.len(), 50);
        assert!(ctx.entities.len() <= 50);
        assert!(ctx.topics.len() <= 20);
        assert_eq!(ctx.messages.last().unwrap().content, "number 119 and 120 and Item119");

        let snap = mgr.extract_context("next");
        assert_eq!(snap.recent_messages.len(), 5);
        assert!(snap.entities.len() <= 50);
        assert_eq!(snap.message_count, 50);
    }

    #[test]
    fn test_topic_cap_trims_oldest() {
        let config = ContextConfig {
            max_topics: 2,
            ..ContextConfig::default()
        };
        let clock = Arc::new(ManualClock::new(start()));
        let mut mgr = ContextManager::new(config, clock);
        mgr.add_message(Role::User, "math", None);
        mgr.add_message(Role::User, "physics", None);
        mgr.add_message(Role::User, "software", None);
        assert_eq!(mgr.current().unwrap().topics, vec!["science", "technology"]);
    }

    // ---- Session lifecycle ----

    #[test]
    fn test_session_active_and_timeout() {
        let (mut mgr, clock) = make_manager();
        assert!(!mgr.is_session_active());
        mgr.add_message(Role::User, "hello", None);
        assert!(mgr.is_session_active());

        clock.advance(Duration::minutes(29));
        assert!(mgr.is_session_active());

        clock.advance(Duration::minutes(2));
        assert!(!mgr.is_session_active());
    }

    #[test]
    fn test_expired_session_is_discarded_not_archived() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "hello", None);
        let old_id = mgr.current().unwrap().id;

        clock.advance(Duration::minutes(31));
        let snap = mgr.extract_context("are you there?");
        assert_ne!(snap.context_id, old_id);
        assert_eq!(snap.message_count, 0);
        assert!(mgr.history().is_empty());
    }

    #[test]
    fn test_end_session_archives_with_bound() {
        let (mut mgr, _) = make_manager();
        for i in 0..12 {
            mgr.add_message(Role::User, &format!("session {}", i), None);
            assert!(mgr.end_session().is_some());
        }
        let history = mgr.history();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].messages[0].content, "session 2");
        assert!(mgr.current().is_none());
        assert!(mgr.end_session().is_none());
    }

    #[test]
    fn test_session_duration() {
        let (mut mgr, clock) = make_manager();
        mgr.add_message(Role::User, "hello", None);
        clock.advance(Duration::seconds(90));
        let snap = mgr.extract_context("still here");
        assert_eq!(snap.session_duration_secs, 90);
    }

    // ---- Export / import ----

    #[test]
    fn test_export_import_roundtrip_through_json() {
        let (mut mgr, _) = make_manager();
        mgr.add_message(Role::User, "define serendipity", None);
        mgr.add_message(
            Role::Assistant,
            "serendipity: a happy accident",
            Some(MessageMetadata {
                confidence: Some(0.9),
                sources: vec!["vocabulary".to_string()],
            }),
        );
        let exported = mgr.export_context();
        let json = serde_json::to_string(&exported).unwrap();

        let (mut restored, _) = make_manager();
        restored.import_context(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.export_context(), exported);
        assert_eq!(restored.current().unwrap().messages.len(), 2);
    }

    #[test]
    fn test_import_reapplies_bounds() {
        let (mut source, _) = make_manager();
        for i in 0..60 {
            source.add_message(Role::User, &format!("message {}", i), None);
        }
        let mut exported = source.export_context();
        let ctx = exported.current.as_mut().unwrap();
        for i in 60..80 {
            ctx.messages.push(Message {
                role: Role::User,
                content: format!("message {}", i),
                timestamp: start(),
                metadata: None,
            });
        }

        let (mut restored, _) = make_manager();
        restored.import_context(exported);
        let ctx = restored.current().unwrap();
        assert_eq!(ctx.messages.len(), 50);
        assert_eq!(ctx.messages.last().unwrap().content, "message 79");
    }
}
