//! Conversation context tracking for cogito.
//!
//! Owns the rolling, bounded state of one chat session: messages, topics,
//! entities, and the conversational flow state derived from them.

pub mod manager;
pub mod topics;

pub use manager::{ContextExport, ContextManager};
pub use topics::derive_topics;
