//! Interaction pattern learning for cogito.
//!
//! Mines recurring patterns from past interactions: high-confidence
//! interactions synchronously, everything else in periodic batches.
//! The pattern table is flushed to a durable [`PatternStore`] on a slower
//! cadence, best effort.

pub mod engine;
pub mod error;
pub mod extractor;
pub mod scheduler;
pub mod store;
pub mod types;

pub use engine::LearningEngine;
pub use error::LearningError;
pub use scheduler::LearningScheduler;
pub use store::{InMemoryPatternStore, PatternStore, SqlitePatternStore};
pub use types::{
    InteractionRecord, LearningPattern, LearningStats, PatternKind, PatternSnapshot,
    PersistOutcome, PersistReport, SweepReport,
};
