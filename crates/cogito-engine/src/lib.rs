//! The cognitive engine: intent classification, concurrent module dispatch,
//! response synthesis, and the FIFO request worker that ties the context,
//! reasoning, and learning crates together.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod intent;
pub mod module;
pub mod synthesis;

pub use dispatch::DispatchReport;
pub use engine::{CognitiveEngine, EngineStats};
pub use error::{EngineError, ModuleError};
pub use intent::{analyze_intent, IntentRule};
pub use module::{KnowledgeModule, ModuleRegistry};
