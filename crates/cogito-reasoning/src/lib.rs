//! Explainable reasoning chains for cogito.
//!
//! Builds an ordered, scored trace of the judgments made while composing
//! an answer: input analysis, context integration, module ranking,
//! validation, and conclusion.

pub mod engine;
pub mod types;
pub mod validation;

pub use engine::ReasoningEngine;
pub use types::{ReasoningChain, ReasoningStep, StepKind, ValidationScores};
pub use validation::validate_steps;
