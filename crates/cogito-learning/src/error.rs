//! Error types for the learning engine.

use cogito_core::error::CogitoError;

/// Errors from pattern extraction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("Invalid interaction: {0}")]
    InvalidInteraction(String),
    #[error("Pattern store error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<serde_json::Error> for LearningError {
    fn from(err: serde_json::Error) -> Self {
        LearningError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for LearningError {
    fn from(err: rusqlite::Error) -> Self {
        LearningError::Storage(err.to_string())
    }
}

impl From<LearningError> for CogitoError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::Storage(msg) => CogitoError::Storage(msg),
            LearningError::Serialization(msg) => CogitoError::Serialization(msg),
            other => CogitoError::Learning(other.to_string()),
        }
    }
}
