//! Error types for the cognitive engine.

use cogito_core::error::CogitoError;

/// Why a knowledge module produced no usable response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleError {
    #[error("module {0} is not initialized")]
    NotInitialized(String),
    #[error("module {module} failed: {reason}")]
    Failed { module: String, reason: String },
    #[error("module {module} timed out after {timeout_ms}ms")]
    Timeout { module: String, timeout_ms: u64 },
    #[error("module {0} panicked")]
    Panicked(String),
}

impl ModuleError {
    pub fn failed(module: impl Into<String>, reason: impl Into<String>) -> Self {
        ModuleError::Failed {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Errors inside the request pipeline. None of these reach
/// [`crate::CognitiveEngine::process_input`] callers; they become the
/// reason text of a fallback response.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is shutting down")]
    ShuttingDown,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request worker failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl From<ModuleError> for CogitoError {
    fn from(err: ModuleError) -> Self {
        CogitoError::Module(err.to_string())
    }
}

impl From<EngineError> for CogitoError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ShuttingDown => CogitoError::ShuttingDown,
            EngineError::Module(e) => e.into(),
            other => CogitoError::Module(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_display() {
        let err = ModuleError::Timeout {
            module: "facts".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "module facts timed out after 5000ms");

        let err = ModuleError::failed("vocabulary", "lookup service unavailable");
        assert_eq!(
            err.to_string(),
            "module vocabulary failed: lookup service unavailable"
        );
    }

    #[test]
    fn test_engine_error_into_cogito_error() {
        let err: CogitoError = EngineError::ShuttingDown.into();
        assert!(matches!(err, CogitoError::ShuttingDown));

        let err: CogitoError = EngineError::from(ModuleError::Panicked("math".to_string())).into();
        assert!(matches!(err, CogitoError::Module(_)));
    }
}
