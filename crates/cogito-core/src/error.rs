use thiserror::Error;

/// Top-level error type for the cogito system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for CogitoError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CogitoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Module error: {0}")]
    Module(String),

    #[error("Learning error: {0}")]
    Learning(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for CogitoError {
    fn from(err: toml::de::Error) -> Self {
        CogitoError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CogitoError {
    fn from(err: toml::ser::Error) -> Self {
        CogitoError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CogitoError {
    fn from(err: serde_json::Error) -> Self {
        CogitoError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for cogito operations.
pub type Result<T> = std::result::Result<T, CogitoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CogitoError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = CogitoError::Storage("database locked".to_string());
        assert_eq!(err.to_string(), "Storage error: database locked");

        assert_eq!(CogitoError::ShuttingDown.to_string(), "Shutdown in progress");
    }

    #[test]
    fn test_every_variant_has_a_source() {
        // Each variant is produced by a conversion or a config path.
        let errors = vec![
            CogitoError::Config("bad".to_string()),
            CogitoError::Module("bad".to_string()),
            CogitoError::Learning("bad".to_string()),
            CogitoError::Storage("bad".to_string()),
            CogitoError::Io(std::io::Error::other("bad")),
            CogitoError::Serialization("bad".to_string()),
            CogitoError::ShuttingDown,
        ];
        for err in errors {
            let label = match &err {
                CogitoError::Config(_) => "Configuration",
                CogitoError::Module(_) => "Module",
                CogitoError::Learning(_) => "Learning",
                CogitoError::Storage(_) => "Storage",
                CogitoError::Io(_) => "I/O",
                CogitoError::Serialization(_) => "Serialization",
                CogitoError::ShuttingDown => "Shutdown",
            };
            assert!(err.to_string().starts_with(label));
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CogitoError = io_err.into();
        assert!(matches!(err, CogitoError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CogitoError = json_err.into();
        assert!(matches!(err, CogitoError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: CogitoError = toml_err.into();
        assert!(matches!(err, CogitoError::Config(_)));
    }
}
