use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CogitoError, Result};

/// Top-level configuration for cogito.
///
/// Loaded from `~/.cogito/config.toml` by default. Each section corresponds
/// to one pipeline component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CogitoConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub learning: LearningConfig,
}

impl CogitoConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CogitoConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CogitoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the pattern database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.cogito/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Conversation context bounds and flow detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Messages retained per session; oldest are trimmed.
    pub max_messages: usize,
    /// Distinct topics retained per session.
    pub max_topics: usize,
    /// Entities retained per session.
    pub max_entities: usize,
    /// Archived sessions kept in the history ring.
    pub max_history: usize,
    /// Inactivity after which a session is discarded.
    pub session_timeout_minutes: u32,
    /// Maximum gap to the previous user message for a follow-up.
    pub follow_up_window_secs: u32,
    /// Minimum token-Jaccard similarity for a follow-up.
    pub follow_up_similarity: f64,
    /// Messages included in a context snapshot.
    pub recent_messages: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: 50,
            max_topics: 20,
            max_entities: 50,
            max_history: 10,
            session_timeout_minutes: 30,
            follow_up_window_secs: 30,
            follow_up_similarity: 0.6,
            recent_messages: 5,
        }
    }
}

/// Cognitive engine dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-module processing timeout in milliseconds.
    pub module_timeout_ms: u64,
    /// Responses at or below this confidence are discarded.
    pub min_response_confidence: f64,
    /// Lower bound for the aggregated answer confidence.
    pub confidence_floor: f64,
    /// Pending requests the FIFO queue holds before callers wait.
    pub queue_capacity: usize,
    /// Build a reasoning chain for every answered request.
    pub enable_reasoning: bool,
    /// Inputs longer than this (in characters) are rejected.
    pub max_input_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            module_timeout_ms: 5_000,
            min_response_confidence: 0.2,
            confidence_floor: 0.1,
            queue_capacity: 64,
            enable_reasoning: true,
            max_input_length: 2_000,
        }
    }
}

/// Reasoning chain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Chains kept in the in-memory history.
    pub max_history: usize,
    /// Recent messages compared against the input for context relevance.
    pub context_window: usize,
    /// Confidence jump between adjacent steps considered a logic break.
    pub flow_swing_threshold: f64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_history: 100,
            context_window: 3,
            flow_swing_threshold: 0.5,
        }
    }
}

/// Pattern learning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Whether interactions are recorded at all.
    pub enabled: bool,
    /// Interactions at or above this confidence are mined immediately.
    pub high_confidence_threshold: f64,
    /// Queued interactions processed per sweep.
    pub batch_size: usize,
    /// Seconds between pattern sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds between persistence flushes.
    pub persist_interval_secs: u64,
    /// Token similarity above which queued inputs cluster together.
    pub similarity_threshold: f64,
    /// Example inputs retained per pattern.
    pub max_examples: usize,
    /// Days without observation after which a pattern becomes stale.
    pub stale_after_days: u32,
    /// Stale patterns with fewer occurrences than this are pruned.
    pub min_occurrences: u64,
    /// Key under which the pattern table is persisted.
    pub storage_key: String,
    /// Maximum queued interactions; the oldest are dropped beyond this.
    pub max_queue: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            high_confidence_threshold: 0.8,
            batch_size: 10,
            sweep_interval_secs: 30,
            persist_interval_secs: 300,
            similarity_threshold: 0.6,
            max_examples: 10,
            stale_after_days: 30,
            min_occurrences: 3,
            storage_key: "learning_patterns".to_string(),
            max_queue: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = CogitoConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.context.max_messages, 50);
        assert_eq!(config.context.max_topics, 20);
        assert_eq!(config.context.max_entities, 50);
        assert_eq!(config.context.session_timeout_minutes, 30);
        assert_eq!(config.engine.module_timeout_ms, 5_000);
        assert_eq!(config.engine.min_response_confidence, 0.2);
        assert_eq!(config.learning.batch_size, 10);
        assert_eq!(config.learning.sweep_interval_secs, 30);
        assert_eq!(config.learning.persist_interval_secs, 300);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[engine]
module_timeout_ms = 250

[learning]
enabled = false
"#;
        let file = create_temp_config(content);
        let config = CogitoConfig::load(file.path()).unwrap();
        assert_eq!(config.engine.module_timeout_ms, 250);
        assert!(!config.learning.enabled);
        assert_eq!(config.engine.confidence_floor, 0.1);
        assert_eq!(config.context.follow_up_window_secs, 30);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[engine\nmodule_timeout_ms = ");
        let err = CogitoConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CogitoError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = CogitoConfig::load_or_default(Path::new("/nonexistent/cogito.toml"));
        assert_eq!(config.general.data_dir, "~/.cogito/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CogitoConfig::default();
        config.reasoning.max_history = 7;
        config.save(&path).unwrap();

        let reloaded = CogitoConfig::load(&path).unwrap();
        assert_eq!(reloaded.reasoning.max_history, 7);
        assert_eq!(reloaded.learning.storage_key, "learning_patterns");
    }
}
