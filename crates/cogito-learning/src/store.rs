//! Durable storage for the pattern table.
//!
//! The engine talks to storage only through [`PatternStore`]. Snapshots are
//! stored as JSON under a caller-chosen key.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::LearningError;
use crate::types::PatternSnapshot;

/// Durable store for serialized pattern tables.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Load the snapshot stored under `key`, if any.
    async fn load_patterns(&self, key: &str) -> Result<Option<PatternSnapshot>, LearningError>;

    /// Replace the snapshot stored under `key`.
    async fn save_patterns(&self, key: &str, snapshot: &PatternSnapshot)
        -> Result<(), LearningError>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store. Snapshots survive only as long as the store does.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn load_patterns(&self, key: &str) -> Result<Option<PatternSnapshot>, LearningError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| LearningError::LockPoisoned(e.to_string()))?;
        match entries.get(key) {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    async fn save_patterns(
        &self,
        key: &str,
        snapshot: &PatternSnapshot,
    ) -> Result<(), LearningError> {
        let payload = serde_json::to_string(snapshot)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| LearningError::LockPoisoned(e.to_string()))?;
        entries.insert(key.to_string(), payload);
        Ok(())
    }
}

// =============================================================================
// SQLite store
// =============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pattern_snapshots (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    saved_at TEXT NOT NULL
);";

/// SQLite-backed store keeping one row per storage key.
///
/// The connection is wrapped in a Mutex; every call holds it only for a
/// single statement, on tokio's blocking pool.
pub struct SqlitePatternStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePatternStore {
    /// Open (or create) a store at `path`, creating parent directories.
    pub fn new(path: &Path) -> Result<Self, LearningError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LearningError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| LearningError::Storage(format!("Failed to open database: {}", e)))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(SCHEMA)?;
        info!("Pattern store opened at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, LearningError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LearningError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on a blocking thread.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, LearningError>
    where
        F: FnOnce(&Connection) -> Result<T, LearningError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| LearningError::Storage(format!("Database lock poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| LearningError::Storage(format!("Database task panicked: {}", e)))?
    }
}

impl std::fmt::Debug for SqlitePatternStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePatternStore").finish()
    }
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    async fn load_patterns(&self, key: &str) -> Result<Option<PatternSnapshot>, LearningError> {
        let key = key.to_string();
        let payload: Option<String> = self
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload FROM pattern_snapshots WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    async fn save_patterns(
        &self,
        key: &str,
        snapshot: &PatternSnapshot,
    ) -> Result<(), LearningError> {
        let payload = serde_json::to_string(snapshot)?;
        let saved_at = snapshot.saved_at.to_rfc3339();
        let owned_key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO pattern_snapshots (key, payload, saved_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET payload = excluded.payload, saved_at = excluded.saved_at",
                params![owned_key, payload, saved_at],
            )?;
            Ok(())
        })
        .await?;
        debug!(key, patterns = snapshot.patterns.len(), "Pattern snapshot saved");
        Ok(())
    }
}
