//! The learning engine: pattern table, interaction queue, and sweeps.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use cogito_core::clock::Clock;
use cogito_core::config::LearningConfig;
use cogito_core::types::ContextSnapshot;

use crate::error::LearningError;
use crate::extractor;
use crate::store::PatternStore;
use crate::types::{
    table_key, InteractionRecord, LearningPattern, LearningStats, PatternKind, PatternSnapshot,
    PersistOutcome, PersistReport, SweepReport,
};

#[derive(Debug, Default)]
struct Counters {
    total_interactions: u64,
    last_sweep_at: Option<DateTime<Utc>>,
    last_persist: Option<PersistReport>,
    consecutive_persist_failures: u32,
}

/// Mines recurring patterns from answered interactions.
///
/// High-confidence interactions are mined on arrival; everything is also
/// queued for the batch sweep driven by [`crate::LearningScheduler`].
pub struct LearningEngine {
    config: LearningConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn PatternStore>,
    patterns: Mutex<HashMap<String, LearningPattern>>,
    queue: Mutex<VecDeque<InteractionRecord>>,
    counters: Mutex<Counters>,
}

impl LearningEngine {
    pub fn new(
        config: LearningConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn PatternStore>,
    ) -> Self {
        Self {
            config,
            clock,
            store,
            patterns: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Record one answered interaction.
    ///
    /// Never fails: extraction errors are logged. Disabled learning makes
    /// this a no-op.
    pub fn learn_from_interaction(
        &self,
        input: &str,
        response: &str,
        confidence: f64,
        source: &str,
        context: &ContextSnapshot,
    ) {
        if !self.config.enabled {
            return;
        }
        let mut record = InteractionRecord {
            input: input.to_string(),
            response: response.to_string(),
            confidence: cogito_core::clamp_confidence(confidence),
            source: source.to_string(),
            context: context.clone(),
            recorded_at: self.clock.now(),
            extracted: false,
        };

        if record.confidence >= self.config.high_confidence_threshold {
            match self.extract_basic(&record) {
                Ok(n) => {
                    record.extracted = true;
                    debug!(observations = n, source, "Mined high-confidence interaction");
                }
                Err(e) => warn!("Immediate pattern extraction failed: {}", e),
            }
        }

        match self.queue.lock() {
            Ok(mut queue) => {
                queue.push_back(record);
                while queue.len() > self.config.max_queue {
                    queue.pop_front();
                }
            }
            Err(e) => warn!("Learning queue lock poisoned: {}", e),
        }
        if let Ok(mut counters) = self.counters.lock() {
            counters.total_interactions += 1;
        }
    }

    // =========================================================================
    // Sweeps
    // =========================================================================

    /// Drain one batch from the queue and run the deeper analysis on it,
    /// then prune stale patterns.
    ///
    /// A failing item is logged and skipped; the rest of the batch still runs.
    pub fn run_pattern_sweep(&self) -> SweepReport {
        let (batch, still_queued) = match self.queue.lock() {
            Ok(mut queue) => {
                let n = self.config.batch_size.min(queue.len());
                let batch: Vec<InteractionRecord> = queue.drain(..n).collect();
                let rest: Vec<String> = queue.iter().map(|r| r.input.clone()).collect();
                (batch, rest)
            }
            Err(e) => {
                warn!("Learning queue lock poisoned: {}", e);
                return SweepReport::default();
            }
        };

        let mut report = SweepReport::default();
        for (i, record) in batch.iter().enumerate() {
            let peers: Vec<&str> = batch
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, r)| r.input.as_str())
                .chain(still_queued.iter().map(String::as_str))
                .collect();
            match self.analyze(record, &peers) {
                Ok(n) => {
                    report.processed += 1;
                    report.observations += n;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(input = %record.input, "Skipping interaction in pattern sweep: {}", e);
                }
            }
        }

        report.pruned = self.prune_stale();
        if let Ok(mut counters) = self.counters.lock() {
            counters.last_sweep_at = Some(self.clock.now());
        }
        debug!(
            processed = report.processed,
            failed = report.failed,
            observations = report.observations,
            pruned = report.pruned,
            "Pattern sweep complete"
        );
        report
    }

    /// Write the pattern table and summary statistics to the durable store.
    ///
    /// Failures are recorded in the returned report (and in
    /// [`LearningStats::last_persist`]) but never touch in-memory state.
    pub async fn run_persistence_sweep(&self) -> PersistReport {
        let attempted_at = self.clock.now();
        let snapshot = match self.snapshot(attempted_at) {
            Ok(s) => s,
            Err(e) => return self.record_persist(attempted_at, 0, Err(e)),
        };
        let count = snapshot.patterns.len();
        let result = self
            .store
            .save_patterns(&self.config.storage_key, &snapshot)
            .await;
        self.record_persist(attempted_at, count, result)
    }

    /// Flush immediately, outside the regular cadence.
    pub async fn persist_now(&self) -> PersistReport {
        self.run_persistence_sweep().await
    }

    /// Merge a previously persisted snapshot into the table.
    ///
    /// Returns the number of patterns loaded. Entries already present in
    /// memory win over stored ones.
    pub async fn restore(&self) -> Result<usize, LearningError> {
        let Some(snapshot) = self.store.load_patterns(&self.config.storage_key).await? else {
            debug!(key = %self.config.storage_key, "No persisted patterns to restore");
            return Ok(0);
        };
        let mut patterns = self.lock_patterns()?;
        let mut loaded = 0;
        for (key, pattern) in snapshot.patterns {
            if let std::collections::hash_map::Entry::Vacant(slot) = patterns.entry(key) {
                slot.insert(pattern);
                loaded += 1;
            }
        }
        if let Ok(mut counters) = self.counters.lock() {
            counters.total_interactions = counters
                .total_interactions
                .max(snapshot.stats.total_interactions);
        }
        info!(loaded, key = %self.config.storage_key, "Restored learning patterns");
        Ok(loaded)
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// All patterns, ordered by table key.
    pub fn get_patterns(&self) -> Vec<LearningPattern> {
        let Ok(patterns) = self.patterns.lock() else {
            return Vec::new();
        };
        let mut all: Vec<LearningPattern> = patterns.values().cloned().collect();
        all.sort_by_key(|p| p.table_key());
        all
    }

    /// The `limit` most frequently observed patterns, ties broken by
    /// confidence and then key.
    pub fn get_top_patterns(&self, limit: usize) -> Vec<LearningPattern> {
        let mut all = self.get_patterns();
        all.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then(b.confidence.total_cmp(&a.confidence))
                .then_with(|| a.table_key().cmp(&b.table_key()))
        });
        all.truncate(limit);
        all
    }

    /// Look up one pattern.
    pub fn get_pattern(&self, kind: PatternKind, key: &str) -> Option<LearningPattern> {
        self.patterns
            .lock()
            .ok()
            .and_then(|p| p.get(&table_key(kind, key)).cloned())
    }

    pub fn get_learning_stats(&self) -> LearningStats {
        let patterns = self.get_patterns();
        let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for p in &patterns {
            *by_kind.entry(p.kind.to_string()).or_default() += 1;
        }
        let average_confidence = if patterns.is_empty() {
            0.0
        } else {
            patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64
        };
        let most_frequent = self.get_top_patterns(1).first().map(|p| p.table_key());
        let queued = self.queue.lock().map(|q| q.len()).unwrap_or(0);

        let mut stats = LearningStats {
            total_patterns: patterns.len(),
            queued_interactions: queued,
            patterns_by_kind: by_kind,
            average_confidence,
            most_frequent,
            ..LearningStats::default()
        };
        if let Ok(counters) = self.counters.lock() {
            stats.total_interactions = counters.total_interactions;
            stats.last_sweep_at = counters.last_sweep_at;
            stats.last_persist = counters.last_persist.clone();
            stats.consecutive_persist_failures = counters.consecutive_persist_failures;
        }
        stats
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_patterns(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, LearningPattern>>, LearningError> {
        self.patterns
            .lock()
            .map_err(|e| LearningError::LockPoisoned(format!("pattern table: {}", e)))
    }

    fn validate(record: &InteractionRecord) -> Result<(), LearningError> {
        if record.input.trim().is_empty() {
            return Err(LearningError::InvalidInteraction("empty input".to_string()));
        }
        Ok(())
    }

    fn extract_basic(&self, record: &InteractionRecord) -> Result<usize, LearningError> {
        Self::validate(record)?;
        let keys = extractor::basic_keys(record);
        let n = keys.len();
        let mut patterns = self.lock_patterns()?;
        for (kind, key) in keys {
            self.observe(&mut patterns, kind, &key, record);
        }
        Ok(n)
    }

    fn analyze(&self, record: &InteractionRecord, peers: &[&str]) -> Result<usize, LearningError> {
        Self::validate(record)?;
        let mut keys: Vec<(PatternKind, String)> = Vec::new();
        if !record.extracted {
            keys.extend(extractor::basic_keys(record));
        }
        if let Some(key) =
            extractor::similarity_key(&record.input, peers, self.config.similarity_threshold)
        {
            keys.push((PatternKind::Similarity, key));
        }
        keys.extend(
            extractor::behavior_keys(record)
                .into_iter()
                .map(|k| (PatternKind::Behavior, k.to_string())),
        );
        keys.extend(
            extractor::success_keys(record)
                .into_iter()
                .map(|k| (PatternKind::Success, k)),
        );
        keys.push((PatternKind::Temporal, extractor::temporal_key(record.recorded_at)));

        let n = keys.len();
        let mut patterns = self.lock_patterns()?;
        for (kind, key) in keys {
            self.observe(&mut patterns, kind, &key, record);
        }
        Ok(n)
    }

    fn observe(
        &self,
        patterns: &mut HashMap<String, LearningPattern>,
        kind: PatternKind,
        key: &str,
        record: &InteractionRecord,
    ) {
        let now = self.clock.now();
        let pattern = patterns
            .entry(table_key(kind, key))
            .and_modify(|p| p.observe(record.confidence, now))
            .or_insert_with(|| LearningPattern::new(kind, key, record.confidence, now));
        pattern.push_example(&record.input, self.config.max_examples);
    }

    /// Drop patterns that are both stale and rarely seen.
    fn prune_stale(&self) -> usize {
        let cutoff = self.clock.now() - Duration::days(i64::from(self.config.stale_after_days));
        let min = self.config.min_occurrences;
        let Ok(mut patterns) = self.patterns.lock() else {
            return 0;
        };
        let before = patterns.len();
        patterns.retain(|_, p| !(p.last_seen < cutoff && p.occurrences < min));
        let pruned = before - patterns.len();
        if pruned > 0 {
            info!(pruned, "Pruned stale learning patterns");
        }
        pruned
    }

    fn snapshot(&self, now: DateTime<Utc>) -> Result<PatternSnapshot, LearningError> {
        let stats = self.get_learning_stats();
        let patterns = self
            .lock_patterns()?
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect();
        Ok(PatternSnapshot {
            patterns,
            stats,
            saved_at: now,
        })
    }

    fn record_persist(
        &self,
        attempted_at: DateTime<Utc>,
        patterns: usize,
        result: Result<(), LearningError>,
    ) -> PersistReport {
        let outcome = match result {
            Ok(()) => PersistOutcome::Saved,
            Err(e) => PersistOutcome::Failed {
                error: e.to_string(),
            },
        };
        let report = PersistReport {
            attempted_at,
            patterns,
            outcome,
        };
        if let Ok(mut counters) = self.counters.lock() {
            if report.is_success() {
                counters.consecutive_persist_failures = 0;
                debug!(patterns, "Learning patterns persisted");
            } else {
                counters.consecutive_persist_failures += 1;
                warn!(
                    failures = counters.consecutive_persist_failures,
                    "Persisting learning patterns failed: {:?}",
                    report.outcome
                );
            }
            counters.last_persist = Some(report.clone());
        }
        report
    }
}
