//! The cognitive engine: the pipeline's single external entry point.
//!
//! Requests are queued on a bounded FIFO and drained by one worker task, so
//! at most one request runs end-to-end at a time and the conversation
//! context is never mutated by two requests at once. Module dispatch within
//! a request still fans out concurrently.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use cogito_context::{ContextExport, ContextManager};
use cogito_core::clock::Clock;
use cogito_core::config::{CogitoConfig, EngineConfig};
use cogito_core::types::{
    ContextSnapshot, EngineResponse, IntentAnalysis, IntentCategory, MessageMetadata, Role,
};
use cogito_learning::LearningEngine;
use cogito_reasoning::ReasoningEngine;

use crate::dispatch::{self, DispatchReport};
use crate::error::EngineError;
use crate::fallback::{self, FALLBACK_SOURCE};
use crate::intent;
use crate::module::{KnowledgeModule, ModuleRegistry};
use crate::synthesis;

/// Running counters over every processed request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub processed: u64,
    pub answered: u64,
    pub fallbacks: u64,
    pub module_timeouts: u64,
    pub module_failures: u64,
    pub average_confidence: f64,
}

#[derive(Debug, Default)]
struct StatsInner {
    stats: EngineStats,
    confidence_sum: f64,
}

struct Request {
    input: String,
    reply: oneshot::Sender<EngineResponse>,
}

// =============================================================================
// Public handle
// =============================================================================

/// Orchestrates context, intent, dispatch, reasoning, and learning.
pub struct CognitiveEngine {
    core: Arc<EngineCore>,
    sender: Mutex<Option<mpsc::Sender<Request>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CognitiveEngine {
    /// Create the engine and start its request worker.
    ///
    /// Must be called from within a Tokio runtime. No modules are bound
    /// until [`initialize`](Self::initialize) is called; until then every
    /// request is answered by the fallback path.
    pub fn new(
        config: &CogitoConfig,
        clock: Arc<dyn Clock>,
        learning: Option<Arc<LearningEngine>>,
    ) -> Self {
        let core = Arc::new(EngineCore {
            config: config.engine.clone(),
            registry: RwLock::new(Arc::new(ModuleRegistry::new())),
            context: tokio::sync::Mutex::new(ContextManager::new(
                config.context.clone(),
                Arc::clone(&clock),
            )),
            reasoning: ReasoningEngine::new(config.reasoning.clone(), clock),
            learning,
            stats: Mutex::new(StatsInner::default()),
        });

        let (tx, rx) = mpsc::channel(config.engine.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(Arc::clone(&core), rx));
        info!(
            timeout_ms = config.engine.module_timeout_ms,
            queue = config.engine.queue_capacity,
            "Cognitive engine started"
        );

        Self {
            core,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Bind a set of already-constructed modules, replacing any previous set.
    pub fn initialize(&self, registry: ModuleRegistry) {
        let names = registry.names();
        match self.core.registry.write() {
            Ok(mut current) => *current = Arc::new(registry),
            Err(e) => {
                error!("Module registry lock poisoned: {}", e);
                return;
            }
        }
        info!(modules = ?names, "Knowledge modules bound");
    }

    /// Answer `input`. Never fails: every internal problem becomes a
    /// fallback response whose reasoning trail names the cause.
    pub async fn process_input(&self, input: &str) -> EngineResponse {
        match self.submit(input).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request not processed: {}", e);
                let response = self.core.create_fallback_response(
                    input,
                    &e.to_string(),
                    IntentCategory::General,
                );
                self.core.record(&response, true, None);
                response
            }
        }
    }

    async fn submit(&self, input: &str) -> Result<EngineResponse, EngineError> {
        let sender = self
            .sender
            .lock()
            .map_err(|e| EngineError::Worker(format!("queue lock poisoned: {}", e)))?
            .clone()
            .ok_or(EngineError::ShuttingDown)?;
        let (reply, response) = oneshot::channel();
        sender
            .send(Request {
                input: input.to_string(),
                reply,
            })
            .await
            .map_err(|_| EngineError::ShuttingDown)?;
        response
            .await
            .map_err(|_| EngineError::Worker("request dropped by worker".to_string()))
    }

    /// Classify `input` against the intent rule table.
    pub fn analyze_intent(&self, input: &str, context: &ContextSnapshot) -> IntentAnalysis {
        intent::analyze_intent(input, context)
    }

    /// Resolve the suggested modules, falling back to every initialized one.
    pub fn select_modules(&self, analysis: &IntentAnalysis) -> Vec<Arc<dyn KnowledgeModule>> {
        self.core.select_modules(analysis)
    }

    /// Dispatch to `modules` concurrently with the configured timeout.
    pub async fn process_with_modules(
        &self,
        input: &str,
        context: &ContextSnapshot,
        modules: &[Arc<dyn KnowledgeModule>],
    ) -> DispatchReport {
        self.core.process_with_modules(input, context, modules).await
    }

    /// Synthesize one answer from a dispatch report's ranked responses.
    pub fn build_response(
        &self,
        report: &DispatchReport,
        analysis: &IntentAnalysis,
    ) -> Option<EngineResponse> {
        self.core.build_response(report, analysis)
    }

    /// Module-independent answer for `input`.
    pub fn create_fallback_response(&self, input: &str, reason: &str) -> EngineResponse {
        self.core
            .create_fallback_response(input, reason, IntentCategory::General)
    }

    pub fn stats(&self) -> EngineStats {
        self.core
            .stats
            .lock()
            .map(|s| s.stats.clone())
            .unwrap_or_default()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.core.registry().names()
    }

    pub fn reasoning(&self) -> &ReasoningEngine {
        &self.core.reasoning
    }

    pub fn learning(&self) -> Option<&Arc<LearningEngine>> {
        self.core.learning.as_ref()
    }

    /// Snapshot of the live and archived conversation sessions.
    pub async fn export_context(&self) -> ContextExport {
        self.core.context.lock().await.export_context()
    }

    pub async fn import_context(&self, data: ContextExport) {
        self.core.context.lock().await.import_context(data);
    }

    /// Archive the current session; the next request starts a new one.
    pub async fn end_session(&self) {
        if let Some(id) = self.core.context.lock().await.end_session() {
            debug!(context_id = %id, "Session ended");
        }
    }

    /// Stop accepting requests and wait for queued ones to finish.
    ///
    /// Later calls to [`process_input`](Self::process_input) receive a
    /// fallback response explaining that the engine is shutting down.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut s| s.take());
        drop(sender);
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                warn!("Request worker ended abnormally: {}", e);
            }
        }
        info!("Cognitive engine stopped");
    }
}

async fn run_worker(core: Arc<EngineCore>, mut rx: mpsc::Receiver<Request>) {
    while let Some(Request { input, reply }) = rx.recv().await {
        let task_core = Arc::clone(&core);
        let task_input = input.clone();
        let outcome = tokio::spawn(async move { task_core.handle(&task_input).await }).await;
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                error!("Request pipeline failed: {}", e);
                let reason = EngineError::Worker(e.to_string()).to_string();
                let response =
                    core.create_fallback_response(&input, &reason, IntentCategory::General);
                core.record(&response, true, None);
                response
            }
        };
        if reply.send(response).is_err() {
            debug!("Caller went away before the response was ready");
        }
    }
    debug!("Request queue closed; worker exiting");
}

// =============================================================================
// Pipeline
// =============================================================================

struct EngineCore {
    config: EngineConfig,
    registry: RwLock<Arc<ModuleRegistry>>,
    context: tokio::sync::Mutex<ContextManager>,
    reasoning: ReasoningEngine,
    learning: Option<Arc<LearningEngine>>,
    stats: Mutex<StatsInner>,
}

impl EngineCore {
    fn registry(&self) -> Arc<ModuleRegistry> {
        match self.registry.read() {
            Ok(r) => Arc::clone(&r),
            Err(e) => Arc::clone(&e.into_inner()),
        }
    }

    async fn handle(&self, input: &str) -> EngineResponse {
        if let Err(e) = self.validate_input(input) {
            debug!("Rejected input: {}", e);
            let response =
                self.create_fallback_response(input, &e.to_string(), IntentCategory::General);
            self.record(&response, true, None);
            return response;
        }

        let snapshot = self.context.lock().await.extract_context(input);
        let analysis = intent::analyze_intent(input, &snapshot);
        let modules = self.select_modules(&analysis);
        debug!(
            intent = %analysis.intent,
            confidence = analysis.confidence,
            modules = modules.len(),
            "Intent analyzed"
        );

        let report = if modules.is_empty() {
            DispatchReport::default()
        } else {
            self.process_with_modules(input, &snapshot, &modules).await
        };

        let chain_id = self.config.enable_reasoning.then(|| {
            self.reasoning
                .create_reasoning_chain(input, &snapshot, &report.responses)
                .id
        });

        let (mut response, used_fallback) = match self.build_response(&report, &analysis) {
            Some(response) => (response, false),
            None => {
                let reason = if modules.is_empty() {
                    "no knowledge modules available".to_string()
                } else {
                    format!("no confident answer from {} module(s)", report.consulted)
                };
                debug!(reason = %reason, "Using fallback response");
                let mut response = self.create_fallback_response(input, &reason, analysis.intent);
                response
                    .reasoning
                    .extend(report.errors.iter().map(|e| e.to_string()));
                (response, true)
            }
        };
        response.chain_id = chain_id;

        {
            let mut context = self.context.lock().await;
            context.add_message(Role::User, input, None);
            context.add_message(
                Role::Assistant,
                &response.response,
                Some(MessageMetadata {
                    confidence: Some(response.confidence),
                    sources: response.sources.clone(),
                }),
            );
        }

        if let Some(learning) = &self.learning {
            let source = response
                .sources
                .first()
                .map(String::as_str)
                .unwrap_or(FALLBACK_SOURCE);
            learning.learn_from_interaction(
                input,
                &response.response,
                response.confidence,
                source,
                &snapshot,
            );
        }

        self.record(&response, used_fallback, Some(&report));
        response
    }

    fn validate_input(&self, input: &str) -> Result<(), EngineError> {
        if input.trim().is_empty() {
            return Err(EngineError::InvalidInput("empty input".to_string()));
        }
        let len = input.chars().count();
        if len > self.config.max_input_length {
            return Err(EngineError::InvalidInput(format!(
                "input exceeds {} characters",
                self.config.max_input_length
            )));
        }
        Ok(())
    }

    fn select_modules(&self, analysis: &IntentAnalysis) -> Vec<Arc<dyn KnowledgeModule>> {
        let registry = self.registry();
        let selected: Vec<Arc<dyn KnowledgeModule>> = analysis
            .suggested_modules
            .iter()
            .filter_map(|name| registry.get(name))
            .filter(|m| m.is_initialized())
            .collect();
        if selected.is_empty() {
            registry.initialized()
        } else {
            selected
        }
    }

    async fn process_with_modules(
        &self,
        input: &str,
        context: &ContextSnapshot,
        modules: &[Arc<dyn KnowledgeModule>],
    ) -> DispatchReport {
        dispatch::process_with_modules(
            input,
            context,
            modules,
            Duration::from_millis(self.config.module_timeout_ms),
            self.config.min_response_confidence,
        )
        .await
    }

    fn build_response(
        &self,
        report: &DispatchReport,
        analysis: &IntentAnalysis,
    ) -> Option<EngineResponse> {
        synthesis::build_response(
            &report.responses,
            report.consulted,
            analysis,
            self.config.confidence_floor,
        )
    }

    fn create_fallback_response(
        &self,
        input: &str,
        reason: &str,
        intent: IntentCategory,
    ) -> EngineResponse {
        let names = self.registry().names();
        fallback::create_fallback_response(input, reason, intent, &names)
    }

    fn record(
        &self,
        response: &EngineResponse,
        used_fallback: bool,
        report: Option<&DispatchReport>,
    ) {
        let Ok(mut inner) = self.stats.lock() else {
            return;
        };
        inner.confidence_sum += response.confidence;
        let stats = &mut inner.stats;
        stats.processed += 1;
        if used_fallback {
            stats.fallbacks += 1;
        } else {
            stats.answered += 1;
        }
        if let Some(report) = report {
            stats.module_timeouts += report.timeouts() as u64;
            stats.module_failures += report.failures() as u64;
        }
        inner.stats.average_confidence = inner.confidence_sum / inner.stats.processed as f64;
    }
}
