//! Concurrent fan-out to knowledge modules.
//!
//! Every selected module runs in its own task. All calls share one deadline
//! (the per-module timeout, since they start together); a module that misses
//! it is abandoned and treated as absent.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use cogito_core::types::{ContextSnapshot, ModuleResponse};

use crate::error::ModuleError;
use crate::module::KnowledgeModule;

/// What came back from one dispatch round.
#[derive(Debug, Default, Clone)]
pub struct DispatchReport {
    /// Usable responses, highest confidence first.
    pub responses: Vec<ModuleResponse>,
    /// Modules the request was sent to.
    pub consulted: usize,
    /// Modules that produced nothing usable, with the reason.
    pub errors: Vec<ModuleError>,
    /// Successful responses dropped for low confidence.
    pub low_confidence: usize,
}

impl DispatchReport {
    pub fn timeouts(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, ModuleError::Timeout { .. }))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.errors.len() - self.timeouts()
    }
}

/// Send `input` to every module concurrently.
///
/// Responses are kept only when `success` is set and confidence exceeds
/// `min_confidence`; the survivors are sorted by descending confidence.
pub async fn process_with_modules(
    input: &str,
    context: &ContextSnapshot,
    modules: &[Arc<dyn KnowledgeModule>],
    timeout: Duration,
    min_confidence: f64,
) -> DispatchReport {
    let input: Arc<str> = Arc::from(input);
    let context = Arc::new(context.clone());
    let deadline = Instant::now() + timeout;

    let handles: Vec<_> = modules
        .iter()
        .map(|module| {
            let module = Arc::clone(module);
            let name = module.name().to_string();
            let input = Arc::clone(&input);
            let context = Arc::clone(&context);
            let handle = tokio::spawn(async move { module.process(&input, &context).await });
            (name, handle)
        })
        .collect();

    let mut report = DispatchReport {
        consulted: handles.len(),
        ..DispatchReport::default()
    };

    for (name, mut handle) in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(mut response))) => {
                if response.source.is_empty() {
                    response.source = name.clone();
                }
                if !response.success {
                    debug!(module = %name, "Module reported failure");
                    report.errors.push(ModuleError::failed(
                        &name,
                        response.payload.primary_text(),
                    ));
                } else if response.confidence > min_confidence {
                    report.responses.push(response);
                } else {
                    debug!(
                        module = %name,
                        confidence = response.confidence,
                        "Dropping low-confidence response"
                    );
                    report.low_confidence += 1;
                }
            }
            Ok(Ok(Err(e))) => {
                warn!(module = %name, "Module failed: {}", e);
                report.errors.push(e);
            }
            Ok(Err(join_err)) => {
                warn!(module = %name, "Module task aborted: {}", join_err);
                report.errors.push(if join_err.is_panic() {
                    ModuleError::Panicked(name)
                } else {
                    ModuleError::failed(&name, join_err.to_string())
                });
            }
            Err(_) => {
                handle.abort();
                let timeout_ms = timeout.as_millis() as u64;
                warn!(module = %name, timeout_ms, "Module timed out");
                report.errors.push(ModuleError::Timeout {
                    module: name,
                    timeout_ms,
                });
            }
        }
    }

    report
        .responses
        .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use cogito_core::types::ResponsePayload;

    enum Behavior {
        Answer(f64),
        Fail,
        Unsuccessful,
        Sleep(Duration),
        Panic,
    }

    struct MockModule {
        name: &'static str,
        behavior: Behavior,
    }

    #[async_trait]
    impl KnowledgeModule for MockModule {
        fn name(&self) -> &str {
            self.name
        }

        async fn process(
            &self,
            _input: &str,
            _context: &ContextSnapshot,
        ) -> Result<ModuleResponse, ModuleError> {
            match &self.behavior {
                Behavior::Answer(c) => Ok(ModuleResponse::success(
                    self.name,
                    *c,
                    ResponsePayload::text(format!("{} answer", self.name)),
                    Utc::now(),
                )),
                Behavior::Fail => Err(ModuleError::failed(self.name, "backend down")),
                Behavior::Unsuccessful => {
                    Ok(ModuleResponse::failure(self.name, "no idea", Utc::now()))
                }
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(ModuleResponse::success(
                        self.name,
                        0.9,
                        ResponsePayload::text("late"),
                        Utc::now(),
                    ))
                }
                Behavior::Panic => panic!("module exploded"),
            }
        }
    }

    fn module(name: &'static str, behavior: Behavior) -> Arc<dyn KnowledgeModule> {
        Arc::new(MockModule { name, behavior })
    }

    async fn dispatch(modules: &[Arc<dyn KnowledgeModule>]) -> DispatchReport {
        process_with_modules(
            "question",
            &ContextSnapshot::empty(),
            modules,
            Duration::from_secs(5),
            0.2,
        )
        .await
    }

    #[tokio::test]
    async fn test_sorted_by_confidence() {
        let report = dispatch(&[
            module("facts", Behavior::Answer(0.3)),
            module("mathematics", Behavior::Answer(0.9)),
            module("vocabulary", Behavior::Answer(0.6)),
        ])
        .await;
        let sources: Vec<&str> = report.responses.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["mathematics", "vocabulary", "facts"]);
        assert_eq!(report.consulted, 3);
    }

    #[tokio::test]
    async fn test_filters_low_confidence_and_failures() {
        let report = dispatch(&[
            module("weak", Behavior::Answer(0.2)),
            module("broken", Behavior::Fail),
            module("unsure", Behavior::Unsuccessful),
            module("good", Behavior::Answer(0.7)),
        ])
        .await;
        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.responses[0].source, "good");
        assert_eq!(report.low_confidence, 1);
        assert_eq!(report.failures(), 2);
        assert_eq!(report.timeouts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_module_is_dropped() {
        let started = Instant::now();
        let report = dispatch(&[
            module("slow", Behavior::Sleep(Duration::from_secs(60))),
            module("fast", Behavior::Answer(0.8)),
        ])
        .await;
        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.responses[0].source, "fast");
        assert_eq!(report.timeouts(), 1);
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_panicking_module_is_absent() {
        let report = dispatch(&[
            module("boom", Behavior::Panic),
            module("ok", Behavior::Answer(0.8)),
        ])
        .await;
        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.errors, vec![ModuleError::Panicked("boom".to_string())]);
    }

    #[tokio::test]
    async fn test_no_modules() {
        let report = dispatch(&[]).await;
        assert!(report.responses.is_empty());
        assert_eq!(report.consulted, 0);
    }
}
