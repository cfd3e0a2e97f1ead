//! Knowledge module contract and registry.
//!
//! Modules are constructed by the embedding application and handed to the
//! engine already initialized; the engine never manages their lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use cogito_core::types::{ContextSnapshot, ModuleResponse};

use crate::error::ModuleError;

/// A pluggable domain handler.
#[async_trait]
pub trait KnowledgeModule: Send + Sync {
    /// Unique module name, matched against intent module suggestions.
    fn name(&self) -> &str;

    /// Uninitialized modules are never dispatched to.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Answer `input` within this module's domain.
    async fn process(
        &self,
        input: &str,
        context: &ContextSnapshot,
    ) -> Result<ModuleResponse, ModuleError>;
}

/// Named set of knowledge modules, ordered by name.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<dyn KnowledgeModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, replacing (and returning) any module of the same name.
    pub fn register(
        &mut self,
        module: Arc<dyn KnowledgeModule>,
    ) -> Option<Arc<dyn KnowledgeModule>> {
        let name = module.name().to_string();
        if !module.is_initialized() {
            warn!(module = %name, "Registering uninitialized module; it will be skipped");
        }
        let previous = self.modules.insert(name.clone(), module);
        if previous.is_some() {
            warn!(module = %name, "Replaced existing knowledge module");
        } else {
            info!(module = %name, "Registered knowledge module");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn KnowledgeModule>> {
        self.modules.get(name).cloned()
    }

    /// Names of every registered module.
    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// Modules that report themselves ready.
    pub fn initialized(&self) -> Vec<Arc<dyn KnowledgeModule>> {
        self.modules
            .values()
            .filter(|m| m.is_initialized())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cogito_core::types::ResponsePayload;

    struct StubModule {
        name: &'static str,
        ready: bool,
    }

    #[async_trait]
    impl KnowledgeModule for StubModule {
        fn name(&self) -> &str {
            self.name
        }

        fn is_initialized(&self) -> bool {
            self.ready
        }

        async fn process(
            &self,
            _input: &str,
            _context: &ContextSnapshot,
        ) -> Result<ModuleResponse, ModuleError> {
            Ok(ModuleResponse::success(
                self.name,
                0.5,
                ResponsePayload::text("stub"),
                Utc::now(),
            ))
        }
    }

    fn stub(name: &'static str, ready: bool) -> Arc<dyn KnowledgeModule> {
        Arc::new(StubModule { name, ready })
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register(stub("facts", true)).is_none());
        assert!(registry.register(stub("mathematics", true)).is_none());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["facts", "mathematics"]);
        assert!(registry.get("facts").is_some());
        assert!(registry.get("vocabulary").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("facts", false));
        let previous = registry.register(stub("facts", true));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.initialized().len(), 1);
    }

    #[test]
    fn test_initialized_skips_unready_modules() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("facts", true));
        registry.register(stub("coding", false));
        let ready: Vec<String> = registry
            .initialized()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(ready, vec!["facts"]);
    }

    #[tokio::test]
    async fn test_module_process_contract() {
        let module = stub("facts", true);
        let response = module
            .process("anything", &ContextSnapshot::empty())
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.source, "facts");
    }
}
