//! cogito application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Open the pattern store (SQLite, in-memory if that fails)
//! 3. Restore learned patterns and start the learning scheduler
//! 4. Build the cognitive engine with the bundled knowledge modules
//! 5. Answer questions from stdin until EOF, `:quit`, or Ctrl-C

mod cli;
mod modules;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cogito_core::{Clock, CogitoConfig, SystemClock};
use cogito_engine::{CognitiveEngine, ModuleRegistry};
use cogito_learning::{
    InMemoryPatternStore, LearningEngine, LearningScheduler, PatternStore, SqlitePatternStore,
};

use crate::cli::{expand_home, CliArgs};
use crate::modules::ArithmeticModule;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before the subscriber exists so its log level can apply.
    let config_path = args.resolve_config_path();
    let config_found = config_path.exists();
    let mut config = CogitoConfig::load_or_default(&config_path);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if args.no_learning {
        config.learning.enabled = false;
    }

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting cogito v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        tracing::info!(path = %config_path.display(), "Config loaded");
    } else {
        tracing::info!(path = %config_path.display(), "No config file, using defaults");
    }

    let data_dir = expand_home(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!(path = %data_dir.display(), "Data directory ready");

    let db_path = data_dir.join("cogito.db");
    let store: Arc<dyn PatternStore> = match SqlitePatternStore::new(&db_path) {
        Ok(store) => {
            tracing::info!(path = %db_path.display(), "Pattern store opened");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Pattern store unavailable, learning will not persist");
            Arc::new(InMemoryPatternStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let learning = Arc::new(LearningEngine::new(
        config.learning.clone(),
        Arc::clone(&clock),
        store,
    ));

    let scheduler = Arc::new(LearningScheduler::new(Arc::clone(&learning)));
    let scheduler_task = if config.learning.enabled {
        match learning.restore().await {
            Ok(count) => tracing::info!(count, "Learned patterns restored"),
            Err(e) => tracing::warn!(error = %e, "Failed to restore learned patterns"),
        }
        let runner = Arc::clone(&scheduler);
        Some(tokio::spawn(async move { runner.run().await }))
    } else {
        tracing::info!("Learning disabled");
        None
    };

    let engine = CognitiveEngine::new(
        &config,
        clock,
        config.learning.enabled.then(|| Arc::clone(&learning)),
    );
    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(ArithmeticModule));
    engine.initialize(registry);
    tracing::info!(modules = ?engine.module_names(), "Cognitive engine ready");

    let result = repl::run(&engine).await;

    engine.shutdown().await;
    if let Some(task) = scheduler_task {
        scheduler.shutdown();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Learning scheduler did not stop cleanly");
        }
    }
    tracing::info!("cogito stopped");

    result.map_err(Into::into)
}
