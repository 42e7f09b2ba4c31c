//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};

use quizgrade_core::error::GradingError;
use quizgrade_core::grader::{Grader, ProgressReporter};
use quizgrade_core::store::JsonFileStore;
use quizgrade_providers::config::{load_config_from, QuizgradeConfig};

pub mod grade;
pub mod grade_batch;
pub mod import;
pub mod init;
pub mod list;
pub mod list_models;
pub mod regenerate;
pub mod validate;

/// Options shared by every subcommand.
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
}

impl Context {
    pub fn load_config(&self) -> Result<QuizgradeConfig> {
        load_config_from(self.config_path.as_deref())
    }

    /// Build a grader from the config, backed by the JSON store.
    pub fn grader(&self) -> Result<Grader> {
        let config = self.load_config()?;
        let store_path = self
            .store_path
            .clone()
            .unwrap_or_else(|| config.store.clone());
        let store = JsonFileStore::open(&store_path)
            .with_context(|| format!("failed to open store: {}", store_path.display()))?;
        let provider = config.default_embedding_provider()?;
        tracing::debug!(
            provider = provider.name(),
            model = %config.default_model,
            store = %store_path.display(),
            "grader ready"
        );
        Ok(Grader::new(
            Arc::from(provider),
            Arc::new(store),
            config.grader_config(),
        ))
    }
}

/// Console progress reporter for batch commands.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_item_complete(&self, key: &str) {
        eprintln!("  Done: {key}");
    }

    fn on_item_error(&self, key: &str, error: &GradingError) {
        eprintln!("  ERROR: {key}: {error}");
    }

    fn on_batch_complete(&self, total: usize, succeeded: usize, failed: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {succeeded}/{total} succeeded, {failed} failed ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}
