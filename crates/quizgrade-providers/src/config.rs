//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizgrade_core::grader::GraderConfig;
use quizgrade_core::model::SimilarityMetric;
use quizgrade_core::policy::DEFAULT_THRESHOLD;
use quizgrade_core::traits::EmbeddingProvider;

use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

/// Configuration for a single embedding provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    /// In-process embeddings for tests and offline demos.
    Mock {
        #[serde(default = "default_mock_dimensions")]
        dimensions: usize,
        #[serde(default)]
        vectors: HashMap<String, Vec<f32>>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock {
                dimensions,
                vectors,
            } => f
                .debug_struct("Mock")
                .field("dimensions", dimensions)
                .field("vectors", &vectors.len())
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_mock_dimensions() -> usize {
    64
}

/// Top-level quizgrade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizgradeConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for grading.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Embedding model used for references and submissions.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Scores strictly above this are correct.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Similarity metric: "dot" or "cosine".
    #[serde(default)]
    pub metric: SimilarityMetric,
    /// Bound on a single embedding call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Writes attempted before a concurrent-update conflict is reported.
    #[serde(default = "default_write_attempts")]
    pub max_write_attempts: u32,
    /// Max concurrent items in batch operations.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Path of the JSON quiz store.
    #[serde(default = "default_store")]
    pub store: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_timeout() -> u64 {
    30
}
fn default_write_attempts() -> u32 {
    3
}
fn default_parallelism() -> usize {
    4
}
fn default_store() -> PathBuf {
    PathBuf::from("./quizgrade-store.json")
}

impl Default for QuizgradeConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            threshold: default_threshold(),
            metric: SimilarityMetric::default(),
            timeout_secs: default_timeout(),
            max_write_attempts: default_write_attempts(),
            parallelism: default_parallelism(),
            store: default_store(),
        }
    }
}

impl QuizgradeConfig {
    /// Settings injected into the grader.
    pub fn grader_config(&self) -> GraderConfig {
        GraderConfig {
            model: self.default_model.clone(),
            threshold: self.threshold,
            metric: self.metric,
            embed_timeout: Duration::from_secs(self.timeout_secs),
            max_write_attempts: self.max_write_attempts,
            parallelism: self.parallelism,
        }
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.threshold.is_finite(), "threshold must be a finite number");
        anyhow::ensure!(self.timeout_secs >= 1, "timeout_secs must be at least 1");
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        anyhow::ensure!(
            self.max_write_attempts >= 1,
            "max_write_attempts must be at least 1"
        );
        Ok(())
    }

    /// Build the default provider.
    pub fn default_embedding_provider(&self) -> Result<Box<dyn EmbeddingProvider>> {
        let provider = self.providers.get(&self.default_provider).with_context(|| {
            format!(
                "provider '{}' not found in config. Available: {:?}",
                self.default_provider,
                self.providers.keys().collect::<Vec<_>>()
            )
        })?;
        create_provider(&self.default_provider, provider, self.timeout_secs)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied verbatim and never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        mock @ ProviderConfig::Mock { .. } => mock.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizgrade.toml` in the current directory
/// 2. `~/.config/quizgrade/config.toml`
///
/// Environment variable override: `QUIZGRADE_OPENAI_KEY`.
pub fn load_config() -> Result<QuizgradeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizgradeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizgrade.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizgradeConfig::default(),
    };
    tracing::debug!(
        "loaded config from {}",
        config_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".into())
    );

    // Apply env var overrides
    if let Ok(key) = std::env::var("QUIZGRADE_OPENAI_KEY") {
        config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let Some(ProviderConfig::OpenAI { api_key, .. }) = config.providers.get_mut("openai") {
            *api_key = key;
        }
    }

    // Resolve env vars in all provider configs
    let resolved: HashMap<String, ProviderConfig> = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.providers = resolved;

    config.validate()?;
    Ok(config)
}

/// Parse configuration from a TOML string.
pub fn parse_config_str(content: &str) -> Result<QuizgradeConfig> {
    toml::from_str(content).context("invalid quizgrade configuration")
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizgrade"))
}

/// Create a provider instance from its configuration.
///
/// `timeout_secs` bounds each HTTP request made by remote providers.
pub fn create_provider(
    name: &str,
    config: &ProviderConfig,
    timeout_secs: u64,
) -> Result<Box<dyn EmbeddingProvider>> {
    let provider: Box<dyn EmbeddingProvider> = match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "provider '{name}' has an empty api_key");
            Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
                timeout_secs,
            )?)
        }
        ProviderConfig::Ollama { base_url } => {
            Box::new(OllamaProvider::new(base_url, timeout_secs)?)
        }
        ProviderConfig::Mock {
            dimensions,
            vectors,
        } => Box::new(MockProvider::new(vectors.clone(), *dimensions)),
    };
    Ok(provider)
}
