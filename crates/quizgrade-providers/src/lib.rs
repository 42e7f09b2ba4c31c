//! quizgrade-providers: Embedding provider integrations.
//!
//! Implements the `EmbeddingProvider` trait for OpenAI-compatible APIs,
//! Ollama, and an in-process mock, plus configuration loading.

pub mod config;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, ProviderConfig, QuizgradeConfig};
pub use quizgrade_core::error::ProviderError;
