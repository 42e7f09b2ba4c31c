//! Core trait definitions for embedding providers and quiz stores.
//!
//! Providers are implemented in `quizgrade-providers`; stores live in
//! [`crate::store`] or in the host application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, StoreError};
use crate::model::{GradeState, QuizItem};

// ---------------------------------------------------------------------------
// Embedding provider trait
// ---------------------------------------------------------------------------

/// Trait for backends that turn text into embedding vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, request: &EmbedRequest) -> Result<Embedding, ProviderError>;

    /// List embedding models known to this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to embed a piece of text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Model identifier (e.g. "text-embedding-3-small").
    pub model: String,
    /// The text to embed.
    pub text: String,
}

/// An embedding vector together with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub model: String,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Information about an available embedding model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Length of the vectors the model produces.
    pub dimensions: usize,
    /// Cost per 1M input tokens in USD.
    pub cost_per_1m_tokens: f64,
}

// ---------------------------------------------------------------------------
// Persistence gateway trait
// ---------------------------------------------------------------------------

/// Read/write access to quiz items.
///
/// `record_attempt` is a compare-and-swap on `tries`: it must fail with
/// [`StoreError::Conflict`] when the stored count differs from
/// `expected_tries`, and must never move an item out of `Correct`.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn get(&self, quiz_id: &str) -> Result<QuizItem, StoreError>;

    async fn insert(&self, item: QuizItem) -> Result<(), StoreError>;

    async fn record_attempt(&self, quiz_id: &str, update: &AttemptUpdate) -> Result<(), StoreError>;

    /// Replace the reference embedding after an explicit regeneration.
    async fn replace_embedding(
        &self,
        quiz_id: &str,
        embedding: &Embedding,
    ) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<QuizItem>, StoreError>;
}

/// The write performed at the end of a grading attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptUpdate {
    /// `tries` as read before grading.
    pub expected_tries: u32,
    /// New attempt count.
    pub tries: u32,
    pub graded: GradeState,
    pub graded_at: Option<DateTime<Utc>>,
}

impl AttemptUpdate {
    /// Apply this update to an item, checking the CAS precondition.
    ///
    /// Shared by the in-process store implementations.
    pub fn apply_to(&self, item: &mut QuizItem) -> Result<(), StoreError> {
        if item.tries != self.expected_tries || item.is_correct() {
            return Err(StoreError::Conflict {
                quiz_id: item.id.clone(),
                expected: self.expected_tries,
                actual: item.tries,
            });
        }
        item.tries = self.tries;
        item.graded = self.graded;
        if self.graded_at.is_some() {
            item.graded_at = self.graded_at;
        }
        Ok(())
    }
}
