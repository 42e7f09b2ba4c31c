//! Mock embedding provider for tests and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizgrade_core::error::ProviderError;
use quizgrade_core::traits::{EmbedRequest, Embedding, EmbeddingProvider, ModelInfo};

pub const MOCK_MODEL: &str = "mock-embed";

/// Returns fixed vectors for known texts and a hashed bag-of-words vector
/// for everything else.
pub struct MockProvider {
    /// Map of exact text → vector.
    vectors: HashMap<String, Vec<f32>>,
    /// Length of hashed fallback vectors.
    dimensions: usize,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<EmbedRequest>>,
}

impl MockProvider {
    pub fn new(vectors: HashMap<String, Vec<f32>>, dimensions: usize) -> Self {
        Self {
            vectors,
            dimensions: dimensions.max(1),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that only produces hashed vectors.
    pub fn hashed(dimensions: usize) -> Self {
        Self::new(HashMap::new(), dimensions)
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<EmbedRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }

    /// Unit-length bag-of-words vector; word order and case are ignored.
    fn hashed_embedding(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let slot = (hasher.finish() as usize) % self.dimensions;
            vector[slot] += 1.0;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, request: &EmbedRequest) -> Result<Embedding, ProviderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let vector = match self.vectors.get(&request.text) {
            Some(v) => v.clone(),
            None => self.hashed_embedding(&request.text),
        };
        Ok(Embedding {
            vector,
            model: request.model.clone(),
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: MOCK_MODEL.into(),
            name: "Mock Embeddings".into(),
            provider: "mock".into(),
            dimensions: self.dimensions,
            cost_per_1m_tokens: 0.0,
        }]
    }
}
