//! Ollama (local model) embeddings provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizgrade_core::error::ProviderError;
use quizgrade_core::traits::{EmbedRequest, Embedding, EmbeddingProvider, ModelInfo};

use crate::http::{build_client, check_status};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Local models load lazily on first call, so allow longer than remote APIs.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Ollama `/api/embed` provider.
pub struct OllamaProvider {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }

    fn unreachable(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ProviderError::NetworkError(format!(
                "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                self.base_url
            ))
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    model: String,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn embed(&self, request: &EmbedRequest) -> Result<Embedding, ProviderError> {
        let body = OllamaEmbedRequest {
            model: &request.model,
            input: &request.text,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                request.model, request.model
            )));
        }
        let response = check_status(response, &request.model).await?;

        let api_response: OllamaEmbedResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        let vector = api_response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("response has no embedding".into()))?;

        Ok(Embedding {
            vector,
            model: api_response.model,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        // Installed models are only known at runtime; see `list_models_async`.
        vec![]
    }
}

impl OllamaProvider {
    /// Fetch the models installed on the Ollama instance.
    pub async fn list_models_async(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse tags response: {e}"))
        })?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                provider: "ollama".into(),
                dimensions: 0,
                cost_per_1m_tokens: 0.0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> EmbedRequest {
        EmbedRequest {
            model: model.into(),
            text: "The mitochondria is the powerhouse of the cell".into(),
        }
    }

    #[tokio::test]
    async fn successful_embedding() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.25, -0.5, 0.75, 0.0]]
        });

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri(), DEFAULT_TIMEOUT_SECS).unwrap();
        let embedding = provider.embed(&request("nomic-embed-text")).await.unwrap();
        assert_eq!(embedding.dimensions(), 4);
        assert_eq!(embedding.model, "nomic-embed-text");
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri(), DEFAULT_TIMEOUT_SECS).unwrap();
        let err = provider.embed(&request("nonexistent")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(_)));
        assert!(err.to_string().contains("ollama pull nonexistent"));
    }

    #[tokio::test]
    async fn empty_embeddings_are_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "embeddings": []
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri(), DEFAULT_TIMEOUT_SECS).unwrap();
        let err = provider.embed(&request("nomic-embed-text")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn dynamic_model_listing() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "models": [
                {"name": "nomic-embed-text:latest", "size": 274302450_u64},
                {"name": "mxbai-embed-large:latest", "size": 669615493_u64}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(&server.uri(), DEFAULT_TIMEOUT_SECS).unwrap();
        let models = provider.list_models_async().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "nomic-embed-text:latest");
    }
}
