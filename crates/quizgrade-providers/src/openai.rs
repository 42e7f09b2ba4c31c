//! OpenAI-compatible embeddings provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizgrade_core::error::ProviderError;
use quizgrade_core::traits::{EmbedRequest, Embedding, EmbeddingProvider, ModelInfo};

use crate::http::{build_client, check_status, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OpenAI-compatible `/v1/embeddings` provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            org_id,
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model, chars = request.text.len()))]
    async fn embed(&self, request: &EmbedRequest) -> Result<Embedding, ProviderError> {
        let body = OpenAiEmbeddingRequest {
            model: &request.model,
            input: &request.text,
            encoding_format: "float",
        };

        let mut req = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;
        let response = check_status(response, &request.model).await?;

        let api_response: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to parse response: {e}"))
        })?;

        let vector = api_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("response has no embedding".into()))?;

        tracing::debug!(dimensions = vector.len(), "embedded");
        Ok(Embedding {
            vector,
            model: api_response.model,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "text-embedding-3-small".into(),
                name: "Text Embedding 3 Small".into(),
                provider: "openai".into(),
                dimensions: 1536,
                cost_per_1m_tokens: 0.02,
            },
            ModelInfo {
                id: "text-embedding-3-large".into(),
                name: "Text Embedding 3 Large".into(),
                provider: "openai".into(),
                dimensions: 3072,
                cost_per_1m_tokens: 0.13,
            },
            ModelInfo {
                id: "text-embedding-ada-002".into(),
                name: "Ada 002".into(),
                provider: "openai".into(),
                dimensions: 1536,
                cost_per_1m_tokens: 0.10,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, timeout_secs: u64) -> OpenAiProvider {
        OpenAiProvider::new("key", Some(server.uri()), None, timeout_secs).unwrap()
    }

    fn request(text: &str) -> EmbedRequest {
        EmbedRequest {
            model: "text-embedding-3-small".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn successful_embedding() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        });

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("Authorization", "Bearer key"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": "Paris"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let embedding = provider.embed(&request("Paris")).await.unwrap();
        assert_eq!(embedding.vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(embedding.model, "text-embedding-3-small");
    }

    #[tokio::test]
    async fn organization_header_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("OpenAI-Organization", "org-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0]}],
                "model": "m"
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new(
            "key",
            Some(format!("{}/", server.uri())),
            Some("org-123".into()),
            DEFAULT_TIMEOUT_SECS,
        )
        .unwrap();
        assert!(provider.embed(&request("x")).await.is_ok());
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn rate_limited_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert_eq!(err.retry_after_ms(), Some(7000));
    }

    #[tokio::test]
    async fn empty_data_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
                "model": "text-embedding-3-small"
            })))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let provider = provider(&server, DEFAULT_TIMEOUT_SECS);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn slow_response_reports_configured_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(serde_json::json!({
                        "data": [{"embedding": [0.1]}],
                        "model": "text-embedding-3-small"
                    })),
            )
            .mount(&server)
            .await;

        let provider = provider(&server, 1);
        let err = provider.embed(&request("test")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(1)), "got {err:?}");
    }
}
