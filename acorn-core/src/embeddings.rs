//! Embedding provider client.
//!
//! Speaks the OpenAI-compatible embeddings contract: `POST {base}/embeddings`
//! with bearer auth and `{model, input, encoding_format}`, where `input` is a
//! single string or an array of strings for the batch variant. The provider
//! answers `{data: [{embedding: [...]}]}`.
//!
//! The [`Embedder`] trait is the seam the daemon subsystems depend on, so
//! tests can swap in scripted backends without HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::AcornConfig;

/// Provider-safe input ceiling; most embedding models cap around 8192 tokens.
pub const MAX_EMBED_CHARS: usize = 8000;

/// Fixed sample used by the connectivity self-test. Never persisted.
const TEST_SAMPLE: &str = "Hello, this is a test for embedding API connection.";

/// Abstraction over embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts in one request. Empty inputs are dropped; the
    /// output order matches the surviving inputs.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Missing API key or base URL; raised before any network call.
    #[error("Embedding provider not configured (missing API key or base URL)")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx provider response, carrying the HTTP status for diagnosis.
    #[error("Embedding API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding response contained no embedding data")]
    MissingEmbedding,

    #[error("Nothing to embed: input text is empty")]
    EmptyInput,
}

impl EmbeddingError {
    /// Transient failures worth retrying; auth and request-shape errors are
    /// not.
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Http(_) => true,
            EmbeddingError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Resolved provider settings after the embedding → general fallback chain.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

/// HTTP client for the embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    settings: ProviderSettings,
}

impl EmbeddingClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, EmbeddingError> {
        if settings.api_key.is_empty() || settings.base_url.is_empty() {
            return Err(EmbeddingError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Build a client from the application config, applying the
    /// embedding-specific → general credential fallback, plus an
    /// `ACORN_API_KEY` env fallback for development.
    pub fn from_config(config: &AcornConfig) -> Result<Self, EmbeddingError> {
        let api_key = {
            let key = config.embedding_api_key();
            if key.is_empty() {
                std::env::var("ACORN_API_KEY").unwrap_or_default()
            } else {
                key.to_string()
            }
        };

        Self::new(ProviderSettings {
            api_key,
            base_url: config.embedding_base_url().to_string(),
            model: config.embedding.model.clone(),
            max_retries: config.embedding.max_retries,
            retry_delay_ms: config.embedding.retry_delay_ms,
        })
    }

    /// Embed the connectivity-test sample and report the returned
    /// dimensionality. Persists nothing; errors propagate to the caller.
    pub async fn test_connection(&self) -> Result<usize, EmbeddingError> {
        let vector = self.embed(TEST_SAMPLE).await?;
        Ok(vector.len())
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.settings.base_url.trim_end_matches('/'))
    }

    async fn request_embeddings(
        &self,
        input: EmbeddingInput<'_>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.settings.model,
            input,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(status = status.as_u16(), message = %message, "Embedding API error");

            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn with_retry<'a>(
        &'a self,
        input: EmbeddingInput<'a>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let strategy = ExponentialBackoff::from_millis(self.settings.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.settings.max_retries);

        RetryIf::spawn(
            strategy,
            || self.request_embeddings(input.clone()),
            |e: &EmbeddingError| e.is_retryable(),
        )
        .await
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vectors = self.with_retry(EmbeddingInput::Single(&cleaned)).await?;
        if vectors.is_empty() {
            return Err(EmbeddingError::MissingEmbedding);
        }
        Ok(vectors.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let cleaned: Vec<String> = texts
            .iter()
            .map(|t| clean_text(t))
            .filter(|t| !t.is_empty())
            .collect();

        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.with_retry(EmbeddingInput::Batch(&cleaned)).await?;
        if vectors.len() != cleaned.len() {
            return Err(EmbeddingError::MissingEmbedding);
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

/// Trim and truncate to the provider-safe ceiling.
fn clean_text(text: &str) -> String {
    text.trim().chars().take(MAX_EMBED_CHARS).collect()
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    encoding_format: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings(base_url: &str) -> ProviderSettings {
        ProviderSettings {
            api_key: "test-api-key".to_string(),
            base_url: base_url.to_string(),
            model: "text-embedding-3-small".to_string(),
            max_retries: 1,
            retry_delay_ms: 10,
        }
    }

    fn mock_response(vectors: usize, dims: usize) -> serde_json::Value {
        let data: Vec<serde_json::Value> = (0..vectors)
            .map(|v| {
                let values: Vec<f32> = (0..dims).map(|i| (v + i) as f32 / dims as f32).collect();
                serde_json::json!({ "embedding": values })
            })
            .collect();
        serde_json::json!({ "data": data })
    }

    #[test]
    fn clean_text_trims_and_truncates() {
        assert_eq!(clean_text("  hello  "), "hello");
        assert_eq!(clean_text(" \n\t "), "");
        let long = "x".repeat(MAX_EMBED_CHARS + 500);
        assert_eq!(clean_text(&long).chars().count(), MAX_EMBED_CHARS);
    }

    #[test]
    fn missing_credentials_fail_before_any_network_call() {
        let mut settings = test_settings("https://api.example.com/v1");
        settings.api_key = String::new();
        match EmbeddingClient::new(settings) {
            Err(EmbeddingError::MissingCredentials) => {}
            other => panic!("Expected MissingCredentials, got {:?}", other.err()),
        }

        let mut settings = test_settings("");
        settings.api_key = "key".to_string();
        assert!(matches!(
            EmbeddingClient::new(settings),
            Err(EmbeddingError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn embed_posts_expected_body_and_returns_vector() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": "hello world",
                "encoding_format": "float"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(1, 4)))
            .mount(&mock_server)
            .await;

        let vector = client.embed("hello world").await.unwrap();
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn embed_batch_sends_array_input() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"],
                "encoding_format": "float"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(2, 4)))
            .mount(&mock_server)
            .await;

        let texts = vec![
            "first".to_string(),
            "  ".to_string(), // dropped before the request
            "second".to_string(),
        ];
        let vectors = client.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_a_request() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        // Any request arriving here fails the test on mock verification
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(1, 4)))
            .expect(0)
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.embed("   \n  ").await,
            Err(EmbeddingError::EmptyInput)
        ));
        assert!(client.embed_batch(&[" ".to_string()]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_2xx_surfaces_http_status() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "message": "internal error" }
            })))
            .mount(&mock_server)
            .await;

        match client.embed("hello").await {
            Err(EmbeddingError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal error");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.embed("hello").await {
            Err(EmbeddingError::Api { status, .. }) => assert_eq!(status, 401),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(1, 4)))
            .mount(&mock_server)
            .await;

        let vector = client.embed("hello").await.unwrap();
        assert_eq!(vector.len(), 4);
    }

    #[tokio::test]
    async fn missing_data_in_response_is_an_error() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.embed("hello").await,
            Err(EmbeddingError::MissingEmbedding)
        ));
    }

    #[tokio::test]
    async fn test_connection_reports_dimensionality() {
        let mock_server = MockServer::start().await;
        let client = EmbeddingClient::new(test_settings(&mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response(1, 1536)))
            .mount(&mock_server)
            .await;

        let dims = client.test_connection().await.unwrap();
        assert_eq!(dims, 1536);
    }
}
