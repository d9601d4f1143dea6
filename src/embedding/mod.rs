//! Embedding client abstraction and the HTTP adapter for managed endpoints.

use crate::config::{EmbeddingProvider, get_config};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider returned a different number of vectors than texts sent.
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// A returned vector does not match the configured dimensionality.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured on the server.
        expected: usize,
        /// Dimension observed in the response.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Embedding client that talks to a hosted endpoint over HTTP.
///
/// Two wire dialects are supported: the OpenAI-compatible `POST {base}/embeddings`
/// shape with bearer auth, and the Ollama `POST {base}/api/embed` shape. Both accept
/// a batch of inputs in a single request; no additional batching is performed here.
pub struct HttpEmbeddingClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) provider: EmbeddingProvider,
    pub(crate) model: String,
    pub(crate) api_key: Option<String>,
    pub(crate) dimension: usize,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingsResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl HttpEmbeddingClient {
    /// Construct a client from the process configuration.
    pub fn new() -> Result<Self, EmbeddingClientError> {
        let config = get_config();
        let client = Client::builder()
            .user_agent("pdfsilo/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        tracing::debug!(
            url = %config.embedding_url,
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            "Initialized embedding HTTP client"
        );
        Ok(Self {
            client,
            base_url: config.embedding_url.trim_end_matches('/').to_string(),
            provider: config.embedding_provider,
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
            dimension: config.embedding_dimension,
        })
    }

    async fn request_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let (path, body) = match self.provider {
            EmbeddingProvider::OpenAI => (
                format!("{}/embeddings", self.base_url),
                json!({ "model": self.model, "input": texts }),
            ),
            EmbeddingProvider::Ollama => (
                format!("{}/api/embed", self.base_url),
                json!({ "model": self.model, "input": texts }),
            ),
        };

        let mut request = self.client.post(path).json(&body);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbeddingClientError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let vectors = match self.provider {
            EmbeddingProvider::OpenAI => {
                let payload: OpenAiEmbeddingsResponse = response.json().await?;
                payload
                    .data
                    .into_iter()
                    .map(|entry| entry.embedding)
                    .collect()
            }
            EmbeddingProvider::Ollama => {
                let payload: OllamaEmbedResponse = response.json().await?;
                payload.embeddings
            }
        };

        Ok(vectors)
    }

    fn validate(&self, expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbeddingClientError> {
        if vectors.len() != expected {
            return Err(EmbeddingClientError::CountMismatch {
                expected,
                actual: vectors.len(),
            });
        }
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(EmbeddingClientError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            provider = ?self.provider,
            model = %self.model,
            batch = texts.len(),
            "Generating embeddings"
        );
        let vectors = self.request_embeddings(&texts).await?;
        self.validate(texts.len(), &vectors)?;
        Ok(vectors)
    }
}
