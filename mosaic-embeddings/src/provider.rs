//! Remote embedding backend: POST /embeddings with {model, prompt}.

use serde::{Deserialize, Serialize};

use mosaic_core::config::EmbeddingConfig;
use mosaic_core::errors::EmbeddingError;

/// One round-trip to an embeddings backend. Implementations classify
/// failures: `Transient` may be retried, everything else is permanent.
pub trait RemoteEmbeddingBackend: Send + Sync {
    fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Blocking HTTP client for the embeddings endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    dim: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Transient {
                reason: format!("client build failed: {e}"),
            })?;
        Ok(Self {
            client,
            url: format!("{}/embeddings", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            dim: config.dim,
        })
    }
}

impl RemoteEmbeddingBackend for HttpEmbeddingProvider {
    fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| EmbeddingError::Transient {
                reason: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(EmbeddingError::Transient {
                reason: format!("backend returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(EmbeddingError::MalformedResponse {
                reason: format!("backend returned {status}"),
            });
        }

        let payload: EmbeddingResponse =
            response.json().map_err(|e| EmbeddingError::MalformedResponse {
                reason: format!("bad JSON payload: {e}"),
            })?;

        if payload.embedding.len() != self.dim {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dim,
                got: payload.embedding.len(),
            });
        }
        Ok(payload.embedding)
    }
}
