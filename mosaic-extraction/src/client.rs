//! Generation backend client: POST /generate with {model, prompt,
//! stream:false}, retry on transient failure, concurrency capped by a
//! counting semaphore (the backend is a rate-limited shared resource).

use std::sync::{Condvar, Mutex};

use serde::{Deserialize, Serialize};

use mosaic_core::config::GenerationConfig;
use mosaic_core::errors::{ExtractionError, MosaicResult};
use mosaic_core::retry::{with_retry, RetryConfig, TransientError};

/// One round-trip to a generation backend.
pub trait RemoteGenerationBackend: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking HTTP client for the generation endpoint.
pub struct HttpGenerationProvider {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

impl HttpGenerationProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Transient {
                reason: format!("client build failed: {e}"),
            })?;
        Ok(Self {
            client,
            url: format!("{}/generate", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

impl RemoteGenerationBackend for HttpGenerationProvider {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| ExtractionError::Transient {
                reason: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ExtractionError::Transient {
                reason: format!("backend returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(ExtractionError::GenerationFailed {
                attempts: 1,
                reason: format!("backend returned {status}"),
            });
        }

        let payload: GenerateResponse =
            response
                .json()
                .map_err(|e| ExtractionError::GenerationFailed {
                    attempts: 1,
                    reason: format!("bad JSON payload: {e}"),
                })?;
        Ok(payload.response)
    }
}

/// Counting semaphore bounding in-flight generation calls.
struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut permits = self.permits.lock().expect("semaphore lock poisoned");
        while *permits == 0 {
            permits = self
                .available
                .wait(permits)
                .expect("semaphore lock poisoned");
        }
        *permits -= 1;
    }

    fn release(&self) {
        let mut permits = self.permits.lock().expect("semaphore lock poisoned");
        *permits += 1;
        self.available.notify_one();
    }
}

/// Retrying, concurrency-capped wrapper around a generation backend.
pub struct GenerationClient {
    backend: Box<dyn RemoteGenerationBackend>,
    retry: RetryConfig,
    semaphore: Semaphore,
}

impl GenerationClient {
    pub fn new(backend: Box<dyn RemoteGenerationBackend>, llm_concurrency: usize) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            semaphore: Semaphore::new(llm_concurrency),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run one generation, holding a concurrency permit for its duration.
    pub fn generate(&self, prompt: &str) -> MosaicResult<String> {
        self.semaphore.acquire();
        let result = with_retry(&self.retry, "generate", || self.backend.generate(prompt));
        self.semaphore.release();

        match result {
            Ok(text) => Ok(text),
            Err(e) if e.is_transient() => Err(ExtractionError::GenerationFailed {
                attempts: self.retry.max_attempts,
                reason: e.to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}
