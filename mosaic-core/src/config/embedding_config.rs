use serde::{Deserialize, Serialize};

use super::defaults;

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name; also the prefix of every cache key.
    pub model: String,
    /// Output dimensionality D.
    pub dim: usize,
    /// Base URL of the embeddings backend.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_EMBEDDING_MODEL.to_string(),
            dim: defaults::DEFAULT_EMBEDDING_DIM,
            endpoint: defaults::DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            timeout_secs: defaults::DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}
