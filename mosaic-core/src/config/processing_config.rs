use serde::{Deserialize, Serialize};

use super::defaults;

/// Batch processing limits and parallelism bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Expected responses per batch (sizing hint for buffers).
    pub batch_size: usize,
    /// Cap on highlights per assignment.
    pub max_keywords: usize,
    /// Bound on the embedding / highlight fan-out pools.
    pub embed_parallelism: usize,
    /// Concurrent generation calls allowed against the LLM backend.
    pub llm_concurrency: usize,
    /// Total deadline for one batch, in seconds.
    pub batch_timeout_secs: u64,
    /// Grace period for in-flight remote calls on cancellation.
    pub shutdown_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            max_keywords: defaults::DEFAULT_MAX_KEYWORDS,
            embed_parallelism: defaults::DEFAULT_EMBED_PARALLELISM,
            llm_concurrency: defaults::DEFAULT_LLM_CONCURRENCY,
            batch_timeout_secs: defaults::DEFAULT_BATCH_TIMEOUT_SECS,
            shutdown_timeout_secs: defaults::DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}
