use serde::{Deserialize, Serialize};

use super::defaults;

/// LLM generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Base URL of the generation backend.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Character budget for packing responses into an extraction prompt.
    pub prompt_char_limit: usize,
    /// Maximum number of fresh responses fed to a description refresh.
    pub refresh_sample_limit: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_GENERATION_MODEL.to_string(),
            endpoint: defaults::DEFAULT_GENERATION_ENDPOINT.to_string(),
            timeout_secs: defaults::DEFAULT_GENERATION_TIMEOUT_SECS,
            prompt_char_limit: defaults::DEFAULT_PROMPT_CHAR_LIMIT,
            refresh_sample_limit: defaults::DEFAULT_REFRESH_SAMPLE_LIMIT,
        }
    }
}
