use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evolution::EvolutionEntry;

/// One logical batch of survey responses, presented atomically.
/// `batch_id` must be strictly monotonic across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub batch_id: u64,
    pub question: String,
    pub responses: Vec<String>,
}

/// One row per processed batch, keyed by `batch_id`. Doubles as the
/// monotonicity guard: inserting a duplicate batch id is an integrity
/// conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub batch_id: u64,
    pub question: String,
    pub total_responses: u64,
    pub new_themes_count: u64,
    pub updated_themes_count: u64,
    pub deleted_themes_count: u64,
    pub processing_time_seconds: f64,
    pub processed_at: DateTime<Utc>,
}

/// What `process_batch` returns to the caller: the metadata counts plus
/// every evolution entry appended during the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: u64,
    pub question: String,
    pub processing_time_seconds: f64,
    pub total_responses: u64,
    pub themes_created: u64,
    pub themes_updated: u64,
    pub themes_deleted: u64,
    pub evolution: Vec<EvolutionEntry>,
}
