use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single survey response. Created once at ingestion and never mutated;
/// deleting a response cascades to its assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// UUID v4 identifier.
    pub id: String,
    /// Batch this response arrived in.
    pub batch_id: u64,
    /// The survey question the response answers.
    pub question: String,
    /// Raw response text.
    pub text: String,
    /// Unit embedding of the text (zero vector for blank input).
    pub embedding: Vec<f32>,
    /// When the response was persisted.
    pub processed_at: DateTime<Utc>,
}

impl Response {
    pub fn new(batch_id: u64, question: &str, text: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            batch_id,
            question: question.to_string(),
            text: text.to_string(),
            embedding,
            processed_at: Utc::now(),
        }
    }
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
