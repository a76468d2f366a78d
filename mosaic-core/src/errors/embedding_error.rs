/// Embedding subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Remote embedding failed after all retries. Carries the texts that
    /// could not be embedded so callers can report or retry them.
    #[error("embedding failed after {attempts} attempts for {} text(s): {reason}", texts.len())]
    EmbeddingFailed {
        attempts: u32,
        reason: String,
        texts: Vec<String>,
    },

    /// A single request failed with a transient condition (timeout, 5xx).
    /// Internal to the retry loop; surfaces as `EmbeddingFailed` on exhaustion.
    #[error("transient embedding backend error: {reason}")]
    Transient { reason: String },

    #[error("embedding backend returned {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding backend returned malformed payload: {reason}")]
    MalformedResponse { reason: String },
}
