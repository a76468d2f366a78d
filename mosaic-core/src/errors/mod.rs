//! Error taxonomy for the mosaic workspace.
//!
//! Each subsystem has its own thiserror enum; `MosaicError` unifies them
//! with `#[from]` conversions so `?` works across crate boundaries.

mod embedding_error;
mod extraction_error;
mod storage_error;

pub use embedding_error::EmbeddingError;
pub use extraction_error::ExtractionError;
pub use storage_error::StorageError;

/// Top-level error type for the mosaic workspace.
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error(transparent)]
    StorageError(#[from] StorageError),

    #[error(transparent)]
    EmbeddingError(#[from] EmbeddingError),

    #[error(transparent)]
    ExtractionError(#[from] ExtractionError),

    #[error("invalid configuration: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("invalid input: {reason}")]
    InputInvalid { reason: String },

    #[error("cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("batch deadline exceeded after {elapsed_secs}s during {stage}")]
    DeadlineExceeded { stage: String, elapsed_secs: u64 },
}

impl MosaicError {
    /// Whether this error is a constraint violation (duplicate key,
    /// missing foreign key, non-monotonic batch id).
    pub fn is_integrity_conflict(&self) -> bool {
        matches!(
            self,
            MosaicError::StorageError(StorageError::IntegrityConflict { .. })
        )
    }

    /// Whether this error came from a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MosaicError::Cancelled { .. })
    }
}

/// Result alias used throughout the workspace.
pub type MosaicResult<T> = Result<T, MosaicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_conflict_is_detected_through_wrapper() {
        let err: MosaicError = StorageError::IntegrityConflict {
            constraint: "batch_metadata.batch_id".to_string(),
            details: "batch 3 already processed".to_string(),
        }
        .into();
        assert!(err.is_integrity_conflict());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn error_messages_render() {
        let err = MosaicError::Cancelled {
            stage: "embedding".to_string(),
        };
        assert_eq!(err.to_string(), "cancelled during embedding");
    }
}
