//! # mosaic-storage
//!
//! SQLite persistence layer for the theme catalog. Owns every persisted
//! row; serializes catalog mutations through a single write connection;
//! exposes cosine similarity queries over stored embeddings and an
//! atomic per-batch commit.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

mod blob;

pub use engine::StorageEngine;

use mosaic_core::errors::{MosaicError, StorageError};

/// Wrap a raw SQLite message as a storage error.
pub(crate) fn to_storage_err(message: impl Into<String>) -> MosaicError {
    StorageError::SqliteError {
        message: message.into(),
    }
    .into()
}

/// Map a rusqlite error, turning constraint violations into
/// `integrity_conflict` and everything else into a plain SQLite error.
pub(crate) fn map_sqlite_err(constraint: &str, e: rusqlite::Error) -> MosaicError {
    if let rusqlite::Error::SqliteFailure(inner, message) = &e {
        if inner.code == rusqlite::ErrorCode::ConstraintViolation {
            return StorageError::IntegrityConflict {
                constraint: constraint.to_string(),
                details: message.clone().unwrap_or_else(|| inner.to_string()),
            }
            .into();
        }
    }
    to_storage_err(e.to_string())
}
