/// Storage-layer errors for SQLite operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("integrity conflict on {constraint}: {details}")]
    IntegrityConflict { constraint: String, details: String },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("row not found: {entity} {id}")]
    NotFound { entity: String, id: String },

    #[error("embedding must be unit-norm or zero, got norm {norm}")]
    NotNormalized { norm: f64 },

    #[error("theme parent cycle: {theme_id} cannot point at a theme from batch {parent_batch}")]
    ParentCycle { theme_id: String, parent_batch: u64 },
}
