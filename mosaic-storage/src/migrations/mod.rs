//! Versioned schema migrations, tracked in `schema_migrations`.

mod v001_core_tables;

use rusqlite::Connection;

use mosaic_core::errors::{MosaicError, MosaicResult, StorageError};

use crate::to_storage_err;

/// All migrations in application order.
const MIGRATIONS: &[(u32, fn(&Connection) -> MosaicResult<()>)] =
    &[(1, v001_core_tables::migrate)];

/// Run every migration not yet recorded in `schema_migrations`.
pub fn run_migrations(conn: &Connection) -> MosaicResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        let applied: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        if applied {
            continue;
        }

        migrate(conn).map_err(|e| {
            MosaicError::from(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;

        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "applied schema migration");
    }

    Ok(())
}

/// Current schema version.
pub fn current_version(conn: &Connection) -> MosaicResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
