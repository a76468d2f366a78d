//! PRAGMA configuration applied to every SQLite connection.
//!
//! WAL mode, NORMAL sync, 64MB cache, 5s busy_timeout, foreign_keys ON.

use rusqlite::Connection;

use mosaic_core::errors::MosaicResult;

use crate::to_storage_err;

/// Apply performance and safety pragmas to a write connection.
pub fn apply_pragmas(conn: &Connection) -> MosaicResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -64000;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Pragmas for read connections: same safety settings plus query_only.
pub fn apply_read_pragmas(conn: &Connection) -> MosaicResult<()> {
    apply_pragmas(conn)?;
    conn.pragma_update(None, "query_only", true)
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
