//! Storage maintenance.

use rusqlite::Connection;

use mosaic_core::errors::MosaicResult;

use crate::to_storage_err;

/// Reclaim free pages and checkpoint the WAL.
pub fn full_vacuum(conn: &Connection) -> MosaicResult<()> {
    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE); VACUUM;")
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
