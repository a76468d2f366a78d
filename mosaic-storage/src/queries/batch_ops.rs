//! Batch metadata rows. The primary key on batch_id is the
//! monotonicity guard: reprocessing a batch is an integrity conflict.

use rusqlite::{params, Connection};

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::BatchMetadata;

use crate::{map_sqlite_err, to_storage_err};

pub fn insert_metadata(conn: &Connection, metadata: &BatchMetadata) -> MosaicResult<()> {
    conn.execute(
        "INSERT INTO batch_metadata
            (batch_id, question, total_responses, new_themes_count,
             updated_themes_count, deleted_themes_count,
             processing_time_seconds, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            metadata.batch_id as i64,
            metadata.question,
            metadata.total_responses as i64,
            metadata.new_themes_count as i64,
            metadata.updated_themes_count as i64,
            metadata.deleted_themes_count as i64,
            metadata.processing_time_seconds,
            metadata.processed_at.to_rfc3339(),
        ],
    )
    .map_err(|e| map_sqlite_err("batch_metadata.batch_id", e))?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, batch_id: u64) -> MosaicResult<Option<BatchMetadata>> {
    let result = conn.query_row(
        "SELECT batch_id, question, total_responses, new_themes_count,
                updated_themes_count, deleted_themes_count,
                processing_time_seconds, processed_at
         FROM batch_metadata WHERE batch_id = ?1",
        params![batch_id as i64],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, String>(7)?,
            ))
        },
    );
    match result {
        Ok((batch_id, question, total, new, updated, deleted, secs, processed_at)) => {
            Ok(Some(BatchMetadata {
                batch_id: batch_id as u64,
                question,
                total_responses: total as u64,
                new_themes_count: new as u64,
                updated_themes_count: updated as u64,
                deleted_themes_count: deleted as u64,
                processing_time_seconds: secs,
                processed_at: super::parse_timestamp(&processed_at)?,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(to_storage_err(e.to_string())),
    }
}

pub fn latest_batch_id(conn: &Connection) -> MosaicResult<Option<u64>> {
    let max: Option<i64> = conn
        .query_row("SELECT MAX(batch_id) FROM batch_metadata", [], |row| {
            row.get(0)
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(max.map(|id| id as u64))
}
