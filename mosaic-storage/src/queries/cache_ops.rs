//! Content-addressed embedding cache. Entries are immutable: the first
//! write for a hash wins, later writes are no-ops.

use rusqlite::{params, Connection};

use mosaic_core::errors::{MosaicResult, StorageError};
use mosaic_core::vector::is_unit_or_zero;

use crate::blob::{bytes_to_f32_vec, f32_vec_to_bytes};
use crate::to_storage_err;

pub fn cache_get(conn: &Connection, text_hash: &str) -> MosaicResult<Option<Vec<f32>>> {
    let result: Result<Vec<u8>, _> = conn.query_row(
        "SELECT embedding FROM embedding_cache WHERE text_hash = ?1",
        params![text_hash],
        |row| row.get(0),
    );
    match result {
        Ok(blob) => Ok(Some(bytes_to_f32_vec(&blob))),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(to_storage_err(e.to_string())),
    }
}

pub fn cache_put(
    conn: &Connection,
    text_hash: &str,
    embedding: &[f32],
    model_name: &str,
) -> MosaicResult<()> {
    if !is_unit_or_zero(embedding) {
        return Err(StorageError::NotNormalized {
            norm: mosaic_core::vector::l2_norm(embedding),
        }
        .into());
    }
    conn.execute(
        "INSERT OR IGNORE INTO embedding_cache
            (text_hash, embedding, dimensions, model_name)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            text_hash,
            f32_vec_to_bytes(embedding),
            embedding.len() as i64,
            model_name,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn cache_len(conn: &Connection) -> MosaicResult<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM embedding_cache", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}
