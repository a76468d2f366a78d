//! Survey response persistence. Responses are immutable once written;
//! deletes cascade to assignments.

use rusqlite::{params, Connection};

use mosaic_core::errors::{MosaicResult, StorageError};
use mosaic_core::models::Response;
use mosaic_core::vector::is_unit_or_zero;

use crate::blob::{bytes_to_f32_vec, f32_vec_to_bytes};
use crate::{map_sqlite_err, to_storage_err};

pub(crate) const RESPONSE_COLUMNS: &str =
    "id, batch_id, question, response_text, embedding, dimensions, processed_at";

type ResponseRow = (String, i64, String, String, Vec<u8>, i64, String);

pub(crate) fn read_response_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

pub(crate) fn response_from_row(raw: ResponseRow) -> MosaicResult<Response> {
    let (id, batch_id, question, text, blob, _dims, processed_at) = raw;
    Ok(Response {
        id,
        batch_id: batch_id as u64,
        question,
        text,
        embedding: bytes_to_f32_vec(&blob),
        processed_at: super::parse_timestamp(&processed_at)?,
    })
}

/// Insert a response; the embedding is written atomically with the row.
pub fn insert_response(conn: &Connection, response: &Response) -> MosaicResult<()> {
    if !is_unit_or_zero(&response.embedding) {
        return Err(StorageError::NotNormalized {
            norm: mosaic_core::vector::l2_norm(&response.embedding),
        }
        .into());
    }
    conn.execute(
        "INSERT INTO survey_responses
            (id, batch_id, question, response_text, embedding, dimensions, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            response.id,
            response.batch_id as i64,
            response.question,
            response.text,
            f32_vec_to_bytes(&response.embedding),
            response.embedding.len() as i64,
            response.processed_at.to_rfc3339(),
        ],
    )
    .map_err(|e| map_sqlite_err("survey_responses.id", e))?;
    Ok(())
}

pub fn get_response(conn: &Connection, id: &str) -> MosaicResult<Option<Response>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], read_response_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(raw) => Ok(Some(response_from_row(
            raw.map_err(|e| to_storage_err(e.to_string()))?,
        )?)),
        None => Ok(None),
    }
}

pub fn responses_for_batch(conn: &Connection, batch_id: u64) -> MosaicResult<Vec<Response>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses
             WHERE batch_id = ?1 ORDER BY processed_at, id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![batch_id as i64], read_response_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut responses = Vec::new();
    for raw in rows {
        responses.push(response_from_row(
            raw.map_err(|e| to_storage_err(e.to_string()))?,
        )?);
    }
    Ok(responses)
}

/// Delete a response. Assignments cascade via the foreign key.
pub fn delete_response(conn: &Connection, id: &str) -> MosaicResult<()> {
    let deleted = conn
        .execute("DELETE FROM survey_responses WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    if deleted == 0 {
        return Err(StorageError::NotFound {
            entity: "response".to_string(),
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}
