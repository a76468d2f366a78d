//! Assignment upserts, lookups, and retroactive rewrites.

use rusqlite::{params, Connection};

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::Assignment;

use crate::{map_sqlite_err, to_storage_err};

const ASSIGNMENT_COLUMNS: &str = "id, response_id, theme_id, confidence, highlighted_keywords, \
     assigned_at_batch, last_updated_batch";

type AssignmentRow = (String, String, String, f64, String, i64, i64);

fn read_assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
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

fn assignment_from_row(raw: AssignmentRow) -> MosaicResult<Assignment> {
    let (id, response_id, theme_id, confidence, keywords, assigned_at_batch, last_updated_batch) =
        raw;
    let highlighted_keywords = serde_json::from_str(&keywords)
        .map_err(|e| to_storage_err(format!("bad highlighted_keywords JSON: {e}")))?;
    Ok(Assignment {
        id,
        response_id,
        theme_id,
        confidence,
        highlighted_keywords,
        assigned_at_batch: assigned_at_batch as u64,
        last_updated_batch: last_updated_batch as u64,
    })
}

/// Insert an assignment, resolving a duplicate (response, theme) pair by
/// updating its confidence, keywords, and last_updated_batch.
pub fn upsert_assignment(conn: &Connection, assignment: &Assignment) -> MosaicResult<()> {
    let keywords = serde_json::to_string(&assignment.highlighted_keywords)
        .map_err(|e| to_storage_err(format!("serialize highlighted_keywords: {e}")))?;
    conn.execute(
        "INSERT INTO theme_assignments
            (id, response_id, theme_id, confidence, highlighted_keywords,
             assigned_at_batch, last_updated_batch)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(response_id, theme_id) DO UPDATE SET
            confidence = excluded.confidence,
            highlighted_keywords = excluded.highlighted_keywords,
            last_updated_batch = excluded.last_updated_batch",
        params![
            assignment.id,
            assignment.response_id,
            assignment.theme_id,
            assignment.confidence,
            keywords,
            assignment.assigned_at_batch as i64,
            assignment.last_updated_batch as i64,
        ],
    )
    .map_err(|e| map_sqlite_err("theme_assignments", e))?;
    Ok(())
}

pub fn assignments_for_theme(conn: &Connection, theme_id: &str) -> MosaicResult<Vec<Assignment>> {
    query_assignments(conn, "theme_id", theme_id)
}

pub fn assignments_for_response(
    conn: &Connection,
    response_id: &str,
) -> MosaicResult<Vec<Assignment>> {
    query_assignments(conn, "response_id", response_id)
}

fn query_assignments(conn: &Connection, column: &str, value: &str) -> MosaicResult<Vec<Assignment>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM theme_assignments
             WHERE {column} = ?1 ORDER BY assigned_at_batch, id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![value], read_assignment_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut assignments = Vec::new();
    for raw in rows {
        assignments.push(assignment_from_row(
            raw.map_err(|e| to_storage_err(e.to_string()))?,
        )?);
    }
    Ok(assignments)
}

/// Move every assignment from one theme to another, returning the number
/// moved. Responses already assigned to the destination keep only the
/// destination row (the source duplicate is dropped, not doubled).
pub fn rewrite_assignments(
    conn: &Connection,
    from_theme: &str,
    to_theme: &str,
    batch_id: u64,
) -> MosaicResult<u64> {
    // Drop source rows whose (response, destination) pair already exists.
    conn.execute(
        "DELETE FROM theme_assignments
         WHERE theme_id = ?1
           AND response_id IN
               (SELECT response_id FROM theme_assignments WHERE theme_id = ?2)",
        params![from_theme, to_theme],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let moved = conn
        .execute(
            "UPDATE theme_assignments
             SET theme_id = ?2, last_updated_batch = ?3
             WHERE theme_id = ?1",
            params![from_theme, to_theme, batch_id as i64],
        )
        .map_err(|e| map_sqlite_err("theme_assignments", e))?;
    Ok(moved as u64)
}

/// Move a single (response, theme) pair to a new theme, with the same
/// duplicate handling as the bulk rewrite.
pub fn retarget_assignment(
    conn: &Connection,
    response_id: &str,
    from_theme: &str,
    to_theme: &str,
    batch_id: u64,
) -> MosaicResult<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM theme_assignments
                           WHERE response_id = ?1 AND theme_id = ?2)",
            params![response_id, to_theme],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if exists {
        conn.execute(
            "DELETE FROM theme_assignments WHERE response_id = ?1 AND theme_id = ?2",
            params![response_id, from_theme],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        return Ok(());
    }
    conn.execute(
        "UPDATE theme_assignments
         SET theme_id = ?3, last_updated_batch = ?4
         WHERE response_id = ?1 AND theme_id = ?2",
        params![response_id, from_theme, to_theme, batch_id as i64],
    )
    .map_err(|e| map_sqlite_err("theme_assignments", e))?;
    Ok(())
}
