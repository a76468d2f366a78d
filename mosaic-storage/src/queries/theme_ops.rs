//! Theme CRUD, status transitions, and response_count bookkeeping.

use rusqlite::{params, Connection};

use mosaic_core::errors::{MosaicResult, StorageError};
use mosaic_core::models::{StatusChange, Theme, ThemeStatus, ThemeUpdate};
use mosaic_core::vector::is_unit_or_zero;

use crate::blob::{bytes_to_f32_vec, f32_vec_to_bytes};
use crate::{map_sqlite_err, to_storage_err};

pub(crate) const THEME_COLUMNS: &str = "id, name, description, embedding, dimensions, status, \
     created_at_batch, last_updated_batch, parent_theme_id, response_count, metadata, created_at";

type ThemeRow = (
    String,
    String,
    String,
    Vec<u8>,
    i64,
    String,
    i64,
    i64,
    Option<String>,
    i64,
    String,
    String,
);

pub(crate) fn read_theme_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThemeRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
    ))
}

pub(crate) fn theme_from_row(raw: ThemeRow) -> MosaicResult<Theme> {
    let (
        id,
        name,
        description,
        blob,
        _dims,
        status,
        created_at_batch,
        last_updated_batch,
        parent_theme_id,
        response_count,
        metadata,
        created_at,
    ) = raw;
    let status = ThemeStatus::parse(&status)
        .ok_or_else(|| to_storage_err(format!("unknown theme status {status:?}")))?;
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| to_storage_err(format!("bad theme metadata JSON: {e}")))?;
    Ok(Theme {
        id,
        name,
        description,
        embedding: bytes_to_f32_vec(&blob),
        status,
        created_at_batch: created_at_batch as u64,
        last_updated_batch: last_updated_batch as u64,
        parent_theme_id,
        response_count: response_count as u64,
        metadata,
        created_at: super::parse_timestamp(&created_at)?,
    })
}

fn check_embedding(embedding: &[f32]) -> MosaicResult<()> {
    if !is_unit_or_zero(embedding) {
        return Err(StorageError::NotNormalized {
            norm: mosaic_core::vector::l2_norm(embedding),
        }
        .into());
    }
    Ok(())
}

/// Parent pointers must run strictly backwards in batch time (a split
/// child may share its parent's creation batch, never precede it).
fn check_parent(conn: &Connection, theme: &Theme) -> MosaicResult<()> {
    let Some(ref parent_id) = theme.parent_theme_id else {
        return Ok(());
    };
    if parent_id == &theme.id {
        return Err(StorageError::ParentCycle {
            theme_id: theme.id.clone(),
            parent_batch: theme.created_at_batch,
        }
        .into());
    }
    let parent_batch: Option<i64> = conn
        .query_row(
            "SELECT created_at_batch FROM extracted_themes WHERE id = ?1",
            params![parent_id],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(to_storage_err(other.to_string())),
        })?;
    match parent_batch {
        None => Err(StorageError::NotFound {
            entity: "theme".to_string(),
            id: parent_id.clone(),
        }
        .into()),
        Some(batch) if batch as u64 > theme.created_at_batch => Err(StorageError::ParentCycle {
            theme_id: theme.id.clone(),
            parent_batch: batch as u64,
        }
        .into()),
        Some(_) => Ok(()),
    }
}

pub fn insert_theme(conn: &Connection, theme: &Theme) -> MosaicResult<()> {
    check_embedding(&theme.embedding)?;
    check_parent(conn, theme)?;
    let metadata = serde_json::to_string(&theme.metadata)
        .map_err(|e| to_storage_err(format!("serialize theme metadata: {e}")))?;
    conn.execute(
        "INSERT INTO extracted_themes
            (id, name, description, embedding, dimensions, status, created_at_batch,
             last_updated_batch, parent_theme_id, response_count, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            theme.id,
            theme.name,
            theme.description,
            f32_vec_to_bytes(&theme.embedding),
            theme.embedding.len() as i64,
            theme.status.as_str(),
            theme.created_at_batch as i64,
            theme.last_updated_batch as i64,
            theme.parent_theme_id,
            theme.response_count as i64,
            metadata,
            theme.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| map_sqlite_err("extracted_themes.id", e))?;
    Ok(())
}

pub fn update_theme(conn: &Connection, theme: &Theme) -> MosaicResult<()> {
    check_embedding(&theme.embedding)?;
    check_parent(conn, theme)?;
    let metadata = serde_json::to_string(&theme.metadata)
        .map_err(|e| to_storage_err(format!("serialize theme metadata: {e}")))?;
    let updated = conn
        .execute(
            "UPDATE extracted_themes SET
                name = ?2, description = ?3, embedding = ?4, dimensions = ?5,
                status = ?6, last_updated_batch = ?7, parent_theme_id = ?8,
                response_count = ?9, metadata = ?10
             WHERE id = ?1",
            params![
                theme.id,
                theme.name,
                theme.description,
                f32_vec_to_bytes(&theme.embedding),
                theme.embedding.len() as i64,
                theme.status.as_str(),
                theme.last_updated_batch as i64,
                theme.parent_theme_id,
                theme.response_count as i64,
                metadata,
            ],
        )
        .map_err(|e| map_sqlite_err("extracted_themes", e))?;
    if updated == 0 {
        return Err(StorageError::NotFound {
            entity: "theme".to_string(),
            id: theme.id.clone(),
        }
        .into());
    }
    Ok(())
}

pub fn get_theme(conn: &Connection, id: &str) -> MosaicResult<Option<Theme>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {THEME_COLUMNS} FROM extracted_themes WHERE id = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rows = stmt
        .query_map(params![id], read_theme_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    match rows.next() {
        Some(raw) => Ok(Some(theme_from_row(
            raw.map_err(|e| to_storage_err(e.to_string()))?,
        )?)),
        None => Ok(None),
    }
}

pub fn list_themes(conn: &Connection, status: Option<ThemeStatus>) -> MosaicResult<Vec<Theme>> {
    let (sql, filter) = match status {
        Some(s) => (
            format!(
                "SELECT {THEME_COLUMNS} FROM extracted_themes
                 WHERE status = ?1 ORDER BY created_at_batch, id"
            ),
            Some(s.as_str()),
        ),
        None => (
            format!("SELECT {THEME_COLUMNS} FROM extracted_themes ORDER BY created_at_batch, id"),
            None,
        ),
    };
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut themes = Vec::new();
    match filter {
        Some(s) => {
            let rows = stmt
                .query_map(params![s], read_theme_row)
                .map_err(|e| to_storage_err(e.to_string()))?;
            for raw in rows {
                themes.push(theme_from_row(
                    raw.map_err(|e| to_storage_err(e.to_string()))?,
                )?);
            }
        }
        None => {
            let rows = stmt
                .query_map([], read_theme_row)
                .map_err(|e| to_storage_err(e.to_string()))?;
            for raw in rows {
                themes.push(theme_from_row(
                    raw.map_err(|e| to_storage_err(e.to_string()))?,
                )?);
            }
        }
    }
    Ok(themes)
}

pub fn child_themes(conn: &Connection, parent_id: &str) -> MosaicResult<Vec<Theme>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {THEME_COLUMNS} FROM extracted_themes
             WHERE parent_theme_id = ?1 ORDER BY id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![parent_id], read_theme_row)
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut themes = Vec::new();
    for raw in rows {
        themes.push(theme_from_row(
            raw.map_err(|e| to_storage_err(e.to_string()))?,
        )?);
    }
    Ok(themes)
}

/// Apply a status transition. Only the fields a transition owns change.
pub fn apply_status_change(conn: &Connection, change: &StatusChange) -> MosaicResult<()> {
    let updated = match &change.parent_theme_id {
        Some(parent) => conn
            .execute(
                "UPDATE extracted_themes
                 SET status = ?2, parent_theme_id = ?3, last_updated_batch = ?4
                 WHERE id = ?1",
                params![
                    change.theme_id,
                    change.status.as_str(),
                    parent,
                    change.batch_id as i64
                ],
            )
            .map_err(|e| map_sqlite_err("extracted_themes.status", e))?,
        None => conn
            .execute(
                "UPDATE extracted_themes
                 SET status = ?2, last_updated_batch = ?3
                 WHERE id = ?1",
                params![
                    change.theme_id,
                    change.status.as_str(),
                    change.batch_id as i64
                ],
            )
            .map_err(|e| map_sqlite_err("extracted_themes.status", e))?,
    };
    if updated == 0 {
        return Err(StorageError::NotFound {
            entity: "theme".to_string(),
            id: change.theme_id.clone(),
        }
        .into());
    }
    Ok(())
}

/// Apply a partial update (description refresh, post-merge embedding,
/// metadata bump) via read-modify-write inside the caller's transaction.
pub fn apply_theme_update(conn: &Connection, update: &ThemeUpdate) -> MosaicResult<()> {
    let Some(mut theme) = get_theme(conn, &update.theme_id)? else {
        return Err(StorageError::NotFound {
            entity: "theme".to_string(),
            id: update.theme_id.clone(),
        }
        .into());
    };
    if let Some(ref description) = update.description {
        theme.description = description.clone();
    }
    if let Some(ref embedding) = update.embedding {
        theme.embedding = embedding.clone();
    }
    if let Some(ref metadata) = update.metadata {
        theme.metadata = metadata.clone();
    }
    theme.last_updated_batch = theme.last_updated_batch.max(update.last_updated_batch);
    update_theme(conn, &theme)
}

pub fn soft_retire_theme(conn: &Connection, id: &str, batch_id: u64) -> MosaicResult<()> {
    apply_status_change(
        conn,
        &StatusChange {
            theme_id: id.to_string(),
            status: ThemeStatus::Retired,
            parent_theme_id: None,
            batch_id,
        },
    )
}

/// Recompute `response_count` from live assignments (invariant: the
/// counter always equals the number of assignments pointing at the theme).
pub fn recompute_response_counts(conn: &Connection, theme_ids: &[String]) -> MosaicResult<()> {
    let mut stmt = conn
        .prepare(
            "UPDATE extracted_themes
             SET response_count =
                 (SELECT COUNT(*) FROM theme_assignments WHERE theme_id = ?1)
             WHERE id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    for id in theme_ids {
        stmt.execute(params![id])
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(())
}
