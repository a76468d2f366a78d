//! Append-only theme evolution log.

use rusqlite::{params, Connection};

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::{EvolutionAction, EvolutionEntry};

use crate::to_storage_err;

pub fn append_entry(conn: &Connection, entry: &EvolutionEntry) -> MosaicResult<()> {
    let details = serde_json::to_string(&entry.details)
        .map_err(|e| to_storage_err(format!("serialize evolution details: {e}")))?;
    conn.execute(
        "INSERT INTO theme_evolution_log
            (batch_id, action, theme_id, related_theme_id, details,
             affected_response_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.batch_id as i64,
            entry.action.as_str(),
            entry.theme_id,
            entry.related_theme_id,
            details,
            entry.affected_response_count as i64,
            entry.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Entries for one batch, in insertion (sub-step) order.
pub fn entries_for_batch(conn: &Connection, batch_id: u64) -> MosaicResult<Vec<EvolutionEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT batch_id, action, theme_id, related_theme_id, details,
                    affected_response_count, created_at
             FROM theme_evolution_log
             WHERE batch_id = ?1 ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![batch_id as i64], |row| {
            let batch_id: i64 = row.get(0)?;
            let action: String = row.get(1)?;
            let theme_id: String = row.get(2)?;
            let related_theme_id: Option<String> = row.get(3)?;
            let details: String = row.get(4)?;
            let affected: i64 = row.get(5)?;
            let created_at: String = row.get(6)?;
            Ok((
                batch_id,
                action,
                theme_id,
                related_theme_id,
                details,
                affected,
                created_at,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut entries = Vec::new();
    for raw in rows {
        let (batch_id, action, theme_id, related_theme_id, details, affected, created_at) =
            raw.map_err(|e| to_storage_err(e.to_string()))?;
        let action = EvolutionAction::parse(&action)
            .ok_or_else(|| to_storage_err(format!("unknown evolution action {action:?}")))?;
        let details = serde_json::from_str(&details)
            .map_err(|e| to_storage_err(format!("bad evolution details JSON: {e}")))?;
        entries.push(EvolutionEntry {
            batch_id: batch_id as u64,
            action,
            theme_id,
            related_theme_id,
            affected_response_count: affected as u64,
            details,
            created_at: super::parse_timestamp(&created_at)?,
        });
    }
    Ok(entries)
}
