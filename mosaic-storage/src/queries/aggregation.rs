//! Catalog-wide counters.

use rusqlite::Connection;

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::CatalogStats;

use crate::to_storage_err;

fn count(conn: &Connection, sql: &str) -> MosaicResult<u64> {
    let n: i64 = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as u64)
}

pub fn stats(conn: &Connection) -> MosaicResult<CatalogStats> {
    Ok(CatalogStats {
        active_themes: count(
            conn,
            "SELECT COUNT(*) FROM extracted_themes WHERE status = 'active'",
        )?,
        merged_themes: count(
            conn,
            "SELECT COUNT(*) FROM extracted_themes WHERE status = 'merged'",
        )?,
        split_themes: count(
            conn,
            "SELECT COUNT(*) FROM extracted_themes WHERE status = 'split'",
        )?,
        retired_themes: count(
            conn,
            "SELECT COUNT(*) FROM extracted_themes WHERE status = 'retired'",
        )?,
        responses: count(conn, "SELECT COUNT(*) FROM survey_responses")?,
        assignments: count(conn, "SELECT COUNT(*) FROM theme_assignments")?,
        batches: count(conn, "SELECT COUNT(*) FROM batch_metadata")?,
        cache_entries: count(conn, "SELECT COUNT(*) FROM embedding_cache")?,
    })
}
