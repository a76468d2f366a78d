//! v001: survey_responses, extracted_themes, theme_assignments,
//! theme_evolution_log, batch_metadata, embedding_cache.

use rusqlite::Connection;

use mosaic_core::errors::MosaicResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> MosaicResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS survey_responses (
            id             TEXT PRIMARY KEY,
            batch_id       INTEGER NOT NULL,
            question       TEXT NOT NULL,
            response_text  TEXT NOT NULL,
            embedding      BLOB NOT NULL,
            dimensions     INTEGER NOT NULL,
            processed_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_responses_batch ON survey_responses(batch_id);

        CREATE TABLE IF NOT EXISTS extracted_themes (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            description         TEXT NOT NULL,
            embedding           BLOB NOT NULL,
            dimensions          INTEGER NOT NULL,
            status              TEXT NOT NULL DEFAULT 'active'
                                CHECK (status IN ('active', 'merged', 'split', 'retired')),
            created_at_batch    INTEGER NOT NULL,
            last_updated_batch  INTEGER NOT NULL,
            parent_theme_id     TEXT REFERENCES extracted_themes(id),
            response_count      INTEGER NOT NULL DEFAULT 0,
            metadata            TEXT NOT NULL DEFAULT '{}',
            created_at          TEXT NOT NULL,
            CHECK (created_at_batch <= last_updated_batch)
        );

        CREATE INDEX IF NOT EXISTS idx_themes_status ON extracted_themes(status);
        CREATE INDEX IF NOT EXISTS idx_themes_parent ON extracted_themes(parent_theme_id);

        CREATE TABLE IF NOT EXISTS theme_assignments (
            id                    TEXT PRIMARY KEY,
            response_id           TEXT NOT NULL
                                  REFERENCES survey_responses(id) ON DELETE CASCADE,
            theme_id              TEXT NOT NULL
                                  REFERENCES extracted_themes(id) ON DELETE CASCADE,
            confidence            REAL NOT NULL
                                  CHECK (confidence >= 0.0 AND confidence <= 1.0),
            highlighted_keywords  TEXT NOT NULL DEFAULT '[]',
            assigned_at_batch     INTEGER NOT NULL,
            last_updated_batch    INTEGER NOT NULL,
            UNIQUE (response_id, theme_id)
        );

        CREATE INDEX IF NOT EXISTS idx_assignments_response ON theme_assignments(response_id);
        CREATE INDEX IF NOT EXISTS idx_assignments_theme ON theme_assignments(theme_id);

        CREATE TABLE IF NOT EXISTS theme_evolution_log (
            id                       INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id                 INTEGER NOT NULL,
            action                   TEXT NOT NULL
                                     CHECK (action IN ('created', 'updated', 'merged',
                                                       'split', 'retired', 'reassigned')),
            theme_id                 TEXT NOT NULL,
            related_theme_id         TEXT,
            details                  TEXT NOT NULL DEFAULT '{}',
            affected_response_count  INTEGER NOT NULL DEFAULT 0,
            created_at               TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_evolution_batch ON theme_evolution_log(batch_id);

        CREATE TABLE IF NOT EXISTS batch_metadata (
            batch_id                 INTEGER PRIMARY KEY,
            question                 TEXT NOT NULL,
            total_responses          INTEGER NOT NULL,
            new_themes_count         INTEGER NOT NULL,
            updated_themes_count     INTEGER NOT NULL,
            deleted_themes_count     INTEGER NOT NULL,
            processing_time_seconds  REAL NOT NULL,
            processed_at             TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embedding_cache (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text_hash   TEXT NOT NULL UNIQUE,
            embedding   BLOB NOT NULL,
            dimensions  INTEGER NOT NULL,
            model_name  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
