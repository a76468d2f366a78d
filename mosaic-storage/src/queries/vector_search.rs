//! Cosine similarity queries over stored embeddings.
//!
//! Brute-force scan in Rust over the BLOB vectors. Stored vectors are
//! unit-norm (enforced on write), so this is exact; recall against brute
//! force is 1.0 at every threshold.

use rusqlite::{params, Connection};

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::{Response, Theme, ThemeStatus};
use mosaic_core::vector::cosine_similarity;

use crate::blob::bytes_to_f32_vec;
use crate::to_storage_err;

use super::response_ops::{read_response_row, response_from_row, RESPONSE_COLUMNS};
use super::theme_ops::{read_theme_row, theme_from_row, THEME_COLUMNS};

/// Themes in the given status with cosine similarity ≥ `min_cos` to the
/// query vector, sorted descending, capped at `k`.
pub fn search_themes(
    conn: &Connection,
    query: &[f32],
    min_cos: f64,
    k: usize,
    status: ThemeStatus,
) -> MosaicResult<Vec<(Theme, f64)>> {
    if k == 0 || query.iter().all(|x| *x == 0.0) {
        return Ok(vec![]);
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {THEME_COLUMNS} FROM extracted_themes WHERE status = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![status.as_str()], read_theme_row)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(Theme, f64)> = Vec::new();
    for raw in rows {
        let theme = theme_from_row(raw.map_err(|e| to_storage_err(e.to_string()))?)?;
        if theme.embedding.len() != query.len() {
            continue;
        }
        let sim = cosine_similarity(query, &theme.embedding);
        if sim >= min_cos {
            scored.push((theme, sim));
        }
    }
    sort_and_truncate(&mut scored, k);
    Ok(scored)
}

/// Responses with cosine similarity ≥ `min_cos`, sorted descending,
/// capped at `k`.
pub fn search_responses(
    conn: &Connection,
    query: &[f32],
    min_cos: f64,
    k: usize,
) -> MosaicResult<Vec<(Response, f64)>> {
    if k == 0 || query.iter().all(|x| *x == 0.0) {
        return Ok(vec![]);
    }
    let query_len = query.len() as i64;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM survey_responses WHERE dimensions = ?1"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![query_len], read_response_row)
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(Response, f64)> = Vec::new();
    for raw in rows {
        let response = response_from_row(raw.map_err(|e| to_storage_err(e.to_string()))?)?;
        let sim = cosine_similarity(query, &response.embedding);
        if sim >= min_cos {
            scored.push((response, sim));
        }
    }
    sort_and_truncate(&mut scored, k);
    Ok(scored)
}

/// Embeddings of every assignment of a theme, for split-variance checks.
/// Returns (response_id, embedding) pairs.
pub fn assignment_embeddings(
    conn: &Connection,
    theme_id: &str,
) -> MosaicResult<Vec<(String, Vec<f32>)>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, r.embedding
             FROM theme_assignments a
             JOIN survey_responses r ON r.id = a.response_id
             WHERE a.theme_id = ?1
             ORDER BY r.id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![theme_id], |row| {
            let id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut embeddings = Vec::new();
    for raw in rows {
        let (id, blob) = raw.map_err(|e| to_storage_err(e.to_string()))?;
        embeddings.push((id, bytes_to_f32_vec(&blob)));
    }
    Ok(embeddings)
}

fn sort_and_truncate<T>(scored: &mut Vec<(T, f64)>, k: usize) {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
}
