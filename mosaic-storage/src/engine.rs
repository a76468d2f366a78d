//! StorageEngine — owns the ConnectionPool, implements IThemeStore and
//! IEmbeddingCache, runs migrations on open.

use std::path::Path;

use mosaic_core::errors::MosaicResult;
use mosaic_core::models::{
    Assignment, BatchMetadata, BatchPlan, CatalogStats, EvolutionEntry, Response, Theme,
    ThemeStatus,
};
use mosaic_core::traits::{IEmbeddingCache, IThemeStore};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries;
use crate::to_storage_err;

/// The main storage engine. Owns the connection pool and provides the
/// full catalog interface; all mutation is funneled through the single
/// writer.
pub struct StorageEngine {
    pool: ConnectionPool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> MosaicResult<Self> {
        let pool = ConnectionPool::open(path)?;
        let engine = Self { pool };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing). Reads route
    /// through the writer: in-memory read pool connections would be
    /// isolated databases.
    pub fn open_in_memory() -> MosaicResult<Self> {
        let pool = ConnectionPool::open_in_memory()?;
        let engine = Self { pool };
        engine.initialize()?;
        Ok(engine)
    }

    /// Run migrations on the writer.
    fn initialize(&self) -> MosaicResult<()> {
        self.pool.writer.with_conn(migrations::run_migrations)
    }

    /// Execute a read-only query on the best available connection.
    fn with_reader<F, T>(&self, f: F) -> MosaicResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> MosaicResult<T>,
    {
        match &self.pool.readers {
            Some(readers) => readers.with_conn(f),
            None => self.pool.writer.with_conn(f),
        }
    }

    /// Execute a closure inside a write transaction.
    fn with_transaction<F, T>(&self, label: &str, f: F) -> MosaicResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> MosaicResult<T>,
    {
        self.pool.writer.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_storage_err(format!("{label} begin: {e}")))?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()
                        .map_err(|e| to_storage_err(format!("{label} commit: {e}")))?;
                    Ok(value)
                }
                Err(e) => {
                    let _ = tx.rollback();
                    Err(e)
                }
            }
        })
    }

    /// Embeddings of every response assigned to a theme (split checks).
    pub fn assignment_embeddings(&self, theme_id: &str) -> MosaicResult<Vec<(String, Vec<f32>)>> {
        self.with_reader(|conn| queries::vector_search::assignment_embeddings(conn, theme_id))
    }
}

impl IThemeStore for StorageEngine {
    fn put_response(&self, response: &Response) -> MosaicResult<()> {
        self.pool
            .writer
            .with_conn(|conn| queries::response_ops::insert_response(conn, response))
    }

    fn get_response(&self, id: &str) -> MosaicResult<Option<Response>> {
        self.with_reader(|conn| queries::response_ops::get_response(conn, id))
    }

    fn responses_for_batch(&self, batch_id: u64) -> MosaicResult<Vec<Response>> {
        self.with_reader(|conn| queries::response_ops::responses_for_batch(conn, batch_id))
    }

    fn delete_response(&self, id: &str) -> MosaicResult<()> {
        self.with_transaction("delete_response", |conn| {
            let assignments = queries::assignment_ops::assignments_for_response(conn, id)?;
            queries::response_ops::delete_response(conn, id)?;
            let theme_ids: Vec<String> =
                assignments.into_iter().map(|a| a.theme_id).collect();
            queries::theme_ops::recompute_response_counts(conn, &theme_ids)
        })
    }

    fn put_theme(&self, theme: &Theme) -> MosaicResult<()> {
        self.pool
            .writer
            .with_conn(|conn| queries::theme_ops::insert_theme(conn, theme))
    }

    fn get_theme(&self, id: &str) -> MosaicResult<Option<Theme>> {
        self.with_reader(|conn| queries::theme_ops::get_theme(conn, id))
    }

    fn update_theme(&self, theme: &Theme) -> MosaicResult<()> {
        self.pool
            .writer
            .with_conn(|conn| queries::theme_ops::update_theme(conn, theme))
    }

    fn soft_retire_theme(&self, id: &str, reason: &str, batch_id: u64) -> MosaicResult<()> {
        tracing::info!(theme_id = id, reason, "retiring theme");
        self.pool
            .writer
            .with_conn(|conn| queries::theme_ops::soft_retire_theme(conn, id, batch_id))
    }

    fn list_themes(&self, status: Option<ThemeStatus>) -> MosaicResult<Vec<Theme>> {
        self.with_reader(|conn| queries::theme_ops::list_themes(conn, status))
    }

    fn child_themes(&self, parent_id: &str) -> MosaicResult<Vec<Theme>> {
        self.with_reader(|conn| queries::theme_ops::child_themes(conn, parent_id))
    }

    fn put_assignment(&self, assignment: &Assignment) -> MosaicResult<()> {
        self.with_transaction("put_assignment", |conn| {
            queries::assignment_ops::upsert_assignment(conn, assignment)?;
            queries::theme_ops::recompute_response_counts(
                conn,
                std::slice::from_ref(&assignment.theme_id),
            )
        })
    }

    fn assignments_for_theme(&self, theme_id: &str) -> MosaicResult<Vec<Assignment>> {
        self.with_reader(|conn| queries::assignment_ops::assignments_for_theme(conn, theme_id))
    }

    fn assignments_for_response(&self, response_id: &str) -> MosaicResult<Vec<Assignment>> {
        self.with_reader(|conn| {
            queries::assignment_ops::assignments_for_response(conn, response_id)
        })
    }

    fn rewrite_assignments(
        &self,
        from_theme: &str,
        to_theme: &str,
        batch_id: u64,
    ) -> MosaicResult<u64> {
        self.with_transaction("rewrite_assignments", |conn| {
            let moved =
                queries::assignment_ops::rewrite_assignments(conn, from_theme, to_theme, batch_id)?;
            queries::theme_ops::recompute_response_counts(
                conn,
                &[from_theme.to_string(), to_theme.to_string()],
            )?;
            Ok(moved)
        })
    }

    fn find_similar_themes(
        &self,
        embedding: &[f32],
        min_cos: f64,
        k: usize,
        status: ThemeStatus,
    ) -> MosaicResult<Vec<(Theme, f64)>> {
        self.with_reader(|conn| {
            queries::vector_search::search_themes(conn, embedding, min_cos, k, status)
        })
    }

    fn find_similar_responses(
        &self,
        embedding: &[f32],
        min_cos: f64,
        k: usize,
    ) -> MosaicResult<Vec<(Response, f64)>> {
        self.with_reader(|conn| {
            queries::vector_search::search_responses(conn, embedding, min_cos, k)
        })
    }

    fn append_evolution(&self, entry: &EvolutionEntry) -> MosaicResult<()> {
        self.pool
            .writer
            .with_conn(|conn| queries::evolution_ops::append_entry(conn, entry))
    }

    fn evolution_for_batch(&self, batch_id: u64) -> MosaicResult<Vec<EvolutionEntry>> {
        self.with_reader(|conn| queries::evolution_ops::entries_for_batch(conn, batch_id))
    }

    fn put_batch_metadata(&self, metadata: &BatchMetadata) -> MosaicResult<()> {
        self.pool
            .writer
            .with_conn(|conn| queries::batch_ops::insert_metadata(conn, metadata))
    }

    fn get_batch_metadata(&self, batch_id: u64) -> MosaicResult<Option<BatchMetadata>> {
        self.with_reader(|conn| queries::batch_ops::get_metadata(conn, batch_id))
    }

    fn latest_batch_id(&self) -> MosaicResult<Option<u64>> {
        self.with_reader(queries::batch_ops::latest_batch_id)
    }

    fn commit_batch(&self, plan: &BatchPlan) -> MosaicResult<()> {
        self.with_transaction("commit_batch", |conn| {
            queries::batch_commit::apply_plan(conn, plan)
        })
    }

    fn stats(&self) -> MosaicResult<CatalogStats> {
        self.with_reader(queries::aggregation::stats)
    }

    fn vacuum(&self) -> MosaicResult<()> {
        self.pool.writer.with_conn(queries::maintenance::full_vacuum)
    }
}

impl IEmbeddingCache for StorageEngine {
    fn cache_get(&self, text_hash: &str) -> MosaicResult<Option<Vec<f32>>> {
        self.with_reader(|conn| queries::cache_ops::cache_get(conn, text_hash))
    }

    fn cache_put(&self, text_hash: &str, embedding: &[f32], model_name: &str) -> MosaicResult<()> {
        self.pool.writer.with_conn(|conn| {
            queries::cache_ops::cache_put(conn, text_hash, embedding, model_name)
        })
    }
}
