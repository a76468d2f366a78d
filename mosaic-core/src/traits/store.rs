use crate::errors::MosaicResult;
use crate::models::{
    Assignment, BatchMetadata, BatchPlan, CatalogStats, EvolutionEntry, Response, Theme,
    ThemeStatus,
};

/// Durable catalog: responses, themes, assignments, evolution log, batch
/// metadata. The store owns every persisted row and serializes catalog
/// mutations through a single writer; all other components hold only
/// in-memory copies within a batch.
pub trait IThemeStore: Send + Sync {
    // --- Responses ---
    fn put_response(&self, response: &Response) -> MosaicResult<()>;
    fn get_response(&self, id: &str) -> MosaicResult<Option<Response>>;
    fn responses_for_batch(&self, batch_id: u64) -> MosaicResult<Vec<Response>>;
    /// Cascades to the response's assignments.
    fn delete_response(&self, id: &str) -> MosaicResult<()>;

    // --- Themes ---
    fn put_theme(&self, theme: &Theme) -> MosaicResult<()>;
    fn get_theme(&self, id: &str) -> MosaicResult<Option<Theme>>;
    fn update_theme(&self, theme: &Theme) -> MosaicResult<()>;
    fn soft_retire_theme(&self, id: &str, reason: &str, batch_id: u64) -> MosaicResult<()>;
    fn list_themes(&self, status: Option<ThemeStatus>) -> MosaicResult<Vec<Theme>>;
    fn child_themes(&self, parent_id: &str) -> MosaicResult<Vec<Theme>>;

    // --- Assignments ---
    /// Upsert on the (response_id, theme_id) pair: an existing pair gets
    /// its confidence, keywords, and last_updated_batch replaced.
    fn put_assignment(&self, assignment: &Assignment) -> MosaicResult<()>;
    fn assignments_for_theme(&self, theme_id: &str) -> MosaicResult<Vec<Assignment>>;
    fn assignments_for_response(&self, response_id: &str) -> MosaicResult<Vec<Assignment>>;
    /// Move every live assignment from one theme to another, returning the
    /// number moved. A single atomic step.
    fn rewrite_assignments(
        &self,
        from_theme: &str,
        to_theme: &str,
        batch_id: u64,
    ) -> MosaicResult<u64>;

    // --- Vector similarity ---
    /// Themes in the given status whose cosine similarity to `embedding`
    /// is at least `min_cos`, sorted descending, capped at `k`.
    fn find_similar_themes(
        &self,
        embedding: &[f32],
        min_cos: f64,
        k: usize,
        status: ThemeStatus,
    ) -> MosaicResult<Vec<(Theme, f64)>>;
    fn find_similar_responses(
        &self,
        embedding: &[f32],
        min_cos: f64,
        k: usize,
    ) -> MosaicResult<Vec<(Response, f64)>>;

    // --- Evolution log ---
    fn append_evolution(&self, entry: &EvolutionEntry) -> MosaicResult<()>;
    fn evolution_for_batch(&self, batch_id: u64) -> MosaicResult<Vec<EvolutionEntry>>;

    // --- Batch metadata ---
    fn put_batch_metadata(&self, metadata: &BatchMetadata) -> MosaicResult<()>;
    fn get_batch_metadata(&self, batch_id: u64) -> MosaicResult<Option<BatchMetadata>>;
    fn latest_batch_id(&self) -> MosaicResult<Option<u64>>;

    // --- Batch commit ---
    /// Apply a fully computed batch plan in one write transaction.
    /// On failure nothing from the plan survives.
    fn commit_batch(&self, plan: &BatchPlan) -> MosaicResult<()>;

    // --- Aggregation / maintenance ---
    fn stats(&self) -> MosaicResult<CatalogStats>;
    fn vacuum(&self) -> MosaicResult<()>;
}
