//! BatchProcessor — owns the per-batch pipeline and its transaction
//! boundary.
//!
//! Remote work (embedding, extraction, highlighting) happens against
//! in-memory working sets; the store sees exactly two kinds of write:
//! the immutable responses of step 1, and one atomic plan commit at the
//! end. A failure after step 1 retains the responses and nothing else.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use mosaic_core::cancellation::{Cancellable, CancellationToken};
use mosaic_core::config::MosaicConfig;
use mosaic_core::errors::{MosaicError, MosaicResult, StorageError};
use mosaic_core::models::{
    BatchInput, BatchMetadata, BatchPlan, BatchResult, Response, ThemeStatus,
};
use mosaic_core::traits::{IEmbedder, IHighlighter, IThemeExtractor, IThemeStore};
use mosaic_evolution::evolver::theme_embedding_text;
use mosaic_evolution::{CatalogView, ThemeEvolver};

pub struct BatchProcessor {
    store: Arc<dyn IThemeStore>,
    embedder: Arc<dyn IEmbedder>,
    extractor: Arc<dyn IThemeExtractor>,
    highlighter: Arc<dyn IHighlighter>,
    evolver: ThemeEvolver,
    config: MosaicConfig,
    token: CancellationToken,
    highlight_pool: rayon::ThreadPool,
}

impl BatchProcessor {
    pub fn new(
        store: Arc<dyn IThemeStore>,
        embedder: Arc<dyn IEmbedder>,
        extractor: Arc<dyn IThemeExtractor>,
        highlighter: Arc<dyn IHighlighter>,
        config: MosaicConfig,
        token: CancellationToken,
    ) -> MosaicResult<Self> {
        config.validate()?;
        let highlight_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.processing.embed_parallelism.max(1))
            .build()
            .map_err(|e| MosaicError::ConfigurationInvalid {
                reason: format!("highlight pool build failed: {e}"),
            })?;
        let evolver = ThemeEvolver::new(
            store.clone(),
            embedder.clone(),
            extractor.clone(),
            config.thresholds.clone(),
            token.clone(),
        );
        Ok(Self {
            store,
            embedder,
            extractor,
            highlighter,
            evolver,
            config,
            token,
            highlight_pool,
        })
    }

    /// Reject bad input before any state is touched.
    fn validate_input(&self, batch_id: u64, question: &str) -> MosaicResult<()> {
        if question.trim().is_empty() {
            return Err(MosaicError::InputInvalid {
                reason: "question must not be empty".to_string(),
            });
        }
        match self.store.latest_batch_id()? {
            Some(latest) if batch_id == latest => Err(StorageError::IntegrityConflict {
                constraint: "batch_metadata.batch_id".to_string(),
                details: format!("batch {batch_id} already processed"),
            }
            .into()),
            Some(latest) if batch_id < latest => Err(MosaicError::InputInvalid {
                reason: format!(
                    "batch_id must be strictly monotonic: got {batch_id}, latest is {latest}"
                ),
            }),
            _ => {
                if self.store.get_batch_metadata(batch_id)?.is_some() {
                    return Err(StorageError::IntegrityConflict {
                        constraint: "batch_metadata.batch_id".to_string(),
                        details: format!("batch {batch_id} already processed"),
                    }
                    .into());
                }
                Ok(())
            }
        }
    }

    /// Cancellation and deadline checkpoint between pipeline steps.
    fn checkpoint(&self, started: Instant, stage: &str) -> MosaicResult<()> {
        if self.token.is_cancelled() {
            return Err(MosaicError::Cancelled {
                stage: stage.to_string(),
            });
        }
        let elapsed = started.elapsed().as_secs();
        if elapsed > self.config.processing.batch_timeout_secs {
            return Err(MosaicError::DeadlineExceeded {
                stage: stage.to_string(),
                elapsed_secs: elapsed,
            });
        }
        Ok(())
    }

    /// Process one batch end-to-end.
    pub fn process_batch(
        &self,
        batch_id: u64,
        question: &str,
        responses: &[String],
    ) -> MosaicResult<BatchResult> {
        let started = Instant::now();
        self.validate_input(batch_id, question)?;
        info!(batch_id, responses = responses.len(), "processing batch");

        // Step 1: embed and persist responses. These are immutable data
        // and are retained even if the rest of the batch fails.
        let embeddings = self.embedder.embed_many(responses)?;
        let mut persisted: Vec<Response> = Vec::with_capacity(responses.len());
        for (text, embedding) in responses.iter().zip(embeddings.into_iter()) {
            let response = Response::new(batch_id, question, text, embedding);
            self.store.put_response(&response)?;
            persisted.push(response);
        }
        self.checkpoint(started, "persist responses")?;

        // Step 2: propose candidate themes and embed them.
        let candidates = self.extractor.extract(question, responses, batch_id)?;
        let candidate_texts: Vec<String> = candidates
            .iter()
            .map(|c| theme_embedding_text(&c.name, &c.description))
            .collect();
        let candidate_embeddings = self.embedder.embed_many(&candidate_texts)?;
        let embedded_candidates: Vec<_> = candidates
            .into_iter()
            .zip(candidate_embeddings.into_iter())
            .collect();
        self.checkpoint(started, "extraction")?;

        // Step 3: match against the live catalog, then dedupe candidates.
        let mut catalog = CatalogView::load(self.store.as_ref())?;
        let mut plan = BatchPlan::new(batch_id);
        let matched = self
            .evolver
            .match_to_existing(&mut catalog, &persisted, batch_id)?;
        let deduped = self.evolver.dedupe_candidates(
            &mut catalog,
            &embedded_candidates,
            &persisted,
            batch_id,
        )?;
        self.checkpoint(started, "matching")?;

        // Step 4: highlight keywords for every assignment (bounded
        // fan-out across independent response/theme pairs).
        let mut assignments: Vec<_> = Vec::new();
        assignments.extend(matched.assignments);
        let mut dedupe_rest = deduped;
        assignments.extend(std::mem::take(&mut dedupe_rest.assignments));

        let text_by_response: HashMap<&str, &str> = persisted
            .iter()
            .map(|r| (r.id.as_str(), r.text.as_str()))
            .collect();
        let embedding_by_theme: HashMap<String, Vec<f32>> = catalog
            .iter()
            .map(|s| (s.theme.id.clone(), s.theme.embedding.clone()))
            .collect();

        let highlighter = &self.highlighter;
        let token = &self.token;
        let highlighted: MosaicResult<Vec<_>> = self.highlight_pool.install(|| {
            assignments
                .into_par_iter()
                .map(|mut assignment| {
                    if token.is_cancelled() {
                        return Err(MosaicError::Cancelled {
                            stage: "highlighting".to_string(),
                        });
                    }
                    let (Some(text), Some(theme_embedding)) = (
                        text_by_response.get(assignment.response_id.as_str()),
                        embedding_by_theme.get(&assignment.theme_id),
                    ) else {
                        return Ok(assignment);
                    };
                    assignment.highlighted_keywords =
                        highlighter.highlight(text, theme_embedding)?;
                    Ok(assignment)
                })
                .collect()
        });
        let assignments = highlighted?;
        self.checkpoint(started, "highlighting")?;

        // Step 5: stage assignments in the plan.
        plan.assignments = assignments;
        dedupe_rest.merge_into(&mut plan);

        // Step 6: merge, split, refresh.
        self.evolver
            .detect_merges(&mut catalog, batch_id)?
            .merge_into(&mut plan);
        self.checkpoint(started, "merges")?;
        self.evolver
            .detect_splits(&mut catalog, question, batch_id)?
            .merge_into(&mut plan);
        self.checkpoint(started, "splits")?;
        self.evolver
            .refresh_descriptions(&mut catalog, batch_id)?
            .merge_into(&mut plan);
        self.checkpoint(started, "refresh")?;

        // Step 7: metadata, then one atomic commit.
        let themes_created = plan.new_themes.len() as u64;
        let themes_updated = {
            let mut ids: Vec<&str> = plan
                .theme_updates
                .iter()
                .map(|u| u.theme_id.as_str())
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids.len() as u64
        };
        let themes_deleted = plan
            .status_changes
            .iter()
            .filter(|c| {
                matches!(
                    c.status,
                    ThemeStatus::Merged | ThemeStatus::Split | ThemeStatus::Retired
                )
            })
            .count() as u64;

        let metadata = BatchMetadata {
            batch_id,
            question: question.to_string(),
            total_responses: responses.len() as u64,
            new_themes_count: themes_created,
            updated_themes_count: themes_updated,
            deleted_themes_count: themes_deleted,
            processing_time_seconds: started.elapsed().as_secs_f64(),
            processed_at: chrono::Utc::now(),
        };
        plan.metadata = Some(metadata);
        self.store.commit_batch(&plan)?;

        info!(
            batch_id,
            themes_created,
            themes_updated,
            themes_deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch committed"
        );

        Ok(BatchResult {
            batch_id,
            question: question.to_string(),
            processing_time_seconds: started.elapsed().as_secs_f64(),
            total_responses: responses.len() as u64,
            themes_created,
            themes_updated,
            themes_deleted,
            evolution: plan.evolution,
        })
    }

    /// Process batches sequentially in the given order. A failure aborts
    /// the remainder unless `continue_on_error` is set, in which case
    /// each failure is reported independently and theme state is as of
    /// the last successful batch.
    pub fn process_many(
        &self,
        batches: &[BatchInput],
        continue_on_error: bool,
    ) -> Vec<(u64, MosaicResult<BatchResult>)> {
        let mut results = Vec::with_capacity(batches.len());
        for batch in batches {
            let result = self.process_batch(batch.batch_id, &batch.question, &batch.responses);
            let failed = result.is_err();
            results.push((batch.batch_id, result));
            if failed && !continue_on_error {
                break;
            }
        }
        results
    }
}
