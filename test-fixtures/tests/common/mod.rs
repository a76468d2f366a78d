//! Shared harness for the end-to-end scenarios: the real stack wired
//! over the fixture backends, plus seeding helpers and the invariant
//! checker run after every scenario.

use std::sync::Arc;

use mosaic_core::cancellation::CancellationToken;
use mosaic_core::config::MosaicConfig;
use mosaic_core::models::{Assignment, Response, Theme, ThemeStatus};
use mosaic_core::traits::{IEmbedder, IEmbeddingCache, IThemeStore};
use mosaic_core::vector::{is_unit_or_zero, l2_normalize};
use mosaic_embeddings::EmbeddingEngine;
use mosaic_extraction::{GenerationClient, ThemeExtractor};
use mosaic_highlight::KeywordHighlighter;
use mosaic_processing::BatchProcessor;
use mosaic_storage::StorageEngine;
use test_fixtures::{ClusterBackend, Shared, ScriptedLlm, FIXTURE_DIM};

pub struct Stack {
    pub store: Arc<StorageEngine>,
    pub processor: BatchProcessor,
    pub embedder: Arc<EmbeddingEngine>,
    pub backend: Arc<ClusterBackend>,
    pub llm: Arc<ScriptedLlm>,
    pub token: CancellationToken,
}

/// Wire the real components over the fixture backends.
pub fn build_stack(llm_script: Vec<&str>) -> Stack {
    let store = Arc::new(StorageEngine::open_in_memory().unwrap());
    let backend = Arc::new(ClusterBackend::new());
    let llm = Arc::new(ScriptedLlm::new(llm_script));
    let token = CancellationToken::new();

    let mut config = MosaicConfig::default();
    config.embedding.dim = FIXTURE_DIM;

    let cache: Arc<dyn IEmbeddingCache> = store.clone();
    let embedder = Arc::new(
        EmbeddingEngine::new(
            config.embedding.clone(),
            config.processing.embed_parallelism,
            cache,
            Box::new(Shared(backend.clone())),
            token.clone(),
        )
        .unwrap(),
    );
    let extractor = Arc::new(ThemeExtractor::new(
        GenerationClient::new(
            Box::new(Shared(llm.clone())),
            config.processing.llm_concurrency,
        ),
        config.generation.clone(),
        token.clone(),
    ));
    let highlight_embedder: Arc<dyn IEmbedder> = embedder.clone();
    let highlighter = Arc::new(KeywordHighlighter::new(
        highlight_embedder,
        config.ngram.clone(),
        config.processing.max_keywords,
        config.thresholds.min_contribution,
    ));
    let processor = BatchProcessor::new(
        store.clone(),
        embedder.clone(),
        extractor,
        highlighter,
        config,
        token.clone(),
    )
    .unwrap();

    Stack {
        store,
        processor,
        embedder,
        backend,
        llm,
        token,
    }
}

/// A unit vector on one fixture axis.
pub fn axis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; FIXTURE_DIM];
    v[i] = 1.0;
    v
}

/// A unit vector nearly opposite axis 0 (far enough for the split
/// variance gate).
pub fn counter_axis() -> Vec<f32> {
    let mut v = vec![0.0; FIXTURE_DIM];
    v[0] = -1.0;
    v[1] = 0.3;
    l2_normalize(&v)
}

pub fn seed_theme(store: &StorageEngine, name: &str, embedding: Vec<f32>, batch: u64) -> Theme {
    let theme = Theme::new(name, &format!("{name} description"), embedding, batch);
    store.put_theme(&theme).unwrap();
    theme
}

pub fn seed_assigned_response(
    store: &StorageEngine,
    theme: &Theme,
    text: &str,
    embedding: Vec<f32>,
    batch: u64,
) -> Response {
    let response = Response::new(batch, "What challenges do you face?", text, embedding);
    store.put_response(&response).unwrap();
    store
        .put_assignment(&Assignment::new(&response.id, &theme.id, 0.9, batch))
        .unwrap();
    response
}

/// The cross-entity invariants every run must uphold:
/// no assignment points at a merged (or split) theme, response counters
/// equal live assignments, stored embeddings are unit or zero, batch
/// stamps never run backwards.
pub fn assert_invariants(store: &StorageEngine) {
    let themes = store.list_themes(None).unwrap();
    for theme in &themes {
        assert!(
            is_unit_or_zero(&theme.embedding),
            "theme {} embedding not normalized",
            theme.name
        );
        assert!(
            theme.created_at_batch <= theme.last_updated_batch,
            "theme {} batch stamps run backwards",
            theme.name
        );
        let assignments = store.assignments_for_theme(&theme.id).unwrap();
        if matches!(theme.status, ThemeStatus::Merged | ThemeStatus::Split) {
            assert!(
                assignments.is_empty(),
                "assignments still point at {} theme {}",
                theme.status.as_str(),
                theme.name
            );
        }
        assert_eq!(
            theme.response_count as usize,
            assignments.len(),
            "theme {} response_count out of sync",
            theme.name
        );
    }

    if let Some(latest) = store.latest_batch_id().unwrap() {
        for batch_id in 1..=latest {
            for response in store.responses_for_batch(batch_id).unwrap() {
                assert!(
                    is_unit_or_zero(&response.embedding),
                    "response embedding not normalized"
                );
            }
        }
    }
}
