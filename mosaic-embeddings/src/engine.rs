//! EmbeddingEngine — the main entry point for mosaic-embeddings.
//!
//! Read-through flow per text: blank short-circuit → L1 → durable cache
//! → grouped remote fetch of the misses over a bounded pool. Every
//! vector that leaves this engine is L2-normalized.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use mosaic_core::cancellation::{Cancellable, CancellationToken};
use mosaic_core::config::EmbeddingConfig;
use mosaic_core::errors::{EmbeddingError, MosaicError, MosaicResult};
use mosaic_core::retry::{with_retry, RetryConfig, TransientError};
use mosaic_core::traits::{IEmbedder, IEmbeddingCache};
use mosaic_core::vector::l2_normalize;

use crate::cache::L1MemoryCache;
use crate::hashing::cache_key;
use crate::provider::{HttpEmbeddingProvider, RemoteEmbeddingBackend};

/// Default L1 capacity (entries).
const L1_CAPACITY: u64 = 10_000;

/// The main embedding engine. Implements `IEmbedder`.
pub struct EmbeddingEngine {
    config: EmbeddingConfig,
    l1: L1MemoryCache,
    durable: Arc<dyn IEmbeddingCache>,
    backend: Box<dyn RemoteEmbeddingBackend>,
    retry: RetryConfig,
    pool: rayon::ThreadPool,
    token: CancellationToken,
}

impl EmbeddingEngine {
    /// Create an engine over an arbitrary backend (tests inject mocks).
    pub fn new(
        config: EmbeddingConfig,
        embed_parallelism: usize,
        durable: Arc<dyn IEmbeddingCache>,
        backend: Box<dyn RemoteEmbeddingBackend>,
        token: CancellationToken,
    ) -> MosaicResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(embed_parallelism.max(1))
            .build()
            .map_err(|e| MosaicError::ConfigurationInvalid {
                reason: format!("embedding pool build failed: {e}"),
            })?;
        Ok(Self {
            config,
            l1: L1MemoryCache::new(L1_CAPACITY),
            durable,
            backend,
            retry: RetryConfig::default(),
            pool,
            token,
        })
    }

    /// Create an engine backed by the HTTP embeddings endpoint.
    pub fn with_http_backend(
        config: EmbeddingConfig,
        embed_parallelism: usize,
        durable: Arc<dyn IEmbeddingCache>,
        token: CancellationToken,
    ) -> MosaicResult<Self> {
        let backend = HttpEmbeddingProvider::new(&config)?;
        Self::new(config, embed_parallelism, durable, Box::new(backend), token)
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.config.dim]
    }

    /// Fetch one text from the backend with retry, normalizing the result.
    fn fetch_remote(&self, text: &str) -> MosaicResult<Vec<f32>> {
        let result = with_retry(&self.retry, "embed", || self.backend.fetch(text));
        match result {
            Ok(raw) => Ok(l2_normalize(&raw)),
            Err(e) if e.is_transient() => Err(EmbeddingError::EmbeddingFailed {
                attempts: self.retry.max_attempts,
                reason: e.to_string(),
                texts: vec![text.to_string()],
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }
}

impl IEmbedder for EmbeddingEngine {
    fn embed(&self, text: &str) -> MosaicResult<Vec<f32>> {
        let mut vectors = self.embed_many(std::slice::from_ref(&text.to_string()))?;
        Ok(vectors.remove(0))
    }

    fn embed_many(&self, texts: &[String]) -> MosaicResult<Vec<Vec<f32>>> {
        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        // Misses grouped by cache key: duplicate texts in one batch cost
        // one fetch. (key, text, result slots)
        let mut misses: Vec<(String, String, Vec<usize>)> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            // Blank input never reaches the backend or the cache.
            if text.trim().is_empty() {
                results[i] = Some(self.zero_vector());
                continue;
            }
            let key = cache_key(&self.config.model, text);
            if let Some(hit) = self.l1.get(&key) {
                results[i] = Some(hit);
                continue;
            }
            if let Some(hit) = self.durable.cache_get(&key)? {
                self.l1.insert(key, hit.clone());
                results[i] = Some(hit);
                continue;
            }
            match misses.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, _, slots)) => slots.push(i),
                None => misses.push((key, text.clone(), vec![i])),
            }
        }

        if !misses.is_empty() {
            if self.token.is_cancelled() {
                return Err(MosaicError::Cancelled {
                    stage: "embedding".to_string(),
                });
            }
            debug!(
                total = texts.len(),
                misses = misses.len(),
                "embedding cache misses, fetching"
            );

            // One grouped remote round over the misses, bounded by the pool.
            let token = &self.token;
            let fetched: MosaicResult<Vec<(String, Vec<usize>, Vec<f32>)>> =
                self.pool.install(|| {
                    misses
                        .par_iter()
                        .map(|(key, text, slots)| {
                            if token.is_cancelled() {
                                return Err(MosaicError::Cancelled {
                                    stage: "embedding".to_string(),
                                });
                            }
                            let vector = self.fetch_remote(text)?;
                            Ok((key.clone(), slots.clone(), vector))
                        })
                        .collect()
                });

            for (key, slots, vector) in fetched? {
                self.durable
                    .cache_put(&key, &vector, &self.config.model)?;
                self.l1.insert(key, vector.clone());
                for i in slots {
                    results[i] = Some(vector.clone());
                }
            }
        }

        Ok(results
            .into_iter()
            .map(|v| v.expect("every slot filled by hit, miss, or blank"))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.config.dim
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory durable cache fake.
    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, Vec<f32>>>,
    }

    impl IEmbeddingCache for MapCache {
        fn cache_get(&self, text_hash: &str) -> MosaicResult<Option<Vec<f32>>> {
            Ok(self.entries.lock().unwrap().get(text_hash).cloned())
        }
        fn cache_put(
            &self,
            text_hash: &str,
            embedding: &[f32],
            _model_name: &str,
        ) -> MosaicResult<()> {
            self.entries
                .lock()
                .unwrap()
                .entry(text_hash.to_string())
                .or_insert_with(|| embedding.to_vec());
            Ok(())
        }
    }

    /// Backend that counts calls and returns a text-dependent raw vector.
    struct CountingBackend {
        calls: AtomicU32,
        dim: usize,
    }

    impl CountingBackend {
        fn new(dim: usize) -> Self {
            Self {
                calls: AtomicU32::new(0),
                dim,
            }
        }
    }

    impl RemoteEmbeddingBackend for CountingBackend {
        fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let seed = text.len() as f32 + 1.0;
            let mut v = vec![seed; self.dim];
            v[0] = 2.0 * seed;
            Ok(v)
        }
    }

    /// Backend that always times out.
    struct FailingBackend;

    impl RemoteEmbeddingBackend for FailingBackend {
        fn fetch(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Transient {
                reason: "timeout".to_string(),
            })
        }
    }

    fn engine_with(backend: Box<dyn RemoteEmbeddingBackend>) -> EmbeddingEngine {
        let config = EmbeddingConfig {
            dim: 8,
            ..Default::default()
        };
        let mut engine = EmbeddingEngine::new(
            config,
            2,
            Arc::new(MapCache::default()),
            backend,
            CancellationToken::new(),
        )
        .unwrap();
        // Keep retry delays out of the test suite.
        engine.retry = RetryConfig {
            max_attempts: 3,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(2),
        };
        engine
    }

    #[test]
    fn blank_input_yields_zero_vector_without_backend_call() {
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        struct SharedCounting {
            calls: std::sync::Arc<AtomicU32>,
        }
        impl RemoteEmbeddingBackend for SharedCounting {
            fn fetch(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1.0; 8])
            }
        }
        let engine = engine_with(Box::new(SharedCounting {
            calls: calls.clone(),
        }));
        for text in ["", "   ", "\n\t"] {
            let v = engine.embed(text).unwrap();
            assert_eq!(v, vec![0.0; 8]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn embedded_vectors_are_unit_norm() {
        let engine = engine_with(Box::new(CountingBackend::new(8)));
        let v = engine.embed("some text").unwrap();
        let norm: f64 = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn repeat_embedding_hits_cache() {
        let backend = CountingBackend::new(8);
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        struct SharedCounting {
            inner: CountingBackend,
            calls: std::sync::Arc<AtomicU32>,
        }
        impl RemoteEmbeddingBackend for SharedCounting {
            fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.inner.fetch(text)
            }
        }
        let engine = engine_with(Box::new(SharedCounting {
            inner: backend,
            calls: calls.clone(),
        }));

        let a = engine.embed("cached text").unwrap();
        let b = engine.embed("cached text").unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_groups_misses_and_serves_hits() {
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        struct SharedCounting {
            calls: std::sync::Arc<AtomicU32>,
        }
        impl RemoteEmbeddingBackend for SharedCounting {
            fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![text.len() as f32 + 1.0; 8])
            }
        }
        let engine = engine_with(Box::new(SharedCounting {
            calls: calls.clone(),
        }));

        engine.embed("alpha").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let texts = vec![
            "alpha".to_string(), // already cached
            "beta".to_string(),
            "".to_string(), // blank, never fetched
            "gamma!".to_string(),
        ];
        let vectors = engine.embed_many(&texts).unwrap();
        assert_eq!(vectors.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 3); // beta + gamma only
    }

    #[test]
    fn duplicate_texts_in_one_batch_fetch_once() {
        let calls = std::sync::Arc::new(AtomicU32::new(0));
        struct SharedCounting {
            calls: std::sync::Arc<AtomicU32>,
        }
        impl RemoteEmbeddingBackend for SharedCounting {
            fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![text.len() as f32 + 1.0; 8])
            }
        }
        let engine = engine_with(Box::new(SharedCounting {
            calls: calls.clone(),
        }));
        let vectors = engine
            .embed_many(&["same text".to_string(), "same text".to_string()])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(vectors[0], vectors[1]);
    }

    #[test]
    fn exhausted_retries_surface_embedding_failed_with_texts() {
        let engine = engine_with(Box::new(FailingBackend));
        let err = engine.embed("doomed text").unwrap_err();
        match err {
            MosaicError::EmbeddingError(EmbeddingError::EmbeddingFailed {
                attempts, texts, ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(texts, vec!["doomed text".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cancelled_token_aborts_before_remote_round() {
        let token = CancellationToken::new();
        token.cancel();
        let config = EmbeddingConfig {
            dim: 8,
            ..Default::default()
        };
        let engine = EmbeddingEngine::new(
            config,
            2,
            Arc::new(MapCache::default()),
            Box::new(CountingBackend::new(8)),
            token,
        )
        .unwrap();
        let err = engine.embed("text").unwrap_err();
        assert!(err.is_cancelled());
    }
}
