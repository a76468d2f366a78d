//! Shared test doubles for the mosaic workspace.
//!
//! The fakes sit at the remote boundary, exactly where the production
//! system talks to the outside world: `ClusterBackend` stands in for
//! the embeddings endpoint and `ScriptedLlm` for the generation
//! endpoint. Everything above them (cache, extractor parsing, evolver,
//! store) runs the real code paths in the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use mosaic_core::errors::{EmbeddingError, ExtractionError};
use mosaic_embeddings::RemoteEmbeddingBackend;
use mosaic_extraction::RemoteGenerationBackend;

/// Embedding dimension used across the fixture suite.
pub const FIXTURE_DIM: usize = 128;

/// Topic axes for the deterministic embedding model.
const AXIS_API: usize = 0;
const AXIS_DOC: usize = 1;
const AXIS_PRICING: usize = 2;

/// First axis reserved for per-token noise directions.
const NOISE_BASE: usize = 8;
const NOISE_SLOTS: usize = FIXTURE_DIM - NOISE_BASE;

const KW_API: &[&str] = &["api", "integration", "rate", "limits", "challenges", "endpoint"];
const KW_DOC: &[&str] = &["documentation", "docs", "gaps", "guides"];
const KW_PRICING: &[&str] = &["pricing", "price", "cost", "expensive"];

/// Tokens that carry no signal at all in the fixture space.
const ZERO_TOKENS: &[&str] = &[
    "a", "an", "and", "are", "be", "do", "face", "feel", "is", "of", "or", "the", "to", "what",
    "with", "you",
];

/// Deterministic embedding backend with engineered cluster structure.
///
/// Topic keywords accumulate on fixed axes; every other substantive
/// token gets its own stable noise axis (sequential registry, so no two
/// tokens ever collide). Texts about the same topic land close; pure
/// keyword phrases land closer to the topic axis than full sentences,
/// which is what gives the highlighter positive marginal scores.
#[derive(Default)]
pub struct ClusterBackend {
    noise_axes: Mutex<HashMap<String, usize>>,
    calls: AtomicU32,
}

impl ClusterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote calls made so far (cache-hit tests count these).
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn noise_axis(&self, token: &str) -> usize {
        let mut axes = self.noise_axes.lock().expect("noise registry poisoned");
        let next = NOISE_BASE + (axes.len() % NOISE_SLOTS);
        *axes.entry(token.to_string()).or_insert(next)
    }

    /// The raw (unnormalized) fixture vector for a text.
    pub fn raw_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; FIXTURE_DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if ZERO_TOKENS.contains(&token.as_str()) {
                continue;
            }
            if KW_API.contains(&token.as_str()) {
                v[AXIS_API] += 1.0;
            } else if KW_DOC.contains(&token.as_str()) {
                v[AXIS_DOC] += 1.0;
            } else if KW_PRICING.contains(&token.as_str()) {
                v[AXIS_PRICING] += 1.0;
            } else {
                v[self.noise_axis(&token)] += 1.0;
            }
        }
        v
    }
}

impl RemoteEmbeddingBackend for ClusterBackend {
    fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw_vector(text))
    }
}

/// Generation backend that replays a script of raw model outputs.
/// An exhausted script answers with an empty JSON array.
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<String>>,
    calls: AtomicU32,
}

impl ScriptedLlm {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(outputs.into_iter().map(String::from).collect()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn push(&self, output: &str) {
        self.script
            .lock()
            .expect("script poisoned")
            .push_back(output.to_string());
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteGenerationBackend for ScriptedLlm {
    fn generate(&self, _prompt: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or_else(|| "[]".to_string()))
    }
}

// Tests hold the fakes behind Arcs so they can observe call counts
// after handing them to the engines. `Arc<T>` can't implement a
// foreign trait directly (orphan rules), so this local wrapper carries
// the impl.
pub struct Shared<T>(pub std::sync::Arc<T>);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(self.0.clone())
    }
}

impl RemoteEmbeddingBackend for Shared<ClusterBackend> {
    fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.0.fetch(text)
    }
}

impl RemoteGenerationBackend for Shared<ScriptedLlm> {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.0.generate(prompt)
    }
}

/// The canonical two-theme model output used by the fresh-catalog
/// scenarios. The API description is keyword-pure so that theme sits
/// exactly on its topic axis; the documentation description carries the
/// complaint words ("sparse", "incomplete") so single-keyword doc
/// responses still clear the match threshold.
pub const TWO_THEME_JSON: &str = r#"[
  {"name": "API Challenges", "description": "Api integration rate limits."},
  {"name": "Documentation Gaps", "description": "Documentation docs sparse incomplete."}
]"#;
