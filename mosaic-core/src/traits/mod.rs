//! Capability traits at the component seams.
//!
//! The evolver and processor receive these as trait objects; the test
//! suite substitutes in-memory fakes for every remote-backed component.

mod cache;
mod embedder;
mod extractor;
mod highlighter;
mod store;

pub use cache::IEmbeddingCache;
pub use embedder::IEmbedder;
pub use extractor::IThemeExtractor;
pub use highlighter::IHighlighter;
pub use store::IThemeStore;
