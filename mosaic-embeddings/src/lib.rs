//! # mosaic-embeddings
//!
//! Text → fixed-dimension unit vector, with a two-tier read-through
//! cache (in-process moka over the store's durable table), grouped
//! remote fetches over a bounded pool, and capped exponential retry.

pub mod cache;
pub mod engine;
pub mod hashing;
pub mod provider;

pub use engine::EmbeddingEngine;
pub use provider::{HttpEmbeddingProvider, RemoteEmbeddingBackend};
