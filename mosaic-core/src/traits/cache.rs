use crate::errors::MosaicResult;

/// Durable embedding cache, content-addressed by the 64-hex SHA-256 of
/// the model-prefixed input text. Entries are immutable; a miss is not
/// an error.
pub trait IEmbeddingCache: Send + Sync {
    fn cache_get(&self, text_hash: &str) -> MosaicResult<Option<Vec<f32>>>;
    fn cache_put(&self, text_hash: &str, embedding: &[f32], model_name: &str) -> MosaicResult<()>;
}
