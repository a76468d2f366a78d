//! Cache keys: 64-hex SHA-256 of the model-prefixed input text.
//!
//! Prefixing with the model name keeps vectors from different models
//! from colliding in the shared cache table.

use sha2::{Digest, Sha256};

/// Compute the cache key for a (model, text) pair.
pub fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_64_hex_chars() {
        let key = cache_key("nomic-embed-text", "some response");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(cache_key("m", "text"), cache_key("m", "text"));
    }

    #[test]
    fn key_depends_on_model_and_text() {
        assert_ne!(cache_key("model-a", "text"), cache_key("model-b", "text"));
        assert_ne!(cache_key("m", "text one"), cache_key("m", "text two"));
    }
}
