use serde::{Deserialize, Serialize};

use super::highlight::Highlight;

/// Junction between a response and a theme. Unique on
/// (response_id, theme_id); may be rewritten during retroactive passes
/// when its theme changes identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// UUID v4 identifier.
    pub id: String,
    pub response_id: String,
    pub theme_id: String,
    /// Cosine similarity that produced the assignment, clamped to [0, 1].
    pub confidence: f64,
    pub highlighted_keywords: Vec<Highlight>,
    pub assigned_at_batch: u64,
    pub last_updated_batch: u64,
}

impl Assignment {
    pub fn new(response_id: &str, theme_id: &str, confidence: f64, batch_id: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            response_id: response_id.to_string(),
            theme_id: theme_id.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            highlighted_keywords: Vec::new(),
            assigned_at_batch: batch_id,
            last_updated_batch: batch_id,
        }
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.response_id == other.response_id && self.theme_id == other.theme_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let a = Assignment::new("r1", "t1", 1.7, 1);
        assert_eq!(a.confidence, 1.0);
        let b = Assignment::new("r1", "t1", -0.2, 1);
        assert_eq!(b.confidence, 0.0);
    }

    #[test]
    fn equality_is_by_pair() {
        let a = Assignment::new("r1", "t1", 0.8, 1);
        let b = Assignment::new("r1", "t1", 0.9, 2);
        assert_eq!(a, b);
    }
}
