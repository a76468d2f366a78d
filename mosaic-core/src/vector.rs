//! Vector math shared across the workspace: cosine similarity,
//! L2 normalization, centroids. All similarity reasoning in the system
//! operates on unit vectors, so cosine reduces to a dot product for
//! stored rows; the full formula is kept for raw inputs.

use crate::constants::UNIT_NORM_TOLERANCE;

/// Cosine similarity between two vectors.
/// Returns 0.0 for zero-length, mismatched, or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Normalize a vector to unit length. The zero vector is returned unchanged
/// (blank responses embed to zero and must stay zero).
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm < f64::EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| (*x as f64 / norm) as f32).collect()
}

/// Whether a vector is unit-norm within the storage tolerance, or zero.
pub fn is_unit_or_zero(v: &[f32]) -> bool {
    let norm = l2_norm(v);
    norm < f64::EPSILON || (norm - 1.0).abs() <= UNIT_NORM_TOLERANCE
}

/// Arithmetic mean of a set of vectors. Empty input yields an empty vector.
pub fn centroid(vectors: &[&[f32]]) -> Vec<f32> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let dims = first.len();
    let mut sum = vec![0.0f64; dims];
    for v in vectors {
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    sum.into_iter().map(|x| (x / n) as f32).collect()
}

/// Weighted mean of two vectors, renormalized to unit length.
/// Used for the survivor embedding after a theme merge.
pub fn weighted_merge(a: &[f32], w_a: f64, b: &[f32], w_b: f64) -> Vec<f32> {
    debug_assert_eq!(a.len(), b.len());
    let total = (w_a + w_b).max(f64::EPSILON);
    let merged: Vec<f32> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (((*x as f64) * w_a + (*y as f64) * w_b) / total) as f32)
        .collect();
    l2_normalize(&merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_return_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_keeps_zero_vector() {
        let v = l2_normalize(&[0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
        assert!(is_unit_or_zero(&v));
    }

    #[test]
    fn centroid_of_two_vectors() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let c = centroid(&[&a, &b]);
        assert_eq!(c, vec![0.5, 0.5]);
    }

    #[test]
    fn weighted_merge_leans_toward_heavier_side() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let merged = weighted_merge(&a, 3.0, &b, 1.0);
        assert!(merged[0] > merged[1]);
        assert!((l2_norm(&merged) - 1.0).abs() < 1e-6);
    }
}
