//! Deterministic 2-means over unit vectors, for the split pass.
//!
//! Initialization is seeded from the data (first point + the point
//! farthest from it), so identical inputs always partition identically.

use mosaic_core::vector::{centroid, cosine_similarity, l2_normalize};

/// Maximum refinement iterations.
const MAX_ITERS: usize = 50;

/// Intra-cluster variance: `1 − mean_i cos(centroid, r_i)`.
/// Empty input has zero variance.
pub fn cluster_variance(points: &[Vec<f32>]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let refs: Vec<&[f32]> = points.iter().map(|p| p.as_slice()).collect();
    let center = centroid(&refs);
    let mean_sim: f64 = points
        .iter()
        .map(|p| cosine_similarity(&center, p))
        .sum::<f64>()
        / points.len() as f64;
    1.0 - mean_sim
}

/// Partition points into two clusters. Returns a label (0 or 1) per
/// point and the two final centroids (unit vectors).
///
/// Degenerate inputs (fewer than two points, or all points identical)
/// collapse into cluster 0.
pub fn two_means(points: &[Vec<f32>]) -> (Vec<usize>, [Vec<f32>; 2]) {
    if points.len() < 2 {
        let dim = points.first().map(|p| p.len()).unwrap_or(0);
        return (vec![0; points.len()], [vec![0.0; dim], vec![0.0; dim]]);
    }

    // Seed: first point, and the point farthest from it.
    let seed_a = 0usize;
    let mut seed_b = 0usize;
    let mut worst = f64::INFINITY;
    for (i, p) in points.iter().enumerate().skip(1) {
        let sim = cosine_similarity(&points[seed_a], p);
        if sim < worst {
            worst = sim;
            seed_b = i;
        }
    }
    if seed_b == seed_a {
        return (
            vec![0; points.len()],
            [l2_normalize(&points[0]), vec![0.0; points[0].len()]],
        );
    }

    let mut centroids = [
        l2_normalize(&points[seed_a]),
        l2_normalize(&points[seed_b]),
    ];
    let mut labels = vec![0usize; points.len()];

    for _ in 0..MAX_ITERS {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let sim_a = cosine_similarity(&centroids[0], p);
            let sim_b = cosine_similarity(&centroids[1], p);
            let label = if sim_b > sim_a { 1 } else { 0 };
            if labels[i] != label {
                labels[i] = label;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for cluster in 0..2 {
            let members: Vec<&[f32]> = points
                .iter()
                .zip(labels.iter())
                .filter(|(_, l)| **l == cluster)
                .map(|(p, _)| p.as_slice())
                .collect();
            if !members.is_empty() {
                centroids[cluster] = l2_normalize(&centroid(&members));
            }
        }
    }

    (labels, centroids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(i: usize, dim: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[i] = 1.0;
        v
    }

    #[test]
    fn tight_cluster_has_low_variance() {
        let points = vec![
            l2_normalize(&[1.0, 0.05, 0.0]),
            l2_normalize(&[1.0, 0.0, 0.05]),
            l2_normalize(&[1.0, 0.02, 0.02]),
        ];
        assert!(cluster_variance(&points) < 0.05);
    }

    #[test]
    fn two_distinct_clusters_have_high_variance() {
        let points = vec![axis(0, 3), axis(0, 3), axis(1, 3), axis(1, 3)];
        assert!(cluster_variance(&points) > 0.25);
    }

    #[test]
    fn two_means_separates_distinct_clusters() {
        let points = vec![
            l2_normalize(&[1.0, 0.0, 0.0]),
            l2_normalize(&[0.99, 0.1, 0.0]),
            l2_normalize(&[0.0, 0.0, 1.0]),
            l2_normalize(&[0.1, 0.0, 0.99]),
        ];
        let (labels, _) = two_means(&points);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn identical_points_collapse_to_one_cluster() {
        let points = vec![axis(0, 2); 4];
        let (labels, _) = two_means(&points);
        assert!(labels.iter().all(|l| *l == 0));
    }

    #[test]
    fn partition_is_deterministic() {
        let points = vec![
            l2_normalize(&[1.0, 0.2, 0.0]),
            l2_normalize(&[0.0, 0.1, 1.0]),
            l2_normalize(&[0.9, 0.3, 0.1]),
            l2_normalize(&[0.1, 0.0, 0.9]),
        ];
        let (a, _) = two_means(&points);
        let (b, _) = two_means(&points);
        assert_eq!(a, b);
    }
}
