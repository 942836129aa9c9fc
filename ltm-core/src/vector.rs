//! Vector math shared by providers, the dedup pipeline, and result
//! ranking. All arithmetic is done in `f64` even though embeddings are
//! stored as `f32`, so accumulated dot products over 1536 dimensions
//! don't lose precision before the final comparison.

use crate::config::DistanceMetric;

pub fn dot_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity with a zero-norm guard instead of producing NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

/// Converts a raw distance into the `[0, 1]`-ish similarity space used
/// for `min_similarity` filtering and ranking. Thresholds are
/// metric-specific, not normalized to one universal scale, so a caller
/// switching metrics must recalibrate its `min_similarity`.
pub fn similarity_from_distance(metric: DistanceMetric, distance: f64) -> f64 {
    match metric {
        DistanceMetric::Cosine => (1.0 - distance).max(0.0),
        DistanceMetric::L2 => 1.0 / (1.0 + distance),
        DistanceMetric::InnerProduct => distance.abs().min(1.0),
    }
}

/// Metric-aware similarity between two raw vectors, matching what the
/// corresponding SQL distance operator would have produced.
pub fn similarity(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f64 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b).max(0.0),
        DistanceMetric::L2 => 1.0 / (1.0 + l2_distance(a, b)),
        DistanceMetric::InnerProduct => dot_product(a, b).abs().min(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_vector_is_zero_not_nan() {
        let zero = vec![0.0_f32, 0.0, 0.0];
        let v = vec![1.0_f32, 2.0, 3.0];
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn similarity_from_distance_matches_metric_formulas() {
        assert_eq!(similarity_from_distance(DistanceMetric::Cosine, 0.0), 1.0);
        assert_eq!(similarity_from_distance(DistanceMetric::Cosine, 1.5), 0.0);
        assert!((similarity_from_distance(DistanceMetric::L2, 1.0) - 0.5).abs() < 1e-9);
        assert_eq!(similarity_from_distance(DistanceMetric::InnerProduct, -2.0), 1.0);
    }

    #[test]
    fn metric_similarity_agrees_with_distance_form() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        let d = l2_distance(&a, &b);
        assert!((similarity(DistanceMetric::L2, &a, &b) - similarity_from_distance(DistanceMetric::L2, d)).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_zero_cosine_similarity() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
