//! Similarity scoring between embedding vectors.
//!
//! The default metric is the raw dot product. Embeddings from most hosted
//! models are unit-length, in which case dot and cosine agree; when they are
//! not, a longer vector scores higher regardless of direction.

use crate::error::DimensionMismatch;
use crate::model::SimilarityMetric;

/// Dot product of two equal-length vectors, accumulated in `f64`.
pub fn score(a: &[f32], b: &[f32]) -> Result<f64, DimensionMismatch> {
    check_dimensions(a, b)?;
    Ok(a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum())
}

/// Cosine similarity. Returns 0.0 when either vector has zero magnitude.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64, DimensionMismatch> {
    let dot = score(a, b)?;
    let denom = magnitude(a) * magnitude(b);
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / denom)
}

/// Score `a` against `b` under the given metric.
pub fn score_with(
    metric: SimilarityMetric,
    a: &[f32],
    b: &[f32],
) -> Result<f64, DimensionMismatch> {
    match metric {
        SimilarityMetric::Dot => score(a, b),
        SimilarityMetric::Cosine => cosine(a, b),
    }
}

/// Euclidean norm.
pub fn magnitude(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<(), DimensionMismatch> {
    if a.len() != b.len() {
        return Err(DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_score_is_squared_norm() {
        let vectors: Vec<Vec<f32>> = vec![
            vec![1.0, 0.0],
            vec![3.0, 4.0],
            vec![0.5, -0.25, 2.0, 1.5],
            vec![-1.0, -2.0, -3.0],
        ];
        for v in &vectors {
            let expected: f64 = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum();
            assert_eq!(score(v, v).unwrap(), expected);
        }
        assert_eq!(score(&[3.0, 4.0], &[3.0, 4.0]).unwrap(), 25.0);
    }

    #[test]
    fn empty_vectors_score_zero() {
        assert_eq!(score(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let pairs: Vec<(Vec<f32>, Vec<f32>)> = vec![
            (vec![1.0], vec![1.0, 0.0]),
            (vec![1.0, 0.0, 0.0], vec![1.0, 0.0]),
            (vec![], vec![0.5]),
            (vec![0.1; 8], vec![0.1; 7]),
        ];
        for (a, b) in &pairs {
            let err = score(a, b).unwrap_err();
            assert_eq!(
                err,
                DimensionMismatch {
                    left: a.len(),
                    right: b.len()
                }
            );
            assert!(cosine(a, b).is_err());
        }
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(score(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
    }

    // Dot product is not normalized: scaling one side scales the score, so a
    // long vector can clear a threshold that its direction alone would not.
    #[test]
    fn dot_product_is_magnitude_sensitive() {
        let reference: [f32; 2] = [0.6, 0.8];
        let short: [f32; 2] = [0.3, 0.4];
        let long: [f32; 2] = [1.2, 1.6];
        assert!(score(&reference, &short).unwrap() < 0.6);
        assert!(score(&reference, &long).unwrap() > 0.6);
        let c_short = cosine(&reference, &short).unwrap();
        let c_long = cosine(&reference, &long).unwrap();
        assert!((c_short - c_long).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn score_with_dispatches_on_metric() {
        let a: [f32; 2] = [2.0, 0.0];
        let b: [f32; 2] = [3.0, 0.0];
        assert_eq!(score_with(SimilarityMetric::Dot, &a, &b).unwrap(), 6.0);
        assert!((score_with(SimilarityMetric::Cosine, &a, &b).unwrap() - 1.0).abs() < 1e-12);
    }
}
