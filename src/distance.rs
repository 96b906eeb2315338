//! Math kernels for vector similarity
//!
//! Binary kernels are only reachable through [`checked`], which rejects
//! operands of different lengths before any arithmetic runs.

use crate::error::{Result, VectorDbError};

/// Compute the L2 norm (magnitude) of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length.
///
/// A zero vector (or one whose norm is not finite) has no direction and is
/// rejected rather than producing NaN components.
pub fn normalize(v: &[f32]) -> Result<Vec<f32>> {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(VectorDbError::InvalidVector {
            reason: format!("Cannot normalize vector with norm {}", norm),
        });
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// Run a binary kernel after checking both operands have the same length.
pub fn checked<F>(a: &[f32], b: &[f32], op: F) -> Result<f32>
where
    F: FnOnce(&[f32], &[f32]) -> Result<f32>,
{
    if a.len() != b.len() {
        return Err(VectorDbError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    op(a, b)
}

/// Dot product of two vectors of equal length
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    checked(a, b, |a, b| Ok(dot_unchecked(a, b)))
}

/// Cosine similarity in `[-1, 1]`.
///
/// Fails if either operand has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    checked(a, b, |a, b| {
        let denom = l2_norm(a) * l2_norm(b);
        if denom == 0.0 {
            return Err(VectorDbError::InvalidVector {
                reason: "Cannot compute cosine similarity with zero vector".to_string(),
            });
        }
        // Clamp to [-1, 1] to absorb floating point drift
        Ok((dot_unchecked(a, b) / denom).clamp(-1.0, 1.0))
    })
}

/// Euclidean (L2) distance between two vectors of equal length
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    checked(a, b, |a, b| {
        Ok(a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt())
    })
}

fn dot_unchecked(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
