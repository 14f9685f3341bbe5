use std::fmt;

use crate::error::KnnError;

/// A unit-length embedding produced from one captured frame.
///
/// Built only through [`EmbeddingVector::normalize`], so every value of this
/// type has an L2 norm of 1 (within f32 rounding) and the dot product of two
/// embeddings is their cosine similarity. Immutable once created.
#[derive(Clone, PartialEq)]
pub struct EmbeddingVector {
    values: Box<[f32]>,
}

impl EmbeddingVector {
    /// Scales a raw extractor output to unit length.
    ///
    /// Fails with [`KnnError::DegenerateVector`] when the norm is zero or not
    /// finite (empty input, all zeros, NaN or infinite components).
    pub fn normalize(raw: &[f32]) -> Result<Self, KnnError> {
        let mut sum: f64 = 0.0;
        for &x in raw {
            sum += (x as f64) * (x as f64);
        }
        let norm = sum.sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(KnnError::DegenerateVector);
        }

        let values = raw.iter().map(|&x| ((x as f64) / norm) as f32).collect();
        Ok(Self { values })
    }

    /// Number of components.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Read-only view of the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Cosine similarity with a row of the same dimension.
    pub fn similarity(&self, row: &[f32]) -> f32 {
        dot(&self.values, row)
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl fmt::Debug for EmbeddingVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingVector")
            .field("dimension", &self.values.len())
            .finish()
    }
}

/// Dot product with f64 accumulation. Both slices must have the same length.
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        sum += (x as f64) * (y as f64);
    }
    sum as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(v: &[f32]) -> f64 {
        v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
    }

    #[test]
    fn test_normalize_unit_length() {
        let inputs: [&[f32]; 5] = [
            &[3.0, 4.0],
            &[0.9, 0.1, 0.0, 0.0],
            &[-2.0, 0.5, 7.25, 1e-3],
            &[1e-20, 0.0, 0.0],
            &[1e30, -1e30, 5.0],
        ];
        for raw in inputs {
            let v = EmbeddingVector::normalize(raw).unwrap();
            assert_eq!(v.dimension(), raw.len());
            let n = l2(v.as_slice());
            assert!((n - 1.0).abs() < 1e-6, "norm of {raw:?} is {n}");
        }
    }

    #[test]
    fn test_normalize_keeps_direction() {
        let v = EmbeddingVector::normalize(&[3.0, 4.0]).unwrap();
        assert!((v.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((v.as_slice()[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_fails() {
        assert_eq!(
            EmbeddingVector::normalize(&[0.0, 0.0, 0.0]),
            Err(KnnError::DegenerateVector)
        );
    }

    #[test]
    fn test_normalize_empty_fails() {
        assert_eq!(EmbeddingVector::normalize(&[]), Err(KnnError::DegenerateVector));
    }

    #[test]
    fn test_normalize_non_finite_fails() {
        assert!(EmbeddingVector::normalize(&[f32::NAN, 1.0]).is_err());
        assert!(EmbeddingVector::normalize(&[f32::INFINITY, 1.0]).is_err());
    }

    #[test]
    fn test_similarity_is_cosine() {
        let a = EmbeddingVector::normalize(&[1.0, 0.0, 0.0]).unwrap();
        let b = EmbeddingVector::normalize(&[1.0, 1.0, 0.0]).unwrap();
        let sim = a.similarity(b.as_slice());
        assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6, "got {sim}");

        let c = EmbeddingVector::normalize(&[-1.0, 0.0, 0.0]).unwrap();
        assert!((a.similarity(c.as_slice()) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_debug_hides_values() {
        let v = EmbeddingVector::normalize(&[1.0, 2.0]).unwrap();
        assert_eq!(format!("{v:?}"), "EmbeddingVector { dimension: 2 }");
    }
}
