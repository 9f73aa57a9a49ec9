use crate::{KernelElem, KernelError, Result};
use num_traits::Float;
use rayon::prelude::*;

/// Numerically stable softmax over consecutive rows of length `row_len`.
///
/// The row maximum is subtracted before exponentiation, so rows holding very
/// large or very negative values (such as additive mask biases) stay finite.
pub fn cpu_softmax_rows<T>(data: &[T], row_len: usize) -> Result<Vec<T>>
where
    T: KernelElem + Float,
{
    if data.is_empty() {
        return Ok(Vec::new());
    }
    if row_len == 0 || data.len() % row_len != 0 {
        return Err(KernelError::ShapeMismatch {
            expected: vec![row_len],
            got: vec![data.len()],
        });
    }

    let mut out = data.to_vec();
    out.par_chunks_mut(row_len).for_each(|row| {
        let max = row
            .iter()
            .copied()
            .fold(T::neg_infinity(), |acc, v| acc.max(v));
        let mut sum = T::zero();
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_sum_to_one() {
        let data = vec![1.0f32, 2.0, 3.0, -1.0, 0.0, 1.0];
        let out = cpu_softmax_rows(&data, 3).unwrap();
        for row in out.chunks(3) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        // Shift invariance: both rows differ by a constant offset.
        for (a, b) in out[..3].iter().zip(&out[3..]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_large_negative_entries_vanish() {
        let data = vec![0.5f32, f32::MIN];
        let out = cpu_softmax_rows(&data, 2).unwrap();
        assert_eq!(out, vec![1.0, 0.0]);
    }

    #[test]
    fn test_large_positive_entries_stay_finite() {
        let data = vec![1000.0f64, 1000.0];
        let out = cpu_softmax_rows(&data, 2).unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let data = vec![1.0f32; 5];
        assert!(matches!(
            cpu_softmax_rows(&data, 2),
            Err(KernelError::ShapeMismatch { .. })
        ));
    }
}
