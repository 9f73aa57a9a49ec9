//! Causal masking.
//!
//! A causal mask stops query position `i` from attending to any key position
//! `j > i`. It is an additive bias: allowed entries are `0`, forbidden entries
//! hold the most negative finite value, so that after softmax their weight
//! underflows to exactly zero.

use crate::tensor::{Result, Tensor, TensorElem, TensorError};
use num_traits::Float;

/// `[t, t]` indicator with ones on and below the diagonal.
pub fn lower_triangle<T: TensorElem>(t: usize) -> Tensor<T, 2> {
    let mut tril = Tensor::zeros([t, t]);
    for (i, row) in tril.data_mut().chunks_exact_mut(t.max(1)).enumerate() {
        row[..=i].iter_mut().for_each(|v| *v = T::one());
    }
    tril
}

/// Additive `[t, t]` mask: `0` where `j <= i`, `T::min_value()` where `j > i`.
///
/// Deterministic: two calls with the same `t` give bit-identical matrices.
pub fn causal_mask<T: TensorElem + Float>(t: usize) -> Tensor<T, 2> {
    // Complement of the lower triangle, scaled by the most negative float.
    lower_triangle::<T>(t).map(|keep| {
        if keep == T::one() {
            T::zero()
        } else {
            T::min_value()
        }
    })
}

/// Adds the causal mask to every `[t, t]` slice of a `[n, t, t]` score tensor.
///
/// # Errors
///
/// Returns `TensorError::ShapeMismatch` if the last two axes are not square.
pub fn apply_causal_mask<T: TensorElem + Float>(scores: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
    let [n, rows, cols] = *scores.shape();
    if rows != cols {
        return Err(TensorError::ShapeMismatch {
            expected: vec![n, rows, rows],
            got: vec![n, rows, cols],
        });
    }
    scores.broadcast_add(&causal_mask(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_triangle() {
        let tril = lower_triangle::<f32>(3);
        assert_eq!(
            tril.data(),
            &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_causal_mask_values() {
        let m = causal_mask::<f32>(3);
        assert_eq!(m.shape(), &[3, 3]);
        for i in 0..3 {
            for j in 0..3 {
                let v = m.data()[i * 3 + j];
                if j <= i {
                    assert_eq!(v, 0.0);
                } else {
                    assert_eq!(v, f32::MIN);
                }
            }
        }
    }

    #[test]
    fn test_causal_mask_is_deterministic() {
        let a = causal_mask::<f64>(7);
        let b = causal_mask::<f64>(7);
        let bits = |t: &Tensor<f64, 2>| t.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(causal_mask::<f32>(0).size(), 0);
        assert_eq!(causal_mask::<f32>(1).data(), &[0.0]);
    }

    #[test]
    fn test_apply_then_softmax_zeroes_future() {
        let scores = Tensor::<f32, 3>::new(vec![5.0; 2 * 4 * 4], [2, 4, 4]).unwrap();
        let weights = apply_causal_mask(&scores).unwrap().softmax().unwrap();

        for (r, row) in weights.data().chunks(4).enumerate() {
            let i = r % 4;
            for (j, &w) in row.iter().enumerate() {
                if j > i {
                    assert_eq!(w, 0.0);
                } else {
                    assert!((w - 1.0 / (i + 1) as f32).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_apply_rejects_non_square() {
        let scores = Tensor::<f32, 3>::zeros([1, 2, 3]);
        assert_eq!(
            apply_causal_mask(&scores).unwrap_err(),
            TensorError::ShapeMismatch {
                expected: vec![1, 2, 2],
                got: vec![1, 2, 3],
            }
        );
    }
}
