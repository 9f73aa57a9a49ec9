use crate::{KernelElem, KernelError, Result, check_len};
use rayon::prelude::*;

/// Leading (batch) axes of both operands must agree exactly; no broadcasting.
fn check_batch<const RANK: usize>(lhs: &[usize; RANK], rhs: &[usize; RANK]) -> Result<usize> {
    if lhs[..RANK - 2] != rhs[..RANK - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: lhs[..RANK - 2].to_vec(),
            got: rhs[..RANK - 2].to_vec(),
        });
    }
    Ok(lhs[..RANK - 2].iter().product())
}

/// Batched matrix multiplication `[.., M, K] x [.., K, N] -> [.., M, N]`.
///
/// Each output row is accumulated as a sum of scaled `rhs` rows, so both
/// operands are read sequentially and no transposed copy of `rhs` is needed.
/// Rows of the output are distributed over the `rayon` pool.
pub fn cpu_matmul<T, const RANK: usize>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize; RANK],
    rhs_shape: &[usize; RANK],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let m = lhs_shape[RANK - 2];
    let k = lhs_shape[RANK - 1];
    let n = rhs_shape[RANK - 1];

    if k != rhs_shape[RANK - 2] {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k],
            got: vec![rhs_shape[RANK - 2]],
        });
    }
    let batch = check_batch(lhs_shape, rhs_shape)?;
    check_len(lhs_data.len(), batch * m * k)?;
    check_len(rhs_data.len(), batch * k * n)?;

    let mut out_data = vec![T::zero(); batch * m * n];
    if n == 0 {
        return Ok(out_data);
    }

    out_data
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(row, out_row)| {
            let b = row / m.max(1);
            let a_row = &lhs_data[row * k..(row + 1) * k];
            let rhs_block = &rhs_data[b * k * n..(b + 1) * k * n];
            for (&a, rhs_row) in a_row.iter().zip(rhs_block.chunks_exact(n)) {
                for (out, &r) in out_row.iter_mut().zip(rhs_row) {
                    *out += a * r;
                }
            }
        });

    Ok(out_data)
}

/// Batched multiplication against a transposed right operand:
/// `[.., M, K] x [.., N, K]ᵀ -> [.., M, N]`.
///
/// Used for `queries · keysᵀ` and for `x · Wᵀ` in linear layers, where the
/// right operand is already laid out row-per-output.
pub fn cpu_matmul_nt<T, const RANK: usize>(
    lhs_data: &[T],
    rhs_data: &[T],
    lhs_shape: &[usize; RANK],
    rhs_shape: &[usize; RANK],
) -> Result<Vec<T>>
where
    T: KernelElem,
{
    let m = lhs_shape[RANK - 2];
    let k = lhs_shape[RANK - 1];
    let n = rhs_shape[RANK - 2];

    if k != rhs_shape[RANK - 1] {
        return Err(KernelError::ShapeMismatch {
            expected: vec![k],
            got: vec![rhs_shape[RANK - 1]],
        });
    }
    let batch = check_batch(lhs_shape, rhs_shape)?;
    check_len(lhs_data.len(), batch * m * k)?;
    check_len(rhs_data.len(), batch * n * k)?;

    let mut out_data = vec![T::zero(); batch * m * n];
    if n == 0 {
        return Ok(out_data);
    }

    out_data
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(row, out_row)| {
            let b = row / m.max(1);
            let a_row = &lhs_data[row * k..(row + 1) * k];
            let rhs_block = &rhs_data[b * n * k..(b + 1) * n * k];
            for (out, b_row) in out_row.iter_mut().zip(rhs_block.chunks_exact(k.max(1))) {
                let mut sum = T::zero();
                for (&x, &y) in a_row.iter().zip(b_row) {
                    sum += x * y;
                }
                *out = sum;
            }
        });

    Ok(out_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_simple() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![5.0, 6.0, 7.0, 8.0];

        let result = cpu_matmul(&a, &b, &[2, 2], &[2, 2]).unwrap();
        assert_eq!(result, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_rectangular() {
        // [2, 3] x [3, 1]
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![1.0, 0.0, -1.0];

        let result = cpu_matmul(&a, &b, &[2, 3], &[3, 1]).unwrap();
        assert_eq!(result, vec![-2.0, -2.0]);
    }

    #[test]
    fn test_matmul_batch() {
        let a = vec![
            1.0, 0.0, 0.0, 1.0, // identity
            2.0, 0.0, 0.0, 2.0, // 2 * identity
        ];
        let b = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

        let result = cpu_matmul(&a, &b, &[2, 2, 2], &[2, 2, 2]).unwrap();
        assert_eq!(result, vec![1.0, 2.0, 3.0, 4.0, 10.0, 12.0, 14.0, 16.0]);
    }

    #[test]
    fn test_matmul_inner_dim_mismatch() {
        let a = vec![1.0; 4];
        let b = vec![1.0; 6];

        let err = cpu_matmul(&a, &b, &[2, 2], &[3, 2]);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_matmul_batch_mismatch() {
        let a = vec![1.0; 8];
        let b = vec![1.0; 12];

        let err = cpu_matmul(&a, &b, &[2, 2, 2], &[3, 2, 2]);
        assert_eq!(
            err,
            Err(KernelError::ShapeMismatch {
                expected: vec![2],
                got: vec![3],
            })
        );
    }

    #[test]
    fn test_matmul_nt_matches_matmul() {
        // lhs [2, 3], rhs [3, 2] and its transpose [2, 3]
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let b_t = vec![7.0, 9.0, 11.0, 8.0, 10.0, 12.0];

        let nn = cpu_matmul(&a, &b, &[2, 3], &[3, 2]).unwrap();
        let nt = cpu_matmul_nt(&a, &b_t, &[2, 3], &[2, 3]).unwrap();
        assert_eq!(nn, nt);
        assert_eq!(nn, vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_nt_batched_self_product() {
        // Two batches of a single row vector: x·xᵀ is the squared norm.
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let result = cpu_matmul_nt(&x, &x, &[2, 1, 2], &[2, 1, 2]).unwrap();
        assert_eq!(result, vec![5.0, 25.0]);
    }

    #[test]
    fn test_matmul_data_length_checked() {
        let a = vec![1.0; 3];
        let b = vec![1.0; 4];
        let err = cpu_matmul(&a, &b, &[2, 2], &[2, 2]);
        assert!(matches!(err, Err(KernelError::ShapeMismatch { .. })));
    }
}
