//! Tensor operations.
//!
//! Only what the encoder needs lives here:
//! - **Element-wise arithmetic**: `+`, `-`, `*`, `/` on same-shaped tensors.
//! - **Trailing broadcast**: [`Tensor::broadcast_add`] adds a lower-rank tensor
//!   across the leading axes (bias vectors, positional tables, mask matrices).
//! - **Batched matmul**, with and without a transposed right operand.
//! - **Axis swaps** of any rank, used to fold attention heads into the batch axis.
//! - **Softmax** over the last axis.
//!
//! Heavy lifting is delegated to `ctransformer_kernels`; element-wise work is
//! parallelised here with `rayon`.
//!
//! ```rust
//! use ctransformer::tensor::Tensor;
//!
//! let a = Tensor::<f32, 1>::new(vec![1.0, 2.0], [2]).unwrap();
//! let b = Tensor::<f32, 1>::new(vec![3.0, 4.0], [2]).unwrap();
//! let c = (&a + &b).unwrap();
//! assert_eq!(c.data(), &[4.0, 6.0]);
//! ```
//!
//! > [!NOTE]
//! > Element-wise operators require identical shapes. Anything that looks like
//! > broadcasting goes through `broadcast_add`, which only aligns trailing axes.

use super::{Result, Tensor, TensorElem, TensorError};

use num_traits::Float;
use rayon::prelude::*;
use std::ops::{Add, Div, Mul, Sub};

/// Implements a binary arithmetic trait for `&Tensor` with strict shape checks.
macro_rules! impl_bin_op {
    ($trait:ident, $method:ident) => {
        impl<T, const RANK: usize> $trait for &Tensor<T, RANK>
        where
            T: TensorElem,
        {
            type Output = Result<Tensor<T, RANK>>;

            fn $method(self, rhs: Self) -> Self::Output {
                if self.shape != rhs.shape {
                    return Err(TensorError::ShapeMismatch {
                        expected: self.shape.to_vec(),
                        got: rhs.shape.to_vec(),
                    });
                }

                let data = self
                    .data
                    .par_iter()
                    .zip(rhs.data.par_iter())
                    .map(|(a, b)| a.$method(*b))
                    .collect();
                Ok(Tensor::from_parts(data, self.shape))
            }
        }
    };
}

impl_bin_op!(Add, add);
impl_bin_op!(Sub, sub);
impl_bin_op!(Mul, mul);
impl_bin_op!(Div, div);

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Applies a function element-wise, returning a tensor of the same shape.
    ///
    /// ```rust
    /// use ctransformer::tensor::Tensor;
    /// let t = Tensor::<f32, 1>::new(vec![1.0, 2.0, 3.0], [3]).unwrap();
    /// assert_eq!(t.map(|x| x * x).data(), &[1.0, 4.0, 9.0]);
    /// ```
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + Sync + Send,
    {
        let data = self.data.par_iter().map(|&v| f(v)).collect();
        Tensor::from_parts(data, self.shape)
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&self, factor: T) -> Self {
        self.map(|v| v * factor)
    }

    /// Adds `rhs` to every trailing block of `self`.
    ///
    /// `rhs` must match the last `R2` axes of `self` exactly; it is repeated
    /// across the remaining leading axes. Typical uses:
    /// - `[rows, out] + [out]`: a bias vector,
    /// - `[b, t, e] + [t, e]`: a positional table,
    /// - `[n, t, t] + [t, t]`: an additive mask.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the trailing axes differ or
    /// `R2 > RANK`.
    pub fn broadcast_add<const R2: usize>(&self, rhs: &Tensor<T, R2>) -> Result<Self> {
        if R2 > RANK || self.shape[RANK - R2..] != rhs.shape[..] {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape[RANK.saturating_sub(R2)..].to_vec(),
                got: rhs.shape.to_vec(),
            });
        }

        let block = rhs.data.len();
        let mut out = self.data.clone();
        if block > 0 {
            out.par_chunks_mut(block).for_each(|chunk| {
                for (o, &r) in chunk.iter_mut().zip(&rhs.data) {
                    *o += r;
                }
            });
        }
        Ok(Tensor::from_parts(out, self.shape))
    }

    /// Batched matrix multiplication over the last two axes.
    ///
    /// - Rank 2: `[M, K] x [K, N] -> [M, N]`
    /// - Rank 3: `[B, M, K] x [B, K, N] -> [B, M, N]`
    ///
    /// Leading axes are batch axes and must match exactly.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        const { assert!(RANK >= 2, "Matmul requires rank >= 2") };

        let mut out_shape = self.shape;
        out_shape[RANK - 1] = rhs.shape[RANK - 1];
        let out_data =
            ctransformer_kernels::cpu_matmul(&self.data, &rhs.data, &self.shape, &rhs.shape)?;
        Ok(Tensor::from_parts(out_data, out_shape))
    }

    /// Computes `self · rhsᵀ` over the last two axes without materialising the
    /// transpose: `[.., M, K] x [.., N, K] -> [.., M, N]`.
    pub fn matmul_transposed(&self, rhs: &Self) -> Result<Self> {
        const { assert!(RANK >= 2, "Matmul requires rank >= 2") };

        let mut out_shape = self.shape;
        out_shape[RANK - 1] = rhs.shape[RANK - 2];
        let out_data =
            ctransformer_kernels::cpu_matmul_nt(&self.data, &rhs.data, &self.shape, &rhs.shape)?;
        Ok(Tensor::from_parts(out_data, out_shape))
    }

    /// Swaps the last two axes.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::Unsupported` for rank < 2.
    pub fn transpose(&self) -> Result<Self> {
        if RANK < 2 {
            return Err(TensorError::Unsupported(format!(
                "transpose requires rank >= 2, got {RANK}"
            )));
        }
        self.transpose_axes(RANK - 2, RANK - 1)
    }

    /// Swaps two axes, physically permuting the data into a new contiguous tensor.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` if either axis is out of range.
    pub fn transpose_axes(&self, ax1: usize, ax2: usize) -> Result<Self> {
        if ax1 >= RANK || ax2 >= RANK {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![ax1, ax2],
                shape: self.shape.to_vec(),
            });
        }
        let mut new_shape = self.shape;
        new_shape.swap(ax1, ax2);
        let data = ctransformer_kernels::cpu_swap_axes(&self.data, &self.shape, ax1, ax2)?;
        Ok(Tensor::from_parts(data, new_shape))
    }
}

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem + Float,
{
    /// Softmax over the last axis. Every row of the result sums to one.
    pub fn softmax(&self) -> Result<Self> {
        const { assert!(RANK >= 1, "Softmax requires rank >= 1") };

        let data = ctransformer_kernels::cpu_softmax_rows(&self.data, self.shape[RANK - 1])?;
        Ok(Tensor::from_parts(data, self.shape))
    }
}
