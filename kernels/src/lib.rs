//! CPU kernels backing the `ctransformer` tensor runtime.
//!
//! Kernels work on raw row-major slices plus a shape array, so the tensor crate
//! can stay a thin owner of data and shape. Every kernel parallelises over
//! output rows with `rayon`.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use std::fmt::Debug;
use thiserror::Error;

pub mod cpu_matmul;
pub mod cpu_softmax;
pub mod cpu_transpose;

pub use cpu_matmul::{cpu_matmul, cpu_matmul_nt};
pub use cpu_softmax::cpu_softmax_rows;
pub use cpu_transpose::{cpu_swap_axes, cpu_transpose};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Trait bound for elements that can be processed by kernels.
/// Mirrors `TensorElem` in the main crate so neither crate depends on the other.
pub trait KernelElem:
    Num + NumAssign + Copy + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> KernelElem for T where
    T: Num + NumAssign + Copy + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

/// Row-major strides for `shape`.
pub fn contiguous_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut acc = 1;
    for axis in (0..RANK).rev() {
        strides[axis] = acc;
        acc *= shape[axis];
    }
    strides
}

pub(crate) fn check_len(len: usize, expected: usize) -> Result<()> {
    if len != expected {
        return Err(KernelError::ShapeMismatch {
            expected: vec![expected],
            got: vec![len],
        });
    }
    Ok(())
}
