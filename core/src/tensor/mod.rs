//! Dense CPU tensors.
//!
//! A [`Tensor`] is a flat, row-major `Vec<T>` plus a `[usize; RANK]` shape. The
//! rank is part of the type; the size of every axis is a runtime value, so the
//! same model handles any batch size or sequence length without recompiling.
//!
//! ```rust
//! use ctransformer::tensor::Tensor;
//!
//! let x = Tensor::<f32, 3>::new(vec![0.0; 24], [2, 3, 4]).unwrap();
//! assert_eq!(x.shape(), &[2, 3, 4]);
//! assert_eq!(x.strides(), &[12, 4, 1]);
//!
//! // Reshape is free: the data is reinterpreted, never copied.
//! let flat = x.reshape([6, 4]).unwrap();
//! assert_eq!(flat.shape(), &[6, 4]);
//! ```
//!
//! > [!TIP]
//! > **Row-major layout**: the last axis changes fastest in memory. That is why
//! > attention folds heads with an explicit axis swap before reshaping: a plain
//! > reshape of `[b, t, h, e]` into `[b * h, t, e]` would interleave positions of
//! > different heads.

use num_traits::{FromPrimitive, Num, NumAssign, ToPrimitive};
use rand::Rng;
use std::fmt::Debug;
use thiserror::Error;

use ctransformer_kernels::KernelError;

pub mod ops;
pub mod shape;

pub use shape::{Dim, SymbolicShape, shape_list};

/// Errors raised by tensor operations and the layers built on them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// A structural precondition on shapes was violated.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// The trailing axis of an attention input differs from the configured width.
    #[error("Input embedding dim ({got}) should match layer embedding dim ({expected})")]
    EmbeddingDimMismatch { expected: usize, got: usize },
    /// A sequence is longer than the positional table.
    #[error("Sequence length {len} exceeds the positional capacity of {max}")]
    SequenceTooLong { len: usize, max: usize },
    /// An index is out of bounds for the given shape.
    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    /// A model configuration was rejected before any weights were built.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The requested operation is not defined for this input.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<KernelError> for TensorError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::ShapeMismatch { expected, got } => {
                TensorError::ShapeMismatch { expected, got }
            }
            KernelError::AxisOutOfRange { axis, rank } => TensorError::IndexOutOfBounds {
                index: vec![axis],
                shape: vec![rank],
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;

/// Trait bound for elements that can be stored in a Tensor.
///
/// - `Copy`: elements live in contiguous memory and are read by value.
/// - `Num + NumAssign`: arithmetic used by the kernels.
/// - `Send + Sync`: required for parallel execution via `rayon`.
///
/// Integer types qualify too; token ids are `Tensor<usize, 2>`.
pub trait TensorElem:
    Num + NumAssign + Copy + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

impl<T> TensorElem for T where
    T: Num + NumAssign + Copy + Debug + Send + Sync + FromPrimitive + ToPrimitive + PartialOrd
{
}

/// Converts an `f64` constant into the element type.
///
/// # Errors
///
/// Returns `TensorError::Unsupported` when `T` cannot represent `value`.
pub fn cast<T: TensorElem>(value: f64) -> Result<T> {
    T::from_f64(value).ok_or_else(|| {
        TensorError::Unsupported(format!(
            "{value} is not representable as {}",
            std::any::type_name::<T>()
        ))
    })
}

/// An N-dimensional array stored contiguously in row-major order.
///
/// # Generics
///
/// - `T`: the element type (must implement [`TensorElem`]).
/// - `RANK`: the number of axes.
///
/// All operations on a tensor borrow it and return a new one; nothing in the
/// model mutates an input in place.
#[derive(Clone, PartialEq)]
pub struct Tensor<T, const RANK: usize>
where
    T: TensorElem,
{
    shape: [usize; RANK],
    strides: [usize; RANK],
    data: Vec<T>,
}

impl<T, const RANK: usize> Tensor<T, RANK>
where
    T: TensorElem,
{
    /// Creates a new Tensor from a vector of data and a shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the length of `data` does not match the product of `shape`.
    pub fn new(data: Vec<T>, shape: [usize; RANK]) -> Result<Self> {
        let size: usize = shape.iter().product();
        if data.len() != size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![size],
                got: vec![data.len()],
            });
        }
        Ok(Self::from_parts(data, shape))
    }

    /// Builds a tensor whose length is already known to match `shape`.
    pub(crate) fn from_parts(data: Vec<T>, shape: [usize; RANK]) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Self {
            shape,
            strides: compute_strides(&shape),
            data,
        }
    }

    /// Creates a tensor with every element set to `value`.
    pub fn full(shape: [usize; RANK], value: T) -> Self {
        let size: usize = shape.iter().product();
        Self::from_parts(vec![value; size], shape)
    }

    /// Creates a new Tensor filled with zeros.
    pub fn zeros(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::zero())
    }

    /// Creates a new Tensor filled with ones.
    pub fn ones(shape: [usize; RANK]) -> Self {
        Self::full(shape, T::one())
    }

    /// Samples every element independently from `U(low, high)`.
    ///
    /// Sampling happens in `f64` and is converted once per element, so the
    /// same seed yields the same values for `f32` and `f64` models up to
    /// rounding.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::Unsupported` if a sample is not representable as `T`.
    pub fn random_uniform<R>(shape: [usize; RANK], low: f64, high: f64, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let size: usize = shape.iter().product();
        let data = (0..size)
            .map(|_| {
                let sample = if low < high {
                    rng.random_range(low..high)
                } else {
                    low
                };
                cast(sample)
            })
            .collect::<Result<Vec<T>>>()?;
        Ok(Self::from_parts(data, shape))
    }

    /// Reinterprets the data with a new shape of any rank.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the total number of elements in `new_shape`
    /// does not match the current size of the tensor.
    pub fn reshape<const NEW_RANK: usize>(
        self,
        new_shape: [usize; NEW_RANK],
    ) -> Result<Tensor<T, NEW_RANK>> {
        let new_size: usize = new_shape.iter().product();
        if self.data.len() != new_size {
            return Err(TensorError::ShapeMismatch {
                expected: vec![self.data.len()],
                got: vec![new_size],
            });
        }
        Ok(Tensor::from_parts(self.data, new_shape))
    }

    /// Returns the shape of the tensor.
    pub const fn shape(&self) -> &[usize; RANK] {
        &self.shape
    }

    /// Returns the row-major strides of the tensor.
    pub const fn strides(&self) -> &[usize; RANK] {
        &self.strides
    }

    /// Returns a reference to the underlying data as a slice.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns a mutable reference to the underlying data.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor and returns its flat data.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Returns the total number of elements in the tensor.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Computes row-major strides for `shape`.
const fn compute_strides<const RANK: usize>(shape: &[usize; RANK]) -> [usize; RANK] {
    let mut strides = [0; RANK];
    let mut stride = 1;
    let mut i = RANK;
    while i > 0 {
        i -= 1;
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

impl<T, const RANK: usize> Debug for Tensor<T, RANK>
where
    T: TensorElem,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("dtype", &std::any::type_name::<T>())
            .field("data_len", &self.data.len())
            .finish()
    }
}
