//! Activation functions.
//!
//! The feed-forward sublayer of every encoder block uses ReLU,
//! $f(x) = \max(0, x)$, between its expanding and projecting linear maps.

use crate::tensor::{Tensor, TensorElem};

/// Computes $\max(0, x)$ for a single element.
pub fn relu<T: TensorElem>(x: T) -> T {
    if x > T::zero() { x } else { T::zero() }
}

/// Activation functions namespace.
///
/// Provides element-wise activation functions for Tensors.
pub struct Activation;

impl Activation {
    /// Applies ReLU element-wise.
    pub fn relu<const RANK: usize, T: TensorElem>(x: &Tensor<T, RANK>) -> Tensor<T, RANK> {
        x.map(relu)
    }
}
