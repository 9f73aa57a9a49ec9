//! Static / runtime shape resolution.
//!
//! Layers often know some axis sizes when they are built (the embedding width)
//! and learn others only when data arrives (batch size, sequence length). A
//! [`SymbolicShape`] records what is known up front; [`SymbolicShape::resolve`]
//! fills in the rest from the tensor at hand.

use super::{Tensor, TensorElem};

/// The size of one axis as declared before data is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Fixed at construction time.
    Known(usize),
    /// Only available from the runtime tensor.
    Deferred,
}

impl Dim {
    pub fn known(self) -> Option<usize> {
        match self {
            Dim::Known(n) => Some(n),
            Dim::Deferred => None,
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Known(n)
    }
}

/// A declared shape whose axes may be partly deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolicShape<const RANK: usize> {
    dims: [Dim; RANK],
}

impl<const RANK: usize> SymbolicShape<RANK> {
    pub const fn new(dims: [Dim; RANK]) -> Self {
        Self { dims }
    }

    /// Every axis deferred.
    pub const fn deferred() -> Self {
        Self {
            dims: [Dim::Deferred; RANK],
        }
    }

    pub const fn dims(&self) -> &[Dim; RANK] {
        &self.dims
    }

    /// True when no axis needs the runtime shape.
    pub fn is_static(&self) -> bool {
        self.dims.iter().all(|d| matches!(d, Dim::Known(_)))
    }

    /// Resolves every axis: the declared size where known, the size of `x`
    /// otherwise.
    ///
    /// The runtime shape of `x` is read only when at least one axis is
    /// deferred; a fully static shape is returned as declared even if `x`
    /// disagrees. Never fails.
    pub fn resolve<T: TensorElem>(&self, x: &Tensor<T, RANK>) -> [usize; RANK] {
        let mut runtime: Option<&[usize; RANK]> = None;
        let mut resolved = [0; RANK];
        for (axis, dim) in self.dims.iter().enumerate() {
            resolved[axis] = match dim {
                Dim::Known(n) => *n,
                Dim::Deferred => runtime.get_or_insert_with(|| x.shape())[axis],
            };
        }
        resolved
    }
}

impl<const RANK: usize> Default for SymbolicShape<RANK> {
    fn default() -> Self {
        Self::deferred()
    }
}

/// Per-axis sizes of `x`, read entirely from the runtime shape.
pub fn shape_list<T: TensorElem, const RANK: usize>(x: &Tensor<T, RANK>) -> [usize; RANK] {
    SymbolicShape::<RANK>::deferred().resolve(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_axes_take_precedence() {
        let x = Tensor::<f32, 3>::zeros([2, 5, 4]);
        let shape = SymbolicShape::new([Dim::Deferred, Dim::Deferred, Dim::Known(4)]);
        assert_eq!(shape.resolve(&x), [2, 5, 4]);
    }

    #[test]
    fn test_fully_static_shape_ignores_runtime() {
        let x = Tensor::<f32, 2>::zeros([3, 3]);
        let shape = SymbolicShape::new([Dim::Known(7), Dim::Known(1)]);
        assert!(shape.is_static());
        assert_eq!(shape.resolve(&x), [7, 1]);
    }

    #[test]
    fn test_shape_list() {
        let x = Tensor::<usize, 2>::zeros([2, 9]);
        assert_eq!(shape_list(&x), [2, 9]);
        assert!(!SymbolicShape::<2>::default().is_static());
    }

    #[test]
    fn test_dim_conversions() {
        assert_eq!(Dim::from(3), Dim::Known(3));
        assert_eq!(Dim::Known(3).known(), Some(3));
        assert_eq!(Dim::Deferred.known(), None);
    }
}
