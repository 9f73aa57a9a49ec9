use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError, cast};
use num_traits::Float;
use rayon::prelude::*;

/// Layer Normalization over the last axis.
///
/// Formula: `y = (x - mean) / sqrt(var + eps) * gamma + beta`, with the
/// biased variance of each row.
#[derive(Debug, Clone)]
pub struct LayerNorm<T: TensorElem> {
    /// Scale (gamma), shape `[features]`.
    pub weight: Tensor<T, 1>,
    /// Shift (beta), shape `[features]`.
    pub bias: Tensor<T, 1>,
    pub eps: T,
}

impl<T: TensorElem + Float> LayerNorm<T> {
    pub fn new(weight: Tensor<T, 1>, bias: Tensor<T, 1>, eps: T) -> Self {
        Self { weight, bias, eps }
    }

    /// Identity affine parameters (`gamma = 1`, `beta = 0`).
    pub fn with_features(features: usize, eps: T) -> Self {
        Self::new(Tensor::ones([features]), Tensor::zeros([features]), eps)
    }

    /// Normalizes every row along the last axis.
    pub fn forward<const RANK: usize>(&self, x: &Tensor<T, RANK>) -> Result<Tensor<T, RANK>> {
        const { assert!(RANK >= 1, "LayerNorm requires rank >= 1") };

        let shape = x.shape();
        let last_dim = shape[RANK - 1];
        if last_dim != self.weight.shape()[0] || last_dim != self.bias.shape()[0] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![last_dim, last_dim],
                got: vec![self.weight.shape()[0], self.bias.shape()[0]],
            });
        }

        let mut out = Tensor::zeros(*shape);
        if last_dim == 0 {
            return Ok(out);
        }
        let n: T = cast(last_dim as f64)?;
        let gamma = self.weight.data();
        let beta = self.bias.data();

        out.data_mut()
            .par_chunks_mut(last_dim)
            .zip(x.data().par_chunks(last_dim))
            .for_each(|(out_row, in_row)| {
                let mean = in_row.iter().fold(T::zero(), |acc, &v| acc + v) / n;
                let var = in_row
                    .iter()
                    .fold(T::zero(), |acc, &v| acc + (v - mean) * (v - mean))
                    / n;
                let rstd = (var + self.eps).sqrt().recip();

                for (((o, &v), &g), &b) in out_row.iter_mut().zip(in_row).zip(gamma).zip(beta) {
                    *o = (v - mean) * rstd * g + b;
                }
            });

        Ok(out)
    }
}

impl<T: TensorElem> Module<T> for LayerNorm<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        vec![
            ("weight".to_string(), self.weight.data()),
            ("bias".to_string(), self.bias.data()),
        ]
    }
}
