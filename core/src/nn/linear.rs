use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use rand::Rng;

/// Fully connected layer: `y = x·Wᵀ + b`.
///
/// Weights are stored as `[out_features, in_features]`, one row per output
/// unit, so the forward pass multiplies against the transposed operand
/// directly instead of materialising `Wᵀ`.
///
/// # Examples
/// ```rust
/// use ctransformer::nn::Linear;
/// use ctransformer::tensor::Tensor;
///
/// let layer = Linear::<f32>::new(Tensor::ones([2, 3]), Some(Tensor::zeros([2])));
/// let x = Tensor::<f32, 3>::ones([4, 5, 3]);
/// let y = layer.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[4, 5, 2]);
/// assert_eq!(y.data()[0], 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct Linear<T: TensorElem> {
    /// Shape: `[out_features, in_features]`
    pub weight: Tensor<T, 2>,
    /// Shape: `[out_features]`
    pub bias: Option<Tensor<T, 1>>,
}

impl<T: TensorElem> Linear<T> {
    pub fn new(weight: Tensor<T, 2>, bias: Option<Tensor<T, 1>>) -> Self {
        Self { weight, bias }
    }

    /// Glorot-uniform weights, `U(-l, l)` with `l = sqrt(6 / (in + out))`, and
    /// a zero bias when `bias` is set.
    pub fn init<R>(in_features: usize, out_features: usize, bias: bool, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let fan = (in_features + out_features).max(1) as f64;
        let limit = (6.0 / fan).sqrt();
        let weight = Tensor::random_uniform([out_features, in_features], -limit, limit, rng)?;
        let bias = bias.then(|| Tensor::zeros([out_features]));
        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }

    /// Applies the layer to the last axis of `x`; leading axes are batch axes.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if the last axis of `x` differs from
    /// `in_features`, or the bias length differs from `out_features`.
    pub fn forward<const RANK: usize>(&self, x: &Tensor<T, RANK>) -> Result<Tensor<T, RANK>> {
        const { assert!(RANK >= 1, "Linear requires rank >= 1") };

        let in_features = self.in_features();
        let shape = *x.shape();
        if shape[RANK - 1] != in_features {
            return Err(TensorError::ShapeMismatch {
                expected: vec![in_features],
                got: vec![shape[RANK - 1]],
            });
        }

        let rows: usize = shape[..RANK - 1].iter().product();
        let flat = Tensor::new(x.data().to_vec(), [rows, in_features])?;
        let mut out = flat.matmul_transposed(&self.weight)?;
        if let Some(bias) = &self.bias {
            out = out.broadcast_add(bias)?;
        }

        let mut out_shape = shape;
        out_shape[RANK - 1] = self.out_features();
        out.reshape(out_shape)
    }
}

impl<T: TensorElem> Module<T> for Linear<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        let mut params = vec![("weight".to_string(), self.weight.data())];
        if let Some(bias) = &self.bias {
            params.push(("bias".to_string(), bias.data()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_linear_forward_2d() {
        // y = x·Wᵀ + b with W = [[1, 2], [3, 4], [5, 6]]
        let weight = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [3, 2]).unwrap();
        let bias = Tensor::new(vec![0.5, 0.5, 0.5], [3]).unwrap();
        let layer = Linear::<f32>::new(weight, Some(bias));

        let x = Tensor::new(vec![1.0, 1.0, 2.0, 0.0], [2, 2]).unwrap();
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.shape(), &[2, 3]);

        let expected = [3.5, 7.5, 11.5, 2.5, 6.5, 10.5];
        for (got, exp) in y.data().iter().zip(expected) {
            assert!((got - exp).abs() < 1e-6);
        }
    }

    #[test]
    fn test_linear_forward_3d_matches_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Linear::<f32>::init(4, 6, true, &mut rng).unwrap();

        let x = Tensor::<f32, 3>::new((0..24).map(|v| v as f32 * 0.1).collect(), [2, 3, 4])
            .unwrap();
        let y3 = layer.forward(&x).unwrap();
        assert_eq!(y3.shape(), &[2, 3, 6]);

        let y2 = layer.forward(&x.clone().reshape([6, 4]).unwrap()).unwrap();
        assert_eq!(y3.data(), y2.data());
    }

    #[test]
    fn test_linear_without_bias() {
        let layer = Linear::<f64>::new(Tensor::ones([2, 2]), None);
        let x = Tensor::new(vec![1.0, 2.0], [2]).unwrap();
        assert_eq!(layer.forward(&x).unwrap().data(), &[3.0, 3.0]);
        assert_eq!(layer.named_parameters().len(), 1);
    }

    #[test]
    fn test_linear_input_mismatch() {
        let layer = Linear::<f32>::new(Tensor::zeros([3, 4]), None);
        let x = Tensor::<f32, 2>::zeros([2, 5]);
        assert_eq!(
            layer.forward(&x).unwrap_err(),
            TensorError::ShapeMismatch {
                expected: vec![4],
                got: vec![5],
            }
        );
    }

    #[test]
    fn test_linear_bias_mismatch() {
        let layer = Linear::<f32>::new(Tensor::zeros([3, 2]), Some(Tensor::zeros([2])));
        let x = Tensor::<f32, 2>::zeros([1, 2]);
        assert!(matches!(
            layer.forward(&x),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_glorot_init() {
        let mut rng = StdRng::seed_from_u64(11);
        let layer = Linear::<f32>::init(10, 6, true, &mut rng).unwrap();
        let limit = (6.0f32 / 16.0).sqrt();

        assert_eq!(layer.weight.shape(), &[6, 10]);
        assert!(layer.weight.data().iter().all(|w| w.abs() <= limit + 1e-6));
        assert!(layer.weight.data().iter().any(|w| *w != 0.0));
        assert_eq!(layer.bias.as_ref().unwrap().data(), &[0.0; 6]);
        assert_eq!(layer.num_parameters(), 66);
    }
}
