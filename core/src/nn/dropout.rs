use crate::nn::Mode;
use crate::tensor::{Result, Tensor, TensorElem, TensorError, cast};

use rand::Rng;

/// Inverted dropout.
///
/// In training mode each element is zeroed with probability `p` and the
/// survivors are scaled by `1 / (1 - p)`, so the expected activation matches
/// inference mode, where the layer is the identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    /// # Errors
    ///
    /// Returns `TensorError::InvalidConfig` unless `0 <= p < 1`.
    pub fn new(p: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(TensorError::InvalidConfig(format!(
                "dropout rate must be in [0, 1), got {p}"
            )));
        }
        Ok(Self { p })
    }

    pub fn rate(&self) -> f64 {
        self.p
    }

    pub fn forward<T, const RANK: usize>(
        &self,
        x: &Tensor<T, RANK>,
        mode: &mut Mode<'_>,
    ) -> Result<Tensor<T, RANK>>
    where
        T: TensorElem,
    {
        let rng = match mode {
            Mode::Train(rng) if self.p > 0.0 => rng,
            _ => return Ok(x.clone()),
        };

        let scale: T = cast(1.0 / (1.0 - self.p))?;
        // Draw the mask sequentially; the RNG is not shared across threads.
        let keep: Vec<bool> = (0..x.size()).map(|_| rng.random::<f64>() >= self.p).collect();
        let mut out = x.clone();
        for (v, kept) in out.data_mut().iter_mut().zip(keep) {
            *v = if kept { *v * scale } else { T::zero() };
        }
        Ok(out)
    }
}
