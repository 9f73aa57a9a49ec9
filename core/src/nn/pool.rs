use crate::tensor::{Result, Tensor, TensorElem, TensorError, cast};
use num_traits::Float;
use rayon::prelude::*;

/// Reduction over the sequence axis: `[b, t, e] -> [b, e]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pooling {
    /// Average over all positions.
    #[default]
    Mean,
    /// Element-wise maximum over all positions.
    Max,
}

impl Pooling {
    /// # Errors
    ///
    /// Returns `TensorError::Unsupported` for an empty sequence (`t == 0`),
    /// where neither reduction is defined.
    pub fn forward<T: TensorElem + Float>(&self, x: &Tensor<T, 3>) -> Result<Tensor<T, 2>> {
        let [batch, seq_len, dim] = *x.shape();
        if seq_len == 0 {
            return Err(TensorError::Unsupported(
                "cannot pool an empty sequence".to_string(),
            ));
        }
        let inv_len: T = cast(1.0 / seq_len as f64)?;

        let mut out = Tensor::zeros([batch, dim]);
        if dim == 0 {
            return Ok(out);
        }

        out.data_mut()
            .par_chunks_mut(dim)
            .zip(x.data().par_chunks(seq_len * dim))
            .for_each(|(pooled, sequence)| {
                let mut rows = sequence.chunks_exact(dim);
                if let Some(first) = rows.next() {
                    pooled.copy_from_slice(first);
                }
                for row in rows {
                    for (p, &v) in pooled.iter_mut().zip(row) {
                        *p = match self {
                            Pooling::Mean => *p + v,
                            Pooling::Max => Float::max(*p, v),
                        };
                    }
                }
                if *self == Pooling::Mean {
                    pooled.iter_mut().for_each(|p| *p *= inv_len);
                }
            });

        Ok(out)
    }
}
