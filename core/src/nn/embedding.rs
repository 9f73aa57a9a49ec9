use crate::nn::Module;
use crate::tensor::{Result, Tensor, TensorElem, TensorError};

use rand::Rng;
use rayon::prelude::*;

/// Lookup table mapping integer ids to dense vectors.
///
/// Serves both as the token embedding (`num_embeddings = vocabulary size`)
/// and as the learned positional embedding (`num_embeddings = maximum
/// sequence length`).
#[derive(Debug, Clone)]
pub struct Embedding<T: TensorElem> {
    /// Shape: `[num_embeddings, embedding_dim]`
    pub weight: Tensor<T, 2>,
}

impl<T: TensorElem> Embedding<T> {
    pub fn new(weight: Tensor<T, 2>) -> Self {
        Self { weight }
    }

    /// Uniform `U(-0.05, 0.05)` table.
    pub fn init<R>(num_embeddings: usize, embedding_dim: usize, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let weight = Tensor::random_uniform([num_embeddings, embedding_dim], -0.05, 0.05, rng)?;
        Ok(Self { weight })
    }

    pub fn num_embeddings(&self) -> usize {
        self.weight.shape()[0]
    }

    pub fn embedding_dim(&self) -> usize {
        self.weight.shape()[1]
    }

    /// Looks up every id of a `[batch, seq]` tensor, giving `[batch, seq, dim]`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` for an id `>= num_embeddings`.
    pub fn forward(&self, input: &Tensor<usize, 2>) -> Result<Tensor<T, 3>> {
        let [batch_size, seq_len] = *input.shape();
        let [vocab_size, hidden_dim] = *self.weight.shape();

        if let Some(&bad) = input.data().iter().find(|&&id| id >= vocab_size) {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![bad],
                shape: vec![vocab_size, hidden_dim],
            });
        }

        let mut out = Tensor::zeros([batch_size, seq_len, hidden_dim]);
        if hidden_dim > 0 {
            let table = self.weight.data();
            out.data_mut()
                .par_chunks_mut(hidden_dim)
                .zip(input.data().par_iter())
                .for_each(|(row, &id)| {
                    row.copy_from_slice(&table[id * hidden_dim..(id + 1) * hidden_dim]);
                });
        }
        Ok(out)
    }

    /// Rows `0..len` of the table as a `[len, dim]` tensor, i.e. the
    /// embeddings of positions `0, 1, .., len - 1`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::SequenceTooLong` if `len > num_embeddings`.
    pub fn positions(&self, len: usize) -> Result<Tensor<T, 2>> {
        let max = self.num_embeddings();
        if len > max {
            return Err(TensorError::SequenceTooLong { len, max });
        }
        let dim = self.embedding_dim();
        Tensor::new(self.weight.data()[..len * dim].to_vec(), [len, dim])
    }
}

impl<T: TensorElem> Module<T> for Embedding<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        vec![("weight".to_string(), self.weight.data())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn table() -> Embedding<f32> {
        // Row i is [i, 10 * i].
        let data = (0..4).flat_map(|i| [i as f32, 10.0 * i as f32]).collect();
        Embedding::new(Tensor::new(data, [4, 2]).unwrap())
    }

    #[test]
    fn test_lookup() {
        let ids = Tensor::new(vec![3, 0, 1, 1], [2, 2]).unwrap();
        let out = table().forward(&ids).unwrap();
        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(out.data(), &[3.0, 30.0, 0.0, 0.0, 1.0, 10.0, 1.0, 10.0]);
    }

    #[test]
    fn test_lookup_out_of_vocabulary() {
        let ids = Tensor::new(vec![0, 4], [1, 2]).unwrap();
        assert_eq!(
            table().forward(&ids).unwrap_err(),
            TensorError::IndexOutOfBounds {
                index: vec![4],
                shape: vec![4, 2],
            }
        );
    }

    #[test]
    fn test_positions() {
        let pos = table().positions(3).unwrap();
        assert_eq!(pos.shape(), &[3, 2]);
        assert_eq!(pos.data(), &[0.0, 0.0, 1.0, 10.0, 2.0, 20.0]);

        assert_eq!(table().positions(0).unwrap().size(), 0);
        assert_eq!(
            table().positions(5).unwrap_err(),
            TensorError::SequenceTooLong { len: 5, max: 4 }
        );
    }

    #[test]
    fn test_init_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let emb = Embedding::<f64>::init(10, 4, &mut rng).unwrap();
        assert_eq!(emb.num_embeddings(), 10);
        assert_eq!(emb.embedding_dim(), 4);
        assert!(emb.weight.data().iter().all(|w| w.abs() <= 0.05));
    }
}
