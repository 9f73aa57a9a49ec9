use crate::nn::Mode;
use crate::tensor::{Result, Tensor, TensorElem};
use num_traits::Float;

/// A model mapping token sequences to class probabilities.
pub trait SequenceClassifier<T: TensorElem + Float> {
    fn num_classes(&self) -> usize;

    /// Performs a forward pass through the model.
    ///
    /// # Arguments
    ///
    /// * `tokens` - A tensor of shape [batch_size, sequence_length] containing token IDs.
    /// * `mode` - Training (with the dropout RNG) or inference.
    ///
    /// # Returns
    ///
    /// * `probs` - A tensor of shape [batch_size, num_classes] whose rows sum to one.
    fn forward(&self, tokens: &Tensor<usize, 2>, mode: &mut Mode<'_>) -> Result<Tensor<T, 2>>;

    /// Inference-mode forward pass.
    fn classify(&self, tokens: &Tensor<usize, 2>) -> Result<Tensor<T, 2>> {
        self.forward(tokens, &mut Mode::Eval)
    }

    /// Most probable class of every sequence. Ties go to the lowest index.
    fn predict(&self, tokens: &Tensor<usize, 2>) -> Result<Vec<usize>> {
        let probs = self.classify(tokens)?;
        Ok(argmax_rows(probs.data(), self.num_classes()))
    }
}

/// Index of the largest element of each `width`-long row.
pub fn argmax_rows<T: TensorElem>(data: &[T], width: usize) -> Vec<usize> {
    if width == 0 {
        return Vec::new();
    }
    data.chunks(width)
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, row[0]), |(best, max), (i, &v)| {
                    if v > max { (i, v) } else { (best, max) }
                })
                .0
        })
        .collect()
}
