use super::mask::apply_causal_mask;
use crate::nn::Linear;
use crate::nn::module::{Module, scoped};
use crate::tensor::{Result, Tensor, TensorElem, TensorError, cast, shape_list};
use num_traits::Float;
use rand::Rng;

/// Output of [`SelfAttention::forward_with_weights`]: the attended sequence
/// `[b, t, e]` and the post-softmax attention weights `[b, h, t, t]`.
pub type AttentionOutput<T> = (Tensor<T, 3>, Tensor<T, 4>);

/// Multi-head scaled dot-product self-attention.
///
/// Every head works at the full embedding width `emb`, so the key, query
/// and value projections map `emb -> emb * heads` and `unify_heads` maps the
/// concatenated heads back down to `emb`.
///
/// # Head folding
///
/// The projections produce `[b, t, h * e]`. Viewing that as `[b, t, h, e]`,
/// swapping axes 1 and 2 and flattening gives `[b * h, t, e]`: each head
/// becomes an independent batch entry and a single batched matmul computes
/// the scores of every head at once. The inverse permutation restores
/// `[b, t, h * e]` before `unify_heads`.
///
/// > [!TIP]
/// > Queries and keys are each scaled by `e^(-1/4)` before the dot product
/// > instead of dividing the scores by `sqrt(e)` afterwards. The result is the
/// > same, but the intermediate values stay smaller.
#[derive(Debug, Clone)]
pub struct SelfAttention<T: TensorElem> {
    /// `[emb * heads, emb]`, no bias.
    pub to_keys: Linear<T>,
    /// `[emb * heads, emb]`, no bias.
    pub to_queries: Linear<T>,
    /// `[emb * heads, emb]`, no bias.
    pub to_values: Linear<T>,
    /// `[emb, emb * heads]`, with bias.
    pub unify_heads: Linear<T>,
    emb: usize,
    heads: usize,
    causal: bool,
}

fn check_widths(emb: usize, heads: usize) -> Result<()> {
    if emb == 0 || heads == 0 {
        return Err(TensorError::InvalidConfig(format!(
            "attention needs emb > 0 and heads > 0, got emb={emb}, heads={heads}"
        )));
    }
    Ok(())
}

fn check_projection<T: TensorElem>(layer: &Linear<T>, out: usize, inp: usize) -> Result<()> {
    if layer.weight.shape() != &[out, inp] {
        return Err(TensorError::ShapeMismatch {
            expected: vec![out, inp],
            got: layer.weight.shape().to_vec(),
        });
    }
    if let Some(bias) = &layer.bias {
        if bias.shape() != &[out] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![out],
                got: bias.shape().to_vec(),
            });
        }
    }
    Ok(())
}

impl<T: TensorElem + Float> SelfAttention<T> {
    /// Builds a layer with Glorot-uniform projections and a zero output bias.
    pub fn new<R>(emb: usize, heads: usize, causal: bool, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        check_widths(emb, heads)?;
        let wide = emb * heads;
        let to_keys = Linear::init(emb, wide, false, rng)?;
        let to_queries = Linear::init(emb, wide, false, rng)?;
        let to_values = Linear::init(emb, wide, false, rng)?;
        let unify_heads = Linear::init(wide, emb, true, rng)?;
        Self::from_projections(
            emb,
            heads,
            causal,
            to_keys,
            to_queries,
            to_values,
            unify_heads,
        )
    }

    /// Assembles a layer from existing projections, checking every shape.
    ///
    /// # Errors
    ///
    /// - `TensorError::InvalidConfig` if `emb` or `heads` is zero.
    /// - `TensorError::ShapeMismatch` if a projection has the wrong shape.
    pub fn from_projections(
        emb: usize,
        heads: usize,
        causal: bool,
        to_keys: Linear<T>,
        to_queries: Linear<T>,
        to_values: Linear<T>,
        unify_heads: Linear<T>,
    ) -> Result<Self> {
        check_widths(emb, heads)?;
        let wide = emb * heads;
        for projection in [&to_keys, &to_queries, &to_values] {
            check_projection(projection, wide, emb)?;
        }
        check_projection(&unify_heads, emb, wide)?;

        Ok(Self {
            to_keys,
            to_queries,
            to_values,
            unify_heads,
            emb,
            heads,
            causal,
        })
    }

    pub fn emb(&self) -> usize {
        self.emb
    }

    pub fn heads(&self) -> usize {
        self.heads
    }

    pub fn is_causal(&self) -> bool {
        self.causal
    }

    /// Attends `x` (`[b, t, emb]`) to itself, returning `[b, t, emb]`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::EmbeddingDimMismatch` if the last axis of `x`
    /// is not `emb`.
    pub fn forward(&self, x: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let (output, _) = self.forward_with_weights(x)?;
        Ok(output)
    }

    /// Like [`forward`](Self::forward), also returning the attention weights
    /// `[b, h, t, t]`. Row `i` of a head's matrix is the distribution of
    /// query `i` over all keys.
    pub fn forward_with_weights(&self, x: &Tensor<T, 3>) -> Result<AttentionOutput<T>> {
        let [b, t, e] = shape_list(x);
        if e != self.emb {
            return Err(TensorError::EmbeddingDimMismatch {
                expected: self.emb,
                got: e,
            });
        }
        let h = self.heads;
        tracing::trace!(batch = b, seq_len = t, heads = h, causal = self.causal, "self-attention");

        let scale: T = cast((e as f64).powf(-0.25))?;
        let queries = self.fold_heads(self.to_queries.forward(x)?)?.scale(scale);
        let keys = self.fold_heads(self.to_keys.forward(x)?)?.scale(scale);
        let values = self.fold_heads(self.to_values.forward(x)?)?;

        // [b * h, t, t]
        let mut scores = queries.matmul_transposed(&keys)?;
        if self.causal {
            scores = apply_causal_mask(&scores)?;
        }
        let weights = scores.softmax()?;

        let attended = weights.matmul(&values)?;
        let merged = attended
            .reshape([b, h, t, e])?
            .transpose_axes(1, 2)?
            .reshape([b, t, h * e])?;
        let output = self.unify_heads.forward(&merged)?;

        Ok((output, weights.reshape([b, h, t, t])?))
    }

    /// `[b, t, h * e] -> [b * h, t, e]`
    fn fold_heads(&self, projected: Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let [b, t, _] = *projected.shape();
        let (h, e) = (self.heads, self.emb);
        projected
            .reshape([b, t, h, e])?
            .transpose_axes(1, 2)?
            .reshape([b * h, t, e])
    }
}

impl<T: TensorElem> Module<T> for SelfAttention<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        let mut params = scoped("to_keys", self.to_keys.named_parameters());
        params.extend(scoped("to_queries", self.to_queries.named_parameters()));
        params.extend(scoped("to_values", self.to_values.named_parameters()));
        params.extend(scoped("unify_heads", self.unify_heads.named_parameters()));
        params
    }
}
