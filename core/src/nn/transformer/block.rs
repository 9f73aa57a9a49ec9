use super::attention::SelfAttention;
use crate::nn::module::{Module, scoped};
use crate::nn::{Activation, Dropout, LayerNorm, Linear, Mode};
use crate::tensor::{Result, Tensor, TensorElem, TensorError, cast};
use num_traits::Float;
use rand::Rng;

/// Position-wise feed-forward network: `Linear(e -> m*e) -> ReLU -> Linear(m*e -> e)`.
#[derive(Debug, Clone)]
pub struct FeedForward<T: TensorElem> {
    pub expand: Linear<T>,
    pub project: Linear<T>,
}

impl<T: TensorElem + Float> FeedForward<T> {
    pub fn new<R>(emb: usize, hidden_mult: usize, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let hidden = emb * hidden_mult;
        Ok(Self {
            expand: Linear::init(emb, hidden, true, rng)?,
            project: Linear::init(hidden, emb, true, rng)?,
        })
    }

    pub fn forward(&self, x: &Tensor<T, 3>) -> Result<Tensor<T, 3>> {
        let hidden = Activation::relu(&self.expand.forward(x)?);
        self.project.forward(&hidden)
    }
}

impl<T: TensorElem> Module<T> for FeedForward<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        let mut params = scoped("expand", self.expand.named_parameters());
        params.extend(scoped("project", self.project.named_parameters()));
        params
    }
}

/// Encoder block with post-normalisation residuals.
///
/// ```text
/// x = dropout(norm1(attention(x) + x))
/// x = dropout(norm2(ff(x) + x))
/// ```
///
/// A single dropout layer is shared by both sublayers.
#[derive(Debug, Clone)]
pub struct TransformerBlock<T: TensorElem> {
    pub attention: SelfAttention<T>,
    pub norm1: LayerNorm<T>,
    pub norm2: LayerNorm<T>,
    pub ff: FeedForward<T>,
    pub dropout: Dropout,
}

/// Construction parameters of a [`TransformerBlock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockConfig {
    pub emb: usize,
    pub heads: usize,
    pub causal: bool,
    pub ff_hidden_mult: usize,
    pub dropout: f64,
    pub layer_norm_eps: f64,
}

impl BlockConfig {
    /// Bidirectional block, 4x feed-forward expansion, no dropout.
    pub fn new(emb: usize, heads: usize) -> Self {
        Self {
            emb,
            heads,
            causal: false,
            ff_hidden_mult: 4,
            dropout: 0.0,
            layer_norm_eps: 1e-3,
        }
    }
}

impl<T: TensorElem + Float> TransformerBlock<T> {
    pub fn new<R>(config: BlockConfig, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if config.ff_hidden_mult == 0 {
            return Err(TensorError::InvalidConfig(
                "ff_hidden_mult must be positive".to_string(),
            ));
        }
        let eps: T = cast(config.layer_norm_eps)?;
        Ok(Self {
            attention: SelfAttention::new(config.emb, config.heads, config.causal, rng)?,
            norm1: LayerNorm::with_features(config.emb, eps),
            norm2: LayerNorm::with_features(config.emb, eps),
            ff: FeedForward::new(config.emb, config.ff_hidden_mult, rng)?,
            dropout: Dropout::new(config.dropout)?,
        })
    }

    /// `[b, t, e] -> [b, t, e]`
    pub fn forward(&self, x: &Tensor<T, 3>, mode: &mut Mode<'_>) -> Result<Tensor<T, 3>> {
        let attended = self.attention.forward(x)?;
        let x = self.norm1.forward(&(&attended + x)?)?;
        let x = self.dropout.forward(&x, mode)?;

        let fed = self.ff.forward(&x)?;
        let x = self.norm2.forward(&(&fed + &x)?)?;
        self.dropout.forward(&x, mode)
    }
}

impl<T: TensorElem> Module<T> for TransformerBlock<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        let mut params = scoped("attention", self.attention.named_parameters());
        params.extend(scoped("norm1", self.norm1.named_parameters()));
        params.extend(scoped("ff", self.ff.named_parameters()));
        params.extend(scoped("norm2", self.norm2.named_parameters()));
        params
    }
}
