//! Transformer encoder for sequence classification.
//!
//! ```text
//! tokens [b, t]
//!   -> token embedding + positional embedding      [b, t, e]
//!   -> dropout
//!   -> depth x TransformerBlock                    [b, t, e]
//!   -> pool over t (mean, or max)                  [b, e]
//!   -> Linear(e -> num_classes) -> softmax         [b, num_classes]
//! ```
//!
//! # Example
//!
//! ```rust
//! use ctransformer::models::classifier::{ClassifierConfig, TransformerClassifier};
//! use ctransformer::models::traits::SequenceClassifier;
//! use ctransformer::tensor::Tensor;
//!
//! let config = ClassifierConfig::new(8, 2, 2, 16, 100, 3);
//! let model = TransformerClassifier::<f32>::from_seed(config, 0).unwrap();
//!
//! let tokens = Tensor::new(vec![1, 5, 9, 42, 7, 0], [2, 3]).unwrap();
//! let probs = model.classify(&tokens).unwrap();
//! assert_eq!(probs.shape(), &[2, 3]);
//!
//! let labels = model.predict(&tokens).unwrap();
//! assert!(labels.iter().all(|&c| c < 3));
//! ```

mod config;

pub use config::ClassifierConfig;

use crate::models::traits::SequenceClassifier;
use crate::nn::module::scoped;
use crate::nn::transformer::TransformerBlock;
use crate::nn::{Dropout, Embedding, Linear, Mode, Module, Pooling};
use crate::tensor::{Dim, Result, SymbolicShape, Tensor, TensorElem, shape_list};
use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct TransformerClassifier<T: TensorElem> {
    /// `[num_tokens, emb]`
    pub token_embedding: Embedding<T>,
    /// `[seq_length, emb]`
    pub pos_embedding: Embedding<T>,
    pub blocks: Vec<TransformerBlock<T>>,
    /// `[num_classes, emb]`
    pub to_probs: Linear<T>,
    pub pooling: Pooling,
    pub dropout: Dropout,
    config: ClassifierConfig,
}

impl<T: TensorElem + Float> TransformerClassifier<T> {
    /// Validates `config` and draws every weight from `rng`.
    pub fn new<R>(config: ClassifierConfig, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;

        let token_embedding = Embedding::init(config.num_tokens, config.emb, rng)?;
        let pos_embedding = Embedding::init(config.seq_length, config.emb, rng)?;
        let mut blocks = Vec::with_capacity(config.depth);
        for _ in 0..config.depth {
            blocks.push(TransformerBlock::new(config.block_config(), rng)?);
        }
        let to_probs = Linear::init(config.emb, config.num_classes, true, rng)?;

        let model = Self {
            token_embedding,
            pos_embedding,
            blocks,
            to_probs,
            pooling: config.pooling(),
            dropout: Dropout::new(config.dropout)?,
            config,
        };
        tracing::debug!(
            emb = model.config.emb,
            heads = model.config.heads,
            depth = model.config.depth,
            num_classes = model.config.num_classes,
            parameters = model.num_parameters(),
            "built transformer classifier"
        );
        Ok(model)
    }

    /// Reproducible construction from a seed.
    pub fn from_seed(config: ClassifierConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(config, &mut rng)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Class probabilities `[b, num_classes]` for token ids `[b, t]`.
    ///
    /// # Errors
    ///
    /// - `TensorError::SequenceTooLong` if `t > seq_length`.
    /// - `TensorError::IndexOutOfBounds` for a token id `>= num_tokens`.
    /// - `TensorError::Unsupported` for an empty sequence.
    pub fn forward(&self, tokens: &Tensor<usize, 2>, mode: &mut Mode<'_>) -> Result<Tensor<T, 2>> {
        let [_, seq_len] = shape_list(tokens);
        let positions = self.pos_embedding.positions(seq_len)?;

        let embedded = self.token_embedding.forward(tokens)?;
        let [b, t, e] = SymbolicShape::new([Dim::Deferred, Dim::Deferred, Dim::Known(self.config.emb)])
            .resolve(&embedded);
        tracing::trace!(batch = b, seq_len = t, emb = e, mode = ?mode, "classifier forward");

        let mut x = embedded.broadcast_add(&positions)?;
        x = self.dropout.forward(&x, mode)?;
        for block in &self.blocks {
            x = block.forward(&x, mode)?;
        }

        let pooled = self.pooling.forward(&x)?;
        self.to_probs.forward(&pooled)?.softmax()
    }
}

impl<T: TensorElem + Float> SequenceClassifier<T> for TransformerClassifier<T> {
    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn forward(&self, tokens: &Tensor<usize, 2>, mode: &mut Mode<'_>) -> Result<Tensor<T, 2>> {
        TransformerClassifier::forward(self, tokens, mode)
    }
}

impl<T: TensorElem> Module<T> for TransformerClassifier<T> {
    fn named_parameters(&self) -> Vec<(String, &[T])> {
        let mut params = scoped("token_embedding", self.token_embedding.named_parameters());
        params.extend(scoped("pos_embedding", self.pos_embedding.named_parameters()));
        for (i, block) in self.blocks.iter().enumerate() {
            params.extend(scoped(&format!("blocks.{i}"), block.named_parameters()));
        }
        params.extend(scoped("to_probs", self.to_probs.named_parameters()));
        params
    }
}
