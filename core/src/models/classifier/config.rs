use crate::nn::Pooling;
use crate::nn::transformer::BlockConfig;
use crate::tensor::{Result, TensorError};
use serde::{Deserialize, Serialize};

fn default_ff_hidden_mult() -> usize {
    4
}

fn default_layer_norm_eps() -> f64 {
    1e-3
}

/// Hyper-parameters of a [`TransformerClassifier`](super::TransformerClassifier).
///
/// The six size fields are required; the rest fall back to their defaults
/// when deserialized from a partial document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Embedding width, also the width of every attention head.
    pub emb: usize,
    pub heads: usize,
    /// Number of encoder blocks.
    pub depth: usize,
    /// Maximum sequence length (size of the positional table).
    pub seq_length: usize,
    /// Vocabulary size.
    pub num_tokens: usize,
    pub num_classes: usize,
    /// Max pooling over the sequence instead of mean pooling.
    #[serde(default)]
    pub max_pool: bool,
    #[serde(default)]
    pub dropout: f64,
    #[serde(default = "default_ff_hidden_mult")]
    pub ff_hidden_mult: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

impl ClassifierConfig {
    pub fn new(
        emb: usize,
        heads: usize,
        depth: usize,
        seq_length: usize,
        num_tokens: usize,
        num_classes: usize,
    ) -> Self {
        Self {
            emb,
            heads,
            depth,
            seq_length,
            num_tokens,
            num_classes,
            max_pool: false,
            dropout: 0.0,
            ff_hidden_mult: default_ff_hidden_mult(),
            layer_norm_eps: default_layer_norm_eps(),
        }
    }

    /// Binary sentiment classification over a 50k vocabulary, 512 tokens.
    pub fn imdb() -> Self {
        Self::new(128, 8, 6, 512, 50_000, 2)
    }

    pub fn with_max_pool(mut self, max_pool: bool) -> Self {
        self.max_pool = max_pool;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_ff_hidden_mult(mut self, ff_hidden_mult: usize) -> Self {
        self.ff_hidden_mult = ff_hidden_mult;
        self
    }

    pub fn pooling(&self) -> Pooling {
        if self.max_pool {
            Pooling::Max
        } else {
            Pooling::Mean
        }
    }

    /// Settings shared by every encoder block. Classifier blocks are never causal.
    pub fn block_config(&self) -> BlockConfig {
        BlockConfig {
            emb: self.emb,
            heads: self.heads,
            causal: false,
            ff_hidden_mult: self.ff_hidden_mult,
            dropout: self.dropout,
            layer_norm_eps: self.layer_norm_eps,
        }
    }

    /// Rejects configurations no model can be built from.
    ///
    /// `depth == 0` is accepted: the model then pools the embeddings directly.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("emb", self.emb),
            ("heads", self.heads),
            ("seq_length", self.seq_length),
            ("num_tokens", self.num_tokens),
            ("num_classes", self.num_classes),
            ("ff_hidden_mult", self.ff_hidden_mult),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(TensorError::InvalidConfig(format!("{name} must be positive")));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TensorError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.layer_norm_eps.is_finite() && self.layer_norm_eps > 0.0) {
            return Err(TensorError::InvalidConfig(format!(
                "layer_norm_eps must be positive and finite, got {}",
                self.layer_norm_eps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::new(4, 2, 1, 5, 10, 3);
        assert!(!config.max_pool);
        assert_eq!(config.dropout, 0.0);
        assert_eq!(config.ff_hidden_mult, 4);
        assert_eq!(config.pooling(), Pooling::Mean);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ClassifierConfig::imdb()
            .with_max_pool(true)
            .with_dropout(0.1)
            .with_ff_hidden_mult(2);
        assert_eq!(config.pooling(), Pooling::Max);
        assert_eq!(config.block_config().ff_hidden_mult, 2);
        assert_eq!(config.block_config().dropout, 0.1);
        assert!(!config.block_config().causal);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let err = ClassifierConfig::new(4, 0, 1, 5, 10, 3).validate().unwrap_err();
        assert_eq!(
            err,
            TensorError::InvalidConfig("heads must be positive".to_string())
        );
        assert!(ClassifierConfig::new(4, 2, 1, 5, 10, 0).validate().is_err());
        assert!(ClassifierConfig::new(4, 2, 0, 5, 10, 3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let base = ClassifierConfig::new(4, 2, 1, 5, 10, 3);
        assert!(base.clone().with_dropout(1.0).validate().is_err());
        assert!(base.clone().with_dropout(-0.5).validate().is_err());

        let mut no_eps = base;
        no_eps.layer_norm_eps = 0.0;
        assert!(no_eps.validate().is_err());
    }
}
