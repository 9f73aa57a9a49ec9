//! # ctransformer
//!
//! A compact Transformer encoder for sequence classification, built on a small
//! pure-Rust CPU tensor runtime.
//!
//! ## Modules
//!
//! - [`mod@tensor`]: N-dimensional tensors, shape resolution and the operations the model needs.
//! - [`nn`]: layers (Linear, Embedding, LayerNorm, Dropout, pooling) and the
//!   Transformer building blocks (causal mask, multi-head self-attention, encoder block).
//! - [`models`]: the sequence classifier.
//!
//! ## Example
//!
//! ```rust
//! use ctransformer::nn::Mode;
//! use ctransformer::nn::transformer::SelfAttention;
//! use ctransformer::tensor::Tensor;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let attention = SelfAttention::<f32>::new(8, 2, true, &mut rng).unwrap();
//!
//! let x = Tensor::<f32, 3>::ones([2, 5, 8]);
//! let (y, weights) = attention.forward_with_weights(&x).unwrap();
//! assert_eq!(y.shape(), &[2, 5, 8]);
//! assert_eq!(weights.shape(), &[2, 2, 5, 5]);
//! # let _ = Mode::Eval;
//! ```
//!
//! Logging goes through `tracing`; install any subscriber to see construction
//! summaries (`debug`) and per-forward shapes (`trace`).

pub mod models;
pub mod nn;
pub mod tensor;

pub use models::{ClassifierConfig, SequenceClassifier, TransformerClassifier};
pub use nn::Mode;
pub use tensor::{Result, Tensor, TensorElem, TensorError};
