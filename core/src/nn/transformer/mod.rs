//! Transformer encoder building blocks.
//!
//! - [`mask`]: additive causal mask.
//! - [`SelfAttention`](attention::SelfAttention): multi-head scaled dot-product self-attention.
//! - [`TransformerBlock`](block::TransformerBlock): attention and feed-forward sublayers with
//!   residual connections, layer norm and dropout.

pub mod attention;
pub mod block;
pub mod mask;

pub use attention::{AttentionOutput, SelfAttention};
pub use block::{BlockConfig, FeedForward, TransformerBlock};
pub use mask::{apply_causal_mask, causal_mask, lower_triangle};
