//! Neural network layers.
//!
//! Every layer is a plain struct with public weight tensors and a `forward`
//! method. Layers whose behaviour depends on training vs. inference take an
//! explicit [`Mode`].

pub mod activation;
pub mod dropout;
pub mod embedding;
pub mod linear;
pub mod module;
pub mod norm;
pub mod pool;
pub mod transformer;

pub use activation::Activation;
pub use dropout::Dropout;
pub use embedding::Embedding;
pub use linear::Linear;
pub use module::{Mode, Module};
pub use norm::LayerNorm;
pub use pool::Pooling;
