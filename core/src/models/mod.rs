//! Model architectures.
//!
//! - [`classifier`]: a Transformer encoder that maps token sequences to
//!   class probabilities.
//!
//! ```rust
//! use ctransformer::models::classifier::{ClassifierConfig, TransformerClassifier};
//! use ctransformer::models::traits::SequenceClassifier;
//! use ctransformer::tensor::Tensor;
//!
//! let model = TransformerClassifier::<f32>::from_seed(ClassifierConfig::new(4, 2, 1, 5, 10, 3), 0).unwrap();
//! let tokens = Tensor::new(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 0], [2, 5]).unwrap();
//! let probs = model.classify(&tokens).unwrap();
//! assert_eq!(probs.shape(), &[2, 3]);
//! ```

pub mod classifier;
pub mod traits;

pub use classifier::{ClassifierConfig, TransformerClassifier};
pub use traits::SequenceClassifier;
