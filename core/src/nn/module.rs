use crate::tensor::TensorElem;
use rand::RngCore;
use std::fmt::Debug;

/// Common interface of every layer.
///
/// Layers are plain structs with public weight tensors and a `forward`
/// method; this trait only exposes their parameters so that generic code
/// (parameter counting, an external optimizer, logging) can walk a model
/// without knowing its concrete type.
///
/// `Send + Sync` lets a built model be shared across threads for inference.
pub trait Module<T: TensorElem>: Debug + Send + Sync {
    /// Every learnable tensor as `(dotted.name, flat data)`, in a stable order.
    fn named_parameters(&self) -> Vec<(String, &[T])>;

    /// Total number of learnable scalars.
    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.len()).sum()
    }
}

/// Prefixes the parameter names of a sub-layer with `scope.`.
pub(crate) fn scoped<'a, T>(
    scope: &str,
    params: Vec<(String, &'a [T])>,
) -> Vec<(String, &'a [T])> {
    params
        .into_iter()
        .map(|(name, p)| (format!("{scope}.{name}"), p))
        .collect()
}

/// Whether a forward pass runs in training or inference mode.
///
/// Passed explicitly to every forward that behaves differently between the
/// two (dropout). Training mode carries the random source used for dropout
/// masks, so a seeded RNG gives reproducible training passes.
pub enum Mode<'a> {
    Eval,
    Train(&'a mut dyn RngCore),
}

impl Mode<'_> {
    pub fn is_training(&self) -> bool {
        matches!(self, Mode::Train(_))
    }
}

impl Debug for Mode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Eval => f.write_str("Eval"),
            Mode::Train(_) => f.write_str("Train"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug)]
    struct Pair {
        a: Vec<f32>,
        b: Vec<f32>,
    }

    impl Module<f32> for Pair {
        fn named_parameters(&self) -> Vec<(String, &[f32])> {
            vec![
                ("a".to_string(), self.a.as_slice()),
                ("b".to_string(), self.b.as_slice()),
            ]
        }
    }

    #[test]
    fn test_num_parameters_default() {
        let m = Pair {
            a: vec![0.0; 3],
            b: vec![0.0; 4],
        };
        assert_eq!(m.num_parameters(), 7);
    }

    #[test]
    fn test_scoped_names() {
        let m = Pair {
            a: vec![0.0],
            b: vec![0.0],
        };
        let names: Vec<String> = scoped("block", m.named_parameters())
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["block.a", "block.b"]);
    }

    #[test]
    fn test_mode() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!Mode::Eval.is_training());
        let train = Mode::Train(&mut rng);
        assert!(train.is_training());
        assert_eq!(format!("{train:?}"), "Train");
    }
}
