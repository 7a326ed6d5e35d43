use crate::layer::WeightInit;
use crate::optimizer::{OptimizationAlgorithm, Updater};

/// Hyperparameters shared by every configuration of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct MetaParameters {
    /// Seed for weight initialization
    pub seed: u64,

    /// Optimization steps per call to `fit`
    pub iterations: usize,

    /// Learning rate for training
    pub learning_rate: f32,

    pub weight_init: WeightInit,

    pub optimization_algorithm: OptimizationAlgorithm,

    /// Whether the L2 penalty is applied
    pub regularization: bool,

    /// L2 coefficient, used only when `regularization` is set
    pub l2: f32,

    /// Updater for layers that do not name their own
    pub default_updater: Updater,
}

impl MetaParameters {
    /// Effective L2 coefficient.
    pub fn l2_penalty(&self) -> f32 {
        if self.regularization {
            self.l2
        } else {
            0.0
        }
    }
}

impl Default for MetaParameters {
    fn default() -> Self {
        MetaParameters {
            seed: 123,
            iterations: 1,
            learning_rate: 0.1,
            weight_init: WeightInit::Xavier,
            optimization_algorithm: OptimizationAlgorithm::LineGradientDescent,
            regularization: false,
            l2: 1e-4,
            default_updater: Updater::Sgd,
        }
    }
}
