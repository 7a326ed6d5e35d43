use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::activation::ActivationType;
use crate::error::TrainingError;
use crate::optimizer::{Updater, UpdaterState};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightInit {
    /// Normal with variance 2 / (fan_in + fan_out)
    Xavier,

    /// He initialization (good for ReLU networks)
    Relu,

    /// Uniform in [-1/sqrt(fan_in), 1/sqrt(fan_in)]
    Uniform,
}

impl WeightInit {
    pub fn name(&self) -> &'static str {
        match self {
            WeightInit::Xavier => "xavier",
            WeightInit::Relu => "relu",
            WeightInit::Uniform => "uniform",
        }
    }

    fn sample(
        &self,
        rng: &mut StdRng,
        inputs: usize,
        neurons: usize,
    ) -> Result<Array2<f32>, TrainingError> {
        let invalid = |e: &dyn fmt::Display| TrainingError::InvalidConfiguration(e.to_string());
        let shape = (neurons, inputs);
        let weights = match self {
            WeightInit::Xavier => {
                let std_dev = (2.0 / (inputs + neurons) as f32).sqrt();
                let normal = Normal::new(0.0, std_dev).map_err(|e| invalid(&e))?;
                Array2::from_shape_fn(shape, |_| normal.sample(&mut *rng))
            }
            WeightInit::Relu => {
                let std_dev = (2.0 / inputs as f32).sqrt();
                let normal = Normal::new(0.0, std_dev).map_err(|e| invalid(&e))?;
                Array2::from_shape_fn(shape, |_| normal.sample(&mut *rng))
            }
            WeightInit::Uniform => {
                let bound = 1.0 / (inputs as f32).sqrt();
                let uniform = Uniform::new_inclusive(-bound, bound).map_err(|e| invalid(&e))?;
                Array2::from_shape_fn(shape, |_| uniform.sample(&mut *rng))
            }
        };
        Ok(weights)
    }
}

impl FromStr for WeightInit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xavier" => Ok(WeightInit::Xavier),
            "relu" | "he" => Ok(WeightInit::Relu),
            "uniform" => Ok(WeightInit::Uniform),
            other => Err(format!("unknown weight initialization `{}`", other)),
        }
    }
}

/// Fully connected layer operating on batches, one sample per row.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub neurons: usize,
    pub inputs: usize,
    /// (neurons × inputs)
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: ActivationType,
    pub updater: Updater,
    pub weight_grads: Array2<f32>,
    pub bias_grads: Array1<f32>,
    weight_state: UpdaterState<ndarray::Ix2>,
    bias_state: UpdaterState<ndarray::Ix1>,
    input_cache: Array2<f32>,
    preactivation_cache: Array2<f32>,
    activation_cache: Array2<f32>,
}

impl DenseLayer {
    /// Constructs a new layer with weights drawn from `rng`.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Number of inputs to this layer
    /// * `neurons` - Number of neurons in this layer
    /// * `activation` - Activation function type for the layer
    /// * `updater` - Rule used to turn gradients into weight updates
    /// * `weight_init` - Weight initialization strategy
    pub fn new(
        inputs: usize,
        neurons: usize,
        activation: ActivationType,
        updater: Updater,
        weight_init: WeightInit,
        rng: &mut StdRng,
    ) -> Result<Self, TrainingError> {
        if inputs == 0 || neurons == 0 {
            return Err(TrainingError::InvalidConfiguration(format!(
                "layer needs at least one input and one neuron, got {} -> {}",
                inputs, neurons
            )));
        }

        let weights = weight_init.sample(rng, inputs, neurons)?;
        let bias = Array1::zeros(neurons);

        Ok(DenseLayer {
            neurons,
            inputs,
            weight_grads: Array2::zeros(weights.raw_dim()),
            bias_grads: Array1::zeros(neurons),
            weight_state: UpdaterState::new(weights.raw_dim()),
            bias_state: UpdaterState::new(bias.raw_dim()),
            weights,
            bias,
            activation,
            updater,
            input_cache: Array2::zeros((0, inputs)),
            preactivation_cache: Array2::zeros((0, neurons)),
            activation_cache: Array2::zeros((0, neurons)),
        })
    }

    /// Inference pass; leaves the caches untouched.
    pub fn predict(&self, input: &Array2<f32>) -> Array2<f32> {
        let preactivation = input.dot(&self.weights.t()) + &self.bias;
        self.activation.forward(&preactivation)
    }

    /// Training pass; caches what [`DenseLayer::backward`] needs.
    pub fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        self.input_cache = input.clone();
        self.preactivation_cache = input.dot(&self.weights.t()) + &self.bias;
        self.activation_cache = self.activation.forward(&self.preactivation_cache);
        self.activation_cache.clone()
    }

    /// Accumulates gradients from `grad_output` (w.r.t. this layer's
    /// activated output) and returns the gradient w.r.t. its input.
    pub fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        let delta = self.activation.backward(
            &self.preactivation_cache,
            &self.activation_cache,
            grad_output,
        );
        self.backward_preactivation(&delta)
    }

    /// Same as [`DenseLayer::backward`] but starting from the gradient
    /// w.r.t. the pre-activation, as the softmax/NLL output layer provides.
    pub fn backward_preactivation(&mut self, delta: &Array2<f32>) -> Array2<f32> {
        self.weight_grads = &self.weight_grads + &delta.t().dot(&self.input_cache);
        self.bias_grads = &self.bias_grads + &delta.sum_axis(Axis(0));
        delta.dot(&self.weights)
    }

    pub fn zero_gradients(&mut self) {
        self.weight_grads.fill(0.0);
        self.bias_grads.fill(0.0);
    }

    /// Steps `(weights, bias)` would take for the current gradients.
    /// Advances the updater history.
    pub fn compute_update(&mut self, learning_rate: f32) -> (Array2<f32>, Array1<f32>) {
        let weight_delta = self
            .updater
            .delta(&mut self.weight_state, &self.weight_grads, learning_rate);
        let bias_delta = self
            .updater
            .delta(&mut self.bias_state, &self.bias_grads, learning_rate);
        (weight_delta, bias_delta)
    }

    pub fn apply_update(&mut self, weight_delta: &Array2<f32>, bias_delta: &Array1<f32>, scale: f32) {
        self.weights.scaled_add(-scale, weight_delta);
        self.bias.scaled_add(-scale, bias_delta);
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn layer(inputs: usize, neurons: usize, activation: ActivationType) -> DenseLayer {
        let mut rng = StdRng::seed_from_u64(7);
        DenseLayer::new(inputs, neurons, activation, Updater::Sgd, WeightInit::Xavier, &mut rng)
            .unwrap()
    }

    #[test]
    fn test_weight_init_names_parse_back() {
        for init in [WeightInit::Xavier, WeightInit::Relu, WeightInit::Uniform] {
            assert_eq!(init.name().parse::<WeightInit>(), Ok(init));
        }
        assert_eq!("He".parse::<WeightInit>(), Ok(WeightInit::Relu));
    }

    #[test]
    fn test_zero_width_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = DenseLayer::new(0, 3, ActivationType::ReLU, Updater::Sgd, WeightInit::Xavier, &mut rng);
        assert!(matches!(result, Err(TrainingError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(layer(4, 3, ActivationType::Tanh).weights, layer(4, 3, ActivationType::Tanh).weights);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut dense = layer(2, 1, ActivationType::Tanh);
        let input = array![[0.4, -0.3]];

        // loss = sum(output)
        dense.forward(&input);
        dense.backward(&array![[1.0]]);
        let analytic = dense.weight_grads[[0, 1]];

        let eps = 1e-3;
        let mut plus = dense.clone();
        plus.weights[[0, 1]] += eps;
        let mut minus = dense.clone();
        minus.weights[[0, 1]] -= eps;
        let numeric = (plus.predict(&input).sum() - minus.predict(&input).sum()) / (2.0 * eps);

        assert!((analytic - numeric).abs() < 1e-3, "{} vs {}", analytic, numeric);
    }

    #[test]
    fn test_predict_does_not_touch_caches() {
        let mut dense = layer(2, 2, ActivationType::ReLU);
        let trained = dense.forward(&array![[1.0, 2.0]]);
        let predicted = dense.predict(&array![[1.0, 2.0]]);
        assert_eq!(trained, predicted);
        assert_eq!(dense.activation_cache, trained);
    }
}
