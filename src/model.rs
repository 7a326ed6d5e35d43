use std::fmt;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::trace;

use crate::activation::ActivationType;
use crate::dataset::Dataset;
use crate::error::TrainingError;
use crate::hyperparameters::MetaParameters;
use crate::layer::DenseLayer;
use crate::optimizer::{OptimizationAlgorithm, Updater};
use crate::Loss;

/// Step scales tried, in order, by line gradient descent.
const LINE_SEARCH_STEPS: [f32; 5] = [1.0, 0.5, 0.25, 0.125, 0.0625];

/// Description of one dense layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub inputs: usize,
    pub neurons: usize,
    pub activation: ActivationType,
    /// `None` falls back to [`MetaParameters::default_updater`].
    pub updater: Option<Updater>,
}

/// A complete, trainable network description: shared meta-parameters plus
/// the layer stack, hidden layers first and the output layer last.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfiguration {
    pub meta: MetaParameters,
    pub layers: Vec<LayerConfig>,
    pub loss: Loss,
}

impl ModelConfiguration {
    /// The first layer, provided an output layer follows it.
    pub fn hidden_layer(&self) -> Option<&LayerConfig> {
        match self.layers.as_slice() {
            [hidden, _, ..] => Some(hidden),
            _ => None,
        }
    }

    pub fn output_layer(&self) -> Option<&LayerConfig> {
        self.layers.last()
    }
}

impl fmt::Display for ModelConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hidden_layer() {
            Some(hidden) => {
                let updater = hidden.updater.map(|u| u.name()).unwrap_or("-");
                write!(f, "({}, {}, {})", hidden.neurons, hidden.activation, updater)
            }
            None => write!(f, "({} layers)", self.layers.len()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub layers: Vec<DenseLayer>,
    pub loss: Loss,
    learning_rate: f32,
    iterations: usize,
    l2: f32,
    algorithm: OptimizationAlgorithm,
}

impl Model {
    /// Create an untrained network from a configuration.
    ///
    /// Weights are drawn from a generator seeded with the configuration's
    /// seed, so two models built from equal configurations are identical.
    pub fn new(config: &ModelConfiguration) -> Result<Self, TrainingError> {
        if config.layers.len() < 2 {
            return Err(TrainingError::InvalidConfiguration(
                "at least two layers (hidden and output) are required".to_string(),
            ));
        }
        for pair in config.layers.windows(2) {
            if pair[0].neurons != pair[1].inputs {
                return Err(TrainingError::InvalidConfiguration(format!(
                    "layer with {} neurons feeds a layer expecting {} inputs",
                    pair[0].neurons, pair[1].inputs
                )));
            }
        }
        if let Some(output) = config.output_layer() {
            if output.activation != ActivationType::Softmax {
                return Err(TrainingError::InvalidConfiguration(format!(
                    "output layer must use softmax, got {}",
                    output.activation
                )));
            }
        }

        let meta = &config.meta;
        let mut rng = StdRng::seed_from_u64(meta.seed);
        let layers = config
            .layers
            .iter()
            .map(|layer| {
                DenseLayer::new(
                    layer.inputs,
                    layer.neurons,
                    layer.activation,
                    layer.updater.unwrap_or(meta.default_updater),
                    meta.weight_init,
                    &mut rng,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Model {
            layers,
            loss: config.loss,
            learning_rate: meta.learning_rate,
            iterations: meta.iterations,
            l2: meta.l2_penalty(),
            algorithm: meta.optimization_algorithm,
        })
    }

    pub fn input_width(&self) -> usize {
        self.layers[0].inputs
    }

    pub fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1].neurons
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    /// Class probabilities, one row per sample.
    pub fn output(&self, features: &Array2<f32>) -> Result<Array2<f32>, TrainingError> {
        self.check_input(features)?;
        Ok(self.predict(features))
    }

    /// Runs `iterations` full-batch optimisation steps over `dataset` and
    /// returns the loss measured before the last step.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<f32, TrainingError> {
        self.check_input(dataset.features())?;
        if dataset.labels().ncols() != self.output_width() {
            return Err(TrainingError::OutputWidth {
                expected: self.output_width(),
                found: dataset.labels().ncols(),
            });
        }

        let mut loss = f32::NAN;
        for iteration in 0..self.iterations {
            loss = self.compute_gradients(dataset.features(), dataset.labels());
            if !loss.is_finite() {
                return Err(TrainingError::Diverged(loss, iteration));
            }
            trace!(iteration, loss, "iteration");

            let updates: Vec<(Array2<f32>, Array1<f32>)> = self
                .layers
                .iter_mut()
                .map(|layer| layer.compute_update(self.learning_rate))
                .collect();

            match self.algorithm {
                OptimizationAlgorithm::StochasticGradientDescent => self.apply_updates(&updates, 1.0),
                OptimizationAlgorithm::LineGradientDescent => {
                    self.line_search(dataset, &updates, loss)
                }
            }
        }
        Ok(loss)
    }

    fn check_input(&self, features: &Array2<f32>) -> Result<(), TrainingError> {
        if features.ncols() != self.input_width() {
            return Err(TrainingError::InputWidth {
                expected: self.input_width(),
                found: features.ncols(),
            });
        }
        Ok(())
    }

    fn predict(&self, features: &Array2<f32>) -> Array2<f32> {
        self.layers
            .iter()
            .fold(features.clone(), |current, layer| layer.predict(&current))
    }

    /// Forward and backward pass over the whole batch; leaves gradients in
    /// the layers and returns the loss at the current weights.
    fn compute_gradients(&mut self, features: &Array2<f32>, labels: &Array2<f32>) -> f32 {
        for layer in &mut self.layers {
            layer.zero_gradients();
        }

        let mut current = features.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current);
        }
        let loss = self.loss.calculate(&current, labels) + self.l2_term();

        let mut grad = self.loss.output_delta(&current, labels);
        let last = self.layers.len() - 1;
        grad = self.layers[last].backward_preactivation(&grad);
        for layer in self.layers[..last].iter_mut().rev() {
            grad = layer.backward(&grad);
        }

        if self.l2 > 0.0 {
            for layer in &mut self.layers {
                layer.weight_grads.scaled_add(self.l2, &layer.weights);
            }
        }
        loss
    }

    fn l2_term(&self) -> f32 {
        if self.l2 == 0.0 {
            return 0.0;
        }
        let squares: f32 = self
            .layers
            .iter()
            .map(|layer| layer.weights.iter().map(|w| w * w).sum::<f32>())
            .sum();
        0.5 * self.l2 * squares
    }

    fn current_loss(&self, dataset: &Dataset) -> f32 {
        let output = self.predict(dataset.features());
        self.loss.calculate(&output, dataset.labels()) + self.l2_term()
    }

    fn apply_updates(&mut self, updates: &[(Array2<f32>, Array1<f32>)], scale: f32) {
        for (layer, (weight_delta, bias_delta)) in self.layers.iter_mut().zip(updates) {
            layer.apply_update(weight_delta, bias_delta, scale);
        }
    }

    fn line_search(
        &mut self,
        dataset: &Dataset,
        updates: &[(Array2<f32>, Array1<f32>)],
        loss_before: f32,
    ) {
        for (i, &scale) in LINE_SEARCH_STEPS.iter().enumerate() {
            self.apply_updates(updates, scale);
            let last = i == LINE_SEARCH_STEPS.len() - 1;
            if last || self.current_loss(dataset) < loss_before {
                return;
            }
            self.apply_updates(updates, -scale);
        }
    }
}
