use std::fmt;
use std::str::FromStr;

use ndarray::{Array, Dimension, Zip};
use thiserror::Error;

const NESTEROVS_MOMENTUM: f32 = 0.9;
const ADAGRAD_EPSILON: f32 = 1e-6;
const RMSPROP_DECAY: f32 = 0.95;
const RMSPROP_EPSILON: f32 = 1e-8;
const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;
const ADADELTA_RHO: f32 = 0.95;
const ADADELTA_EPSILON: f32 = 1e-6;

/// Weight-update rule applied to a layer's gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Updater {
    Sgd,
    Adam,
    AdaDelta,
    Nesterovs,
    AdaGrad,
    RmsProp,
    /// Applies the raw gradient; the learning rate is ignored.
    None,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown updater `{0}`")]
pub struct UnknownUpdater(pub String);

impl Updater {
    pub const NAMES: [&'static str; 7] = [
        "SGD", "ADAM", "ADADELTA", "NESTEROVS", "ADAGRAD", "RMSPROP", "NONE",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Updater::Sgd => "SGD",
            Updater::Adam => "ADAM",
            Updater::AdaDelta => "ADADELTA",
            Updater::Nesterovs => "NESTEROVS",
            Updater::AdaGrad => "ADAGRAD",
            Updater::RmsProp => "RMSPROP",
            Updater::None => "NONE",
        }
    }

    /// Computes the step to subtract from a parameter and advances `state`.
    pub fn delta<D: Dimension>(
        &self,
        state: &mut UpdaterState<D>,
        grad: &Array<f32, D>,
        learning_rate: f32,
    ) -> Array<f32, D> {
        state.step += 1;
        match self {
            Updater::Sgd => grad * learning_rate,
            Updater::None => grad.clone(),
            Updater::Nesterovs => {
                let previous = state.first.clone();
                state.first = &state.first * NESTEROVS_MOMENTUM - grad * learning_rate;
                previous * NESTEROVS_MOMENTUM - &state.first * (1.0 + NESTEROVS_MOMENTUM)
            }
            Updater::AdaGrad => {
                state.second = &state.second + &grad.mapv(|g| g * g);
                let mut delta = grad.clone();
                Zip::from(&mut delta)
                    .and(&state.second)
                    .for_each(|d, &h| *d = learning_rate * *d / (h.sqrt() + ADAGRAD_EPSILON));
                delta
            }
            Updater::RmsProp => {
                state.second = &state.second * RMSPROP_DECAY
                    + grad.mapv(|g| g * g) * (1.0 - RMSPROP_DECAY);
                let mut delta = grad.clone();
                Zip::from(&mut delta)
                    .and(&state.second)
                    .for_each(|d, &r| *d = learning_rate * *d / (r + RMSPROP_EPSILON).sqrt());
                delta
            }
            Updater::Adam => {
                state.first = &state.first * ADAM_BETA1 + grad * (1.0 - ADAM_BETA1);
                state.second =
                    &state.second * ADAM_BETA2 + grad.mapv(|g| g * g) * (1.0 - ADAM_BETA2);
                let t = state.step as i32;
                let alpha = learning_rate * (1.0 - ADAM_BETA2.powi(t)).sqrt()
                    / (1.0 - ADAM_BETA1.powi(t));
                let mut delta = state.first.clone();
                Zip::from(&mut delta)
                    .and(&state.second)
                    .for_each(|d, &v| *d = alpha * *d / (v.sqrt() + ADAM_EPSILON));
                delta
            }
            Updater::AdaDelta => {
                state.second = &state.second * ADADELTA_RHO
                    + grad.mapv(|g| g * g) * (1.0 - ADADELTA_RHO);
                let mut delta = grad.clone();
                Zip::from(&mut delta)
                    .and(&state.second)
                    .and(&state.first)
                    .for_each(|d, &msg, &msdx| {
                        *d *= (msdx + ADADELTA_EPSILON).sqrt() / (msg + ADADELTA_EPSILON).sqrt();
                    });
                state.first =
                    &state.first * ADADELTA_RHO + delta.mapv(|d| d * d) * (1.0 - ADADELTA_RHO);
                delta
            }
        }
    }
}

impl fmt::Display for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Updater {
    type Err = UnknownUpdater;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let updater = match s.to_uppercase().as_str() {
            "SGD" => Updater::Sgd,
            "ADAM" => Updater::Adam,
            "ADADELTA" => Updater::AdaDelta,
            "NESTEROVS" => Updater::Nesterovs,
            "ADAGRAD" => Updater::AdaGrad,
            "RMSPROP" => Updater::RmsProp,
            "NONE" => Updater::None,
            _ => return Err(UnknownUpdater(s.to_string())),
        };
        Ok(updater)
    }
}

/// Per-parameter history kept between steps (momentum, squared-gradient
/// averages). Which slot means what depends on the [`Updater`].
#[derive(Debug, Clone)]
pub struct UpdaterState<D: Dimension> {
    first: Array<f32, D>,
    second: Array<f32, D>,
    step: u32,
}

impl<D: Dimension> UpdaterState<D> {
    pub fn new(shape: D) -> Self {
        UpdaterState {
            first: Array::zeros(shape.clone()),
            second: Array::zeros(shape),
            step: 0,
        }
    }
}

/// How a computed update is applied during one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationAlgorithm {
    /// Apply the updater's step as is.
    StochasticGradientDescent,
    /// Backtrack along the updater's step until the loss decreases.
    LineGradientDescent,
}

impl OptimizationAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationAlgorithm::StochasticGradientDescent => "stochastic_gradient_descent",
            OptimizationAlgorithm::LineGradientDescent => "line_gradient_descent",
        }
    }
}

impl FromStr for OptimizationAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stochastic_gradient_descent" | "sgd" => {
                Ok(OptimizationAlgorithm::StochasticGradientDescent)
            }
            "line_gradient_descent" => Ok(OptimizationAlgorithm::LineGradientDescent),
            other => Err(format!("unknown optimization algorithm `{}`", other)),
        }
    }
}
