use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Axis};
use thiserror::Error;

const LEAKY_RELU_SLOPE: f32 = 0.01;

/// Enum representing different activation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationType {
    ReLU,
    Tanh,
    Sigmoid,
    Softmax,
    HardTanh,
    LeakyReLU,
    SoftSign,
    SoftPlus,
    Identity,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown activation function `{0}`")]
pub struct UnknownActivation(pub String);

impl ActivationType {
    /// Every accepted name, in the order they are documented.
    pub const NAMES: [&'static str; 9] = [
        "relu",
        "tanh",
        "sigmoid",
        "softmax",
        "hardtanh",
        "leakyrelu",
        "softsign",
        "softplus",
        "identity",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActivationType::ReLU => "relu",
            ActivationType::Tanh => "tanh",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::Softmax => "softmax",
            ActivationType::HardTanh => "hardtanh",
            ActivationType::LeakyReLU => "leakyrelu",
            ActivationType::SoftSign => "softsign",
            ActivationType::SoftPlus => "softplus",
            ActivationType::Identity => "identity",
        }
    }

    /// Applies the activation function to a given input.
    ///
    /// Softmax is not element-wise; here it degrades to `exp`, use
    /// [`ActivationType::forward`] for whole rows.
    pub fn apply(&self, x: f32) -> f32 {
        match self {
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Tanh => x.tanh(),
            ActivationType::Sigmoid => sigmoid(x),
            ActivationType::Softmax => x.exp(),
            ActivationType::HardTanh => x.clamp(-1.0, 1.0),
            ActivationType::LeakyReLU => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_RELU_SLOPE * x
                }
            }
            ActivationType::SoftSign => x / (1.0 + x.abs()),
            // log(1 + e^x) without overflowing for large x
            ActivationType::SoftPlus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
            ActivationType::Identity => x,
        }
    }

    /// Computes the derivative of the activation function at the
    /// pre-activation value `x`. Softmax follows [`ActivationType::apply`].
    pub fn derivative(&self, x: f32) -> f32 {
        match self {
            ActivationType::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationType::Tanh => 1.0 - x.tanh().powi(2),
            ActivationType::Sigmoid => {
                let s = sigmoid(x);
                s * (1.0 - s)
            }
            ActivationType::Softmax => x.exp(),
            ActivationType::HardTanh => {
                if x > -1.0 && x < 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationType::LeakyReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    LEAKY_RELU_SLOPE
                }
            }
            ActivationType::SoftSign => 1.0 / (1.0 + x.abs()).powi(2),
            ActivationType::SoftPlus => sigmoid(x),
            ActivationType::Identity => 1.0,
        }
    }

    /// Activates a batch of pre-activations, one sample per row.
    pub fn forward(&self, preactivation: &Array2<f32>) -> Array2<f32> {
        match self {
            ActivationType::Softmax => softmax_rows(preactivation),
            _ => preactivation.mapv(|x| self.apply(x)),
        }
    }

    /// Gradient with respect to the pre-activation, given the gradient with
    /// respect to the activated output.
    pub fn backward(
        &self,
        preactivation: &Array2<f32>,
        output: &Array2<f32>,
        grad_output: &Array2<f32>,
    ) -> Array2<f32> {
        match self {
            ActivationType::Softmax => {
                // Row-wise Jacobian-vector product: s * (g - <g, s>)
                let dot = (grad_output * output).sum_axis(Axis(1)).insert_axis(Axis(1));
                output * &(grad_output - &dot)
            }
            _ => grad_output * &preactivation.mapv(|x| self.derivative(x)),
        }
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationType {
    type Err = UnknownActivation;

    /// Names are matched exactly; `"ReLU"` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let activation = match s {
            "relu" => ActivationType::ReLU,
            "tanh" => ActivationType::Tanh,
            "sigmoid" => ActivationType::Sigmoid,
            "softmax" => ActivationType::Softmax,
            "hardtanh" => ActivationType::HardTanh,
            "leakyrelu" => ActivationType::LeakyReLU,
            "softsign" => ActivationType::SoftSign,
            "softplus" => ActivationType::SoftPlus,
            "identity" => ActivationType::Identity,
            other => return Err(UnknownActivation(other.to_string())),
        };
        Ok(activation)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn softmax_rows(input: &Array2<f32>) -> Array2<f32> {
    let mut output = input.clone();
    for mut row in output.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
        row.mapv_inplace(|x| (x - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|x| x / sum);
    }
    output
}
