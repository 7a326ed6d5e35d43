use crate::activation::ActivationType;
use crate::hyperparameters::MetaParameters;
use crate::model::{LayerConfig, ModelConfiguration};
use crate::optimizer::Updater;
use crate::Loss;

/// Everything the grid holds fixed: network input/output widths and the
/// meta-parameters shared by every cell.
#[derive(Debug, Clone, PartialEq)]
pub struct GridBase {
    pub number_of_inputs: usize,
    pub number_of_outputs: usize,
    pub meta: MetaParameters,
}

impl GridBase {
    /// One cell of the grid: a hidden layer of `hidden_neurons` units with
    /// the given activation and updater, feeding a softmax output layer.
    pub fn configuration(
        &self,
        hidden_neurons: usize,
        activation: ActivationType,
        updater: Updater,
    ) -> ModelConfiguration {
        ModelConfiguration {
            meta: self.meta.clone(),
            layers: vec![
                LayerConfig {
                    inputs: self.number_of_inputs,
                    neurons: hidden_neurons,
                    activation,
                    updater: Some(updater),
                },
                LayerConfig {
                    inputs: hidden_neurons,
                    neurons: self.number_of_outputs,
                    activation: ActivationType::Softmax,
                    updater: None,
                },
            ],
            loss: Loss::NegativeLogLikelihood,
        }
    }
}

/// Cartesian product of the three axes, widths outermost and updaters
/// innermost. Report rows follow this order.
pub fn build_grid(
    base: &GridBase,
    hidden_widths: &[usize],
    activations: &[ActivationType],
    updaters: &[Updater],
) -> Vec<ModelConfiguration> {
    let mut grid = Vec::with_capacity(hidden_widths.len() * activations.len() * updaters.len());
    for &width in hidden_widths {
        for &activation in activations {
            for &updater in updaters {
                grid.push(base.configuration(width, activation, updater));
            }
        }
    }
    grid
}
