//! Train one configuration and score it on held-out data.
//!
//! [`Backend`] and [`TrainableClassifier`] are where a different training
//! engine plugs in; [`NeuralBackend`] builds the in-crate [`Model`].

use ndarray::Array2;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::TrainingError;
use crate::evaluation::Evaluation;
use crate::model::{Model, ModelConfiguration};

/// A model that can be fitted and queried for class scores.
pub trait TrainableClassifier {
    /// One pass over the training data. Returns the training loss.
    fn fit(&mut self, dataset: &Dataset) -> Result<f32, TrainingError>;

    /// Class scores for each row of `features`.
    fn output(&self, features: &Array2<f32>) -> Result<Array2<f32>, TrainingError>;
}

/// Builds untrained classifiers from configurations.
pub trait Backend {
    type Classifier: TrainableClassifier;

    fn build(&self, config: &ModelConfiguration) -> Result<Self::Classifier, TrainingError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralBackend;

impl Backend for NeuralBackend {
    type Classifier = Model;

    fn build(&self, config: &ModelConfiguration) -> Result<Model, TrainingError> {
        Model::new(config)
    }
}

impl TrainableClassifier for Model {
    fn fit(&mut self, dataset: &Dataset) -> Result<f32, TrainingError> {
        Model::fit(self, dataset)
    }

    fn output(&self, features: &Array2<f32>) -> Result<Array2<f32>, TrainingError> {
        Model::output(self, features)
    }
}

/// Builds a fresh classifier, fits it `epochs` times on `train`, and
/// evaluates its predictions on `test`.
pub fn train_and_evaluate<B: Backend>(
    backend: &B,
    config: &ModelConfiguration,
    train: &Dataset,
    test: &Dataset,
    epochs: usize,
) -> Result<Evaluation, TrainingError> {
    let mut classifier = backend.build(config)?;
    for epoch in 0..epochs {
        let loss = classifier.fit(train)?;
        debug!(epoch, loss, "epoch finished");
    }

    let predicted = classifier.output(test.features())?;
    let mut evaluation = Evaluation::new(test.num_classes());
    evaluation.eval(test.labels(), &predicted);
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationType;
    use crate::grid::GridBase;
    use crate::hyperparameters::MetaParameters;
    use crate::optimizer::Updater;
    use ndarray::array;

    fn separable() -> Dataset {
        let features = array![[-2.0, -1.0], [-1.5, -2.0], [-1.0, -1.5], [1.0, 1.5], [1.5, 2.0], [2.0, 1.0]];
        Dataset::from_class_labels(features, &[0, 0, 0, 1, 1, 1], 2).unwrap()
    }

    fn config(updater: Updater) -> ModelConfiguration {
        let base = GridBase {
            number_of_inputs: 2,
            number_of_outputs: 2,
            meta: MetaParameters {
                iterations: 20,
                learning_rate: 0.5,
                ..MetaParameters::default()
            },
        };
        base.configuration(4, ActivationType::Tanh, updater)
    }

    #[test]
    fn test_learns_separable_data() {
        let data = separable();
        let evaluation = train_and_evaluate(&NeuralBackend, &config(Updater::Sgd), &data, &data, 10).unwrap();
        assert_eq!(evaluation.total(), 6);
        assert_eq!(evaluation.accuracy(), 1.0);
    }

    #[test]
    fn test_same_inputs_same_result() {
        let data = separable();
        let first = train_and_evaluate(&NeuralBackend, &config(Updater::Adam), &data, &data, 3).unwrap();
        let second = train_and_evaluate(&NeuralBackend, &config(Updater::Adam), &data, &data, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_width_mismatch_fails() {
        let data = separable();
        let mut bad = config(Updater::Sgd);
        bad.layers[0].inputs = 3;
        let err = train_and_evaluate(&NeuralBackend, &bad, &data, &data, 1).unwrap_err();
        assert!(matches!(err, TrainingError::InputWidth { expected: 3, found: 2 }));
    }
}
