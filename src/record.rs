use crate::activation::ActivationType;
use crate::error::StructuralError;
use crate::evaluation::Evaluation;
use crate::model::ModelConfiguration;
use crate::optimizer::Updater;
use crate::runner::ExperimentRun;

/// Report-ready view of one trained configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub hidden_neurons: usize,
    pub activation: ActivationType,
    pub updater: Option<Updater>,
    pub evaluation: Evaluation,
}

impl ExperimentRecord {
    /// Reads the hidden layer back out of the configuration that was
    /// actually trained.
    pub fn new(
        configuration: &ModelConfiguration,
        evaluation: Evaluation,
    ) -> Result<Self, StructuralError> {
        let hidden = configuration
            .hidden_layer()
            .ok_or(StructuralError::MissingHiddenLayer)?;
        Ok(ExperimentRecord {
            hidden_neurons: hidden.neurons,
            activation: hidden.activation,
            updater: hidden.updater,
            evaluation,
        })
    }

    pub fn f1(&self) -> f64 {
        self.evaluation.f1()
    }

    pub fn accuracy(&self) -> f64 {
        self.evaluation.accuracy()
    }

    pub fn recall(&self) -> f64 {
        self.evaluation.recall()
    }

    /// Updater name, or an empty string when the record has none.
    pub fn updater_name(&self) -> &'static str {
        self.updater.map(|u| u.name()).unwrap_or("")
    }

    /// Labelled summary lines followed by the full evaluation statistics.
    pub fn information_text(&self) -> String {
        format!(
            "Number of neurons in hidden layer: {}\nActivation function: {}\nUpdater: {}\n{}",
            self.hidden_neurons,
            self.activation,
            self.updater_name(),
            self.evaluation.stats()
        )
    }
}

impl TryFrom<ExperimentRun> for ExperimentRecord {
    type Error = StructuralError;

    fn try_from(run: ExperimentRun) -> Result<Self, Self::Error> {
        ExperimentRecord::new(&run.configuration, run.evaluation)
    }
}

/// One record per run, in run order.
pub fn build_records(runs: Vec<ExperimentRun>) -> Result<Vec<ExperimentRecord>, StructuralError> {
    runs.into_iter().map(ExperimentRecord::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridBase;
    use crate::hyperparameters::MetaParameters;
    use ndarray::array;

    fn configuration() -> ModelConfiguration {
        GridBase {
            number_of_inputs: 13,
            number_of_outputs: 2,
            meta: MetaParameters::default(),
        }
        .configuration(7, ActivationType::SoftSign, Updater::AdaGrad)
    }

    #[test]
    fn test_fields_come_from_the_hidden_layer() {
        let evaluation = Evaluation::from_confusion(array![[1, 0], [0, 1]]);
        let record = ExperimentRecord::new(&configuration(), evaluation.clone()).unwrap();

        assert_eq!(record.hidden_neurons, 7);
        assert_eq!(record.activation, ActivationType::SoftSign);
        assert_eq!(record.updater, Some(Updater::AdaGrad));
        assert_eq!(record.evaluation, evaluation);
    }

    #[test]
    fn test_missing_hidden_layer_is_structural_error() {
        let mut configuration = configuration();
        configuration.layers.truncate(1);

        let err = ExperimentRecord::new(&configuration, Evaluation::new(2)).unwrap_err();
        assert_eq!(err, StructuralError::MissingHiddenLayer);
    }

    #[test]
    fn test_information_text() {
        let mut record = ExperimentRecord::new(&configuration(), Evaluation::new(2)).unwrap();
        let text = record.information_text();
        assert!(text.starts_with(
            "Number of neurons in hidden layer: 7\nActivation function: softsign\nUpdater: ADAGRAD\n"
        ));
        assert!(text.contains("Scores"));

        record.updater = None;
        assert!(record.information_text().contains("Updater: \n"));
    }
}
