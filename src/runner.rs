use tracing::info;

use crate::dataset::Dataset;
use crate::error::{Error, TrainingError};
use crate::evaluation::Evaluation;
use crate::model::ModelConfiguration;
use crate::trainer::{train_and_evaluate, Backend};

/// A configuration paired with the evaluation of the model trained from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRun {
    pub configuration: ModelConfiguration,
    pub evaluation: Evaluation,
}

/// Trains and evaluates every configuration in grid order.
///
/// Runs are sequential. The first training failure aborts the sweep and no
/// partial results are returned.
pub fn run_sweep<B: Backend>(
    backend: &B,
    grid: &[ModelConfiguration],
    train: &Dataset,
    test: &Dataset,
    epochs: usize,
) -> Result<Vec<ExperimentRun>, Error> {
    run_each(grid, |configuration| {
        train_and_evaluate(backend, configuration, train, test, epochs)
    })
}

/// Like [`run_sweep`], but each configuration is trained once per
/// (train, test) fold and the fold evaluations are merged.
pub fn run_cross_validated<B: Backend>(
    backend: &B,
    grid: &[ModelConfiguration],
    folds: &[(Dataset, Dataset)],
    epochs: usize,
) -> Result<Vec<ExperimentRun>, Error> {
    run_each(grid, |configuration| {
        let mut merged: Option<Evaluation> = None;
        for (train, test) in folds {
            let evaluation = train_and_evaluate(backend, configuration, train, test, epochs)?;
            match merged.as_mut() {
                Some(total) => total.merge(&evaluation),
                None => merged = Some(evaluation),
            }
        }
        Ok(merged.unwrap_or_else(|| Evaluation::new(0)))
    })
}

fn run_each<F>(grid: &[ModelConfiguration], mut evaluate: F) -> Result<Vec<ExperimentRun>, Error>
where
    F: FnMut(&ModelConfiguration) -> Result<Evaluation, TrainingError>,
{
    let mut runs = Vec::with_capacity(grid.len());
    for (index, configuration) in grid.iter().enumerate() {
        info!(
            run = index + 1,
            of = grid.len(),
            configuration = %configuration,
            "training"
        );
        let evaluation = evaluate(configuration).map_err(|source| Error::Training {
            configuration: configuration.to_string(),
            source,
        })?;
        info!(
            configuration = %configuration,
            f1 = evaluation.f1(),
            accuracy = evaluation.accuracy(),
            "evaluated"
        );
        runs.push(ExperimentRun {
            configuration: configuration.clone(),
            evaluation,
        });
    }
    Ok(runs)
}
