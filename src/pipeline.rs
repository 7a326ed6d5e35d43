//! The whole experiment: load, normalise, build the grid, sweep, report.

use std::path::PathBuf;

use chrono::Local;
use tracing::{error, info};

use crate::config::ExperimentConfig;
use crate::dataset::{DataReader, Dataset};
use crate::error::{ConfigError, DataLoadError, Error, ReportWriteError};
use crate::grid::build_grid;
use crate::model::ModelConfiguration;
use crate::normalizer::Standardizer;
use crate::params::{parse_activations, parse_hidden_widths, parse_updaters};
use crate::record::build_records;
use crate::report::{timestamped_path, Report};
use crate::runner::{run_cross_validated, run_sweep, ExperimentRun};
use crate::trainer::{Backend, NeuralBackend};

/// Data ready for the sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedData {
    Holdout { train: Dataset, test: Dataset },
    CrossValidation { folds: Vec<(Dataset, Dataset)> },
}

pub struct Pipeline<B = NeuralBackend> {
    config: ExperimentConfig,
    backend: B,
}

impl Pipeline<NeuralBackend> {
    pub fn new(config: ExperimentConfig) -> Self {
        Pipeline::with_backend(config, NeuralBackend)
    }
}

impl<B: Backend> Pipeline<B> {
    pub fn with_backend(config: ExperimentConfig, backend: B) -> Self {
        Pipeline { config, backend }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Runs every stage and returns the report, in grid order.
    pub fn run(&self) -> Result<Report, Error> {
        let data = self.prepare_data()?;
        let grid = self.build_grid()?;
        let meta = &self.config.meta;
        info!(
            configurations = grid.len(),
            epochs = self.config.number_of_epochs,
            iterations = meta.iterations,
            learning_rate = meta.learning_rate,
            weight_init = meta.weight_init.name(),
            algorithm = meta.optimization_algorithm.name(),
            "grid built"
        );

        let runs = self.sweep(&grid, &data)?;
        Ok(Report::new(build_records(runs)?))
    }

    /// Reads the dataset files and, if enabled, standardises them with
    /// statistics from the training part only.
    pub fn prepare_data(&self) -> Result<PreparedData, DataLoadError> {
        let data = &self.config.data;
        let reader = DataReader::new(data.label_column_index, data.number_of_labels)
            .with_delimiter(data.separator)
            .with_lines_to_skip(data.lines_to_skip);

        let mut train = reader.read_file(&data.training_dataset_filepath, data.training_dataset_size)?;
        train.check_classes(data.number_of_labels)?;

        if let Some(k) = self.config.cross_validation_folds {
            if data.shuffle {
                train.shuffle(self.config.meta.seed);
            }
            let mut folds = train.folds(k)?;
            if self.config.normalize {
                for (fold_train, fold_test) in &mut folds {
                    Standardizer::fit_transform(fold_train, fold_test);
                }
            }
            return Ok(PreparedData::CrossValidation { folds });
        }

        let test_path = data.test_dataset_filepath.as_ref().ok_or_else(|| {
            DataLoadError::Other("no test dataset configured".to_string())
        })?;
        let mut test = reader.read_file(test_path, data.test_dataset_size)?;
        train.check_compatible(&test)?;

        if self.config.normalize {
            Standardizer::fit_transform(&mut train, &mut test);
        }
        Ok(PreparedData::Holdout { train, test })
    }

    /// Parses the candidate lists and expands them into configurations.
    pub fn build_grid(&self) -> Result<Vec<ModelConfiguration>, Error> {
        let axes = &self.config.axes;
        let widths = parse_hidden_widths(axes.numbers_of_hidden_neurons.as_deref())?;
        let activations = parse_activations(axes.activation_functions.as_deref())?;
        let updaters = parse_updaters(axes.updaters.as_deref())?;
        Ok(build_grid(&self.config.grid_base(), &widths, &activations, &updaters))
    }

    fn sweep(&self, grid: &[ModelConfiguration], data: &PreparedData) -> Result<Vec<ExperimentRun>, Error> {
        let epochs = self.config.number_of_epochs;
        match data {
            PreparedData::Holdout { train, test } => run_sweep(&self.backend, grid, train, test, epochs),
            PreparedData::CrossValidation { folds } => {
                run_cross_validated(&self.backend, grid, folds, epochs)
            }
        }
    }
}

/// Where and how a finished report is published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputOptions {
    pub print: bool,
    pub spreadsheet: bool,
    /// Overrides the configured spreadsheet location.
    pub spreadsheet_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
}

impl OutputOptions {
    /// Fails when a spreadsheet is requested but nothing says where it
    /// goes. Call before [`Pipeline::run`] so the sweep is not wasted.
    pub fn check(&self, config: &ExperimentConfig) -> Result<(), ConfigError> {
        let has_target = self.spreadsheet_path.is_some()
            || config.report_filepath.is_some()
            || config.report_directory_path.is_some();
        if self.spreadsheet && !has_target {
            return Err(ConfigError::Invalid(vec![
                "no report target: set `report_directory_path` or `report_filepath`, \
                 or pass an output path"
                    .to_string(),
            ]));
        }
        Ok(())
    }

    /// Explicit path, then `report_filepath`, then a timestamped file in
    /// `report_directory_path`.
    pub fn resolve_spreadsheet_path(&self, config: &ExperimentConfig) -> Option<PathBuf> {
        self.spreadsheet_path
            .clone()
            .or_else(|| config.report_filepath.clone())
            .or_else(|| {
                config
                    .report_directory_path
                    .as_ref()
                    .map(|dir| timestamped_path(dir, Local::now().naive_local()))
            })
    }
}

/// Prints and writes `report` as requested. A failed write is logged and
/// the text report is printed instead; the first such error is returned
/// once every output has been attempted.
pub fn publish(
    report: &Report,
    config: &ExperimentConfig,
    options: &OutputOptions,
) -> Result<Vec<PathBuf>, ReportWriteError> {
    let mut written = Vec::new();
    let mut failure: Option<ReportWriteError> = None;

    if options.spreadsheet {
        let result = options
            .resolve_spreadsheet_path(config)
            .ok_or(ReportWriteError::NoPath)
            .and_then(|path| report.write_spreadsheet(&path).map(|()| path));
        match result {
            Ok(path) => written.push(path),
            Err(e) => {
                error!(error = %e, "spreadsheet report not written");
                failure.get_or_insert(e);
            }
        }
    }
    if let Some(path) = &options.csv_path {
        match report.write_csv(path) {
            Ok(()) => written.push(path.clone()),
            Err(e) => {
                error!(error = %e, "csv report not written");
                failure.get_or_insert(e);
            }
        }
    }

    if options.print || failure.is_some() {
        println!("{}", report.render_text());
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(written),
    }
}
