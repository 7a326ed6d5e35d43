use std::path::PathBuf;

use thiserror::Error;

/// A required key or hyperparameter list is missing or unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("required parameter list `{0}` missing or entirely invalid")]
    EmptyList(String),

    #[error("invalid configuration:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("failed to read configuration file {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// Dataset file could not be turned into a usable [`crate::Dataset`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataLoadError {
    #[error("failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("{path}, row {row}: {reason}")]
    Malformed {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("{path}: expected {expected} samples, found {found}")]
    SampleCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("feature rows ({features}) do not match label rows ({labels})")]
    RowMismatch { features: usize, labels: usize },

    #[error("label width {found} does not match the number of classes {expected}")]
    LabelWidth { expected: usize, found: usize },

    #[error("training set has {train} features but test set has {test}")]
    FeatureWidth { train: usize, test: usize },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("configuration has no hidden layer")]
    MissingHiddenLayer,
}

/// The classifier rejected a configuration or failed while fitting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    #[error("invalid network configuration: {0}")]
    InvalidConfiguration(String),

    #[error("input has {found} columns, network expects {expected}")]
    InputWidth { expected: usize, found: usize },

    #[error("labels have {found} columns, network outputs {expected}")]
    OutputWidth { expected: usize, found: usize },

    #[error("loss diverged to {0} at iteration {1}")]
    Diverged(f32, usize),
}

#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("failed to write spreadsheet {path}: {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("failed to write csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no report path configured")]
    NoPath,
}

/// Everything that can stop an experiment run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("training failed for {configuration}: {source}")]
    Training {
        configuration: String,
        #[source]
        source: TrainingError,
    },

    #[error(transparent)]
    ReportWrite(#[from] ReportWriteError),
}
