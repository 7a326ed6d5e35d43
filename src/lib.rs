mod activation;
mod hyperparameters;
mod layer;
mod loss;
mod optimizer;

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod grid;
pub mod model;
pub mod normalizer;
pub mod params;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod runner;
pub mod trainer;

pub use activation::ActivationType;
pub use activation::UnknownActivation;
pub use hyperparameters::MetaParameters;
pub use layer::DenseLayer;
pub use layer::WeightInit;
pub use loss::Loss;
pub use optimizer::OptimizationAlgorithm;
pub use optimizer::UnknownUpdater;
pub use optimizer::Updater;
pub use optimizer::UpdaterState;

pub use config::ExperimentConfig;
pub use dataset::{DataReader, Dataset};
pub use error::{ConfigError, DataLoadError, Error, ReportWriteError, StructuralError, TrainingError};
pub use evaluation::Evaluation;
pub use grid::{build_grid, GridBase};
pub use model::{LayerConfig, Model, ModelConfiguration};
pub use pipeline::{publish, OutputOptions, Pipeline};
pub use record::ExperimentRecord;
pub use report::Report;
pub use trainer::{Backend, NeuralBackend, TrainableClassifier};
