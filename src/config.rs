//! Key/value experiment configuration.
//!
//! The file is read once into [`Properties`], then validated into a typed
//! [`ExperimentConfig`]. Validation collects every problem before failing so
//! one run reports all missing or malformed keys.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::grid::GridBase;
use crate::hyperparameters::MetaParameters;

/// Raw `key=value` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parses `key=value`, `key: value` or `key value` lines. Blank lines
    /// and lines starting with `#` or `!` are ignored, a line ending in an
    /// odd number of `\` continues on the next line, and a later key
    /// overrides an earlier one. Other backslash escapes are kept verbatim.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        let mut lines = text.lines();
        while let Some(first) = lines.next() {
            let mut line = first.trim_start().to_string();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            while continues(&line) {
                line.pop();
                match lines.next() {
                    Some(next) => line.push_str(next.trim_start()),
                    None => break,
                }
            }
            let (key, value) = split_entry(&line);
            entries.insert(key.to_string(), value.to_string());
        }
        Properties { entries }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Properties::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// The key ends at the first `=`, `:` or whitespace; one `=` or `:` may
/// follow the whitespace.
fn split_entry(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) {
        Some(at) => {
            let rest = line[at..].trim_start();
            let rest = rest.strip_prefix(|c| c == '=' || c == ':').unwrap_or(rest);
            (&line[..at], rest.trim())
        }
        None => (line, ""),
    }
}

/// Where the training and test samples come from and how to read them.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetProperties {
    pub training_dataset_filepath: PathBuf,
    /// Unused in cross-validation mode.
    pub test_dataset_filepath: Option<PathBuf>,
    pub training_dataset_size: usize,
    pub test_dataset_size: usize,
    pub label_column_index: usize,
    pub number_of_labels: usize,
    pub separator: u8,
    pub lines_to_skip: usize,
    pub shuffle: bool,
}

/// The candidate lists exactly as written; parsed when the grid is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridAxes {
    pub numbers_of_hidden_neurons: Option<String>,
    pub activation_functions: Option<String>,
    pub updaters: Option<String>,
}

/// Typed, validated view of a configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub data: DatasetProperties,
    pub number_of_epochs: usize,
    pub report_directory_path: Option<PathBuf>,
    pub report_filepath: Option<PathBuf>,
    pub number_of_inputs: usize,
    pub number_of_outputs: usize,
    pub meta: MetaParameters,
    pub axes: GridAxes,
    pub normalize: bool,
    pub cross_validation_folds: Option<usize>,
}

/// Accumulates lookup failures instead of stopping at the first one.
struct Reader<'a> {
    properties: &'a Properties,
    problems: Vec<String>,
}

impl<'a> Reader<'a> {
    fn required<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.properties.get(key) {
            None | Some("") => {
                self.problems.push(format!("missing required key `{}`", key));
                None
            }
            Some(raw) => self.convert(key, raw),
        }
    }

    fn optional<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.properties.get(key) {
            None | Some("") => None,
            Some(raw) => self.convert(key, raw),
        }
    }

    fn convert<T>(&mut self, key: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match raw.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.problems.push(format!("`{}` = `{}`: {}", key, raw, e));
                None
            }
        }
    }

    fn list(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(str::to_string)
    }

    fn separator(&mut self, key: &str) -> u8 {
        match self.properties.get(key) {
            None | Some("") => b';',
            Some(raw) if raw.len() == 1 && raw.is_ascii() => raw.as_bytes()[0],
            Some(raw) if raw == "\\t" || raw.eq_ignore_ascii_case("tab") => b'\t',
            Some(raw) => {
                self.problems
                    .push(format!("`{}` = `{}`: separator must be one ASCII character", key, raw));
                b';'
            }
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ExperimentConfig::from_properties(&Properties::load(path)?)
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, ConfigError> {
        let mut r = Reader {
            properties,
            problems: Vec::new(),
        };
        let defaults = MetaParameters::default();

        let cross_validation_folds: Option<usize> = r.optional("cross_validation.folds");
        let training_dataset_filepath = r.required::<PathBuf>("data.training_dataset_filepath");
        let test_dataset_filepath = if cross_validation_folds.is_some() {
            r.optional::<PathBuf>("data.test_dataset_filepath")
        } else {
            r.required::<PathBuf>("data.test_dataset_filepath")
        };
        let training_dataset_size = r.required::<usize>("data.training_dataset_size");
        let test_dataset_size = if cross_validation_folds.is_some() {
            r.optional::<usize>("data.test_dataset_size").or(Some(0))
        } else {
            r.required::<usize>("data.test_dataset_size")
        };
        let label_column_index = r.required::<usize>("data.label_column_index");
        let number_of_labels = r.required::<usize>("data.number_of_labels");
        let separator = r.separator("data.separator");
        let lines_to_skip = r.optional::<usize>("data.lines_to_skip").unwrap_or(0);
        let shuffle = r.optional::<bool>("data.shuffle").unwrap_or(false);

        let number_of_epochs = r.required::<usize>("number_of_epochs");
        let report_directory_path = r.optional::<PathBuf>("report_directory_path");
        let report_filepath = r.optional::<PathBuf>("report_filepath");
        let number_of_inputs = r.required::<usize>("network_architecture.number_of_inputs");
        let number_of_outputs = r.required::<usize>("network_architecture.number_of_outputs");

        let seed = r.required::<u64>("seed");
        let iterations = r.required::<usize>("iterations");
        let learning_rate = r.required::<f32>("learning_rate");
        let weight_init = r.optional("weight_init").unwrap_or(defaults.weight_init);
        let optimization_algorithm = r
            .optional("optimization_algorithm")
            .unwrap_or(defaults.optimization_algorithm);
        let regularization = r.optional::<bool>("regularization").unwrap_or(defaults.regularization);
        let l2 = r.optional::<f32>("l2").unwrap_or(defaults.l2);
        let default_updater = r
            .optional("default_updater")
            .unwrap_or(defaults.default_updater);
        let normalize = r.optional::<bool>("normalize").unwrap_or(true);

        let axes = GridAxes {
            numbers_of_hidden_neurons: r.list("network_architecture.numbers_of_hidden_neurons"),
            activation_functions: r.list("activation_functions"),
            updaters: r.list("updaters"),
        };

        if number_of_epochs == Some(0) {
            r.problems.push("`number_of_epochs` must be at least 1".to_string());
        }
        if iterations == Some(0) {
            r.problems.push("`iterations` must be at least 1".to_string());
        }
        if matches!(cross_validation_folds, Some(k) if k < 2) {
            r.problems.push("`cross_validation.folds` must be at least 2".to_string());
        }

        let (
            Some(training_dataset_filepath),
            Some(training_dataset_size),
            Some(test_dataset_size),
            Some(label_column_index),
            Some(number_of_labels),
            Some(number_of_epochs),
            Some(number_of_inputs),
            Some(number_of_outputs),
            Some(seed),
            Some(iterations),
            Some(learning_rate),
        ) = (
            training_dataset_filepath,
            training_dataset_size,
            test_dataset_size,
            label_column_index,
            number_of_labels,
            number_of_epochs,
            number_of_inputs,
            number_of_outputs,
            seed,
            iterations,
            learning_rate,
        )
        else {
            return Err(ConfigError::Invalid(r.problems));
        };
        if !r.problems.is_empty() {
            return Err(ConfigError::Invalid(r.problems));
        }

        Ok(ExperimentConfig {
            data: DatasetProperties {
                training_dataset_filepath,
                test_dataset_filepath,
                training_dataset_size,
                test_dataset_size,
                label_column_index,
                number_of_labels,
                separator,
                lines_to_skip,
                shuffle,
            },
            number_of_epochs,
            report_directory_path,
            report_filepath,
            number_of_inputs,
            number_of_outputs,
            meta: MetaParameters {
                seed,
                iterations,
                learning_rate,
                weight_init,
                optimization_algorithm,
                regularization,
                l2,
                default_updater,
            },
            axes,
            normalize,
            cross_validation_folds,
        })
    }

    /// The fixed part of every grid cell.
    pub fn grid_base(&self) -> GridBase {
        GridBase {
            number_of_inputs: self.number_of_inputs,
            number_of_outputs: self.number_of_outputs,
            meta: self.meta.clone(),
        }
    }
}
