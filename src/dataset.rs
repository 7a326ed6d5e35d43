//! Tabular datasets and the delimited-file reader that produces them.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use ndarray::{s, Array2, Axis};
use tracing::debug;

use crate::error::DataLoadError;

/// Feature matrix paired with one-hot labels, one sample per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array2<f32>,
}

impl Dataset {
    pub fn new(features: Array2<f32>, labels: Array2<f32>) -> Result<Self, DataLoadError> {
        if features.nrows() != labels.nrows() {
            return Err(DataLoadError::RowMismatch {
                features: features.nrows(),
                labels: labels.nrows(),
            });
        }
        Ok(Dataset { features, labels })
    }

    /// Builds a dataset from integer class labels, one-hot encoding them.
    pub fn from_class_labels(
        features: Array2<f32>,
        classes: &[usize],
        number_of_labels: usize,
    ) -> Result<Self, DataLoadError> {
        let mut labels = Array2::zeros((classes.len(), number_of_labels));
        for (row, &class) in classes.iter().enumerate() {
            if class >= number_of_labels {
                return Err(DataLoadError::LabelWidth {
                    expected: number_of_labels,
                    found: class + 1,
                });
            }
            labels[[row, class]] = 1.0;
        }
        Dataset::new(features, labels)
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut Array2<f32> {
        &mut self.features
    }

    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    pub fn num_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.ncols()
    }

    /// Fails unless the labels span exactly `number_of_labels` classes.
    pub fn check_classes(&self, number_of_labels: usize) -> Result<(), DataLoadError> {
        if self.num_classes() != number_of_labels {
            return Err(DataLoadError::LabelWidth {
                expected: number_of_labels,
                found: self.num_classes(),
            });
        }
        Ok(())
    }

    /// Fails when `test` cannot be scored by a model trained on `self`.
    pub fn check_compatible(&self, test: &Dataset) -> Result<(), DataLoadError> {
        if self.num_features() != test.num_features() {
            return Err(DataLoadError::FeatureWidth {
                train: self.num_features(),
                test: test.num_features(),
            });
        }
        test.check_classes(self.num_classes())
    }

    /// Reorders the samples with a generator seeded by `seed`.
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut order: Vec<usize> = (0..self.num_samples()).collect();
        rng.shuffle(&mut order);
        self.features = self.features.select(Axis(0), &order);
        self.labels = self.labels.select(Axis(0), &order);
    }

    /// Splits into `k` (train, test) pairs. Fold `i` tests on the `i`-th
    /// contiguous block of rows; the first `n % k` blocks get one extra row.
    pub fn folds(&self, k: usize) -> Result<Vec<(Dataset, Dataset)>, DataLoadError> {
        let n = self.num_samples();
        if k < 2 || k > n {
            return Err(DataLoadError::Other(format!(
                "cannot split {} samples into {} folds",
                n, k
            )));
        }

        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let size = n / k + usize::from(i < n % k);
            let end = start + size;
            let train_rows: Vec<usize> = (0..start).chain(end..n).collect();
            let train = Dataset {
                features: self.features.select(Axis(0), &train_rows),
                labels: self.labels.select(Axis(0), &train_rows),
            };
            let test = Dataset {
                features: self.features.slice(s![start..end, ..]).to_owned(),
                labels: self.labels.slice(s![start..end, ..]).to_owned(),
            };
            folds.push((train, test));
            start = end;
        }
        Ok(folds)
    }
}

/// Reads delimited text files where one column holds an integer class label
/// and every other column is a numeric feature.
#[derive(Debug, Clone)]
pub struct DataReader {
    pub delimiter: u8,
    pub lines_to_skip: usize,
    pub label_column_index: usize,
    pub number_of_labels: usize,
}

impl DataReader {
    pub fn new(label_column_index: usize, number_of_labels: usize) -> Self {
        DataReader {
            delimiter: b';',
            lines_to_skip: 0,
            label_column_index,
            number_of_labels,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_lines_to_skip(mut self, lines: usize) -> Self {
        self.lines_to_skip = lines;
        self
    }

    /// Reads a file that must hold exactly `expected_samples` rows.
    pub fn read_file(
        &self,
        path: impl AsRef<Path>,
        expected_samples: usize,
    ) -> Result<Dataset, DataLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DataLoadError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let dataset = self.read(BufReader::new(file), path)?;
        if dataset.num_samples() != expected_samples {
            return Err(DataLoadError::SampleCount {
                path: path.to_path_buf(),
                expected: expected_samples,
                found: dataset.num_samples(),
            });
        }
        debug!(
            path = %path.display(),
            samples = dataset.num_samples(),
            features = dataset.num_features(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Reads every row from `source`; `path` only labels error messages.
    pub fn read<R: Read>(&self, source: R, path: &Path) -> Result<Dataset, DataLoadError> {
        let mut source = BufReader::new(source);
        let io_error = |e: std::io::Error| DataLoadError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let mut skipped = String::new();
        for _ in 0..self.lines_to_skip {
            skipped.clear();
            source.read_line(&mut skipped).map_err(io_error)?;
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .from_reader(source);

        let mut values: Vec<f32> = Vec::new();
        let mut classes: Vec<usize> = Vec::new();
        let mut width: Option<usize> = None;

        for (index, record) in reader.records().enumerate() {
            let row = index + 1 + self.lines_to_skip;
            let malformed = |reason: String| DataLoadError::Malformed {
                path: path.to_path_buf(),
                row,
                reason,
            };
            let record = record.map_err(|e| malformed(e.to_string()))?;

            if record.len() <= self.label_column_index {
                return Err(malformed(format!(
                    "{} columns, label column index is {}",
                    record.len(),
                    self.label_column_index
                )));
            }
            let features = record.len() - 1;
            match width {
                None => width = Some(features),
                Some(w) if w != features => {
                    return Err(malformed(format!(
                        "expected {} columns, found {}",
                        w + 1,
                        record.len()
                    )))
                }
                Some(_) => {}
            }

            for (column, field) in record.iter().enumerate() {
                let field = field.trim();
                if column == self.label_column_index {
                    let class: usize = field
                        .parse()
                        .map_err(|_| malformed(format!("label `{}` is not a class index", field)))?;
                    if class >= self.number_of_labels {
                        return Err(malformed(format!(
                            "label {} outside 0..{}",
                            class, self.number_of_labels
                        )));
                    }
                    classes.push(class);
                } else {
                    let value: f32 = field.parse().map_err(|_| {
                        malformed(format!("column {}: `{}` is not numeric", column, field))
                    })?;
                    values.push(value);
                }
            }
        }

        let width = width.ok_or_else(|| DataLoadError::Io {
            path: PathBuf::from(path),
            reason: "file contains no samples".to_string(),
        })?;
        let features = Array2::from_shape_vec((classes.len(), width), values)
            .map_err(|e| DataLoadError::Other(e.to_string()))?;
        Dataset::from_class_labels(features, &classes, self.number_of_labels)
    }
}
