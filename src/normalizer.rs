use ndarray::{Array1, Axis};

use crate::dataset::Dataset;

/// Per-column standardisation to zero mean and unit variance.
///
/// Statistics come from the training set only and are then applied to
/// every set that is scored against the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: Array1<f32>,
    pub std: Array1<f32>,
}

impl Standardizer {
    pub fn fit(dataset: &Dataset) -> Self {
        let features = dataset.features();
        let n = features.ncols();
        let mean = features
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n));
        let std = features.std_axis(Axis(0), 0.0);
        Standardizer { mean, std }
    }

    /// Zero-variance columns are only centred.
    pub fn transform(&self, dataset: &mut Dataset) {
        for mut row in dataset.features_mut().rows_mut() {
            for ((x, &mean), &std) in row.iter_mut().zip(&self.mean).zip(&self.std) {
                *x -= mean;
                if std > 0.0 {
                    *x /= std;
                }
            }
        }
    }

    /// Fits on `train` and applies the statistics to both sets.
    pub fn fit_transform(train: &mut Dataset, test: &mut Dataset) -> Self {
        let standardizer = Standardizer::fit(train);
        standardizer.transform(train);
        standardizer.transform(test);
        standardizer
    }
}
