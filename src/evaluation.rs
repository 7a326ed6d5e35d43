//! Classification statistics computed from a confusion matrix.

use std::fmt::Write;

use ndarray::{Array2, ArrayView1};

/// Confusion counts for `num_classes` classes plus the scores derived from
/// them. Rows are actual classes, columns predicted classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    confusion: Array2<usize>,
}

impl Evaluation {
    pub fn new(num_classes: usize) -> Self {
        Evaluation {
            confusion: Array2::zeros((num_classes, num_classes)),
        }
    }

    pub fn from_confusion(confusion: Array2<usize>) -> Self {
        Evaluation { confusion }
    }

    pub fn num_classes(&self) -> usize {
        self.confusion.nrows()
    }

    pub fn confusion(&self) -> &Array2<usize> {
        &self.confusion
    }

    /// Scores `predicted` (probabilities or one-hot) against one-hot
    /// `labels` by comparing the arg-max of each row.
    pub fn eval(&mut self, labels: &Array2<f32>, predicted: &Array2<f32>) {
        for (actual, guess) in labels.rows().into_iter().zip(predicted.rows()) {
            self.add(argmax(actual), argmax(guess));
        }
    }

    pub fn add(&mut self, actual: usize, predicted: usize) {
        self.confusion[[actual, predicted]] += 1;
    }

    /// Adds another evaluation's counts, e.g. from a different fold.
    pub fn merge(&mut self, other: &Evaluation) {
        self.confusion += &other.confusion;
    }

    pub fn total(&self) -> usize {
        self.confusion.sum()
    }

    pub fn true_positives(&self, class: usize) -> usize {
        self.confusion[[class, class]]
    }

    pub fn false_positives(&self, class: usize) -> usize {
        self.confusion.column(class).sum() - self.true_positives(class)
    }

    pub fn false_negatives(&self, class: usize) -> usize {
        self.confusion.row(class).sum() - self.true_positives(class)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.confusion.diag().sum() as f64 / total as f64
    }

    /// Macro average over classes that were predicted at least once.
    pub fn precision(&self) -> f64 {
        self.macro_average(|class| (self.true_positives(class), self.false_positives(class)))
    }

    /// Macro average over classes that occur at least once.
    pub fn recall(&self) -> f64 {
        self.macro_average(|class| (self.true_positives(class), self.false_negatives(class)))
    }

    /// Harmonic mean of the macro-averaged precision and recall.
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    fn macro_average(&self, counts: impl Fn(usize) -> (usize, usize)) -> f64 {
        let ratios: Vec<f64> = (0..self.num_classes())
            .filter_map(|class| {
                let (hits, misses) = counts(class);
                let denominator = hits + misses;
                (denominator > 0).then(|| hits as f64 / denominator as f64)
            })
            .collect();
        if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        }
    }

    /// Multi-line summary: every non-empty confusion cell, then the scores.
    pub fn stats(&self) -> String {
        let mut out = String::new();
        for ((actual, predicted), &count) in self.confusion.indexed_iter() {
            if count > 0 {
                let _ = writeln!(
                    out,
                    "Examples labeled as {} classified by model as {}: {} times",
                    actual, predicted, count
                );
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "==========================Scores========================================");
        let _ = writeln!(out, " Accuracy:        {:.4}", self.accuracy());
        let _ = writeln!(out, " Precision:       {:.4}", self.precision());
        let _ = writeln!(out, " Recall:          {:.4}", self.recall());
        let _ = writeln!(out, " F1 Score:        {:.4}", self.f1());
        let _ = writeln!(out, "========================================================================");
        out
    }
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}
