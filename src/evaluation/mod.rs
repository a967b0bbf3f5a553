//! Confusion matrix and per-class metrics for held-out predictions

use std::fmt::Write as _;

use anyhow::{ensure, Result};
use ndarray::{Array2, Axis};
use serde::Serialize;

/// Square count matrix; rows are true classes, columns predicted classes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Tally 0-based `truth`/`predicted` pairs over `classes` classes.
    pub fn from_labels(truth: &[usize], predicted: &[usize], classes: usize) -> Result<Self> {
        ensure!(
            truth.len() == predicted.len(),
            "label count mismatch: {} true vs {} predicted",
            truth.len(),
            predicted.len()
        );
        ensure!(classes > 0, "confusion matrix needs at least one class");
        let mut counts = Array2::<usize>::zeros((classes, classes));
        for (idx, (&actual, &guess)) in truth.iter().zip(predicted.iter()).enumerate() {
            ensure!(
                actual < classes && guess < classes,
                "sample {} has label outside 0..{} (true {}, predicted {})",
                idx,
                classes,
                actual,
                guess
            );
            counts[[actual, guess]] += 1;
        }
        Ok(Self { counts })
    }

    pub fn classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[[actual, predicted]]
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    fn row_total(&self, class: usize) -> usize {
        self.counts.index_axis(Axis(0), class).sum()
    }

    fn column_total(&self, class: usize) -> usize {
        self.counts.index_axis(Axis(1), class).sum()
    }

    pub fn render(&self, class_names: &[String]) -> String {
        let width = class_names
            .iter()
            .map(|name| name.len())
            .chain(std::iter::once(8))
            .max()
            .unwrap_or(8);
        let mut out = String::new();
        let _ = write!(out, "{:>width$}", "true\\pred");
        for class in 0..self.classes() {
            let _ = write!(out, " {:>width$}", display_name(class_names, class));
        }
        out.push('\n');
        for actual in 0..self.classes() {
            let _ = write!(out, "{:>width$}", display_name(class_names, actual));
            for predicted in 0..self.classes() {
                let _ = write!(out, " {:>width$}", self.counts[[actual, predicted]]);
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Precision/recall/F1 per class plus accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total: usize,
}

impl ClassificationReport {
    pub fn from_matrix(matrix: &ConfusionMatrix, class_names: &[String]) -> Self {
        let classes: Vec<ClassMetrics> = (0..matrix.classes())
            .map(|class| {
                let hits = matrix.count(class, class) as f64;
                let precision = ratio(hits, matrix.column_total(class) as f64);
                let recall = ratio(hits, matrix.row_total(class) as f64);
                ClassMetrics {
                    name: display_name(class_names, class),
                    precision,
                    recall,
                    f1: ratio(2.0 * precision * recall, precision + recall),
                    support: matrix.row_total(class),
                }
            })
            .collect();

        let total = matrix.total();
        let count = classes.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / count,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / count,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / count,
        };
        let weight = |pick: fn(&ClassMetrics) -> f64| {
            ratio(
                classes.iter().map(|c| pick(c) * c.support as f64).sum(),
                total as f64,
            )
        };
        let weighted_avg = AverageMetrics {
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
        };

        Self {
            accuracy: ratio(matrix.correct() as f64, total as f64),
            classes,
            macro_avg,
            weighted_avg,
            total,
        }
    }

    pub fn render(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(std::iter::once(12))
            .max()
            .unwrap_or(12);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        );
        for class in &self.classes {
            let _ = writeln!(
                out,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.name, class.precision, class.recall, class.f1, class.support
            );
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        );
        for (label, avg) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            let _ = writeln!(
                out,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, avg.precision, avg.recall, avg.f1, self.total
            );
        }
        out
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn display_name(class_names: &[String], class: usize) -> String {
    class_names
        .get(class)
        .cloned()
        .unwrap_or_else(|| format!("class {}", class))
}
