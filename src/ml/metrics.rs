// src/ml/metrics.rs
//! Per-class classification metrics

use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use crate::simulation::Label;
use serde::Serialize;
use std::fmt;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Summary of predictions against ground truth on a held-out partition
///
/// Undefined ratios (no predictions or no support for a class) are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub support: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Weighted mean of the per-class metrics
fn averaged(metrics: &[ClassMetrics], weight: impl Fn(&ClassMetrics) -> f64) -> AveragedMetrics {
    let norm: f64 = metrics.iter().map(&weight).sum();
    if norm == 0.0 {
        return AveragedMetrics { precision: 0.0, recall: 0.0, f1: 0.0 };
    }
    let mean = |value: fn(&ClassMetrics) -> f64| {
        metrics.iter().map(|m| weight(m) * value(m)).sum::<f64>() / norm
    };
    AveragedMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1: mean(|m| m.f1),
    }
}

impl ClassificationReport {
    /// Build a report from class indices into `classes`
    pub fn from_predictions(truth: &[usize], predicted: &[usize], classes: &[Label]) -> Self {
        let n = classes.len();
        let mut true_positive = vec![0usize; n];
        let mut predicted_count = vec![0usize; n];
        let mut support = vec![0usize; n];

        for (&t, &p) in truth.iter().zip(predicted) {
            support[t] += 1;
            predicted_count[p] += 1;
            if t == p {
                true_positive[t] += 1;
            }
        }

        let per_class: Vec<ClassMetrics> = classes
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let precision = ratio(true_positive[i], predicted_count[i]);
                let recall = ratio(true_positive[i], support[i]);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: support[i],
                }
            })
            .collect();

        let total = truth.len().min(predicted.len());
        let macro_avg = averaged(&per_class, |_| 1.0);
        let weighted_avg = averaged(&per_class, |m| m.support as f64);

        Self {
            accuracy: ratio(true_positive.iter().sum(), total),
            classes: per_class,
            macro_avg,
            weighted_avg,
            support: total,
        }
    }

    pub fn class(&self, label: Label) -> Option<&ClassMetrics> {
        self.classes.iter().find(|m| m.label == label)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            EngineErrorBuilder::new(PipelineStage::Training, "report_to_json").configuration(err.to_string())
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|m| m.label.as_str().len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.support)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.support
            )?;
        }
        Ok(())
    }
}
