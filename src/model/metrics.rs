// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Classification quality metrics

use crate::risk::RiskLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision / recall / F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: RiskLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

/// Averaged scores
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class breakdown plus accuracy and averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

/// Fraction of matching predictions (0 for empty input)
pub fn accuracy(truth: &[RiskLabel], predicted: &[RiskLabel]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build a report over every label present in either slice.
    ///
    /// Undefined ratios (no predictions / no support) score 0.
    pub fn new(truth: &[RiskLabel], predicted: &[RiskLabel]) -> Self {
        let mut labels: Vec<RiskLabel> = truth.iter().chain(predicted).copied().collect();
        labels.sort();
        labels.dedup();

        let per_class: Vec<ClassMetrics> = labels
            .iter()
            .map(|&label| {
                let tp = truth
                    .iter()
                    .zip(predicted)
                    .filter(|(t, p)| **t == label && **p == label)
                    .count();
                let predicted_count = predicted.iter().filter(|p| **p == label).count();
                let support = truth.iter().filter(|t| **t == label).count();

                let precision = ratio(tp, predicted_count);
                let recall = ratio(tp, support);
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
                    support,
                }
            })
            .collect();

        let total: usize = per_class.iter().map(|m| m.support).sum();
        let n = per_class.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: per_class.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: per_class.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: per_class.iter().map(|m| m.f1).sum::<f64>() / n,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            per_class,
            accuracy: accuracy(truth, predicted),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.label.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use RiskLabel::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[], &[]), 0.0);
        assert_relative_eq!(accuracy(&[Low, High, High, Medium], &[Low, High, Low, Medium]), 0.75);
    }

    #[test]
    fn test_report_scores() {
        let truth = [Low, Low, High, High];
        let predicted = [Low, High, High, High];
        let report = ClassificationReport::new(&truth, &predicted);

        assert_eq!(report.per_class.len(), 2);
        let low = report.per_class[0];
        let high = report.per_class[1];
        assert_eq!(low.label, Low);
        assert_relative_eq!(low.precision, 1.0);
        assert_relative_eq!(low.recall, 0.5);
        assert_relative_eq!(high.precision, 2.0 / 3.0);
        assert_relative_eq!(high.recall, 1.0);
        assert_relative_eq!(high.f1, 0.8);
        assert_eq!(high.support, 2);

        assert_relative_eq!(report.accuracy, 0.75);
        assert_relative_eq!(report.macro_avg.recall, 0.75);
        assert_eq!(report.weighted_avg.support, 4);
    }

    #[test]
    fn test_predicted_only_label_has_zero_support() {
        let report = ClassificationReport::new(&[Low], &[VeryHigh]);
        let vh = report.per_class.iter().find(|m| m.label == VeryHigh).unwrap();
        assert_eq!(vh.support, 0);
        assert_eq!(vh.recall, 0.0);
        assert!(format!("{}", report).contains("very high"));
    }
}
