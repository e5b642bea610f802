// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Offline training pipeline
//!
//! `samples -> encode time bucket -> stratified split -> fit forest -> evaluate`.

use super::dataset::LabeledSample;
use super::encoder::LabelEncoder;
use super::forest::{ForestConfig, RandomForest};
use super::metrics::{accuracy, ClassificationReport};
use super::split::stratified_split;
use super::RiskModel;
use crate::error::ModelError;
use crate::risk::RiskLabel;
use serde::{Deserialize, Serialize};

/// Model input columns, in feature-vector order
pub const FEATURE_NAMES: [&str; 3] = ["distance_to_forest", "distance_to_leopard", "time_of_day_encoded"];

/// Training pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Forest hyperparameters
    pub forest: ForestConfig,
    /// Fraction of each class held out for evaluation
    pub test_fraction: f64,
    /// Split seed
    pub split_seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the forest hyperparameters
    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    /// Set the held-out fraction
    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }
}

/// Trained model plus evaluation results
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: RiskModel,
    pub train_size: usize,
    pub test_size: usize,
    pub train_accuracy: f64,
    /// Report on the held-out rows (empty when nothing was held out)
    pub test_report: ClassificationReport,
    /// `(feature name, importance)` in feature order
    pub feature_importances: Vec<(&'static str, f64)>,
}

/// Train a risk model on labeled samples.
pub fn train(samples: &[LabeledSample], config: &TrainingConfig) -> Result<TrainingOutcome, ModelError> {
    if samples.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }

    let encoder = LabelEncoder::fit(samples.iter().map(|s| s.time_of_day.as_str()));
    let x = samples
        .iter()
        .map(|s| {
            let code = encoder.transform(&s.time_of_day)?;
            Ok(vec![s.distance_to_forest, s.distance_to_leopard, code as f64])
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    let y: Vec<RiskLabel> = samples.iter().map(|s| s.risk_level).collect();

    let (train_idx, test_idx) = stratified_split(&y, config.test_fraction, config.split_seed);
    if train_idx.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }

    let pick_x = |idx: &[usize]| idx.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
    let pick_y = |idx: &[usize]| idx.iter().map(|&i| y[i]).collect::<Vec<_>>();
    let (x_train, y_train) = (pick_x(&train_idx), pick_y(&train_idx));
    let (x_test, y_test) = (pick_x(&test_idx), pick_y(&test_idx));

    log::info!(
        "Training random forest: {} trees on {} rows ({} held out)",
        config.forest.n_trees,
        x_train.len(),
        x_test.len()
    );

    let forest = RandomForest::fit(&x_train, &y_train, config.forest.clone())?;

    let predict_all = |rows: &[Vec<f64>]| -> Result<Vec<RiskLabel>, ModelError> {
        rows.iter().map(|row| forest.predict(row)).collect()
    };
    let train_accuracy = accuracy(&y_train, &predict_all(&x_train)?);
    let test_report = ClassificationReport::new(&y_test, &predict_all(&x_test)?);

    let feature_importances = FEATURE_NAMES
        .iter()
        .copied()
        .zip(forest.feature_importances())
        .collect();

    log::info!(
        "Training done: train accuracy {:.3}, test accuracy {:.3}",
        train_accuracy,
        test_report.accuracy
    );

    Ok(TrainingOutcome {
        model: RiskModel::new(forest, encoder),
        train_size: x_train.len(),
        test_size: x_test.len(),
        train_accuracy,
        test_report,
        feature_importances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<LabeledSample> {
        let buckets = ["morning", "afternoon", "evening", "night"];
        (0..120)
            .map(|i| {
                let leopard = (i * 17 % 1000) as f64;
                let label = if leopard < 150.0 {
                    RiskLabel::VeryHigh
                } else if leopard < 500.0 {
                    RiskLabel::Medium
                } else {
                    RiskLabel::Low
                };
                LabeledSample::new((i * 13 % 800) as f64, leopard, buckets[i % 4], label)
            })
            .collect()
    }

    fn quick() -> TrainingConfig {
        TrainingConfig::new().with_forest(ForestConfig::new().with_n_trees(20))
    }

    #[test]
    fn test_train_reports() {
        let data = samples();
        let outcome = train(&data, &quick()).unwrap();

        assert_eq!(outcome.train_size + outcome.test_size, data.len());
        assert!(outcome.test_size > 0);
        assert!(outcome.train_accuracy > 0.8);
        assert_eq!(outcome.feature_importances.len(), 3);
        assert_eq!(outcome.feature_importances[1].0, "distance_to_leopard");
        let total: f64 = outcome.feature_importances.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(outcome.model.encoder().classes().len(), 4);
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(matches!(train(&[], &quick()), Err(ModelError::EmptyTrainingSet)));
    }
}
