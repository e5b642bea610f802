// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Learned risk model
//!
//! A [`RiskModel`] pairs a [`RandomForest`] with the [`LabelEncoder`] used
//! for the time-of-day column. Both are persisted as JSON artifacts in a
//! model directory:
//!
//! - [`MODEL_FILE`]: the forest
//! - [`ENCODER_FILE`]: the time-of-day encoder
//!
//! # Example
//!
//! ```rust,no_run
//! use mootrack::model::RiskModel;
//!
//! let model = RiskModel::load("models").unwrap();
//! let label = model.predict(500.0, 150.0, "evening").unwrap();
//! println!("risk: {}", label);
//! ```

pub mod dataset;
pub mod encoder;
pub mod forest;
pub mod metrics;
pub mod split;
pub mod training;
pub mod tree;

pub use dataset::{LabeledSample, DATASET_FILE};
pub use encoder::LabelEncoder;
pub use forest::{ForestConfig, MaxFeatures, RandomForest};
pub use metrics::{ClassMetrics, ClassificationReport};
pub use training::{train, TrainingConfig, TrainingOutcome, FEATURE_NAMES};

use crate::error::ModelError;
use crate::risk::RiskLabel;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Forest artifact file name
pub const MODEL_FILE: &str = "risk_predictor_model.json";

/// Encoder artifact file name
pub const ENCODER_FILE: &str = "time_of_day_encoder.json";

/// Trained forest plus time-of-day encoder
#[derive(Debug, Clone, PartialEq)]
pub struct RiskModel {
    forest: RandomForest,
    encoder: LabelEncoder,
}

impl RiskModel {
    pub fn new(forest: RandomForest, encoder: LabelEncoder) -> Self {
        Self { forest, encoder }
    }

    /// Classify a situation. Fails with [`ModelError::UnseenLabel`] when
    /// `time_bucket` was not seen at training time.
    pub fn predict(
        &self,
        dist_forest: f64,
        dist_predator: f64,
        time_bucket: &str,
    ) -> Result<RiskLabel, ModelError> {
        let code = self.encoder.transform(time_bucket)?;
        self.forest.predict(&[dist_forest, dist_predator, code as f64])
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    /// Write both artifacts into `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ModelError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        serde_json::to_writer(BufWriter::new(File::create(dir.join(MODEL_FILE))?), &self.forest)?;
        serde_json::to_writer_pretty(
            BufWriter::new(File::create(dir.join(ENCODER_FILE))?),
            &self.encoder,
        )?;

        log::info!("Saved risk model artifacts to {}", dir.display());
        Ok(())
    }

    /// Load both artifacts from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ModelError> {
        let dir = dir.as_ref();
        let model_path = dir.join(MODEL_FILE);
        let encoder_path = dir.join(ENCODER_FILE);

        for path in [&model_path, &encoder_path] {
            if !path.is_file() {
                return Err(ModelError::ArtifactNotFound(path.display().to_string()));
            }
        }

        let forest: RandomForest = serde_json::from_reader(BufReader::new(File::open(&model_path)?))?;
        let encoder: LabelEncoder =
            serde_json::from_reader(BufReader::new(File::open(&encoder_path)?))?;

        if encoder.is_empty() {
            return Err(ModelError::NotFitted);
        }
        forest.validate()?;
        Ok(Self { forest, encoder })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> RiskModel {
        let samples: Vec<LabeledSample> = (0..80)
            .map(|i| {
                let leopard = i as f64 * 25.0;
                let bucket = ["morning", "afternoon", "evening", "night"][i % 4];
                let label = if leopard < 300.0 {
                    RiskLabel::High
                } else {
                    RiskLabel::Low
                };
                LabeledSample::new(400.0 + i as f64, leopard, bucket, label)
            })
            .collect();
        let config = TrainingConfig::new().with_forest(ForestConfig::new().with_n_trees(10));
        train(&samples, &config).unwrap().model
    }

    #[test]
    fn test_save_and_reload_reproduce_prediction() {
        let model = tiny_model();
        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();

        assert!(dir.path().join(MODEL_FILE).is_file());
        assert!(dir.path().join(ENCODER_FILE).is_file());

        let reloaded = RiskModel::load(dir.path()).unwrap();
        assert_eq!(
            model.predict(500.0, 150.0, "evening").unwrap(),
            reloaded.predict(500.0, 150.0, "evening").unwrap()
        );
        assert_eq!(
            model.forest().predict_proba(&[500.0, 150.0, 1.0]).unwrap(),
            reloaded.forest().predict_proba(&[500.0, 150.0, 1.0]).unwrap()
        );
    }

    #[test]
    fn test_unseen_bucket() {
        let model = tiny_model();
        assert!(matches!(
            model.predict(500.0, 150.0, "dusk"),
            Err(ModelError::UnseenLabel(_))
        ));
    }

    #[test]
    fn test_tampered_forest_rejected() {
        let model = tiny_model();
        let dir = tempfile::tempdir().unwrap();
        model.save(dir.path()).unwrap();

        let path = dir.path().join(MODEL_FILE);
        let mut doc: serde_json::Value =
            serde_json::from_reader(BufReader::new(File::open(&path).unwrap())).unwrap();
        doc["trees"][0]["nodes"] = serde_json::json!([]);
        serde_json::to_writer(BufWriter::new(File::create(&path).unwrap()), &doc).unwrap();

        assert!(matches!(RiskModel::load(dir.path()), Err(ModelError::Corrupt(_))));
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RiskModel::load(dir.path()),
            Err(ModelError::ArtifactNotFound(_))
        ));
    }
}
