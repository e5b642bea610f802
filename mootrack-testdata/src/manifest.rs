// MooTrack Testdata - Dataset manifest
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Manifest describing a generated training dataset.

use crate::generator::{label_distribution, GeneratorConfig};
use crate::scenario::ScenarioError;
use chrono::{DateTime, Utc};
use mootrack::model::LabeledSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Observed range of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

impl ColumnRange {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(r) => Some(Self {
                min: r.min.min(v),
                max: r.max.max(v),
            }),
        })
    }
}

/// Dataset manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    /// Dataset name (matches filename without extension).
    pub name: String,
    /// Number of rows.
    pub sample_count: usize,
    /// Rows per risk label.
    pub label_distribution: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_forest: Option<ColumnRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_to_leopard: Option<ColumnRange>,
    /// Generator settings used.
    pub generator: GeneratorConfig,
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
}

impl DatasetManifest {
    /// Describe `samples` produced with `config`.
    pub fn describe(name: &str, config: &GeneratorConfig, samples: &[LabeledSample]) -> Self {
        Self {
            name: name.to_string(),
            sample_count: samples.len(),
            label_distribution: label_distribution(samples)
                .into_iter()
                .map(|(label, n)| (label.to_string(), n))
                .collect(),
            distance_to_forest: ColumnRange::of(samples.iter().map(|s| s.distance_to_forest)),
            distance_to_leopard: ColumnRange::of(samples.iter().map(|s| s.distance_to_leopard)),
            generator: config.clone(),
            generated_at: Utc::now(),
        }
    }

    /// Save manifest to JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load manifest from JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_samples;
    use tempfile::NamedTempFile;

    #[test]
    fn test_describe() {
        let config = GeneratorConfig::new().with_num_samples(200).with_seed(42);
        let samples = generate_samples(&config);
        let manifest = DatasetManifest::describe("risk", &config, &samples);

        assert_eq!(manifest.sample_count, 200);
        assert_eq!(manifest.label_distribution.values().sum::<usize>(), 200);
        assert!(manifest.label_distribution.contains_key("very high"));
        let forest = manifest.distance_to_forest.unwrap();
        assert!(forest.min >= 10.0 && forest.max <= 1500.0);
    }

    #[test]
    fn test_empty_has_no_ranges() {
        let manifest = DatasetManifest::describe("empty", &GeneratorConfig::new(), &[]);
        assert_eq!(manifest.sample_count, 0);
        assert!(manifest.distance_to_leopard.is_none());
    }

    #[test]
    fn test_save_load() {
        let config = GeneratorConfig::new().with_num_samples(20).with_seed(1);
        let manifest = DatasetManifest::describe("risk", &config, &generate_samples(&config));
        let file = NamedTempFile::new().unwrap();
        manifest.save(file.path()).unwrap();

        let loaded = DatasetManifest::load(file.path()).unwrap();
        assert_eq!(loaded.sample_count, 20);
        assert_eq!(loaded.generator.seed, Some(1));
        assert_eq!(loaded.label_distribution, manifest.label_distribution);
    }
}
