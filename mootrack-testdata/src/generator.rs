// MooTrack Testdata - Labeled sample generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Synthetic labeled rows for training the risk classifier.
//!
//! Labels follow distance bands to the nearest leopard, with random
//! escalation after dark and close to the forest edge.

use mootrack::model::LabeledSample;
use mootrack::{RiskLabel, TimeOfDay};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of rows to generate.
    pub num_samples: usize,
    /// Distance to forest range in meters, `[min, max)`.
    pub forest_range_m: (f64, f64),
    /// Distance to leopard range in meters, `[min, max)`.
    pub leopard_range_m: (f64, f64),
    /// Chance of a one-step escalation in the evening or at night.
    pub dark_escalation: f64,
    /// Rows closer to the forest than this may escalate.
    pub forest_edge_m: f64,
    /// Chance of a one-step escalation near the forest edge.
    pub forest_escalation: f64,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            forest_range_m: (10.0, 1500.0),
            leopard_range_m: (0.0, 2000.0),
            dark_escalation: 0.4,
            forest_edge_m: 100.0,
            forest_escalation: 0.3,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of rows.
    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set the leopard distance range.
    pub fn with_leopard_range(mut self, min: f64, max: f64) -> Self {
        self.leopard_range_m = ordered(min, max);
        self
    }

    /// Set the forest distance range.
    pub fn with_forest_range(mut self, min: f64, max: f64) -> Self {
        self.forest_range_m = ordered(min, max);
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Label from the leopard distance band alone.
///
/// `roll` is a uniform draw in `[0, 1)` deciding the ambiguous bands.
pub fn band_label(distance_to_leopard: f64, roll: f64) -> RiskLabel {
    match distance_to_leopard {
        d if d < 50.0 => RiskLabel::VeryHigh,
        d if d < 100.0 && roll > 0.2 => RiskLabel::High,
        d if d < 100.0 => RiskLabel::VeryHigh,
        d if d < 200.0 && roll > 0.3 => RiskLabel::Medium,
        d if d < 200.0 => RiskLabel::High,
        d if d < 500.0 && roll > 0.4 => RiskLabel::Low,
        d if d < 500.0 => RiskLabel::Medium,
        _ => RiskLabel::Low,
    }
}

/// Draw a label for one set of features.
pub fn label_for<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    distance_to_forest: f64,
    distance_to_leopard: f64,
    time_of_day: TimeOfDay,
    rng: &mut R,
) -> RiskLabel {
    let mut label = band_label(distance_to_leopard, rng.gen());

    if time_of_day.is_dark() && label != RiskLabel::VeryHigh && rng.gen::<f64>() < config.dark_escalation {
        label = label.escalate();
    }
    if distance_to_forest < config.forest_edge_m
        && label != RiskLabel::VeryHigh
        && rng.gen::<f64>() < config.forest_escalation
    {
        label = label.escalate();
    }

    label
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Uniform over `[lo, hi)`, or the single value when the range is empty.
fn range_distribution((lo, hi): (f64, f64)) -> Uniform<f64> {
    let (lo, hi) = ordered(lo, hi);
    if lo < hi {
        Uniform::new(lo, hi)
    } else {
        Uniform::new_inclusive(lo, lo)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generate labeled rows.
pub fn generate_samples(config: &GeneratorConfig) -> Vec<LabeledSample> {
    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let forest = range_distribution(config.forest_range_m);
    let leopard = range_distribution(config.leopard_range_m);

    (0..config.num_samples)
        .map(|_| {
            let distance_to_forest = rng.sample(forest);
            let distance_to_leopard = rng.sample(leopard);
            let time_of_day = TimeOfDay::ALL[rng.gen_range(0..TimeOfDay::ALL.len())];
            let label = label_for(config, distance_to_forest, distance_to_leopard, time_of_day, &mut rng);

            LabeledSample::new(
                round2(distance_to_forest),
                round2(distance_to_leopard),
                time_of_day.as_str(),
                label,
            )
        })
        .collect()
}

/// Row count per label, every label present.
pub fn label_distribution(samples: &[LabeledSample]) -> BTreeMap<RiskLabel, usize> {
    let mut counts: BTreeMap<RiskLabel, usize> = RiskLabel::ALL.iter().map(|l| (*l, 0)).collect();
    for sample in samples {
        *counts.entry(sample.risk_level).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_count() {
        let samples = generate_samples(&GeneratorConfig::new().with_num_samples(50).with_seed(42));
        assert_eq!(samples.len(), 50);
    }

    #[test]
    fn test_ranges_and_rounding() {
        let samples = generate_samples(&GeneratorConfig::new().with_seed(1));
        for s in &samples {
            assert!(s.distance_to_forest >= 10.0 && s.distance_to_forest <= 1500.0);
            assert!(s.distance_to_leopard >= 0.0 && s.distance_to_leopard <= 2000.0);
            assert_eq!(round2(s.distance_to_forest), s.distance_to_forest);
            assert!(s.time_of_day.parse::<TimeOfDay>().is_ok());
        }
    }

    #[test]
    fn test_very_close_is_always_very_high() {
        let config = GeneratorConfig::new()
            .with_num_samples(500)
            .with_leopard_range(0.0, 49.0)
            .with_seed(7);
        assert!(generate_samples(&config)
            .iter()
            .all(|s| s.risk_level == RiskLabel::VeryHigh));
    }

    #[test]
    fn test_far_daytime_away_from_forest_is_low() {
        let config = GeneratorConfig::new()
            .with_num_samples(2000)
            .with_leopard_range(500.0, 2000.0)
            .with_forest_range(100.0, 1500.0)
            .with_seed(8);
        let samples = generate_samples(&config);
        let daytime: Vec<_> = samples
            .iter()
            .filter(|s| s.time_of_day == "morning" || s.time_of_day == "afternoon")
            .collect();
        assert!(!daytime.is_empty());
        assert!(daytime.iter().all(|s| s.risk_level == RiskLabel::Low));
    }

    #[test]
    fn test_band_label() {
        assert_eq!(band_label(10.0, 0.0), RiskLabel::VeryHigh);
        assert_eq!(band_label(75.0, 0.5), RiskLabel::High);
        assert_eq!(band_label(75.0, 0.1), RiskLabel::VeryHigh);
        assert_eq!(band_label(150.0, 0.9), RiskLabel::Medium);
        assert_eq!(band_label(150.0, 0.3), RiskLabel::High);
        assert_eq!(band_label(300.0, 0.41), RiskLabel::Low);
        assert_eq!(band_label(300.0, 0.4), RiskLabel::Medium);
        assert_eq!(band_label(800.0, 0.0), RiskLabel::Low);
    }

    #[test]
    fn test_degenerate_ranges() {
        let config = GeneratorConfig::new()
            .with_num_samples(50)
            .with_leopard_range(800.0, 600.0)
            .with_forest_range(250.0, 250.0)
            .with_seed(9);
        assert_eq!(config.leopard_range_m, (600.0, 800.0));

        let samples = generate_samples(&config);
        assert_eq!(samples.len(), 50);
        for s in &samples {
            assert!((600.0..=800.0).contains(&s.distance_to_leopard));
            assert_eq!(s.distance_to_forest, 250.0);
        }
    }

    #[test]
    fn test_reproducibility() {
        let config = GeneratorConfig::new().with_num_samples(100).with_seed(12345);
        assert_eq!(generate_samples(&config), generate_samples(&config));
    }

    #[test]
    fn test_label_distribution() {
        let samples = generate_samples(&GeneratorConfig::new().with_num_samples(300).with_seed(3));
        let counts = label_distribution(&samples);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts.values().sum::<usize>(), 300);
    }
}
