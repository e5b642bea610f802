// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Random forest classifier over [`RiskLabel`]s
//!
//! Bagged CART trees with per-split feature subsampling. Prediction is soft
//! voting: the mean of the leaf class distributions, ties resolved toward
//! the lowest class index.

use super::tree::{DecisionTree, TreeParams};
use crate::error::ModelError;
use crate::risk::RiskLabel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least 1
    Sqrt,
    /// Every feature
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
            MaxFeatures::All => n_features.max(1),
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples to split a node
    pub min_samples_split: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Per-split feature subsampling
    pub max_features: MaxFeatures,
    /// Sample rows with replacement for each tree
    pub bootstrap: bool,
    /// Weight classes inversely to their frequency
    pub balanced_class_weight: bool,
    /// RNG seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            balanced_class_weight: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of trees
    pub fn with_n_trees(mut self, n: usize) -> Self {
        self.n_trees = n;
        self
    }

    /// Set the maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the feature subsampling rule
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    classes: Vec<RiskLabel>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest on feature rows `x` and labels `y`.
    pub fn fit(x: &[Vec<f64>], y: &[RiskLabel], config: ForestConfig) -> Result<Self, ModelError> {
        if x.is_empty() || y.is_empty() || config.n_trees == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ModelError::FeatureMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        let n_features = x[0].len();
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::FeatureMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        if let Some(row) = x.iter().position(|row| row.iter().any(|v| !v.is_finite())) {
            return Err(ModelError::NonFiniteFeature { row });
        }

        let mut classes: Vec<RiskLabel> = y.to_vec();
        classes.sort();
        classes.dedup();

        let targets: Vec<usize> = y
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or(0))
            .collect();

        let weights = Self::sample_weights(&targets, classes.len(), config.balanced_class_weight);
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            min_samples_leaf: config.min_samples_leaf.max(1),
            max_features: config.max_features.resolve(n_features),
        };

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees = (0..config.n_trees)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let rows: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(x, &targets, &weights, &rows, classes.len(), params, &mut tree_rng)
            })
            .collect();

        log::debug!(
            "Fitted random forest: {} trees, {} classes, {} samples",
            config.n_trees,
            classes.len(),
            n
        );

        Ok(Self {
            config,
            classes,
            n_features,
            trees,
        })
    }

    /// `n_samples / (n_classes * count(class))` per row, or all ones.
    fn sample_weights(targets: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
        if !balanced {
            return vec![1.0; targets.len()];
        }
        let mut counts = vec![0usize; n_classes];
        for &t in targets {
            counts[t] += 1;
        }
        let n = targets.len() as f64;
        targets
            .iter()
            .map(|&t| n / (n_classes as f64 * counts[t] as f64))
            .collect()
    }

    /// Mean class distribution over all trees, in [`RandomForest::classes`] order
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() || self.classes.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if features.len() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Most probable label
    pub fn predict(&self, features: &[f64]) -> Result<RiskLabel, ModelError> {
        let proba = self.predict_proba(features)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(self.classes[best])
    }

    /// Structural check for a forest read back from disk.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() || self.classes.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if self.n_features == 0 {
            return Err(ModelError::Corrupt("forest has no features".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| match e {
                    ModelError::Corrupt(reason) => ModelError::Corrupt(format!("tree {}: {}", i, reason)),
                    other => other,
                })?;
        }
        Ok(())
    }

    /// Labels known to the forest, ascending severity
    pub fn classes(&self) -> &[RiskLabel] {
        &self.classes
    }

    /// Feature count
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Training configuration
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Mean of per-tree normalized impurity importances, normalized to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_data() -> (Vec<Vec<f64>>, Vec<RiskLabel>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let d = i as f64 * 10.0;
            x.push(vec![d, (i % 4) as f64]);
            y.push(if d < 200.0 {
                RiskLabel::High
            } else {
                RiskLabel::Low
            });
        }
        (x, y)
    }

    fn small() -> ForestConfig {
        ForestConfig::new().with_n_trees(15)
    }

    #[test]
    fn test_defaults() {
        let config = ForestConfig::default();
        assert_eq!(config.n_trees, 200);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.min_samples_split, 5);
        assert_eq!(config.min_samples_leaf, 2);
        assert_eq!(config.seed, 42);
        assert_eq!(MaxFeatures::Sqrt.resolve(3), 1);
    }

    #[test]
    fn test_learns_threshold() {
        let (x, y) = toy_data();
        let forest = RandomForest::fit(&x, &y, small()).unwrap();
        assert_eq!(forest.classes(), &[RiskLabel::Low, RiskLabel::High]);
        assert_eq!(forest.predict(&[20.0, 1.0]).unwrap(), RiskLabel::High);
        assert_eq!(forest.predict(&[550.0, 1.0]).unwrap(), RiskLabel::Low);

        let proba = forest.predict_proba(&[20.0, 1.0]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let (x, y) = toy_data();
        let a = RandomForest::fit(&x, &y, small()).unwrap();
        let b = RandomForest::fit(&x, &y, small()).unwrap();
        assert_eq!(a, b);
        for probe in [[0.0, 0.0], [195.0, 3.0], [205.0, 2.0], [1e9, 0.0]] {
            assert_eq!(a.predict(&probe).unwrap(), a.predict(&probe).unwrap());
            assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
        }
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let (x, y) = toy_data();
        let config = small().with_max_features(MaxFeatures::All);
        let forest = RandomForest::fit(&x, &y, config).unwrap();
        let imp = forest.feature_importances();
        assert_eq!(imp.len(), 2);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            RandomForest::fit(&[], &[], small()),
            Err(ModelError::EmptyTrainingSet)
        ));

        let (x, y) = toy_data();
        let forest = RandomForest::fit(&x, &y, small()).unwrap();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(ModelError::FeatureMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_rejects_non_finite_features() {
        let (mut x, y) = toy_data();
        x[5][0] = f64::NAN;
        assert!(matches!(
            RandomForest::fit(&x, &y, small()),
            Err(ModelError::NonFiniteFeature { row: 5 })
        ));
        x[5][0] = f64::INFINITY;
        assert!(RandomForest::fit(&x, &y, small()).is_err());
    }

    #[test]
    fn test_validate_fitted_forest() {
        let (x, y) = toy_data();
        let mut forest = RandomForest::fit(&x, &y, small()).unwrap();
        assert!(forest.validate().is_ok());

        forest.n_features = 0;
        assert!(matches!(forest.validate(), Err(ModelError::Corrupt(_))));
    }

    #[test]
    fn test_balanced_weights() {
        let w = RandomForest::sample_weights(&[0, 0, 0, 1], 2, true);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[3] - 2.0).abs() < 1e-12);
    }
}
