// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! CART decision tree (Gini impurity, weighted samples)
//!
//! Trees are grown over a multiset of row indices so that bootstrap
//! resampling is just index duplication. Nodes live in a flat arena;
//! node 0 is the root.

use crate::error::ModelError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Maximum depth (root is depth 0)
    pub max_depth: usize,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples required in each child
    pub min_samples_leaf: usize,
    /// Number of features examined per split
    pub max_features: usize,
}

/// A tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node with a normalized class distribution
    Leaf { distribution: Vec<f64> },
    /// `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: usize,
    /// Unnormalized weighted impurity decrease per feature
    #[serde(default)]
    importances: Vec<f64>,
}

/// Training view shared by every node of one tree
struct Grower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    weights: &'a [f64],
    params: TreeParams,
    n_classes: usize,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
    left_weight: f64,
    left_impurity: f64,
    right_weight: f64,
    right_impurity: f64,
}

fn gini(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

impl<'a> Grower<'a> {
    fn class_weights(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += self.weights[i];
        }
        counts
    }

    fn leaf(&mut self, counts: &[f64], total: f64) -> usize {
        let distribution = if total > 0.0 {
            counts.iter().map(|c| c / total).collect()
        } else {
            vec![1.0 / self.n_classes as f64; self.n_classes]
        };
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_weights(indices);
        let total: f64 = counts.iter().sum();
        let impurity = gini(&counts, total);

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || indices.len() < 2 * self.params.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            return self.leaf(&counts, total);
        }

        let Some(best) = self.best_split(indices, rng) else {
            return self.leaf(&counts, total);
        };

        self.importances[best.feature] += total * impurity
            - best.left_weight * best.left_impurity
            - best.right_weight * best.right_impurity;

        let (feature, threshold) = (best.feature, best.threshold);
        let mut left_rows: Vec<usize> = Vec::with_capacity(indices.len());
        let mut right_rows: Vec<usize> = Vec::with_capacity(indices.len());
        for &i in indices.iter() {
            if self.x[i][feature] <= threshold {
                left_rows.push(i);
            } else {
                right_rows.push(i);
            }
        }

        // Reserve the slot, children are appended after it
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let id = self.nodes.len() - 1;
        let left = self.grow(&mut left_rows, depth + 1, rng);
        let right = self.grow(&mut right_rows, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Draw features in random order; keep looking past `max_features`
    /// until at least one valid split is found.
    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut right_counts = self.class_weights(&sorted);
            let mut right_weight: f64 = right_counts.iter().sum();
            let total_weight = right_weight;
            let mut left_counts = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;

            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                let w = self.weights[i];
                left_counts[self.y[i]] += w;
                right_counts[self.y[i]] -= w;
                left_weight += w;
                right_weight -= w;

                let n_left = pos + 1;
                let n_right = sorted.len() - n_left;
                if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf {
                    continue;
                }

                let here = self.x[i][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let left_impurity = gini(&left_counts, left_weight);
                let right_impurity = gini(&right_counts, right_weight);
                let impurity =
                    (left_weight * left_impurity + right_weight * right_impurity) / total_weight;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next || !threshold.is_finite() {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                        left_weight,
                        left_impurity,
                        right_weight: right_weight.max(0.0),
                        right_impurity,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    /// Grow a tree over `indices` (duplicates allowed).
    ///
    /// `y` holds class indices below `n_classes`; `weights` is per row.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        weights: &[f64],
        indices: &[usize],
        n_classes: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = x.first().map_or(0, |row| row.len());
        let mut grower = Grower {
            x,
            y,
            weights,
            params,
            n_classes,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };

        let mut rows = indices.to_vec();
        grower.grow(&mut rows, 0, rng);

        Self {
            nodes: grower.nodes,
            n_classes,
            importances: grower.importances,
        }
    }

    /// Class distribution of the leaf reached by `features`
    pub fn predict_proba(&self, features: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Check the arena of a deserialized tree before it is used for
    /// prediction: children point forward and in range, features and
    /// leaf distributions match the forest shape.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Corrupt("tree has no nodes".to_string()));
        }
        if self.n_classes != n_classes {
            return Err(ModelError::Corrupt(format!(
                "tree has {} classes, forest has {}",
                self.n_classes, n_classes
            )));
        }
        let len = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes || distribution.iter().any(|p| !p.is_finite()) {
                        return Err(ModelError::Corrupt(format!("leaf {} has a bad distribution", id)));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::Corrupt(format!(
                            "node {} splits on feature {} of {}",
                            id, feature, n_features
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(ModelError::Corrupt(format!("node {} has a NaN threshold", id)));
                    }
                    // Forward-only links keep traversal finite
                    for child in [*left, *right] {
                        if child <= id || child >= len {
                            return Err(ModelError::Corrupt(format!(
                                "node {} links to node {} of {}",
                                id, child, len
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Impurity decrease per feature, normalized to sum to 1
    /// (all zeros for a single-leaf tree)
    pub fn feature_importances(&self) -> Vec<f64> {
        let sum: f64 = self.importances.iter().sum();
        if sum <= 0.0 {
            return vec![0.0; self.importances.len()];
        }
        self.importances.iter().map(|v| v / sum).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    #[test]
    fn test_separable_data() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let w = vec![1.0; 20];
        let idx: Vec<usize> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = DecisionTree::fit(&x, &y, &w, &idx, 2, params(), &mut rng);

        assert_eq!(tree.predict_proba(&[2.0, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[15.0, 0.0]), &[0.0, 1.0]);
        assert_eq!(tree.depth(), 1);
        let imp = tree.feature_importances();
        assert!((imp[0] - 1.0).abs() < 1e-12);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 0, 0];
        let w = vec![1.0; 3];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &w, &[0, 1, 2], 2, params(), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.feature_importances(), vec![0.0]);
    }

    #[test]
    fn test_max_depth_respected() {
        let x: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<usize> = (0..64).map(|i| i % 2).collect();
        let w = vec![1.0; 64];
        let idx: Vec<usize> = (0..64).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let p = TreeParams {
            max_depth: 3,
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, &w, &idx, 2, p, &mut rng);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_min_samples_leaf_blocks_split() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0, 1, 1];
        let w = vec![1.0; 3];
        let mut rng = StdRng::seed_from_u64(1);
        let p = TreeParams {
            min_samples_leaf: 2,
            ..params()
        };
        let tree = DecisionTree::fit(&x, &y, &w, &[0, 1, 2], 2, p, &mut rng);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_validate_rejects_damaged_arena() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let w = vec![1.0; 20];
        let idx: Vec<usize> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &w, &idx, 2, params(), &mut rng);
        assert!(tree.validate(2, 2).is_ok());
        assert!(matches!(tree.validate(2, 3), Err(ModelError::Corrupt(_))));

        let mut empty = tree.clone();
        empty.nodes.clear();
        assert!(matches!(empty.validate(2, 2), Err(ModelError::Corrupt(_))));

        let mut cycle = tree.clone();
        cycle.nodes[0] = Node::Split {
            feature: 0,
            threshold: 9.5,
            left: 0,
            right: 99,
        };
        assert!(matches!(cycle.validate(2, 2), Err(ModelError::Corrupt(_))));

        let mut wide = tree.clone();
        wide.nodes[0] = Node::Split {
            feature: 7,
            threshold: 9.5,
            left: 1,
            right: 2,
        };
        assert!(matches!(wide.validate(2, 2), Err(ModelError::Corrupt(_))));

        let mut short_leaf = tree;
        short_leaf.nodes[1] = Node::Leaf {
            distribution: vec![1.0],
        };
        assert!(matches!(short_leaf.validate(2, 2), Err(ModelError::Corrupt(_))));
    }
}
