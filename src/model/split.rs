// MooTrack - Livestock risk tracking
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Stratified train/test split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Split row indices so each class keeps its proportion in both halves.
///
/// Per class, `round(count * test_fraction)` rows go to the test set.
/// Both returned index lists are sorted ascending.
pub fn stratified_split<L>(labels: &[L], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>)
where
    L: Ord + Clone,
{
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut classes: Vec<L> = labels.to_vec();
    classes.sort();
    classes.dedup();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in &classes {
        let mut rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == class)
            .map(|(i, _)| i)
            .collect();
        rows.shuffle(&mut rng);

        let n_test = ((rows.len() as f64) * fraction).round() as usize;
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
