//! Stratified train/validation partition

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Row indices of the two partitions, each in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainValidationSplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Split row indices so every class keeps its proportion in both partitions
///
/// Each class sends `round(n_c * validation_fraction)` of its rows to
/// validation, but never all of them: a class with a single row stays in
/// training. Rows are shuffled per class with a generator seeded from `seed`.
pub fn stratified_split(labels: &[usize], validation_fraction: f64, seed: u64) -> TrainValidationSplit {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, &class) in labels.iter().enumerate() {
        by_class.entry(class).or_default().push(row);
    }

    let fraction = validation_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut validation = Vec::new();

    for (_, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let n_validation = ((rows.len() as f64 * fraction).round() as usize).min(rows.len() - 1);
        validation.extend_from_slice(&rows[..n_validation]);
        train.extend_from_slice(&rows[n_validation..]);
    }

    train.sort_unstable();
    validation.sort_unstable();
    TrainValidationSplit { train, validation }
}
