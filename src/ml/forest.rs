//! Bagged ensemble of CART trees

use super::tree::{DecisionTree, TreeConfig};
use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Forest hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Candidate features per split, `None` for `sqrt(n_features)`
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            max_features: None,
            bootstrap: true,
            seed: 0,
        }
    }
}

/// Random forest classifier over dense `f64` features
///
/// Class probabilities are the mean of the leaf distributions of every tree.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForest {
    /// Fit `config.n_estimators` trees on `x` with class indices `y`
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> EngineResult<Self> {
        let builder = || EngineErrorBuilder::new(PipelineStage::Training, "fit_forest");

        if x.nrows() == 0 {
            return Err(builder().configuration("cannot fit a forest on zero samples"));
        }
        if x.nrows() != y.len() {
            return Err(builder().data_shape(
                "training labels",
                format!("{} labels for {} feature rows", y.len(), x.nrows()),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&class| class >= n_classes) {
            return Err(builder().data_shape(
                "training labels",
                format!("class index {} out of range for {} classes", bad, n_classes),
            ));
        }
        if config.n_estimators == 0 {
            return Err(builder().configuration("n_estimators must be at least 1"));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1));
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            max_features,
            ..TreeConfig::default()
        };

        let mut master = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let samples: Vec<usize> = if config.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };
            trees.push(DecisionTree::fit(x, y, samples, n_classes, &tree_config, &mut rng));
        }

        debug!(
            "Fitted {} trees on {} samples x {} features ({} candidates per split)",
            trees.len(),
            n_samples,
            n_features,
            max_features
        );

        Ok(Self {
            trees,
            n_classes,
            n_features,
        })
    }

    /// Class probabilities, one row per sample and one column per class
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> EngineResult<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(EngineErrorBuilder::new(PipelineStage::Scoring, "predict_proba").data_shape(
                "feature matrix",
                format!("{} columns, forest was fitted on {}", x.ncols(), self.n_features),
            ));
        }

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (row, mut out) in x.axis_iter(Axis(0)).zip(proba.axis_iter_mut(Axis(0))) {
            for tree in &self.trees {
                for (cell, &p) in out.iter_mut().zip(tree.predict_proba_row(row)) {
                    *cell += p;
                }
            }
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    /// Most probable class per sample; ties go to the lower class index
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> EngineResult<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (class, &p)| {
                        if p > best.1 { (class, p) } else { best }
                    })
                    .0
            })
            .collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, StandardNormal};

    /// Three gaussian blobs in 4 dimensions, only the first two informative
    fn blobs(per_class: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = [[0.0, 0.0], [6.0, 0.0], [0.0, 6.0]];
        let mut x = Array2::zeros((3 * per_class, 4));
        let mut y = Vec::new();
        for (class, center) in centers.iter().enumerate() {
            for i in 0..per_class {
                let row = class * per_class + i;
                for col in 0..4 {
                    let z: f64 = StandardNormal.sample(&mut rng);
                    x[[row, col]] = if col < 2 { center[col] + z } else { z };
                }
                y.push(class);
            }
        }
        (x, y)
    }

    fn config(n_estimators: usize, seed: u64) -> ForestConfig {
        ForestConfig {
            n_estimators,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_separates_blobs() {
        let (x, y) = blobs(40, 1);
        let forest = RandomForest::fit(x.view(), &y, 3, &config(30, 7)).unwrap();
        assert_eq!(forest.n_trees(), 30);

        let (test_x, test_y) = blobs(20, 2);
        let predicted = forest.predict(test_x.view()).unwrap();
        let correct = predicted.iter().zip(&test_y).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / test_y.len() as f64 > 0.9, "accuracy {}/{}", correct, test_y.len());
    }

    #[test]
    fn test_probabilities_are_normalized() {
        let (x, y) = blobs(15, 3);
        let forest = RandomForest::fit(x.view(), &y, 3, &config(10, 1)).unwrap();
        let proba = forest.predict_proba(x.view()).unwrap();
        assert_eq!(proba.dim(), (45, 3));
        for row in proba.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let (x, y) = blobs(15, 4);
        let a = RandomForest::fit(x.view(), &y, 3, &config(8, 11)).unwrap();
        let b = RandomForest::fit(x.view(), &y, 3, &config(8, 11)).unwrap();
        assert_eq!(
            a.predict_proba(x.view()).unwrap(),
            b.predict_proba(x.view()).unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (x, y) = blobs(5, 5);
        assert!(RandomForest::fit(x.view(), &y[..3], 3, &config(2, 0)).unwrap_err().is_data_shape());
        assert!(RandomForest::fit(x.view(), &y, 2, &config(2, 0)).unwrap_err().is_data_shape());
        assert!(RandomForest::fit(x.view(), &y, 3, &config(0, 0)).unwrap_err().is_configuration());

        let empty = Array2::<f64>::zeros((0, 4));
        assert!(RandomForest::fit(empty.view(), &[], 3, &config(2, 0)).unwrap_err().is_configuration());

        let forest = RandomForest::fit(x.view(), &y, 3, &config(2, 0)).unwrap();
        let narrow = Array2::<f64>::zeros((2, 3));
        assert!(forest.predict_proba(narrow.view()).unwrap_err().is_data_shape());
    }
}
