// src/ml/tree.rs
//! CART decision tree for multi-class classification
//!
//! Trees are grown with Gini impurity on (possibly bootstrapped) sample
//! indices. Nodes live in a flat array; children always have larger indices
//! than their parent. Leaves store the class distribution of the training
//! samples that reached them.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or cannot be split
    pub max_depth: Option<usize>,
    /// Candidate features examined per split
    pub max_features: usize,
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_features: usize::MAX,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Fitted classification tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: usize,
    depth: usize,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

impl DecisionTree {
    /// Grow a tree on the rows of `x` listed in `samples`
    ///
    /// `samples` may contain duplicates (bootstrap draws). `y[i]` is the class
    /// index of row `i` and must be below `n_classes`.
    pub fn fit<R: Rng + ?Sized>(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        config: &TreeConfig,
        rng: &mut R,
    ) -> Self {
        let mut nodes = vec![Node::Leaf { distribution: Vec::new() }];
        let mut stack = vec![(0usize, samples, 0usize)];
        let mut max_depth_reached = 0;

        while let Some((node_index, indices, depth)) = stack.pop() {
            max_depth_reached = max_depth_reached.max(depth);

            let mut counts = vec![0usize; n_classes];
            for &i in &indices {
                counts[y[i]] += 1;
            }

            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_exhausted = config.max_depth.is_some_and(|limit| depth >= limit);

            let split = if pure || depth_exhausted || indices.len() < config.min_samples_split {
                None
            } else {
                Self::best_split(x, y, &indices, n_classes, config.max_features, rng)
            };

            match split {
                Some(candidate) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = indices
                        .into_iter()
                        .partition(|&i| x[[i, candidate.feature]] <= candidate.threshold);

                    let left_index = nodes.len();
                    let right_index = left_index + 1;
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes.push(Node::Leaf { distribution: Vec::new() });
                    nodes[node_index] = Node::Split {
                        feature: candidate.feature,
                        threshold: candidate.threshold,
                        left: left_index,
                        right: right_index,
                    };

                    stack.push((right_index, right, depth + 1));
                    stack.push((left_index, left, depth + 1));
                }
                None => {
                    let total = indices.len().max(1) as f64;
                    nodes[node_index] = Node::Leaf {
                        distribution: counts.iter().map(|&c| c as f64 / total).collect(),
                    };
                }
            }
        }

        Self {
            nodes,
            n_classes,
            depth: max_depth_reached,
        }
    }

    /// Best Gini split over a random subset of features
    ///
    /// Examines at least `max_features` features and keeps going through the
    /// remaining ones until some valid split exists.
    fn best_split<R: Rng + ?Sized>(
        x: ArrayView2<'_, f64>,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        max_features: usize,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(indices.len());
        let total = indices.len();

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= max_features && best.is_some() {
                break;
            }

            column.clear();
            column.extend(indices.iter().map(|&i| (x[[i, feature]], y[i])));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; n_classes];
            let mut right_counts = vec![0usize; n_classes];
            for &(_, class) in column.iter() {
                right_counts[class] += 1;
            }

            for position in 0..total - 1 {
                let (value, class) = column[position];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                let next_value = column[position + 1].0;
                if next_value <= value {
                    continue;
                }

                let n_left = position + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / total as f64;

                if best.map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = 0.5 * (value + next_value);
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }

    /// Class distribution of the leaf `row` falls into
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split { feature, threshold, left, right } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fit(x: &Array2<f64>, y: &[usize], n_classes: usize, config: TreeConfig) -> DecisionTree {
        let samples = (0..y.len()).collect();
        DecisionTree::fit(x.view(), y, samples, n_classes, &config, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert!((gini(&[5, 5], 10) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_separable_data_fits_exactly() {
        let x = array![[0.0, 5.0], [1.0, 5.0], [2.0, 5.0], [10.0, 5.0], [11.0, 5.0], [12.0, 5.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let tree = fit(&x, &y, 2, TreeConfig::default());

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 1);
        for (i, &class) in y.iter().enumerate() {
            let proba = tree.predict_proba_row(x.row(i));
            assert_eq!(proba[class], 1.0);
        }
        // Threshold sits halfway between the two clusters
        assert_eq!(tree.predict_proba_row(array![5.9, 0.0].view())[0], 1.0);
        assert_eq!(tree.predict_proba_row(array![6.1, 0.0].view())[1], 1.0);
    }

    #[test]
    fn test_constant_features_become_leaf() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let y = [0, 1, 1, 1];
        let tree = fit(&x, &y, 2, TreeConfig::default());

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba_row(x.row(0)), &[0.25, 0.75]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]];
        let y = [0, 1, 0, 1, 0, 1, 0, 1];
        let config = TreeConfig { max_depth: Some(1), ..Default::default() };
        let tree = fit(&x, &y, 2, config);

        assert_eq!(tree.depth(), 1);
        assert!(tree.node_count() <= 3);
        let unbounded = fit(&x, &y, 2, TreeConfig::default());
        assert!(unbounded.depth() > 1);
        for i in 0..8 {
            assert_eq!(unbounded.predict_proba_row(x.row(i))[y[i]], 1.0);
        }
    }

    #[test]
    fn test_duplicate_samples_weight_leaves() {
        let x = array![[0.0], [0.0]];
        let y = [0, 1];
        let tree = DecisionTree::fit(
            x.view(),
            &y,
            vec![0, 0, 0, 1],
            2,
            &TreeConfig::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(tree.predict_proba_row(x.row(0)), &[0.75, 0.25]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let x = array![[0.0, 1.0], [0.5, 0.0], [1.0, 1.0], [1.5, 0.0], [2.0, 1.0], [2.5, 0.0]];
        let y = [0, 1, 2, 0, 1, 2];
        let config = TreeConfig { max_depth: Some(2), max_features: 1, ..Default::default() };
        let tree = fit(&x, &y, 3, config);
        for i in 0..6 {
            let sum: f64 = tree.predict_proba_row(x.row(i)).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }
}
