//! Health classification: CART forest, stratified split, metrics and scoring

pub mod tree;
pub mod forest;
pub mod split;
pub mod metrics;
pub mod health;

pub use forest::{ForestConfig, RandomForest};
pub use health::{HealthClassifier, HealthIndexRow, HealthIndexTable, TrainedHealthModel};
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport};
pub use split::{stratified_split, TrainValidationSplit};
pub use tree::{DecisionTree, TreeConfig};
