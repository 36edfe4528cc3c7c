//! Telemetry processing: rolling windows and feature extraction

pub mod windowing;
pub mod features;

pub use windowing::{RollingWindow, WindowStats};
pub use features::{
    feature_names, FeatureExtractor, FeatureRow, FeatureTable, FeatureTableBuilder, FEATURE_COUNT,
};
