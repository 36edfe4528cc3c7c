// src/config/constants.rs
//! Pipeline-wide configuration constants

/// Synthetic run generation constants
pub mod simulation {
    pub const DEFAULT_RUN_DURATION_S: f64 = 300.0;
    pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 1.0;
    pub const DEFAULT_NOMINAL_RUNS: usize = 3;
    pub const DEFAULT_RUNS_PER_FAULT: usize = 2;
}

/// Rolling feature constants
pub mod features {
    pub const DEFAULT_WINDOW: usize = 10;
    pub const MIN_WINDOW: usize = 2;
}

/// Classifier constants
pub mod classifier {
    pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;
    pub const DEFAULT_ESTIMATORS: usize = 200;
    pub const DEFAULT_SEED: u64 = 42;

    /// Class whose probability is reported as the health index
    pub const REFERENCE_LABEL: &str = "normal";
}

/// Reporting constants
pub mod reporting {
    pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.7;
}

/// File layout constants
pub mod paths {
    pub const DEFAULT_DATA_DIR: &str = "data";
    pub const HEALTH_INDEX_FILE: &str = "health_index.csv";
    pub const ENV_PREFIX: &str = "ENGINE_HEALTH";
}
