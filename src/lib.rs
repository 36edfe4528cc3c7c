//! Engine-Health: synthetic rocket engine telemetry and health index estimation
//!
//! This library synthesizes labeled multi-channel telemetry for a
//! liquid-propellant engine test, nominal and under a fixed catalog of
//! faults, and turns it into a per-sample health index: the probability,
//! estimated by a random forest over rolling statistics, that the engine is
//! operating nominally.
//!
//! - Signal and fault synthesis with an explicit, seedable random generator
//! - Rolling-window feature extraction that never crosses run boundaries
//! - Random forest training with a stratified validation report
//! - CSV persistence for runs and health-index tables
//! - Layered configuration from defaults, TOML and environment
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use engine_health::{HealthPipeline, PipelineConfig};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = HealthPipeline::new(PipelineConfig::default())?;
//!     let corpus = pipeline.generate_corpus(&mut StdRng::from_entropy())?;
//!     let outcome = pipeline.train_and_score(&corpus)?;
//!
//!     println!("{}", outcome.report);
//!     for (label, health) in outcome.health.summary_by_label() {
//!         println!("{label}: mean health index {health:.3}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod error;
pub mod ml;
pub mod persistence;
pub mod pipeline;
pub mod processing;
pub mod simulation;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, PipelineConfig};
pub use error::{EngineError, EngineResult, PipelineStage};
pub use ml::{ClassificationReport, HealthClassifier, HealthIndexTable, TrainedHealthModel};
pub use pipeline::{HealthPipeline, PipelineOutcome};
pub use processing::{FeatureExtractor, FeatureTable};
pub use simulation::{Channel, Corpus, FaultKind, Label, Run, RunCorpusBuilder, SignalModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Synthetic engine telemetry and health index estimation".to_string(),
        fault_kinds: FaultKind::ALL.iter().map(|kind| kind.tag().to_string()).collect(),
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Tags of the fault catalog
    pub fault_kinds: Vec<String>,
}
