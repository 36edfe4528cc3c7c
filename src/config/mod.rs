// src/config/mod.rs
//! Pipeline configuration
//!
//! Every field carries a serde default, so a partial TOML file or a handful of
//! environment overrides is enough to describe a run.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use serde::{Deserialize, Serialize};

/// Complete pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub reporting: ReportingSettings,
}

/// Corpus generation settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationSettings {
    #[serde(default = "defaults::run_duration_s")]
    pub run_duration_s: f64,

    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: f64,

    #[serde(default = "defaults::nominal_runs")]
    pub nominal_runs: usize,

    #[serde(default = "defaults::runs_per_fault")]
    pub runs_per_fault: usize,
}

/// Rolling feature settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeatureSettings {
    #[serde(default = "defaults::window")]
    pub window: usize,
}

/// Random forest and split settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierSettings {
    #[serde(default = "defaults::validation_fraction")]
    pub validation_fraction: f64,

    #[serde(default = "defaults::n_estimators")]
    pub n_estimators: usize,

    /// `None` grows every tree until its leaves are pure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

/// Settings consumed by reporting only
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReportingSettings {
    #[serde(default = "defaults::alert_threshold")]
    pub alert_threshold: f64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn run_duration_s() -> f64 { simulation::DEFAULT_RUN_DURATION_S }
    pub fn sample_rate_hz() -> f64 { simulation::DEFAULT_SAMPLE_RATE_HZ }
    pub fn nominal_runs() -> usize { simulation::DEFAULT_NOMINAL_RUNS }
    pub fn runs_per_fault() -> usize { simulation::DEFAULT_RUNS_PER_FAULT }

    pub fn window() -> usize { features::DEFAULT_WINDOW }

    pub fn validation_fraction() -> f64 { classifier::DEFAULT_VALIDATION_FRACTION }
    pub fn n_estimators() -> usize { classifier::DEFAULT_ESTIMATORS }
    pub fn seed() -> u64 { classifier::DEFAULT_SEED }

    pub fn alert_threshold() -> f64 { reporting::DEFAULT_ALERT_THRESHOLD }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            run_duration_s: defaults::run_duration_s(),
            sample_rate_hz: defaults::sample_rate_hz(),
            nominal_runs: defaults::nominal_runs(),
            runs_per_fault: defaults::runs_per_fault(),
        }
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self { window: defaults::window() }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            validation_fraction: defaults::validation_fraction(),
            n_estimators: defaults::n_estimators(),
            max_depth: None,
            seed: defaults::seed(),
        }
    }
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self { alert_threshold: defaults::alert_threshold() }
    }
}

impl SimulationSettings {
    /// Number of samples each generated run will hold
    pub fn samples_per_run(&self) -> usize {
        (self.run_duration_s * self.sample_rate_hz).round() as usize
    }
}

impl PipelineConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> EngineResult<()> {
        let mut errors = Vec::new();
        let sim = &self.simulation;

        if !(sim.run_duration_s.is_finite() && sim.run_duration_s > 0.0) {
            errors.push(format!("run duration must be positive, got {}", sim.run_duration_s));
        }
        if !(sim.sample_rate_hz.is_finite() && sim.sample_rate_hz > 0.0) {
            errors.push(format!("sample rate must be positive, got {}", sim.sample_rate_hz));
        }
        if sim.nominal_runs == 0 {
            errors.push("at least one nominal run is required".to_string());
        }

        if self.features.window < features::MIN_WINDOW {
            errors.push(format!(
                "rolling window must be at least {}, got {}",
                features::MIN_WINDOW, self.features.window
            ));
        } else if errors.is_empty() && sim.samples_per_run() < self.features.window {
            errors.push(format!(
                "runs of {} samples are shorter than the rolling window ({})",
                sim.samples_per_run(),
                self.features.window
            ));
        }

        let clf = &self.classifier;
        if !(clf.validation_fraction > 0.0 && clf.validation_fraction < 1.0) {
            errors.push(format!(
                "validation fraction must lie in (0, 1), got {}",
                clf.validation_fraction
            ));
        }
        if clf.n_estimators == 0 {
            errors.push("ensemble size must be at least 1".to_string());
        }
        if clf.max_depth == Some(0) {
            errors.push("max depth must be at least 1 when set".to_string());
        }

        let threshold = self.reporting.alert_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(format!("alert threshold must lie in [0, 1], got {}", threshold));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineErrorBuilder::new(PipelineStage::Configuration, "validate")
                .configuration(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = PipelineConfig::default();
        assert_eq!(config.simulation.run_duration_s, 300.0);
        assert_eq!(config.simulation.sample_rate_hz, 1.0);
        assert_eq!(config.simulation.nominal_runs, 3);
        assert_eq!(config.simulation.runs_per_fault, 2);
        assert_eq!(config.features.window, 10);
        assert_eq!(config.classifier.validation_fraction, 0.2);
        assert_eq!(config.classifier.n_estimators, 200);
        assert_eq!(config.classifier.max_depth, None);
        assert_eq!(config.reporting.alert_threshold, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: PipelineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PipelineConfig = toml::from_str("[features]\nwindow = 20\n").unwrap();
        assert_eq!(config.features.window, 20);
        assert_eq!(config.classifier.n_estimators, 200);
        assert_eq!(config.simulation.samples_per_run(), 300);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.features.window = 1;
        config.classifier.validation_fraction = 1.5;

        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        let message = err.to_string();
        assert!(message.contains("rolling window"));
        assert!(message.contains("validation fraction"));
    }

    #[test]
    fn test_window_longer_than_run_rejected() {
        let mut config = PipelineConfig::default();
        config.simulation.run_duration_s = 5.0;
        assert!(config.validate().is_err());
    }
}
