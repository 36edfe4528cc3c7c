// src/config/loader.rs
//! Layered configuration loading: defaults, optional TOML file, environment

use crate::config::{constants::paths, PipelineConfig};
use crate::error::{EngineError, EngineErrorBuilder, EngineResult, IntoEngineError, PipelineStage};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader
///
/// Sources are applied in order, later ones overriding earlier ones:
/// built-in defaults, the TOML file (if any), then variables such as
/// `ENGINE_HEALTH__CLASSIFIER__N_ESTIMATORS=50`.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    use_environment: bool,
}

impl ConfigLoader {
    /// Loader reading defaults and environment overrides only
    pub fn new() -> Self {
        Self {
            config_path: None,
            use_environment: true,
        }
    }

    /// Loader that also reads the given TOML file, which must exist
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: Some(path.as_ref().to_path_buf()),
            use_environment: true,
        }
    }

    /// Skip environment overrides
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Load and validate the pipeline configuration
    pub fn load(&self) -> EngineResult<PipelineConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config_path {
            debug!("Reading configuration file {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        if self.use_environment {
            builder = builder.add_source(
                Environment::with_prefix(paths::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: PipelineConfig = builder
            .build()
            .and_then(|merged| merged.try_deserialize())
            .map_err(|err| self.load_error(err))?;

        config.validate()?;
        info!(
            "Configuration loaded: {}s at {} Hz, window {}, {} trees",
            config.simulation.run_duration_s,
            config.simulation.sample_rate_hz,
            config.features.window,
            config.classifier.n_estimators
        );
        Ok(config)
    }

    /// Write the given configuration as pretty TOML
    pub fn export<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> EngineResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(config).engine_err(path, "export_config")?;
        std::fs::write(path, content).engine_err(path, "export_config")
    }

    fn load_error(&self, err: config::ConfigError) -> EngineError {
        let error = EngineErrorBuilder::new(PipelineStage::Configuration, "load")
            .configuration(err.to_string());
        match &self.config_path {
            Some(path) => error.with_info("file", path.display().to_string()),
            None => error,
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[classifier]\nn_estimators = 25\nseed = 7\n\n[features]\nwindow = 5").unwrap();

        let config = ConfigLoader::with_file(file.path())
            .without_environment()
            .load()
            .unwrap();

        assert_eq!(config.classifier.n_estimators, 25);
        assert_eq!(config.classifier.seed, 7);
        assert_eq!(config.features.window, 5);
        assert_eq!(config.simulation.run_duration_s, 300.0);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[features]\nwindow = 1").unwrap();

        let err = ConfigLoader::with_file(file.path())
            .without_environment()
            .load()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = ConfigLoader::with_file("/nonexistent/engine-health.toml")
            .without_environment()
            .load()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("engine-health.toml"));
    }

    #[test]
    fn test_export_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let mut config = PipelineConfig::default();
        config.reporting.alert_threshold = 0.5;
        ConfigLoader::export(&config, &path).unwrap();

        let loaded = ConfigLoader::with_file(&path)
            .without_environment()
            .load()
            .unwrap();
        assert_eq!(loaded, config);
    }
}
