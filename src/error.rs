// src/error.rs
//! Unified error handling for the engine health pipeline
//!
//! Every stage of the pipeline reports failures through [`EngineError`]. Each
//! variant carries an [`ErrorContext`] naming the stage and operation that
//! failed, so the driver can report where a run was aborted and which input
//! caused it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the crate
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for the whole pipeline
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Caller or configuration error: unknown fault tag, missing reference
    /// class, empty corpus, invalid settings
    #[error("[CONFIG] {context}: {reason}")]
    Configuration {
        reason: String,
        context: ErrorContext,
    },

    /// Malformed input data: missing columns, non-monotonic time, mixed labels
    #[error("[DATA] {context}: invalid {input}: {reason}")]
    DataShape {
        input: String,
        reason: String,
        context: ErrorContext,
    },

    /// File system or CSV encoding failures in the persistence layer
    #[error("[IO] {context}: {}: {reason}", .path.display())]
    Persistence {
        path: PathBuf,
        reason: String,
        context: ErrorContext,
    },
}

/// Pipeline stages used to locate failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Configuration,
    SignalGeneration,
    FaultInjection,
    CorpusBuilding,
    Persistence,
    FeatureExtraction,
    Training,
    Scoring,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Configuration => "configuration",
            PipelineStage::SignalGeneration => "signal generation",
            PipelineStage::FaultInjection => "fault injection",
            PipelineStage::CorpusBuilding => "corpus building",
            PipelineStage::Persistence => "persistence",
            PipelineStage::FeatureExtraction => "feature extraction",
            PipelineStage::Training => "training",
            PipelineStage::Scoring => "scoring",
        };
        f.write_str(name)
    }
}

/// Where an error happened, plus free-form details for debugging
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    pub stage: PipelineStage,
    pub operation: String,
    pub additional_info: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(stage: PipelineStage, operation: &str) -> Self {
        Self {
            stage,
            operation: operation.to_string(),
            additional_info: BTreeMap::new(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.stage, self.operation)?;
        for (key, value) in &self.additional_info {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

impl EngineError {
    /// Context attached to this error
    pub fn context(&self) -> &ErrorContext {
        match self {
            EngineError::Configuration { context, .. }
            | EngineError::DataShape { context, .. }
            | EngineError::Persistence { context, .. } => context,
        }
    }

    /// Stage that produced this error
    pub fn stage(&self) -> PipelineStage {
        self.context().stage
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration { .. })
    }

    pub fn is_data_shape(&self) -> bool {
        matches!(self, EngineError::DataShape { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, EngineError::Persistence { .. })
    }

    /// Attach a key/value detail to the error context
    pub fn with_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        match &mut self {
            EngineError::Configuration { context, .. }
            | EngineError::DataShape { context, .. }
            | EngineError::Persistence { context, .. } => {
                context.additional_info.insert(key.into(), value.into());
            }
        }
        self
    }
}

/// Builder for [`EngineError`] values scoped to one stage and operation
pub struct EngineErrorBuilder {
    stage: PipelineStage,
    operation: String,
}

impl EngineErrorBuilder {
    pub fn new(stage: PipelineStage, operation: &str) -> Self {
        Self {
            stage,
            operation: operation.to_string(),
        }
    }

    pub fn configuration(self, reason: impl Into<String>) -> EngineError {
        EngineError::Configuration {
            reason: reason.into(),
            context: ErrorContext::new(self.stage, &self.operation),
        }
    }

    pub fn data_shape(self, input: impl Into<String>, reason: impl Into<String>) -> EngineError {
        EngineError::DataShape {
            input: input.into(),
            reason: reason.into(),
            context: ErrorContext::new(self.stage, &self.operation),
        }
    }

    pub fn persistence(self, path: &Path, reason: impl Into<String>) -> EngineError {
        EngineError::Persistence {
            path: path.to_path_buf(),
            reason: reason.into(),
            context: ErrorContext::new(self.stage, &self.operation),
        }
    }
}

/// Convenience trait for mapping foreign errors onto [`EngineError::Persistence`]
pub trait IntoEngineError<T> {
    fn engine_err(self, path: &Path, operation: &str) -> EngineResult<T>;
}

impl<T, E> IntoEngineError<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn engine_err(self, path: &Path, operation: &str) -> EngineResult<T> {
        self.map_err(|err| {
            EngineErrorBuilder::new(PipelineStage::Persistence, operation)
                .persistence(path, err.to_string())
        })
    }
}
