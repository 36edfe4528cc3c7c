// src/pipeline.rs
//! End-to-end health pipeline: corpus -> features -> classifier -> health index

use crate::config::PipelineConfig;
use crate::error::EngineResult;
use crate::ml::{ClassificationReport, HealthClassifier, HealthIndexRow, HealthIndexTable, TrainedHealthModel};
use crate::processing::{FeatureExtractor, FeatureTable};
use crate::simulation::{Corpus, RunCorpusBuilder};
use rand::Rng;
use std::time::Instant;
use tracing::info;

/// Runs the stages in strict sequence with one validated configuration
pub struct HealthPipeline {
    config: PipelineConfig,
}

/// Everything produced by one training + scoring pass
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub features: FeatureTable,
    pub model: TrainedHealthModel,
    pub report: ClassificationReport,
    pub health: HealthIndexTable,
    alert_threshold: f64,
}

impl HealthPipeline {
    pub fn new(config: PipelineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Synthesize the labeled corpus; noise comes from `rng`
    pub fn generate_corpus<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<Corpus> {
        RunCorpusBuilder::new(self.config.simulation.clone()).build(rng)
    }

    pub fn extract_features(&self, corpus: &Corpus) -> EngineResult<FeatureTable> {
        FeatureExtractor::new(self.config.features.window)?.extract(corpus)
    }

    /// Extract features, train on them and score the full table
    pub fn train_and_score(&self, corpus: &Corpus) -> EngineResult<PipelineOutcome> {
        let started = Instant::now();
        let features = self.extract_features(corpus)?;

        let classifier = HealthClassifier::new(self.config.classifier.clone());
        let (model, report) = classifier.train(&features)?;
        let health = HealthClassifier::score(&model, &features)?;

        info!(
            "Pipeline finished in {:.2?}: {} feature rows scored",
            started.elapsed(),
            health.len()
        );
        Ok(PipelineOutcome {
            features,
            model,
            report,
            health,
            alert_threshold: self.config.reporting.alert_threshold,
        })
    }
}

impl PipelineOutcome {
    /// Rows below the configured alert threshold
    pub fn alerts(&self) -> Vec<&HealthIndexRow> {
        self.health.alerts(self.alert_threshold)
    }

    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }
}
