// src/simulation/corpus.rs
//! Labeled training corpus assembly

use super::fault_model::{FaultKind, FaultModel};
use super::signal_model::SignalModel;
use super::types::{Label, Run, CHANNEL_COUNT};
use crate::config::SimulationSettings;
use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::info;

/// A collection of independently generated runs
///
/// Runs keep their own sample order; the order of runs within the corpus
/// carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    runs: Vec<Run>,
}

/// One row of the concatenated corpus table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusRow {
    pub run: usize,
    pub time: f64,
    pub channels: [f64; CHANNEL_COUNT],
    pub label: Label,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    pub fn push(&mut self, run: Run) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<Run> {
        self.runs
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of samples across all runs
    pub fn total_samples(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    /// Runs per label
    pub fn label_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts = BTreeMap::new();
        for run in &self.runs {
            *counts.entry(run.label()).or_insert(0) += 1;
        }
        counts
    }

    /// Row-wise view of the concatenated runs
    pub fn rows(&self) -> impl Iterator<Item = CorpusRow> + '_ {
        self.runs.iter().enumerate().flat_map(|(run_index, run)| {
            (0..run.len()).map(move |i| CorpusRow {
                run: run_index,
                time: run.time()[i],
                channels: run.sample(i),
                label: run.label(),
            })
        })
    }
}

/// Builds the nominal + faulty training corpus
pub struct RunCorpusBuilder {
    settings: SimulationSettings,
    signal_model: SignalModel,
    fault_model: FaultModel,
}

impl RunCorpusBuilder {
    pub fn new(settings: SimulationSettings) -> Self {
        Self::with_signal_model(settings, SignalModel::default())
    }

    pub fn with_signal_model(settings: SimulationSettings, signal_model: SignalModel) -> Self {
        Self {
            settings,
            fault_model: FaultModel::new(signal_model.clone()),
            signal_model,
        }
    }

    /// Generate `nominal_runs` nominal runs followed by `runs_per_fault`
    /// runs of every fault kind, each with its own noise draws from `rng`
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> EngineResult<Corpus> {
        let time = SignalModel::generate_time_axis(
            self.settings.run_duration_s,
            self.settings.sample_rate_hz,
        )?;
        if time.is_empty() {
            return Err(EngineErrorBuilder::new(PipelineStage::CorpusBuilding, "build")
                .configuration("run duration and sample rate yield zero samples per run"));
        }

        let mut corpus = Corpus::new();
        for _ in 0..self.settings.nominal_runs {
            corpus.push(self.signal_model.generate_nominal(&time, rng)?);
        }
        for fault in FaultKind::ALL {
            for _ in 0..self.settings.runs_per_fault {
                corpus.push(self.fault_model.faulty_run(&time, fault, rng)?);
            }
        }

        info!(
            "Generated corpus: {} runs ({} nominal, {} per fault), {} samples each",
            corpus.len(),
            self.settings.nominal_runs,
            self.settings.runs_per_fault,
            time.len()
        );
        Ok(corpus)
    }
}
