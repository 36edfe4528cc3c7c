//! Rolling-window feature extraction
//!
//! Each telemetry channel contributes two features per row: the trailing
//! rolling mean and the rolling sample standard deviation over `window`
//! samples. Window state lives per channel and is reset at every run
//! boundary, so no feature row ever mixes samples from two runs. Rows whose
//! window is not yet full are never emitted, which keeps `time` and `label`
//! aligned with the features they describe.

use crate::config::features::MIN_WINDOW;
use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use crate::processing::windowing::RollingWindow;
use crate::simulation::{Channel, Corpus, Label, Run, CHANNEL_COUNT};
use ndarray::Array2;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Number of features per row: mean and std for every channel
pub const FEATURE_COUNT: usize = 2 * CHANNEL_COUNT;

/// Feature column names, `<channel>_mean` then `<channel>_std` per channel
pub fn feature_names() -> Vec<String> {
    Channel::ALL
        .iter()
        .flat_map(|channel| [format!("{}_mean", channel), format!("{}_std", channel)])
        .collect()
}

/// One fully-populated feature row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    /// Index of the source run within the corpus
    pub run: usize,
    pub time: f64,
    pub label: Label,
    pub features: [f64; FEATURE_COUNT],
}

impl FeatureRow {
    pub fn mean(&self, channel: Channel) -> f64 {
        self.features[2 * channel.index()]
    }

    pub fn std(&self, channel: Channel) -> f64 {
        self.features[2 * channel.index() + 1]
    }
}

/// Feature rows of a whole corpus, in corpus order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    window: usize,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn builder(window: usize) -> FeatureTableBuilder {
        FeatureTableBuilder::new(window)
    }

    /// Window the features were computed with
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct labels present in the table
    pub fn labels(&self) -> BTreeSet<Label> {
        self.rows.iter().map(|row| row.label).collect()
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.rows.iter().any(|row| row.label == label)
    }

    /// Feature matrix with one row per feature row and [`FEATURE_COUNT`] columns
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.rows.len(), FEATURE_COUNT));
        for (mut target, row) in matrix.rows_mut().into_iter().zip(&self.rows) {
            for (cell, &value) in target.iter_mut().zip(row.features.iter()) {
                *cell = value;
            }
        }
        matrix
    }
}

/// Accumulates feature rows run by run
///
/// Call [`FeatureTableBuilder::begin_run`] before the first sample of every
/// run; it clears the per-channel window state.
pub struct FeatureTableBuilder {
    window: usize,
    channels: [RollingWindow; CHANNEL_COUNT],
    current_run: usize,
    rows: Vec<FeatureRow>,
    undefined: usize,
}

impl FeatureTableBuilder {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            channels: std::array::from_fn(|_| RollingWindow::new(window)),
            current_run: 0,
            rows: Vec::new(),
            undefined: 0,
        }
    }

    pub fn begin_run(&mut self, run: usize) {
        self.current_run = run;
        for channel in &mut self.channels {
            channel.reset();
        }
    }

    /// Feed one raw sample; emits a row once every channel window is full
    ///
    /// A row with any non-finite feature (a NaN or infinite sample inside one
    /// of the windows) is dropped and counted in [`Self::undefined_rows`].
    pub fn push_sample(&mut self, time: f64, label: Label, values: &[f64; CHANNEL_COUNT]) {
        let mut features = [0.0; FEATURE_COUNT];
        let mut complete = true;
        let mut defined = true;

        for (index, (window, &value)) in self.channels.iter_mut().zip(values.iter()).enumerate() {
            window.push(value);
            match window.stats() {
                Some(stats) => {
                    defined &= stats.mean.is_finite() && stats.std.is_finite();
                    features[2 * index] = stats.mean;
                    features[2 * index + 1] = stats.std;
                }
                None => complete = false,
            }
        }

        if complete && !defined {
            self.undefined += 1;
        } else if complete {
            self.rows.push(FeatureRow {
                run: self.current_run,
                time,
                label,
                features,
            });
        }
    }

    /// Full-window rows dropped so far because a feature was undefined
    pub fn undefined_rows(&self) -> usize {
        self.undefined
    }

    pub fn build(self) -> FeatureTable {
        FeatureTable {
            window: self.window,
            rows: self.rows,
        }
    }
}

/// Rolling feature extractor
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    window: usize,
}

impl FeatureExtractor {
    pub fn new(window: usize) -> EngineResult<Self> {
        if window < MIN_WINDOW {
            return Err(EngineErrorBuilder::new(PipelineStage::FeatureExtraction, "new")
                .configuration(format!(
                    "rolling window must be at least {}, got {}",
                    MIN_WINDOW, window
                )));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Extract the feature table of a corpus
    pub fn extract(&self, corpus: &Corpus) -> EngineResult<FeatureTable> {
        self.extract_runs(corpus.runs())
    }

    /// Extract features run by run; runs shorter than the window yield no rows
    pub fn extract_runs(&self, runs: &[Run]) -> EngineResult<FeatureTable> {
        if runs.iter().all(Run::is_empty) {
            return Err(EngineErrorBuilder::new(PipelineStage::FeatureExtraction, "extract")
                .configuration("corpus contains no samples"));
        }

        let mut builder = FeatureTable::builder(self.window);
        for (index, run) in runs.iter().enumerate() {
            if run.len() < self.window {
                warn!(
                    "Run {} ({}) has {} samples, fewer than the window of {}; it yields no features",
                    index,
                    run.label(),
                    run.len(),
                    self.window
                );
            }

            builder.begin_run(index);
            for (i, &time) in run.time().iter().enumerate() {
                builder.push_sample(time, run.label(), &run.sample(i));
            }
        }

        if builder.undefined_rows() > 0 {
            warn!(
                "Dropped {} feature rows with undefined values (non-finite samples)",
                builder.undefined_rows()
            );
        }
        let table = builder.build();
        info!(
            "Extracted {} feature rows from {} runs (window {})",
            table.len(),
            runs.len(),
            self.window
        );
        Ok(table)
    }
}
