// src/ml/health.rs
//! Health classifier and health-index scoring
//!
//! The health index of a feature row is the forest's probability that the
//! row belongs to the `normal` class. Training refuses tables without any
//! normal rows since the index is undefined without that reference class.

use super::forest::{ForestConfig, RandomForest};
use super::metrics::ClassificationReport;
use super::split::stratified_split;
use crate::config::ClassifierSettings;
use crate::error::{EngineErrorBuilder, EngineResult, PipelineStage};
use crate::processing::FeatureTable;
use crate::simulation::Label;
use ndarray::Axis;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Trains the random forest behind the health index
#[derive(Debug, Clone, Default)]
pub struct HealthClassifier {
    settings: ClassifierSettings,
}

/// Fitted forest plus what it needs to score new tables consistently
#[derive(Debug, Clone)]
pub struct TrainedHealthModel {
    forest: RandomForest,
    classes: Vec<Label>,
    reference: usize,
    window: usize,
}

/// Health index of one feature row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthIndexRow {
    pub time: f64,
    pub health_index: f64,
    pub label: Label,
}

/// Health index over a whole feature table, in table order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthIndexTable {
    rows: Vec<HealthIndexRow>,
}

impl HealthClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Fit on a stratified training partition and report on the validation one
    pub fn train(&self, table: &FeatureTable) -> EngineResult<(TrainedHealthModel, ClassificationReport)> {
        let builder = || EngineErrorBuilder::new(PipelineStage::Training, "train");

        if table.is_empty() {
            return Err(builder().configuration("feature table is empty"));
        }
        if !table.contains_label(Label::Normal) {
            return Err(builder()
                .configuration(format!(
                    "no '{}' rows to use as the health reference class",
                    Label::Normal
                ))
                .with_info("labels", join_labels(table.labels())));
        }

        let classes: Vec<Label> = table.labels().into_iter().collect();
        let reference = classes
            .iter()
            .position(|label| label.is_normal())
            .ok_or_else(|| builder().configuration("normal class missing from label set"))?;
        let class_index: BTreeMap<Label, usize> =
            classes.iter().enumerate().map(|(i, &label)| (label, i)).collect();
        let y: Vec<usize> = table.rows().iter().map(|row| class_index[&row.label]).collect();

        let split = stratified_split(&y, self.settings.validation_fraction, self.settings.seed);
        let x = table.to_matrix();
        let x_train = x.select(Axis(0), &split.train);
        let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();

        info!(
            "Training forest: {} trees, {} training rows, {} validation rows, {} classes",
            self.settings.n_estimators,
            split.train.len(),
            split.validation.len(),
            classes.len()
        );

        let config = ForestConfig {
            n_estimators: self.settings.n_estimators,
            max_depth: self.settings.max_depth,
            max_features: None,
            bootstrap: true,
            seed: self.settings.seed,
        };
        let forest = RandomForest::fit(x_train.view(), &y_train, classes.len(), &config)?;

        let x_validation = x.select(Axis(0), &split.validation);
        let y_validation: Vec<usize> = split.validation.iter().map(|&i| y[i]).collect();
        let predicted = if split.validation.is_empty() {
            Vec::new()
        } else {
            forest.predict(x_validation.view())?
        };
        let report = ClassificationReport::from_predictions(&y_validation, &predicted, &classes);
        info!(
            "Validation accuracy {:.3}, macro F1 {:.3}",
            report.accuracy, report.macro_avg.f1
        );

        let model = TrainedHealthModel {
            forest,
            classes,
            reference,
            window: table.window(),
        };
        Ok((model, report))
    }

    /// Health index for every row of `table`
    pub fn score(model: &TrainedHealthModel, table: &FeatureTable) -> EngineResult<HealthIndexTable> {
        model.score(table)
    }
}

fn join_labels(labels: impl IntoIterator<Item = Label>) -> String {
    labels
        .into_iter()
        .map(|label| label.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl TrainedHealthModel {
    /// Classes in forest column order
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    /// Rolling window of the training features
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Probability of `normal` for every row, paired with time and label
    pub fn score(&self, table: &FeatureTable) -> EngineResult<HealthIndexTable> {
        let builder = || EngineErrorBuilder::new(PipelineStage::Scoring, "score");

        if table.window() != self.window {
            return Err(builder().configuration(format!(
                "feature table uses window {} but the model was trained with window {}",
                table.window(),
                self.window
            )));
        }
        if table.is_empty() {
            return Err(builder().configuration("feature table is empty"));
        }

        let proba = self.forest.predict_proba(table.to_matrix().view())?;
        let rows = table
            .rows()
            .iter()
            .zip(proba.column(self.reference))
            .map(|(row, &p)| HealthIndexRow {
                time: row.time,
                health_index: p.clamp(0.0, 1.0),
                label: row.label,
            })
            .collect::<Vec<_>>();

        debug!("Scored {} rows", rows.len());
        Ok(HealthIndexTable { rows })
    }

    /// Most probable label for every row
    pub fn predict_labels(&self, table: &FeatureTable) -> EngineResult<Vec<Label>> {
        let predicted = self.forest.predict(table.to_matrix().view())?;
        Ok(predicted.into_iter().map(|class| self.classes[class]).collect())
    }
}

impl HealthIndexTable {
    pub fn from_rows(rows: Vec<HealthIndexRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[HealthIndexRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose health index falls below `threshold`
    pub fn alerts(&self, threshold: f64) -> Vec<&HealthIndexRow> {
        self.rows.iter().filter(|row| row.health_index < threshold).collect()
    }

    /// Mean health index per ground-truth label
    pub fn summary_by_label(&self) -> BTreeMap<Label, f64> {
        let mut sums: BTreeMap<Label, (f64, usize)> = BTreeMap::new();
        for row in &self.rows {
            let entry = sums.entry(row.label).or_insert((0.0, 0));
            entry.0 += row.health_index;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(label, (sum, count))| (label, sum / count as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{FaultKind, CHANNEL_COUNT};

    /// Two well separated regimes over `n` samples each, in one run per label
    fn table(window: usize, labels: &[Label], n: usize) -> FeatureTable {
        let mut builder = FeatureTable::builder(window);
        for (run, &label) in labels.iter().enumerate() {
            builder.begin_run(run);
            let level = if label.is_normal() { 0.0 } else { 100.0 };
            for i in 0..n {
                let wobble = (i % 3) as f64;
                let values: [f64; CHANNEL_COUNT] = std::array::from_fn(|c| level + c as f64 + wobble);
                builder.push_sample(i as f64, label, &values);
            }
        }
        builder.build()
    }

    fn classifier() -> HealthClassifier {
        HealthClassifier::new(ClassifierSettings {
            n_estimators: 15,
            ..Default::default()
        })
    }

    #[test]
    fn test_train_and_score() {
        let labels = [Label::Normal, Label::Fault(FaultKind::TempRise)];
        let features = table(3, &labels, 40);
        let (model, report) = classifier().train(&features).unwrap();

        assert_eq!(model.classes(), &labels);
        assert_eq!(model.window(), 3);
        assert_eq!(report.accuracy, 1.0);

        let health = HealthClassifier::score(&model, &features).unwrap();
        assert_eq!(health.len(), features.len());
        let summary = health.summary_by_label();
        assert!(summary[&Label::Normal] > 0.9);
        assert!(summary[&Label::Fault(FaultKind::TempRise)] < 0.1);
        assert_eq!(health.alerts(0.7).len(), 38);
        assert!(health.rows().iter().all(|r| (0.0..=1.0).contains(&r.health_index)));
    }

    #[test]
    fn test_missing_normal_rejected() {
        let features = table(3, &[Label::Fault(FaultKind::FuelLeak)], 20);
        let err = classifier().train(&features).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.stage(), PipelineStage::Training);
        assert!(err.to_string().contains("normal"));
    }

    #[test]
    fn test_empty_table_rejected() {
        let features = FeatureTable::builder(3).build();
        assert!(classifier().train(&features).unwrap_err().is_configuration());
    }

    #[test]
    fn test_window_mismatch_rejected() {
        let labels = [Label::Normal, Label::Fault(FaultKind::FuelLeak)];
        let (model, _) = classifier().train(&table(3, &labels, 20)).unwrap();
        let err = model.score(&table(4, &labels, 20)).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.stage(), PipelineStage::Scoring);
    }

    #[test]
    fn test_predict_labels() {
        let labels = [Label::Normal, Label::Fault(FaultKind::BearingOverheat)];
        let features = table(2, &labels, 30);
        let (model, _) = classifier().train(&features).unwrap();
        let predicted = model.predict_labels(&features).unwrap();
        let expected: Vec<Label> = features.rows().iter().map(|r| r.label).collect();
        assert_eq!(predicted, expected);
    }
}
