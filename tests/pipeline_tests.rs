//! End-to-end pipeline tests on the default corpus layout

use engine_health::config::{ClassifierSettings, PipelineConfig};
use engine_health::ml::HealthClassifier;
use engine_health::processing::FeatureExtractor;
use engine_health::simulation::{Corpus, Label, RunCorpusBuilder};
use engine_health::{HealthPipeline, PipelineStage};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn default_corpus(seed: u64) -> Corpus {
    let config = PipelineConfig::default();
    RunCorpusBuilder::new(config.simulation)
        .build(&mut StdRng::seed_from_u64(seed))
        .unwrap()
}

fn pipeline(n_estimators: usize) -> HealthPipeline {
    let config = PipelineConfig {
        classifier: ClassifierSettings {
            n_estimators,
            ..Default::default()
        },
        ..Default::default()
    };
    HealthPipeline::new(config).unwrap()
}

#[test]
fn test_end_to_end_default_scenario() {
    let corpus = default_corpus(2024);
    assert_eq!(corpus.len(), 15);

    let config = PipelineConfig::default();
    assert_eq!(config.classifier.n_estimators, 200);
    let outcome = HealthPipeline::new(config).unwrap().train_and_score(&corpus).unwrap();

    // 15 runs of 300 samples, 9 warm-up rows dropped per run
    assert_eq!(outcome.features.len(), 15 * 291);
    assert_eq!(outcome.health.len(), outcome.features.len());

    assert_eq!(outcome.report.classes.len(), 7);
    for label in Label::all() {
        let metrics = outcome.report.class(label).unwrap();
        assert!(metrics.support > 0, "{} has no validation rows", label);
        assert!(metrics.precision > 0.0, "{} precision is zero", label);
        assert!(metrics.recall > 0.0, "{} recall is zero", label);
    }

    for (row, health) in outcome.features.rows().iter().zip(outcome.health.rows()) {
        assert_eq!(row.time, health.time);
        assert_eq!(row.label, health.label);
        assert!((0.0..=1.0).contains(&health.health_index));
    }
}

#[test]
fn test_normal_rows_score_healthier_than_faults() {
    let corpus = default_corpus(77);
    let outcome = pipeline(60).train_and_score(&corpus).unwrap();

    let summary = outcome.health.summary_by_label();
    let normal = summary[&Label::Normal];
    let faulty: Vec<f64> = summary
        .iter()
        .filter(|(label, _)| !label.is_normal())
        .map(|(_, &health)| health)
        .collect();
    let faulty_mean = faulty.iter().sum::<f64>() / faulty.len() as f64;

    assert_eq!(faulty.len(), 6);
    assert!(
        normal > faulty_mean + 0.3,
        "normal mean {} not clearly above fault mean {}",
        normal,
        faulty_mean
    );
    assert!(!outcome.alerts().is_empty());
}

#[test]
fn test_training_without_normal_fails_before_fit() {
    let corpus = default_corpus(5);
    let faulty_only = Corpus::from_runs(
        corpus
            .into_runs()
            .into_iter()
            .filter(|run| !run.label().is_normal())
            .collect(),
    );
    let features = FeatureExtractor::new(10).unwrap().extract(&faulty_only).unwrap();

    let err = HealthClassifier::new(ClassifierSettings::default())
        .train(&features)
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.stage(), PipelineStage::Training);
}

#[test]
fn test_scoring_requires_matching_window() {
    let corpus = default_corpus(9);
    let classifier = HealthClassifier::new(ClassifierSettings {
        n_estimators: 5,
        ..Default::default()
    });

    let train_features = FeatureExtractor::new(10).unwrap().extract(&corpus).unwrap();
    let (model, _) = classifier.train(&train_features).unwrap();

    let other = FeatureExtractor::new(5).unwrap().extract(&corpus).unwrap();
    let err = HealthClassifier::score(&model, &other).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.stage(), PipelineStage::Scoring);
}

#[test]
fn test_training_is_reproducible_for_a_fixed_seed() {
    let corpus = default_corpus(31);
    let features = FeatureExtractor::new(10).unwrap().extract(&corpus).unwrap();
    let classifier = HealthClassifier::new(ClassifierSettings {
        n_estimators: 8,
        ..Default::default()
    });

    let (model_a, report_a) = classifier.train(&features).unwrap();
    let (model_b, report_b) = classifier.train(&features).unwrap();
    assert_eq!(report_a, report_b);
    assert_eq!(
        model_a.score(&features).unwrap(),
        model_b.score(&features).unwrap()
    );
}
