//! Engine health driver: generate a corpus, train the classifier, score it
//!
//! Usage: engine-health [--config pipeline.toml] <generate|train|run> [OPTIONS]

use clap::{Args, Parser, Subcommand};
use engine_health::config::paths::{DEFAULT_DATA_DIR, HEALTH_INDEX_FILE};
use engine_health::error::{EngineErrorBuilder, IntoEngineError};
use engine_health::{persistence, ConfigLoader, Corpus, EngineResult, HealthPipeline, PipelineOutcome, PipelineStage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "engine-health")]
#[command(version, about = "Synthetic rocket engine telemetry and health index estimation", long_about = None)]
struct Cli {
    /// TOML configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the labeled corpus and save one CSV per run
    Generate {
        /// Output directory for run files
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        output: PathBuf,
    },
    /// Train on saved runs and write the health index
    Train(TrainArgs),
    /// Generate, save, train and score in one go
    Run(TrainArgs),
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Directory holding run files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data: PathBuf,

    /// Health-index output file, defaults to <data>/health_index.csv
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write the validation report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false));
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging was already initialized");
    }
}

fn report_outcome(outcome: &PipelineOutcome, args: &TrainArgs) -> EngineResult<()> {
    println!("{}", outcome.report);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.data.join(HEALTH_INDEX_FILE));
    persistence::write_health_index(&output, &outcome.health)?;

    if let Some(path) = &args.report_json {
        let json = outcome.report.to_json()?;
        std::fs::write(path, json).engine_err(path, "write_report")?;
        info!("Wrote validation report to {}", path.display());
    }

    for (label, health) in outcome.health.summary_by_label() {
        info!("{:>20}: mean health index {:.3}", label, health);
    }
    let alerts = outcome.alerts();
    if alerts.is_empty() {
        info!("No rows below the alert threshold {}", outcome.alert_threshold());
    } else {
        warn!(
            "{} of {} rows below the alert threshold {}",
            alerts.len(),
            outcome.health.len(),
            outcome.alert_threshold()
        );
    }
    Ok(())
}

fn generate(pipeline: &HealthPipeline, output: &Path) -> EngineResult<Corpus> {
    if output.is_dir() {
        let existing = persistence::run_files(output)?;
        if !existing.is_empty() {
            warn!(
                "{} already holds {} run files; files not overwritten now stay in place and will be read by a later `train`",
                output.display(),
                existing.len()
            );
        }
    }

    let corpus = pipeline.generate_corpus(&mut StdRng::from_entropy())?;
    persistence::save_corpus(output, &corpus)?;
    Ok(corpus)
}

fn train(pipeline: &HealthPipeline, args: &TrainArgs) -> EngineResult<()> {
    let corpus = persistence::load_corpus_dir(&args.data)?;
    let outcome = pipeline.train_and_score(&corpus)?;
    report_outcome(&outcome, args)
}

/// Generate, save, then train on exactly the runs just generated
fn generate_and_train(pipeline: &HealthPipeline, args: &TrainArgs) -> EngineResult<()> {
    let corpus = generate(pipeline, &args.data)?;
    let outcome = pipeline.train_and_score(&corpus)?;
    report_outcome(&outcome, args)
}

fn execute(cli: &Cli) -> EngineResult<()> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    if let Command::ShowConfig = cli.command {
        let rendered = toml::to_string_pretty(&config).map_err(|err| {
            EngineErrorBuilder::new(PipelineStage::Configuration, "show_config").configuration(err.to_string())
        })?;
        println!("{}", rendered);
        return Ok(());
    }

    let pipeline = HealthPipeline::new(config)?;
    match &cli.command {
        Command::Generate { output } => generate(&pipeline, output).map(|_| ()),
        Command::Train(args) => train(&pipeline, args),
        Command::Run(args) => generate_and_train(&pipeline, args),
        Command::ShowConfig => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let context = err.context();
            error!(stage = %context.stage, operation = %context.operation, "{}", err);
            ExitCode::FAILURE
        }
    }
}
