//! dtrain: object-detection training orchestrator.
//!
//! Trains each configured model through an external trainer, then rewrites
//! the trainer's line-oriented metrics log as a single JSON report per model.
//! The CLI lives here rather than in `main.rs` so integration tests can parse
//! arguments and dispatch commands directly.
//!
//! # Architecture
//!
//! ```text
//! CLI ──► Config ──► Orchestrator ──► Trainer ──► Normalizer
//!                    (dtrain-runner)              (dtrain-core)
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use dtrain_core::config::Config;
use dtrain_core::{clean_run, DeviceSelector};
use dtrain_runner::{resolve_device, CommandTrainer, NvidiaProbe, Orchestrator, Plan};

#[derive(Parser, Debug)]
#[command(name = "dtrain", about = "Train object detectors and clean their metrics logs")]
pub struct Cli {
    /// Config file. Defaults to ./dtrain.toml when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train every model config in turn and write its cleaned metrics report.
    Train(TrainArgs),
    /// Clean the metrics log of a finished run and remove its output directory.
    Clean(CleanArgs),
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// Working directory for trainer output.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory cleaned reports are written to.
    #[arg(long)]
    pub metrics_dir: Option<PathBuf>,

    /// auto, cpu or cuda.
    #[arg(long)]
    pub device: Option<DeviceSelector>,

    /// Trainer program to run for each model.
    #[arg(long)]
    pub trainer: Option<PathBuf>,

    /// Model config files. Replaces run.model_configs when given.
    pub model_configs: Vec<PathBuf>,
}

impl TrainArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(dir) = &self.output_dir {
            cfg.run.output_dir = dir.clone();
        }
        if let Some(dir) = &self.metrics_dir {
            cfg.run.metrics_dir = dir.clone();
        }
        if let Some(device) = self.device {
            cfg.run.device = device;
        }
        if let Some(program) = &self.trainer {
            cfg.trainer.program = program.clone();
        }
        if !self.model_configs.is_empty() {
            cfg.run.model_configs = self.model_configs.clone();
        }
    }
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Run output directory holding metrics.json. Deleted afterwards.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Directory the cleaned report is written to.
    #[arg(long)]
    pub metrics_dir: PathBuf,

    /// Model name used for the report file name.
    #[arg(long)]
    pub model_name: String,
}

/// Install the global tracing subscriber.
pub fn init_tracing(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" })
    });

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}

/// Attach the failed stage to a library error for the exit diagnostic.
fn staged(err: dtrain_core::Error) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("{stage} stage failed"))
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::load(cli.config.as_deref()).map_err(staged)?;
    match cli.command {
        Command::Train(args) => train(&args, cfg).await,
        Command::Clean(args) => clean(&args, &cfg),
    }
}

async fn train(args: &TrainArgs, mut cfg: Config) -> anyhow::Result<()> {
    args.apply(&mut cfg);
    let device = resolve_device(cfg.run.device, &NvidiaProbe::from_env());
    let plan = Plan::from_config(&cfg, device).map_err(staged)?;

    let orchestrator = Orchestrator::new(CommandTrainer::from_config(&cfg.trainer));
    let summaries = orchestrator.run(&plan).await.map_err(staged)?;
    for summary in &summaries {
        println!(
            "{}\t{}\t{}",
            summary.model_name,
            summary.records,
            summary.report_path.display()
        );
    }
    Ok(())
}

fn clean(args: &CleanArgs, cfg: &Config) -> anyhow::Result<()> {
    let schema = cfg.metrics.schema().map_err(staged)?;
    let normalized = clean_run(&args.output_dir, &args.metrics_dir, &args.model_name, &schema)
        .map_err(staged)?;
    println!(
        "{}\t{}\t{}",
        args.model_name,
        normalized.records,
        normalized.report_path.display()
    );
    Ok(())
}
