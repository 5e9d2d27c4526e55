//! Orchestrator: trains every configured model in turn and normalizes the
//! metrics each run leaves behind.
//!
//! Runs are strictly sequential and share one output directory. The first
//! failure aborts the pass; later model configs are not attempted.

use std::path::PathBuf;

use dtrain_core::config::{Config, DataConfig};
use dtrain_core::dataset::{register_coco, TRAIN_DATASET, VAL_DATASET};
use dtrain_core::{clean_run, Device, Error, LogSchema, ModelDefinition, Result, RunConfig};

use crate::Trainer;

/// Everything one training pass needs, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct Plan {
    pub data: DataConfig,
    pub output_dir: PathBuf,
    pub metrics_dir: PathBuf,
    pub model_configs: Vec<PathBuf>,
    pub device: Device,
    pub schema: LogSchema,
}

impl Plan {
    /// Validate `cfg` and fix the device runs will use.
    pub fn from_config(cfg: &Config, device: Device) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            data: cfg.data.clone(),
            output_dir: cfg.run.output_dir.clone(),
            metrics_dir: cfg.run.metrics_dir.clone(),
            model_configs: cfg.run.model_configs.clone(),
            device,
            schema: cfg.metrics.schema()?,
        })
    }
}

/// Result of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub model_name: String,
    pub report_path: PathBuf,
    pub records: usize,
}

pub struct Orchestrator<T> {
    trainer: T,
}

impl<T: Trainer> Orchestrator<T> {
    pub fn new(trainer: T) -> Self {
        Self { trainer }
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Register the datasets once, then train and clean up every model config
    /// in order.
    pub async fn run(&self, plan: &Plan) -> Result<Vec<RunSummary>> {
        let train = register_coco(
            TRAIN_DATASET,
            &plan.data.train_images(),
            &plan.data.train_annotations_path(),
        )?;
        let val = register_coco(
            VAL_DATASET,
            &plan.data.val_images(),
            &plan.data.val_annotations_path(),
        )?;

        let total = plan.model_configs.len();
        let mut summaries = Vec::with_capacity(total);
        for (idx, config_path) in plan.model_configs.iter().enumerate() {
            let model = ModelDefinition::load(config_path)?;
            tracing::info!(run = idx + 1, total, model = model.name(), "starting run");

            let run = RunConfig::new(&model, train.clone(), val.clone(), &plan.output_dir, plan.device)?;
            if run.metrics_log().exists() {
                tracing::warn!(
                    log = %run.metrics_log().display(),
                    "output directory already holds a metrics log; the trainer may append to it"
                );
            }

            self.trainer.train(&run).await?;

            if !run.metrics_log().is_file() {
                return Err(Error::Training {
                    model: model.name().to_string(),
                    reason: format!("trainer left no metrics log at {}", run.metrics_log().display()),
                });
            }

            let normalized = clean_run(run.output_dir(), &plan.metrics_dir, model.name(), &plan.schema)?;
            summaries.push(RunSummary {
                model_name: model.name().to_string(),
                report_path: normalized.report_path,
                records: normalized.records,
            });
        }
        tracing::info!(runs = summaries.len(), "training pass complete");
        Ok(summaries)
    }
}
