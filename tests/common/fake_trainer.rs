//! Fake trainers that stand in for the external training procedure.
//!
//! [`FakeTrainer`] records every [`RunConfig`] it receives and writes a
//! scripted metrics log into the run's output directory, so harnesses can
//! drive the orchestrator end to end without a training framework.

use std::collections::HashMap;
use std::sync::Mutex;

use dtrain_core::{Error, Result, RunConfig};
use dtrain_runner::Trainer;

/// What the fake does when asked to train a given model.
#[derive(Debug, Clone)]
pub enum Script {
    /// Write this text as `metrics.json`.
    Log(String),
    /// Exit successfully without writing a metrics log.
    NoLog,
    /// Fail with a training error carrying this reason.
    Fail(String),
}

pub struct FakeTrainer {
    scripts: HashMap<String, Script>,
    default: Script,
    seen: Mutex<Vec<RunConfig>>,
}

impl FakeTrainer {
    /// Every model writes `log`.
    pub fn writing(log: &str) -> Self {
        Self {
            scripts: HashMap::new(),
            default: Script::Log(log.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Override the behaviour for one model name.
    pub fn on(mut self, model: &str, script: Script) -> Self {
        self.scripts.insert(model.to_string(), script);
        self
    }

    /// Runs received so far, in order.
    pub fn seen(&self) -> Vec<RunConfig> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_models(&self) -> Vec<String> {
        self.seen()
            .iter()
            .map(|r| r.model_name().to_string())
            .collect()
    }
}

impl Trainer for FakeTrainer {
    async fn train(&self, run: &RunConfig) -> Result<()> {
        self.seen.lock().unwrap().push(run.clone());
        let script = self
            .scripts
            .get(run.model_name())
            .unwrap_or(&self.default)
            .clone();
        match script {
            Script::Log(text) => {
                assert!(run.output_dir().is_dir(), "output dir must exist before training");
                std::fs::write(run.metrics_log(), text).unwrap();
                Ok(())
            }
            Script::NoLog => Ok(()),
            Script::Fail(reason) => Err(Error::Training {
                model: run.model_name().to_string(),
                reason,
            }),
        }
    }
}
