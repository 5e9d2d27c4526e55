//! Trainer backed by an external program.
//!
//! The run configuration is written to `<output_dir>/run_config.json` and the
//! program is started as `<program> <args...> --run-config <path>`. Its
//! stdout (at `info`) and stderr (at `warn`) are forwarded line by line into
//! `tracing` under the `trainer` target.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use dtrain_core::config::TrainerConfig;
use dtrain_core::{Error, Result, RunConfig};

use crate::Trainer;

/// File the serialized [`RunConfig`] is handed over in.
pub const RUN_CONFIG_FILE: &str = "run_config.json";

/// How long to keep reading trainer output after the trainer has exited.
/// A background process it left behind may hold the pipes open.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Trainer output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    const fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    const fn level(self) -> tracing::Level {
        match self {
            Self::Stdout => tracing::Level::INFO,
            Self::Stderr => tracing::Level::WARN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandTrainer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTrainer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(cfg: &TrainerConfig) -> Self {
        Self::new(&cfg.program, cfg.args.clone())
    }

    fn write_run_config(run: &RunConfig) -> Result<PathBuf> {
        let path = run.output_dir().join(RUN_CONFIG_FILE);
        let json = serde_json::to_vec_pretty(run).map_err(|e| Error::io(&path, e.into()))?;
        std::fs::write(&path, json).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}

impl Trainer for CommandTrainer {
    async fn train(&self, run: &RunConfig) -> Result<()> {
        let model = run.model_name().to_string();
        let fail = |reason: String| Error::Training {
            model: model.clone(),
            reason,
        };

        let run_file = Self::write_run_config(run)?;
        tracing::info!(
            model = %model,
            program = %self.program.display(),
            device = %run.device(),
            "starting trainer"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--run-config")
            .arg(&run_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fail(format!("cannot start {}: {e}", self.program.display())))?;

        let stdout = tokio::spawn(forward_lines(child.stdout.take(), model.clone(), Stream::Stdout));
        let stderr = tokio::spawn(forward_lines(child.stderr.take(), model.clone(), Stream::Stderr));

        let status = child
            .wait()
            .await
            .map_err(|e| fail(format!("waiting for trainer: {e}")))?;
        // Drain whatever the trainer printed last before reporting.
        for (stream, task) in [(Stream::Stdout, stdout), (Stream::Stderr, stderr)] {
            match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(model = %model, stream = stream.name(), "trainer output task failed: {e}"),
                Err(_) => tracing::warn!(
                    model = %model,
                    stream = stream.name(),
                    "trainer output still open {}s after exit; detaching",
                    OUTPUT_DRAIN_TIMEOUT.as_secs()
                ),
            }
        }

        if !status.success() {
            return Err(fail(format!("trainer exited with {status}")));
        }
        tracing::info!(model = %model, "trainer finished");
        Ok(())
    }
}

async fn forward_lines<R>(reader: Option<R>, model: String, stream: Stream)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else { return };
    let mut lines = BufReader::new(reader).lines();
    let name = stream.name();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if stream.level() == tracing::Level::WARN => {
                tracing::warn!(target: "trainer", model = %model, stream = name, "{line}");
            }
            Ok(Some(line)) => tracing::info!(target: "trainer", model = %model, stream = name, "{line}"),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(target: "trainer", model = %model, stream = name, "unreadable trainer output: {e}");
                break;
            }
        }
    }
}
