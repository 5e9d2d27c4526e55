//! dtrain-runner: drives the external trainer for each model config.
//!
//! The [`Trainer`] trait is the seam to the training framework. The shipped
//! implementation, [`CommandTrainer`], runs a configured program; tests swap
//! in fakes that write a metrics log directly.

use std::future::Future;

use dtrain_core::{Result, RunConfig};

pub mod command;
pub mod device;
pub mod orchestrator;

pub use command::CommandTrainer;
pub use device::{resolve_device, GpuProbe, NvidiaProbe};
pub use orchestrator::{Orchestrator, Plan, RunSummary};

/// An external training procedure.
///
/// On success the trainer must have written
/// [`RunConfig::metrics_log`](dtrain_core::RunConfig::metrics_log). Any
/// failure is reported as [`dtrain_core::Error::Training`].
pub trait Trainer {
    fn train(&self, run: &RunConfig) -> impl Future<Output = Result<()>>;
}
