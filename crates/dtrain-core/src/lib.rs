//! dtrain-core: shared types and the metrics normalizer for dtrain.
//!
//! # Pipeline
//!
//! ```text
//! model config ──► RunConfig ──► trainer ──► metrics.json ──► Normalizer ──► report
//!                    ▲
//!      DatasetHandle ┘ (train, val)
//! ```
//!
//! The trainer itself lives outside this crate; `dtrain-runner` drives it.

pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod types;

pub use dataset::{register_coco, DatasetHandle};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use model::{model_name, ModelDefinition};
pub use normalizer::{clean_run, normalize, LogSchema, Normalized};
pub use types::{CleanedReport, Device, DeviceSelector, MetricsRecord, RunConfig};
