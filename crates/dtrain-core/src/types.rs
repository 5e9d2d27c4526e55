//! Core types shared by the orchestrator and the normalizer.
//!
//! [`RunConfig`] describes one training job. [`MetricsRecord`] is one logged
//! training step and [`CleanedReport`] is the JSON document written once a
//! run has finished.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::dataset::DatasetHandle;
use crate::error::{Error, Result};
use crate::model::ModelDefinition;

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Compute device requested for a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Device preference as written in configuration. `Auto` is resolved to a
/// concrete [`Device`] by the runner before any run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelector {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl std::str::FromStr for DeviceSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown device `{other}` (expected auto, cpu or cuda)")),
        }
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

/// Everything the external trainer needs to start one training job.
///
/// Built once per model configuration entry and never mutated. Datasets are
/// carried as handles rather than looked up by name, so the trainer receives
/// exactly what was registered for this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    model_name: String,
    model_config: PathBuf,
    train: DatasetHandle,
    val: DatasetHandle,
    output_dir: PathBuf,
    eval_dir: PathBuf,
    device: Device,
    resume: bool,
}

impl RunConfig {
    /// Subdirectory of the output directory the COCO evaluator writes into.
    pub const EVAL_SUBDIR: &'static str = "inference";

    /// Assemble a run for `model`. Creates `output_dir` if it does not exist.
    pub fn new(
        model: &ModelDefinition,
        train: DatasetHandle,
        val: DatasetHandle,
        output_dir: impl Into<PathBuf>,
        device: Device,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;
        Ok(Self {
            model_name: model.name().to_string(),
            model_config: model.path().to_path_buf(),
            train,
            val,
            eval_dir: output_dir.join(Self::EVAL_SUBDIR),
            output_dir,
            device,
            resume: false,
        })
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn model_config(&self) -> &Path {
        &self.model_config
    }

    #[must_use]
    pub fn train(&self) -> &DatasetHandle {
        &self.train
    }

    #[must_use]
    pub fn val(&self) -> &DatasetHandle {
        &self.val
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn eval_dir(&self) -> &Path {
        &self.eval_dir
    }

    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    /// Always `false`: every run trains from the initial weights.
    #[must_use]
    pub const fn resume(&self) -> bool {
        self.resume
    }

    /// Where the trainer is expected to leave its raw metrics log.
    #[must_use]
    pub fn metrics_log(&self) -> PathBuf {
        self.output_dir.join(crate::normalizer::METRICS_LOG_FILE)
    }
}

// ---------------------------------------------------------------------------
// MetricsRecord
// ---------------------------------------------------------------------------

/// One logged training step: metric name → value, in the order the trainer
/// wrote them.
///
/// A repeated name overwrites the earlier value without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsRecord {
    values: Vec<(String, f64)>,
}

impl MetricsRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|&(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricsRecord {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for MetricsRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MetricsRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = MetricsRecord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a flat map of metric name to number")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<MetricsRecord, A::Error> {
                let mut record = MetricsRecord::new();
                while let Some((k, v)) = access.next_entry::<String, f64>()? {
                    record.insert(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

// ---------------------------------------------------------------------------
// CleanedReport
// ---------------------------------------------------------------------------

/// The persisted per-run report: `{"metrics": [record, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedReport {
    pub metrics: Vec<MetricsRecord>,
}

impl CleanedReport {
    #[must_use]
    pub fn new(metrics: Vec<MetricsRecord>) -> Self {
        Self { metrics }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Read a report previously written by the normalizer.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| Error::io(path, e.into()))
    }
}
