//! Configuration types for dtrain.
//!
//! [`Config::load`] layers, lowest priority first: the embedded defaults, an
//! optional TOML file, and `DTRAIN_*` environment variables (`__` separates
//! nested keys, e.g. `DTRAIN_RUN__OUTPUT_DIR`). The binary applies its CLI
//! flags on top. [`Config::defaults`] returns the embedded defaults without
//! touching the filesystem or the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::normalizer::{check_metrics_dir, LogSchema};
use crate::types::DeviceSelector;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[data]
image_dir_name    = "images"
train_path        = "data/train"
train_annotations = "annotations.json"
val_path          = "data/val"
val_annotations   = "annotations.json"

[run]
output_dir    = "output"
metrics_dir   = "metrics"
model_configs = []
device        = "auto"

[trainer]
program = "dtrain-trainer"
args    = []

[metrics]
format_version = 1
required_keys  = []
"#;

/// File read by [`Config::load`] when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "dtrain.toml";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub run: RunSection,
    pub trainer: TrainerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// `[data]` section: where the train and validation splits live.
///
/// Each split is a directory holding an image subdirectory named
/// `image_dir_name` and a COCO annotation file.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub image_dir_name: String,
    pub train_path: PathBuf,
    pub train_annotations: String,
    pub val_path: PathBuf,
    pub val_annotations: String,
}

impl DataConfig {
    #[must_use]
    pub fn train_images(&self) -> PathBuf {
        self.train_path.join(&self.image_dir_name)
    }

    #[must_use]
    pub fn train_annotations_path(&self) -> PathBuf {
        self.train_path.join(&self.train_annotations)
    }

    #[must_use]
    pub fn val_images(&self) -> PathBuf {
        self.val_path.join(&self.image_dir_name)
    }

    #[must_use]
    pub fn val_annotations_path(&self) -> PathBuf {
        self.val_path.join(&self.val_annotations)
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    pub output_dir: PathBuf,
    pub metrics_dir: PathBuf,
    #[serde(default)]
    pub model_configs: Vec<PathBuf>,
    #[serde(default)]
    pub device: DeviceSelector,
}

/// `[trainer]` section: the external program that performs training.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default)]
    pub required_keys: Vec<String>,
}

fn default_format_version() -> u32 { crate::normalizer::LOG_FORMAT_VERSION }

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            required_keys: Vec::new(),
        }
    }
}

impl MetricsConfig {
    /// The log contract described by this section.
    pub fn schema(&self) -> Result<LogSchema> {
        LogSchema::new(self.format_version, self.required_keys.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load `path` (or `dtrain.toml` if `None`) over the embedded defaults,
    /// then apply `DTRAIN_*` environment overrides. An explicit path must
    /// exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        tracing::debug!(path = %file.display(), required, "loading config");

        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix("DTRAIN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Parse `toml` over the embedded defaults, ignoring files and environment.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// Check the settings a training pass cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.run.model_configs.is_empty() {
            return Err(Error::Configuration(
                "no model configs given (set run.model_configs or pass them on the command line)"
                    .to_string(),
            ));
        }
        if self.trainer.program.as_os_str().is_empty() {
            return Err(Error::Configuration("trainer.program is empty".to_string()));
        }
        if self.data.image_dir_name.is_empty() {
            return Err(Error::Configuration("data.image_dir_name is empty".to_string()));
        }
        check_metrics_dir(&self.run.output_dir, &self.run.metrics_dir)?;
        self.metrics.schema().map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
