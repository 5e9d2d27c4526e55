//! Model definitions: YAML config files handed through to the trainer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Length of the `.yaml` suffix dropped when deriving a model name.
pub const MODEL_EXTENSION_LEN: usize = 5;

/// Derive the short model name from a model config path: the final path
/// segment with its `.yaml` extension cut off.
///
/// The suffix is removed by length, so `faster_rcnn_R_50_FPN_3x.yaml` becomes
/// `faster_rcnn_R_50_FPN_3x`. A file name no longer than the suffix leaves
/// nothing to name the run after and is rejected.
pub fn model_name(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            Error::Configuration(format!("{} has no usable file name", path.display()))
        })?;

    let len = file_name.chars().count();
    if len <= MODEL_EXTENSION_LEN {
        return Err(Error::Configuration(format!(
            "model config name `{file_name}` is too short to strip a {MODEL_EXTENSION_LEN}-character extension"
        )));
    }
    Ok(file_name.chars().take(len - MODEL_EXTENSION_LEN).collect())
}

/// A model config file that exists and parses as YAML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    name: String,
    path: PathBuf,
}

impl ModelDefinition {
    /// Load and validate the model config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let name = model_name(path)?;
        if !path.is_file() {
            return Err(Error::Configuration(format!(
                "model config {} does not exist",
                path.display()
            )));
        }

        let document: HashMap<String, config::Value> = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| {
                Error::Configuration(format!("model config {}: {e}", path.display()))
            })?;

        if document.is_empty() {
            tracing::warn!(path = %path.display(), "model config is empty");
        }
        tracing::debug!(model = %name, sections = document.len(), "loaded model config");

        Ok(Self {
            name,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

}
