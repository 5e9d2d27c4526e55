//! COCO dataset registration.
//!
//! Registering a dataset validates its image directory and annotation file
//! and returns a [`DatasetHandle`]. Handles are passed explicitly into every
//! [`RunConfig`](crate::RunConfig); there is no process-wide catalog to look
//! datasets up by name.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name the training split is registered under.
pub const TRAIN_DATASET: &str = "train_detector";
/// Name the validation split is registered under.
pub const VAL_DATASET: &str = "val_detector";

/// A validated COCO-format dataset ready to be handed to a trainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetHandle {
    name: String,
    images_dir: PathBuf,
    annotations: PathBuf,
    image_count: usize,
    annotation_count: usize,
    categories: Vec<String>,
}

impl DatasetHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    #[must_use]
    pub fn annotations(&self) -> &Path {
        &self.annotations
    }

    #[must_use]
    pub const fn image_count(&self) -> usize {
        self.image_count
    }

    #[must_use]
    pub const fn annotation_count(&self) -> usize {
        self.annotation_count
    }

    /// Category names in annotation-file order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

// Only the top-level shape is checked; individual entries are left to the trainer.
#[derive(Debug, Deserialize)]
struct CocoFile {
    images: Vec<IgnoredAny>,
    annotations: Vec<IgnoredAny>,
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    name: String,
}

/// Register a COCO-format dataset under `name`.
///
/// Fails with [`Error::Dataset`] if the image directory is missing, or the
/// annotation file is unreadable or lacks the `images`, `annotations` and
/// `categories` arrays.
pub fn register_coco(name: &str, images_dir: &Path, annotations: &Path) -> Result<DatasetHandle> {
    let fail = |reason: String| Error::Dataset {
        dataset: name.to_string(),
        reason,
    };

    if !images_dir.is_dir() {
        return Err(fail(format!(
            "image directory {} does not exist",
            images_dir.display()
        )));
    }

    let text = std::fs::read_to_string(annotations)
        .map_err(|e| fail(format!("cannot read {}: {e}", annotations.display())))?;
    let coco: CocoFile = serde_json::from_str(&text)
        .map_err(|e| fail(format!("{} is not COCO JSON: {e}", annotations.display())))?;

    let handle = DatasetHandle {
        name: name.to_string(),
        images_dir: images_dir.to_path_buf(),
        annotations: annotations.to_path_buf(),
        image_count: coco.images.len(),
        annotation_count: coco.annotations.len(),
        categories: coco.categories.into_iter().map(|c| c.name).collect(),
    };
    tracing::info!(
        dataset = name,
        images = handle.image_count,
        annotations = handle.annotation_count,
        categories = handle.categories.len(),
        "registered dataset"
    );
    Ok(handle)
}
