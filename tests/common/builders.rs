//! Test builders: an on-disk training workspace in a temp directory.
//!
//! These builders are designed for readability in tests, not for production
//! use. They panic on invalid input rather than returning `Result`.

use std::path::{Path, PathBuf};

use dtrain_core::config::Config;
use dtrain_core::Device;
use dtrain_runner::Plan;

use super::fixtures::{COCO_ANNOTATIONS, MODEL_YAML};

/// A temp directory laid out the way a real training pass expects:
///
/// ```text
/// <root>/data/{train,val}/images/
/// <root>/data/{train,val}/annotations.json
/// <root>/configs/<model>.yaml
/// <root>/output/        (trainer working directory)
/// <root>/results/       (cleaned reports)
/// ```
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for split in ["train", "val"] {
            let split_dir = dir.path().join("data").join(split);
            std::fs::create_dir_all(split_dir.join("images")).unwrap();
            std::fs::write(split_dir.join("annotations.json"), COCO_ANNOTATIONS).unwrap();
        }
        std::fs::create_dir_all(dir.path().join("configs")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("output")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.root().join("results")
    }

    /// Write `configs/<name>.yaml` and return its path.
    pub fn model(&self, name: &str) -> PathBuf {
        let path = self.root().join("configs").join(format!("{name}.yaml"));
        std::fs::write(&path, MODEL_YAML).unwrap();
        path
    }

    /// Write `contents` to `output/metrics.json`, as a finished run would.
    pub fn write_run_log(&self, contents: &str) -> PathBuf {
        std::fs::create_dir_all(self.output_dir()).unwrap();
        let path = self.output_dir().join("metrics.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Report path for `model_name` under the metrics directory.
    pub fn report(&self, model_name: &str) -> PathBuf {
        self.metrics_dir().join(format!("{model_name}_train_results.json"))
    }

    /// TOML config pointing every path into this workspace.
    pub fn config_toml(&self, models: &[PathBuf]) -> String {
        let quote = |p: &Path| format!("'{}'", p.display());
        let models: Vec<String> = models.iter().map(|m| quote(m)).collect();
        format!(
            "[data]\n\
             train_path = {train}\n\
             val_path = {val}\n\
             \n\
             [run]\n\
             output_dir = {output}\n\
             metrics_dir = {metrics}\n\
             model_configs = [{models}]\n\
             device = 'cpu'\n",
            train = quote(&self.root().join("data").join("train")),
            val = quote(&self.root().join("data").join("val")),
            output = quote(&self.output_dir()),
            metrics = quote(&self.metrics_dir()),
            models = models.join(", "),
        )
    }

    /// Write [`Self::config_toml`] to `dtrain.toml` in the workspace.
    pub fn write_config(&self, models: &[PathBuf]) -> PathBuf {
        let path = self.root().join("dtrain.toml");
        std::fs::write(&path, self.config_toml(models)).unwrap();
        path
    }

    pub fn config(&self, models: &[PathBuf]) -> Config {
        Config::from_toml_str(&self.config_toml(models)).unwrap()
    }

    pub fn plan(&self, models: &[PathBuf]) -> Plan {
        Plan::from_config(&self.config(models), Device::Cpu).unwrap()
    }
}
