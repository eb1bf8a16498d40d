//! Run configuration.
//!
//! A run is described by a YAML file plus command-line overrides; flags win
//! over the file. Model and device tags are kept as strings here and parsed
//! through the registry exactly once, at startup, so an invalid tag aborts
//! the run before any data is touched.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spinel_kge::{Device, ModelConfig, ModelKind, TrainConfig};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Everything a training or evaluation run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Dataset directory holding `train.txt`, `valid.txt`, `test.txt`.
    pub dataset: PathBuf,
    /// Model registry tag.
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding dimension.
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// Training epochs.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Batch size for training and evaluation.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam learning rate.
    #[serde(default = "default_lr")]
    pub lr: f32,
    /// L2 weight decay.
    #[serde(default)]
    pub l2: f32,
    /// Label smoothing coefficient.
    #[serde(default = "default_label_smoothing")]
    pub label_smoothing: f32,
    /// Validation interval in epochs.
    #[serde(default = "default_eval_interval")]
    pub eval_interval: usize,
    /// Early-stopping patience in evaluations (null disables).
    #[serde(default = "default_early_stopping")]
    pub early_stopping: Option<usize>,
    /// Seed for deterministic initialization.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Device tag.
    #[serde(default = "default_device")]
    pub device: String,
    /// Output root; each run writes into a subdirectory of it.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_model() -> String {
    "distmult".to_string()
}
fn default_embedding_dim() -> usize {
    200
}
fn default_epochs() -> usize {
    100
}
fn default_batch_size() -> usize {
    128
}
fn default_lr() -> f32 {
    0.001
}
fn default_label_smoothing() -> f32 {
    0.1
}
fn default_eval_interval() -> usize {
    2
}
fn default_early_stopping() -> Option<usize> {
    Some(10)
}
fn default_seed() -> u64 {
    1234
}
fn default_device() -> String {
    "cpu".to_string()
}
fn default_out_dir() -> PathBuf {
    PathBuf::from("runs")
}

impl RunConfig {
    /// Read a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Resolve the model tag through the registry.
    pub fn model_kind(&self) -> spinel_kge::Result<ModelKind> {
        self.model.parse()
    }

    /// Resolve the device tag.
    pub fn parse_device(&self) -> spinel_kge::Result<Device> {
        self.device.parse()
    }

    /// Model hyperparameters, with the device resolved explicitly.
    pub fn model_config(&self) -> spinel_kge::Result<ModelConfig> {
        Ok(ModelConfig::default()
            .with_embedding_dim(self.embedding_dim)
            .with_seed(self.seed)
            .with_device(self.parse_device()?))
    }

    /// Training hyperparameters.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig::default()
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_learning_rate(self.lr)
            .with_weight_decay(self.l2)
            .with_label_smoothing(self.label_smoothing)
            .with_eval_interval(self.eval_interval)
            .with_early_stopping(self.early_stopping)
    }

    /// Directory this run writes into: `<out_dir>/<dataset>_<model>`.
    pub fn run_dir(&self) -> PathBuf {
        let dataset_name = self
            .dataset
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        self.out_dir.join(format!("{}_{}", dataset_name, self.model))
    }

    /// Checkpoint path inside the run directory.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.run_dir().join("best.ckpt")
    }
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dataset: Option<PathBuf>,
    pub model: Option<String>,
    pub embedding_dim: Option<usize>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub lr: Option<f32>,
    pub device: Option<String>,
    pub seed: Option<u64>,
    pub out_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Apply non-empty overrides in place.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dataset) = overrides.dataset {
            self.dataset = dataset;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(dim) = overrides.embedding_dim {
            self.embedding_dim = dim;
        }
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(lr) = overrides.lr {
            self.lr = lr;
        }
        if let Some(device) = overrides.device {
            self.device = device;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(out_dir) = overrides.out_dir {
            self.out_dir = out_dir;
        }
    }
}
