//! The decoder model interface and the variant registry.
//!
//! Abstraction sits at the model level, not the tensor level: each decoder
//! owns its embedding tables and knows how to score, differentiate and
//! checkpoint itself. The trainer and evaluator only see [`ScoreModel`].
//!
//! Model variants are resolved once at startup through [`ModelKind`]; an
//! unrecognized tag is a configuration error raised before any training or
//! evaluation happens. Device placement is an explicit constructor argument
//! ([`Device`]), never ambient process state.

use crate::error::{Error, Result};
use crate::models::{ComplEx, DistMult, TransE};
use crate::training::Adam;
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

/// Compute device for embedding tables.
///
/// This backend is CPU-only; the variant exists so that placement is an
/// explicit, validated configuration value rather than an environment
/// side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Self::Cpu),
            other => Err(Error::UnknownDevice(other.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Hyperparameters shared by all decoder variants.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Embedding dimension (for ComplEx: complex dimension, stored as 2d).
    pub embedding_dim: usize,
    /// Seed for deterministic embedding initialization.
    pub seed: u64,
    /// Placement of the embedding tables.
    pub device: Device,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 200,
            seed: 1234,
            device: Device::Cpu,
        }
    }
}

impl ModelConfig {
    /// Set the embedding dimension.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Set the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

/// A trainable decoder scoring `(entity, relation, ?)` queries against all
/// candidate entities.
pub trait ScoreModel {
    /// Which registry variant this model is.
    fn kind(&self) -> ModelKind;

    /// Score a batch of queries against every candidate entity.
    ///
    /// Returns a `(batch, num_entities)` matrix; row `i` holds the
    /// plausibility of each entity as the completion of
    /// `(entities[i], relations[i], ?)`. Scores are sigmoid-calibrated into
    /// `(0, 1)`, so a zeroed entry ranks below every live candidate.
    fn forward(&self, entities: &[u32], relations: &[u32]) -> Result<Array2<f32>>;

    /// Score a single fully-specified triple.
    fn score_one(&self, subject: u32, relation: u32, object: u32) -> Result<f32>;

    /// Run one optimizer step on a batch of 1-N queries.
    ///
    /// `targets` is the `(batch, num_entities)` matrix of (label-smoothed)
    /// completion labels. Returns the batch's binary cross-entropy loss.
    fn train_batch(
        &mut self,
        entities: &[u32],
        relations: &[u32],
        targets: &Array2<f32>,
        optimizer: &mut Adam,
    ) -> Result<f32>;

    /// Number of candidate entities.
    fn num_entities(&self) -> usize;

    /// Size of the relation id space.
    fn num_relations(&self) -> usize;

    /// Embedding dimension as configured.
    fn embedding_dim(&self) -> usize;

    /// Device the model was placed on.
    fn device(&self) -> Device;

    /// Named parameter tensors, for checkpointing.
    fn parameters(&self) -> Vec<(&'static str, &Array2<f32>)>;

    /// Replace parameter tensors by name, validating shapes.
    fn load_parameters(&mut self, params: Vec<(String, Array2<f32>)>) -> Result<()>;
}

/// Registry of decoder variants, resolved from a configuration tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Bilinear diagonal decoder.
    DistMult,
    /// Complex bilinear decoder.
    ComplEx,
    /// Translational decoder.
    TransE,
}

impl ModelKind {
    /// The configuration tag of this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DistMult => "distmult",
            Self::ComplEx => "complex",
            Self::TransE => "transe",
        }
    }

    /// Construct a freshly initialized model of this variant.
    pub fn build(
        self,
        num_entities: usize,
        num_relations: usize,
        config: &ModelConfig,
    ) -> Box<dyn ScoreModel> {
        match self {
            Self::DistMult => Box::new(DistMult::new(num_entities, num_relations, config)),
            Self::ComplEx => Box::new(ComplEx::new(num_entities, num_relations, config)),
            Self::TransE => Box::new(TransE::new(num_entities, num_relations, config)),
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "distmult" => Ok(Self::DistMult),
            "complex" => Ok(Self::ComplEx),
            "transe" => Ok(Self::TransE),
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
