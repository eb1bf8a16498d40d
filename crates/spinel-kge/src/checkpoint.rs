//! Model checkpointing.
//!
//! A checkpoint is a named mapping from parameter name to tensor (shape plus
//! flat data), tagged with the model variant and the validation MRR it was
//! selected by. The on-disk format is bincode; its layout is an
//! implementation detail of this crate.

use crate::error::{Error, Result};
use crate::model::ScoreModel;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One serialized parameter tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorEntry {
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
    /// Row-major element data.
    pub data: Vec<f32>,
}

/// A persisted parameter mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Registry tag of the model variant.
    pub model: String,
    /// Epoch the checkpoint was captured at.
    pub epoch: usize,
    /// Validation MRR that selected this checkpoint.
    pub mrr: f64,
    /// Parameter tensors by name.
    pub params: BTreeMap<String, TensorEntry>,
}

impl Checkpoint {
    /// Capture the current parameters of a model.
    pub fn capture(model: &dyn ScoreModel, epoch: usize, mrr: f64) -> Self {
        let params = model
            .parameters()
            .into_iter()
            .map(|(name, tensor)| {
                (
                    name.to_string(),
                    TensorEntry {
                        shape: tensor.shape().to_vec(),
                        data: tensor.iter().copied().collect(),
                    },
                )
            })
            .collect();

        Self {
            model: model.kind().as_str().to_string(),
            epoch,
            mrr,
            params,
        }
    }

    /// Restore parameters into a model of the same variant.
    pub fn restore(&self, model: &mut dyn ScoreModel) -> Result<()> {
        if self.model != model.kind().as_str() {
            return Err(Error::ModelMismatch {
                found: self.model.clone(),
                requested: model.kind().as_str().to_string(),
            });
        }

        let mut tensors = Vec::with_capacity(self.params.len());
        for (name, entry) in &self.params {
            if entry.shape.len() != 2 || entry.shape[0] * entry.shape[1] != entry.data.len() {
                return Err(Error::ParameterShape {
                    name: name.clone(),
                    expected: vec![2],
                    found: entry.shape.clone(),
                });
            }
            let tensor =
                Array2::from_shape_vec((entry.shape[0], entry.shape[1]), entry.data.clone())
                    .map_err(|_| Error::ParameterShape {
                        name: name.clone(),
                        expected: entry.shape.clone(),
                        found: vec![entry.data.len()],
                    })?;
            tensors.push((name.clone(), tensor));
        }

        model.load_parameters(tensors)
    }

    /// Write the checkpoint to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read a checkpoint from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }
}
