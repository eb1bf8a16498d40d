//! DistMult: bilinear diagonal decoder (Yang et al. 2015).
//!
//! Score: `<h, r, t> = sum_k h_k * r_k * t_k`. The 1-N query vector
//! `q = h ∘ r` turns scoring against all candidates into a single
//! matrix product `q · E^T`.
//!
//! DistMult is symmetric by construction; reciprocal relations (handled by
//! the dataset layer) are what let it model directed queries anyway.

use crate::error::{Error, Result};
use crate::model::{Device, ModelConfig, ModelKind, ScoreModel};
use crate::models::{bce_with_logits, seeded_embeddings, sigmoid, take_param};
use crate::scoring::ScoringFunction;
use crate::training::Adam;
use ndarray::Array2;

/// Bilinear diagonal decoder.
#[derive(Debug, Clone)]
pub struct DistMult {
    /// Entity table, `(num_entities, dim)`.
    entities: Array2<f32>,
    /// Relation table, `(num_relations, dim)`.
    relations: Array2<f32>,
    dim: usize,
    device: Device,
}

impl DistMult {
    /// Create a freshly initialized model.
    pub fn new(num_entities: usize, num_relations: usize, config: &ModelConfig) -> Self {
        Self {
            entities: seeded_embeddings(num_entities, config.embedding_dim, config.seed),
            relations: seeded_embeddings(
                num_relations,
                config.embedding_dim,
                config.seed.wrapping_add(1),
            ),
            dim: config.embedding_dim,
            device: config.device,
        }
    }

    fn check_ids(&self, entities: &[u32], relations: &[u32]) -> Result<()> {
        check_ranges(entities, relations, self.entities.dim().0, self.relations.dim().0)
    }

    /// Query vectors `h ∘ r`, one row per example.
    fn query_matrix(&self, entities: &[u32], relations: &[u32]) -> Array2<f32> {
        let mut queries = Array2::zeros((entities.len(), self.dim));
        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            for k in 0..self.dim {
                queries[[i, k]] = self.entities[[e as usize, k]] * self.relations[[r as usize, k]];
            }
        }
        queries
    }
}

impl ScoreModel for DistMult {
    fn kind(&self) -> ModelKind {
        ModelKind::DistMult
    }

    fn forward(&self, entities: &[u32], relations: &[u32]) -> Result<Array2<f32>> {
        self.check_ids(entities, relations)?;
        let queries = self.query_matrix(entities, relations);
        // sigmoid-calibrated: filtered evaluation zeroes known competitors,
        // which only demotes them when every live score is positive
        Ok(queries.dot(&self.entities.t()).mapv(sigmoid))
    }

    fn score_one(&self, subject: u32, relation: u32, object: u32) -> Result<f32> {
        self.check_ids(&[subject, object], &[relation])?;
        Ok(sigmoid(ScoringFunction::DistMult.score(
            &self.entities.row(subject as usize).to_vec(),
            &self.relations.row(relation as usize).to_vec(),
            &self.entities.row(object as usize).to_vec(),
        )))
    }

    fn train_batch(
        &mut self,
        entities: &[u32],
        relations: &[u32],
        targets: &Array2<f32>,
        optimizer: &mut Adam,
    ) -> Result<f32> {
        self.check_ids(entities, relations)?;
        let queries = self.query_matrix(entities, relations);
        let scores = queries.dot(&self.entities.t());
        let (loss, delta) = bce_with_logits(&scores, targets);

        // dL/dq per example, plus the candidate-side gradient of the entity
        // table: scores = q · E^T.
        let grad_queries = delta.dot(&self.entities);
        let mut grad_entities = delta.t().dot(&queries);
        let mut grad_relations = Array2::zeros(self.relations.raw_dim());

        // q = h ∘ r routes the query gradient into the subject and relation
        // rows; tables are still pre-update here.
        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            let (e, r) = (e as usize, r as usize);
            for k in 0..self.dim {
                grad_entities[[e, k]] += grad_queries[[i, k]] * self.relations[[r, k]];
                grad_relations[[r, k]] += grad_queries[[i, k]] * self.entities[[e, k]];
            }
        }

        optimizer.update("entity_embeddings", &mut self.entities, &grad_entities);
        optimizer.update("relation_embeddings", &mut self.relations, &grad_relations);
        Ok(loss)
    }

    fn num_entities(&self) -> usize {
        self.entities.dim().0
    }

    fn num_relations(&self) -> usize {
        self.relations.dim().0
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn device(&self) -> Device {
        self.device
    }

    fn parameters(&self) -> Vec<(&'static str, &Array2<f32>)> {
        vec![
            ("entity_embeddings", &self.entities),
            ("relation_embeddings", &self.relations),
        ]
    }

    fn load_parameters(&mut self, mut params: Vec<(String, Array2<f32>)>) -> Result<()> {
        self.entities = take_param(&mut params, "entity_embeddings", self.entities.dim())?;
        self.relations = take_param(&mut params, "relation_embeddings", self.relations.dim())?;
        Ok(())
    }
}

/// Shared id-range validation for decoders.
pub(crate) fn check_ranges(
    entities: &[u32],
    relations: &[u32],
    num_entities: usize,
    num_relations: usize,
) -> Result<()> {
    for &e in entities {
        if e as usize >= num_entities {
            return Err(Error::EntityOutOfRange {
                id: e,
                num_entities,
            });
        }
    }
    for &r in relations {
        if r as usize >= num_relations {
            return Err(Error::RelationOutOfRange {
                id: r,
                num_relations,
            });
        }
    }
    Ok(())
}
