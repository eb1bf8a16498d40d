//! ComplEx: complex bilinear decoder (Trouillon et al. 2016).
//!
//! Score: `Re(<h, r, conj(t)>)`. Embeddings live in complex space, stored as
//! `(n, 2d)` matrices with interleaved real/imaginary parts. The conjugate
//! on the tail breaks DistMult's forced symmetry, so asymmetric relations
//! (`parent_of` vs `child_of`) get distinct scores.
//!
//! Writing the complex product `h ⊗ r` as a real query vector `q` with
//! `q[2k] = Re(h_k r_k)` and `q[2k+1] = Im(h_k r_k)` reduces 1-N scoring to
//! the same `q · E^T` product DistMult uses.

use crate::error::Result;
use crate::model::{Device, ModelConfig, ModelKind, ScoreModel};
use crate::models::distmult::check_ranges;
use crate::models::{bce_with_logits, seeded_embeddings, sigmoid, take_param};
use crate::scoring::ScoringFunction;
use crate::training::Adam;
use ndarray::Array2;

/// Complex bilinear decoder.
#[derive(Debug, Clone)]
pub struct ComplEx {
    /// Entity table, `(num_entities, 2 * dim)`, re/im interleaved.
    entities: Array2<f32>,
    /// Relation table, `(num_relations, 2 * dim)`, re/im interleaved.
    relations: Array2<f32>,
    dim: usize,
    device: Device,
}

impl ComplEx {
    /// Create a freshly initialized model. `config.embedding_dim` is the
    /// complex dimension; tables are twice as wide.
    pub fn new(num_entities: usize, num_relations: usize, config: &ModelConfig) -> Self {
        Self {
            entities: seeded_embeddings(num_entities, 2 * config.embedding_dim, config.seed),
            relations: seeded_embeddings(
                num_relations,
                2 * config.embedding_dim,
                config.seed.wrapping_add(1),
            ),
            dim: config.embedding_dim,
            device: config.device,
        }
    }

    fn check_ids(&self, entities: &[u32], relations: &[u32]) -> Result<()> {
        check_ranges(entities, relations, self.entities.dim().0, self.relations.dim().0)
    }

    /// Real-valued query rows encoding the complex product `h ⊗ r`.
    fn query_matrix(&self, entities: &[u32], relations: &[u32]) -> Array2<f32> {
        let mut queries = Array2::zeros((entities.len(), 2 * self.dim));
        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            let (e, r) = (e as usize, r as usize);
            for k in 0..self.dim {
                let h_re = self.entities[[e, 2 * k]];
                let h_im = self.entities[[e, 2 * k + 1]];
                let r_re = self.relations[[r, 2 * k]];
                let r_im = self.relations[[r, 2 * k + 1]];

                queries[[i, 2 * k]] = h_re * r_re - h_im * r_im;
                queries[[i, 2 * k + 1]] = h_re * r_im + h_im * r_re;
            }
        }
        queries
    }
}

impl ScoreModel for ComplEx {
    fn kind(&self) -> ModelKind {
        ModelKind::ComplEx
    }

    fn forward(&self, entities: &[u32], relations: &[u32]) -> Result<Array2<f32>> {
        self.check_ids(entities, relations)?;
        let queries = self.query_matrix(entities, relations);
        // sigmoid-calibrated so zero-filtering demotes known competitors
        Ok(queries.dot(&self.entities.t()).mapv(sigmoid))
    }

    fn score_one(&self, subject: u32, relation: u32, object: u32) -> Result<f32> {
        self.check_ids(&[subject, object], &[relation])?;
        Ok(sigmoid(ScoringFunction::ComplEx.score(
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

        let grad_queries = delta.dot(&self.entities);
        let mut grad_entities = delta.t().dot(&queries);
        let mut grad_relations = Array2::zeros(self.relations.raw_dim());

        // Backprop through the complex product: q_re = h_re r_re - h_im r_im,
        // q_im = h_re r_im + h_im r_re.
        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            let (e, r) = (e as usize, r as usize);
            for k in 0..self.dim {
                let g_re = grad_queries[[i, 2 * k]];
                let g_im = grad_queries[[i, 2 * k + 1]];
                let h_re = self.entities[[e, 2 * k]];
                let h_im = self.entities[[e, 2 * k + 1]];
                let r_re = self.relations[[r, 2 * k]];
                let r_im = self.relations[[r, 2 * k + 1]];

                grad_entities[[e, 2 * k]] += g_re * r_re + g_im * r_im;
                grad_entities[[e, 2 * k + 1]] += -g_re * r_im + g_im * r_re;
                grad_relations[[r, 2 * k]] += g_re * h_re + g_im * h_im;
                grad_relations[[r, 2 * k + 1]] += -g_re * h_im + g_im * h_re;
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
