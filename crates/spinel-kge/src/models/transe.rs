//! TransE: translational decoder (Bordes et al. 2013).
//!
//! Score: `-||h + r - t||_2`. A true triple places the translated head
//! `h + r` on top of the tail, so distances (negated into scores) rank
//! candidates. Unlike the bilinear decoders there is no matrix-product
//! shortcut for 1-N scoring; candidates are scored row by row.

use crate::error::Result;
use crate::model::{Device, ModelConfig, ModelKind, ScoreModel};
use crate::models::distmult::check_ranges;
use crate::models::{bce_with_logits, seeded_embeddings, sigmoid, take_param};
use crate::scoring::ScoringFunction;
use crate::training::Adam;
use ndarray::Array2;

const NORM_FLOOR: f32 = 1e-8;

/// Translational decoder.
#[derive(Debug, Clone)]
pub struct TransE {
    /// Entity table, `(num_entities, dim)`.
    entities: Array2<f32>,
    /// Relation table, `(num_relations, dim)`.
    relations: Array2<f32>,
    dim: usize,
    device: Device,
}

impl TransE {
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

    /// Translated query point `h + r` for one example.
    fn query_point(&self, entity: u32, relation: u32) -> Vec<f32> {
        let (e, r) = (entity as usize, relation as usize);
        (0..self.dim)
            .map(|k| self.entities[[e, k]] + self.relations[[r, k]])
            .collect()
    }

    fn score_matrix(&self, entities: &[u32], relations: &[u32]) -> Array2<f32> {
        let num_entities = self.entities.dim().0;
        let mut scores = Array2::zeros((entities.len(), num_entities));

        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            let query = self.query_point(e, r);
            for j in 0..num_entities {
                let mut sum_sq = 0.0;
                for k in 0..self.dim {
                    let diff = query[k] - self.entities[[j, k]];
                    sum_sq += diff * diff;
                }
                scores[[i, j]] = -sum_sq.sqrt();
            }
        }

        scores
    }
}

impl ScoreModel for TransE {
    fn kind(&self) -> ModelKind {
        ModelKind::TransE
    }

    fn forward(&self, entities: &[u32], relations: &[u32]) -> Result<Array2<f32>> {
        self.check_ids(entities, relations)?;
        // raw scores are negated distances; sigmoid keeps them positive so
        // zero-filtering demotes known competitors
        Ok(self.score_matrix(entities, relations).mapv(sigmoid))
    }

    fn score_one(&self, subject: u32, relation: u32, object: u32) -> Result<f32> {
        self.check_ids(&[subject, object], &[relation])?;
        Ok(sigmoid(ScoringFunction::TransE.score(
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
        let scores = self.score_matrix(entities, relations);
        let (loss, delta) = bce_with_logits(&scores, targets);

        let num_entities = self.entities.dim().0;
        let mut grad_entities = Array2::<f32>::zeros(self.entities.raw_dim());
        let mut grad_relations = Array2::<f32>::zeros(self.relations.raw_dim());

        // s = -||q - t||, so ds/dq = -(q - t)/||q - t|| and the tail gets the
        // opposite sign. The query gradient lands on both h and r.
        for (i, (&e, &r)) in entities.iter().zip(relations).enumerate() {
            let (e, r) = (e as usize, r as usize);
            let query = self.query_point(e as u32, r as u32);

            for j in 0..num_entities {
                let d = delta[[i, j]];
                if d == 0.0 {
                    continue;
                }
                let norm = (-scores[[i, j]]).max(NORM_FLOOR);
                for k in 0..self.dim {
                    let g = d * (query[k] - self.entities[[j, k]]) / norm;
                    grad_entities[[e, k]] -= g;
                    grad_relations[[r, k]] -= g;
                    grad_entities[[j, k]] += g;
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> TransE {
        TransE::new(5, 4, &ModelConfig::default().with_embedding_dim(8))
    }

    #[test]
    fn test_scores_are_calibrated() {
        // raw TransE scores are <= 0, so calibrated scores sit in (0, 0.5]
        let model = small_model();
        let scores = model.forward(&[0, 3], &[1, 2]).unwrap();
        assert!(scores.iter().all(|&s| s > 0.0 && s <= 0.5));
    }

    #[test]
    fn test_forward_matches_score_one() {
        let model = small_model();
        let scores = model.forward(&[3], &[0]).unwrap();
        for object in 0..5u32 {
            let single = model.score_one(3, 0, object).unwrap();
            assert!((scores[[0, object as usize]] - single).abs() < 1e-5);
        }
    }

    #[test]
    fn test_train_batch_learns_target() {
        let mut model = small_model();
        let mut opt = Adam::new(0.05, 0.0);

        let mut targets = Array2::zeros((1, 5));
        targets[[0, 1]] = 1.0;

        let first = model.train_batch(&[0], &[2], &targets, &mut opt).unwrap();
        let mut last = first;
        for _ in 0..40 {
            last = model.train_batch(&[0], &[2], &targets, &mut opt).unwrap();
        }
        assert!(last < first);

        let scores = model.forward(&[0], &[2]).unwrap();
        let best = (0..5)
            .max_by(|&a, &b| scores[[0, a]].partial_cmp(&scores[[0, b]]).unwrap())
            .unwrap();
        assert_eq!(best, 1);
    }
}
