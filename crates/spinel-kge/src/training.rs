//! Training loop for link-prediction decoders.
//!
//! The trainer follows the 1-N scoring regime: each batch row is one
//! `(entity, relation)` query scored against every candidate entity, with a
//! multi-hot label vector of all true completions. Labels are smoothed
//! (`(1 - ls) * y + 1/num_entities`) and the objective is binary
//! cross-entropy over the full candidate pool.
//!
//! Every `eval_interval` epochs the model is evaluated on the validation
//! split with the filtered ranking protocol; the combined MRR selects the
//! best checkpoint. Training stops early when validation MRR has not
//! improved for `early_stopping` consecutive evaluations.
//!
//! All randomness is folded into the seeded embedding init; batch order is a
//! deterministic per-epoch rotation, so a run is reproducible from its
//! configuration alone.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::evaluation::{evaluate, RankingReport};
use crate::model::ScoreModel;
use ndarray::Array2;
use spinel_core::{eval_batches, train_queries, Dataset, FilterIndex, TrainQuery};
use std::collections::HashMap;
use std::path::Path;

/// Training hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of training epochs (default: 100).
    pub epochs: usize,
    /// Queries per batch (default: 128).
    pub batch_size: usize,
    /// Adam learning rate (default: 0.001).
    pub learning_rate: f32,
    /// L2 weight decay folded into the gradient (default: 0.0).
    pub weight_decay: f32,
    /// Label smoothing coefficient (default: 0.1).
    pub label_smoothing: f32,
    /// Evaluate on the validation split every this many epochs (default: 2).
    pub eval_interval: usize,
    /// Stop after this many evaluations without MRR improvement
    /// (None = run all epochs).
    pub early_stopping: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 128,
            learning_rate: 0.001,
            weight_decay: 0.0,
            label_smoothing: 0.1,
            eval_interval: 2,
            early_stopping: Some(10),
        }
    }
}

impl TrainConfig {
    /// Set the epoch count.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the batch size (clamped to at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the weight decay.
    pub fn with_weight_decay(mut self, wd: f32) -> Self {
        self.weight_decay = wd;
        self
    }

    /// Set the label smoothing coefficient.
    pub fn with_label_smoothing(mut self, ls: f32) -> Self {
        self.label_smoothing = ls;
        self
    }

    /// Set the evaluation interval.
    pub fn with_eval_interval(mut self, interval: usize) -> Self {
        self.eval_interval = interval.max(1);
        self
    }

    /// Set or disable early stopping.
    pub fn with_early_stopping(mut self, patience: Option<usize>) -> Self {
        self.early_stopping = patience;
        self
    }
}

struct AdamSlot {
    m: Array2<f32>,
    v: Array2<f32>,
    step: i32,
}

/// Adam optimizer with per-parameter moment estimates.
///
/// Weight decay is classic L2 (added to the gradient), matching an Adam
/// optimizer constructed with a `weight_decay` argument.
///
/// Reference: Kingma & Ba (2014), "Adam: A Method for Stochastic
/// Optimization".
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    slots: HashMap<String, AdamSlot>,
}

impl Adam {
    /// Create an optimizer with the given learning rate and L2 weight decay.
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay,
            slots: HashMap::new(),
        }
    }

    /// Apply one update to a named parameter tensor.
    pub fn update(&mut self, name: &str, param: &mut Array2<f32>, grad: &Array2<f32>) {
        debug_assert_eq!(param.dim(), grad.dim());
        let slot = self.slots.entry(name.to_string()).or_insert_with(|| AdamSlot {
            m: Array2::zeros(param.raw_dim()),
            v: Array2::zeros(param.raw_dim()),
            step: 0,
        });

        slot.step += 1;
        let bias1 = 1.0 - self.beta1.powi(slot.step);
        let bias2 = 1.0 - self.beta2.powi(slot.step);

        for ((p, g), (m, v)) in param
            .iter_mut()
            .zip(grad.iter())
            .zip(slot.m.iter_mut().zip(slot.v.iter_mut()))
        {
            let g = g + self.weight_decay * *p;
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Mean batch loss per epoch.
    pub loss_history: Vec<f32>,
    /// Best validation MRR seen.
    pub best_mrr: f64,
    /// Epoch of the best validation MRR (None if never evaluated).
    pub best_epoch: Option<usize>,
    /// Last validation report.
    pub last_report: Option<RankingReport>,
}

/// Train a model on a dataset, periodically evaluating and checkpointing.
///
/// `sink` receives every progress and metric line; `checkpoint_path`, when
/// set, is overwritten whenever validation MRR improves.
pub fn train(
    model: &mut dyn ScoreModel,
    dataset: &Dataset,
    filters: &FilterIndex,
    config: &TrainConfig,
    checkpoint_path: Option<&Path>,
    sink: &mut dyn FnMut(&str),
) -> Result<TrainOutcome> {
    let mut queries = train_queries(dataset);
    let num_entities = dataset.num_entities();
    let mut optimizer = Adam::new(config.learning_rate, config.weight_decay);

    let mut outcome = TrainOutcome {
        loss_history: Vec::with_capacity(config.epochs),
        best_mrr: 0.0,
        best_epoch: None,
        last_report: None,
    };
    let mut stale_evals = 0usize;

    for epoch in 0..config.epochs {
        // deterministic rotation stands in for shuffling
        let rotation = (epoch * 7919) % queries.len().max(1);
        queries.rotate_left(rotation);

        let mut epoch_loss = 0.0;
        let mut num_batches = 0;
        for chunk in queries.chunks(config.batch_size) {
            let (entities, relations, targets) =
                assemble_batch(chunk, num_entities, config.label_smoothing);
            epoch_loss += model.train_batch(&entities, &relations, &targets, &mut optimizer)?;
            num_batches += 1;
        }

        let avg_loss = if num_batches > 0 {
            epoch_loss / num_batches as f32
        } else {
            0.0
        };
        outcome.loss_history.push(avg_loss);
        sink(&format!("epoch {}: loss = {:.4}", epoch, avg_loss));

        if (epoch + 1) % config.eval_interval != 0 {
            continue;
        }

        log_pass_header(sink, "dev_evaluation");
        let report = evaluate(
            model,
            eval_batches(&dataset.valid, dataset, filters, config.batch_size),
        )?;
        for line in report.log_lines() {
            sink(&line);
        }

        if report.mrr > outcome.best_mrr {
            outcome.best_mrr = report.mrr;
            outcome.best_epoch = Some(epoch);
            stale_evals = 0;
            if let Some(path) = checkpoint_path {
                Checkpoint::capture(model, epoch, report.mrr).save(path)?;
                sink(&format!("saving best model to {}", path.display()));
            }
        } else {
            stale_evals += 1;
        }
        outcome.last_report = Some(report);

        if let Some(patience) = config.early_stopping {
            if stale_evals >= patience {
                sink(&format!("early stopping at epoch {}", epoch));
                break;
            }
        }
    }

    Ok(outcome)
}

/// Pass-header lines mirroring the evaluation banner.
pub fn log_pass_header(sink: &mut dyn FnMut(&str), name: &str) {
    sink("");
    sink(&"-".repeat(50));
    sink(name);
    sink(&"-".repeat(50));
    sink("");
}

fn assemble_batch(
    chunk: &[TrainQuery],
    num_entities: usize,
    label_smoothing: f32,
) -> (Vec<u32>, Vec<u32>, Array2<f32>) {
    let entities: Vec<u32> = chunk.iter().map(|q| q.entity).collect();
    let relations: Vec<u32> = chunk.iter().map(|q| q.relation).collect();

    let uniform = 1.0 / num_entities as f32;
    let mut targets = Array2::from_elem((chunk.len(), num_entities), uniform);
    for (i, query) in chunk.iter().enumerate() {
        for &tail in &query.tails {
            targets[[i, tail as usize]] = (1.0 - label_smoothing) + uniform;
        }
    }

    (entities, relations, targets)
}
