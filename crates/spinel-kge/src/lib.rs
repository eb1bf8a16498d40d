//! Knowledge graph completion: embedding decoders, training and filtered
//! ranking evaluation.
//!
//! Given a triple dataset from [`spinel_core`], this crate trains an
//! embedding decoder to score `(entity, relation, ?)` queries against every
//! candidate entity, and measures link-prediction quality with the filtered
//! ranking protocol (mean rank, mean reciprocal rank, hits@1..10, per
//! corruption direction and combined).
//!
//! # Decoders
//!
//! | Tag | Model | Score |
//! |-----|-------|-------|
//! | `distmult` | [`models::DistMult`] | `<h, r, t>` |
//! | `complex` | [`models::ComplEx`] | `Re(<h, r, conj(t)>)` |
//! | `transe` | [`models::TransE`] | `-\|\|h + r - t\|\|` |
//!
//! Variants are resolved from configuration tags through [`ModelKind`];
//! unknown tags fail before any training starts.
//!
//! # Example
//!
//! ```rust,ignore
//! use spinel_core::{Dataset, FilterIndex, eval_batches};
//! use spinel_kge::{evaluate, train, ModelConfig, ModelKind, TrainConfig};
//!
//! let dataset = Dataset::load("data/kinship")?;
//! let filters = FilterIndex::build(&dataset);
//!
//! let kind: ModelKind = "distmult".parse()?;
//! let mut model = kind.build(
//!     dataset.num_entities(),
//!     dataset.num_relations(),
//!     &ModelConfig::default(),
//! );
//!
//! let outcome = train(
//!     model.as_mut(), &dataset, &filters,
//!     &TrainConfig::default(), Some("best.ckpt".as_ref()),
//!     &mut |line| println!("{line}"),
//! )?;
//!
//! let report = evaluate(
//!     model.as_ref(),
//!     eval_batches(&dataset.test, &dataset, &filters, 128),
//! )?;
//! println!("{}", report.summary());
//! ```

mod checkpoint;
mod error;
mod evaluation;
mod model;
pub mod models;
mod scoring;
mod training;

pub use checkpoint::{Checkpoint, TensorEntry};
pub use error::{Error, Result};
pub use evaluation::{
    evaluate, filtered_rank, Direction, RankAccumulator, RankingReport, HITS_LEVELS,
};
pub use model::{Device, ModelConfig, ModelKind, ScoreModel};
pub use scoring::ScoringFunction;
pub use training::{log_pass_header, train, Adam, TrainConfig, TrainOutcome};
