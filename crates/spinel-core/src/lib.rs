//! Core data types for knowledge graph completion.
//!
//! This crate owns everything the trainer and evaluator consume but do not
//! compute: triple datasets with dense integer ids, entity/relation
//! vocabularies with reciprocal relations, the known-completion index used
//! by filtered evaluation, and batching for both the 1-N training setup and
//! the ranking protocol.
//!
//! # Dataset layout
//!
//! ```text
//! data/kinship/
//!   train.txt     subject<TAB>relation<TAB>object per line
//!   valid.txt
//!   test.txt
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use spinel_core::{Dataset, FilterIndex, eval_batches};
//!
//! let dataset = Dataset::load("data/kinship")?;
//! let filters = FilterIndex::build(&dataset);
//!
//! for batch in eval_batches(&dataset.test, &dataset, &filters, 128) {
//!     // feed to the ranking evaluator
//! }
//! ```

mod batch;
mod dataset;
mod error;
mod filter;
mod triple;
mod vocab;

pub use batch::{eval_batches, train_queries, EvalBatch, TrainQuery};
pub use dataset::{Dataset, Split};
pub use error::{DataError, Result};
pub use filter::FilterIndex;
pub use triple::Triple;
pub use vocab::{RelationVocab, Vocabulary};
