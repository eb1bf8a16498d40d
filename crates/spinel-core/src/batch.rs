//! Batching for training and ranking evaluation.
//!
//! Evaluation batches carry everything the ranking evaluator needs for one
//! slice of test triples: query ids for both corruption directions, the true
//! target per direction, and the filter id-sets of known completions.
//! Batches are materialized per slice and dropped after consumption; the
//! only state that outlives them is the evaluator's accumulator.
//!
//! Training uses the 1-N scoring setup: one query per distinct
//! `(entity, relation)` pair with the multi-set of all its true tails, taken
//! over both directions of the training split.

use crate::dataset::Dataset;
use crate::filter::FilterIndex;
use crate::triple::Triple;
use std::collections::BTreeMap;

/// One evaluation batch over both corruption directions.
///
/// All vectors have the same length (the batch size; the final batch of a
/// pass may be shorter). `tail_filters[i]` holds the known completions of
/// `(subjects[i], relations[i], ?)`; `head_filters[i]` those of
/// `(objects[i], reverse_relations[i], ?)`.
#[derive(Debug, Clone)]
pub struct EvalBatch {
    /// Subject entity ids.
    pub subjects: Vec<u32>,
    /// Object entity ids (targets of the tail-query direction).
    pub objects: Vec<u32>,
    /// Forward relation ids.
    pub relations: Vec<u32>,
    /// Reciprocal relation ids.
    pub reverse_relations: Vec<u32>,
    /// Known tails of `(subject, relation)` per example.
    pub tail_filters: Vec<Vec<u32>>,
    /// Known heads of `(object, relation)` per example, expressed as tails
    /// of the reciprocal query.
    pub head_filters: Vec<Vec<u32>>,
}

impl EvalBatch {
    /// Number of examples in this batch.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// True if the batch has no examples.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Iterate a split in evaluation batches of `batch_size` (the last batch may
/// be shorter).
///
/// Panics if `batch_size` is zero.
pub fn eval_batches<'a>(
    triples: &'a [Triple],
    dataset: &'a Dataset,
    filters: &'a FilterIndex,
    batch_size: usize,
) -> impl Iterator<Item = EvalBatch> + 'a {
    assert!(batch_size > 0, "batch_size must be positive");

    triples.chunks(batch_size).map(move |chunk| {
        let mut batch = EvalBatch {
            subjects: Vec::with_capacity(chunk.len()),
            objects: Vec::with_capacity(chunk.len()),
            relations: Vec::with_capacity(chunk.len()),
            reverse_relations: Vec::with_capacity(chunk.len()),
            tail_filters: Vec::with_capacity(chunk.len()),
            head_filters: Vec::with_capacity(chunk.len()),
        };

        for triple in chunk {
            let reverse = dataset.relations.reverse(triple.relation);
            batch.subjects.push(triple.subject);
            batch.objects.push(triple.object);
            batch.relations.push(triple.relation);
            batch.reverse_relations.push(reverse);
            batch
                .tail_filters
                .push(filters.completions(triple.subject, triple.relation).to_vec());
            batch
                .head_filters
                .push(filters.completions(triple.object, reverse).to_vec());
        }

        batch
    })
}

/// A 1-N training query: one `(entity, relation)` pair with all true tails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainQuery {
    /// Query entity id.
    pub entity: u32,
    /// Query relation id (forward or reciprocal).
    pub relation: u32,
    /// All entities completing the query in the training split, sorted.
    pub tails: Vec<u32>,
}

/// Collect the distinct training queries of a dataset, both directions.
///
/// Ordering is deterministic (sorted by `(entity, relation)`), so runs with
/// the same seed reproduce the same batch sequence.
pub fn train_queries(dataset: &Dataset) -> Vec<TrainQuery> {
    let mut queries: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();

    for triple in &dataset.train {
        queries
            .entry((triple.subject, triple.relation))
            .or_default()
            .push(triple.object);
        queries
            .entry((triple.object, dataset.relations.reverse(triple.relation)))
            .or_default()
            .push(triple.subject);
    }

    queries
        .into_iter()
        .map(|((entity, relation), mut tails)| {
            tails.sort_unstable();
            tails.dedup();
            TrainQuery {
                entity,
                relation,
                tails,
            }
        })
        .collect()
}
