//! Filtered ranking evaluation for link prediction.
//!
//! Implements the standard filtered protocol used by completion benchmarks
//! (FB15k-237, WN18RR, Kinship): for a test triple `(s, r, o)`, score every
//! candidate entity for the tail query `(s, r, ?)` and for the reciprocal
//! head query `(o, r_reverse, ?)`, remove known-true competitors, and record
//! the rank of the true target in each direction.
//!
//! # Filtering
//!
//! | Setting | Candidate pool | Use |
//! |---------|----------------|-----|
//! | Raw | all entities | pessimistic estimate |
//! | Filtered | all entities minus other known completions | standard |
//!
//! Filtering zeroes the scores of every known completion of the query and
//! then restores the target's own score, which the zeroing pass may have hit
//! (the filter set is a superset that can contain the target itself). The
//! target always competes under its own score, never under zero. Decoders
//! emit sigmoid-calibrated scores in `(0, 1)`, so a zeroed competitor drops
//! below every live candidate.
//!
//! # Ranks and ties
//!
//! The rank is the 1-based position of the target in a stable descending
//! sort of the filtered score vector: strictly higher-scored candidates rank
//! first, equal-scored candidates keep ascending index order.
//!
//! # Accumulation
//!
//! [`RankAccumulator`] collects per-example ranks and hit indicators for
//! both directions; [`RankAccumulator::merge`] concatenates two
//! accumulators, so batches may be reduced independently (in any order) and
//! merged before [`RankAccumulator::finalize`].
//!
//! # References
//!
//! - Bordes et al. (2013), "Translating Embeddings for Modeling
//!   Multi-relational Data" (the original filtered protocol)
//! - Ruffinelli et al. (2020), "You CAN Teach an Old Dog New Tricks"
//!   (evaluation pitfalls, tie handling)

use crate::error::{Error, Result};
use crate::model::ScoreModel;
use spinel_core::EvalBatch;

/// Number of hits@k cutoffs reported (k = 1..=10).
pub const HITS_LEVELS: usize = 10;

/// Which query of a test triple an example came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Tail query `(s, r, ?)` — the object is ranked.
    Left,
    /// Head query `(o, r_reverse, ?)` — the subject is ranked.
    Right,
}

/// Compute the filtered rank of `target` within one score vector.
///
/// `scores` is mutated in place: every id in `filter` is zeroed, then the
/// target's original score is written back. The rank is the target's 1-based
/// position in the stable descending order of the result.
pub fn filtered_rank(scores: &mut [f32], target: u32, filter: &[u32]) -> Result<usize> {
    let num_entities = scores.len();
    if target as usize >= num_entities {
        return Err(Error::EntityOutOfRange {
            id: target,
            num_entities,
        });
    }

    let target_value = scores[target as usize];
    for &id in filter {
        match scores.get_mut(id as usize) {
            Some(slot) => *slot = 0.0,
            None => {
                return Err(Error::EntityOutOfRange {
                    id,
                    num_entities,
                })
            }
        }
    }
    scores[target as usize] = target_value;

    let mut order: Vec<u32> = (0..num_entities as u32).collect();
    order.sort_by(|&a, &b| {
        scores[b as usize]
            .partial_cmp(&scores[a as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // target is guaranteed present: order is a permutation of 0..n
    let position = order.iter().position(|&id| id == target).unwrap_or(0);
    Ok(position + 1)
}

/// Accumulates ranks and hit indicators over one evaluation pass.
///
/// Owns its lists exclusively; a pass starts from [`RankAccumulator::new`]
/// and nothing survives it except the finalized report.
#[derive(Debug, Clone, Default)]
pub struct RankAccumulator {
    ranks: Vec<usize>,
    ranks_left: Vec<usize>,
    ranks_right: Vec<usize>,
    hits: [Vec<f32>; HITS_LEVELS],
    hits_left: [Vec<f32>; HITS_LEVELS],
    hits_right: [Vec<f32>; HITS_LEVELS],
}

impl RankAccumulator {
    /// Fresh accumulator with empty lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one ranked example.
    ///
    /// Appends the rank to the combined and direction lists and an indicator
    /// per cutoff level to the combined and direction hit-lists.
    pub fn add_example(&mut self, direction: Direction, rank: usize) {
        self.ranks.push(rank);
        let side_ranks = match direction {
            Direction::Left => &mut self.ranks_left,
            Direction::Right => &mut self.ranks_right,
        };
        side_ranks.push(rank);

        let side_hits = match direction {
            Direction::Left => &mut self.hits_left,
            Direction::Right => &mut self.hits_right,
        };
        for level in 0..HITS_LEVELS {
            let hit = if rank - 1 <= level { 1.0 } else { 0.0 };
            self.hits[level].push(hit);
            side_hits[level].push(hit);
        }
    }

    /// Concatenate another accumulator into this one.
    ///
    /// Concatenation order does not affect the finalized means, so per-batch
    /// accumulators may be reduced in parallel and merged in any order.
    pub fn merge(&mut self, other: RankAccumulator) {
        self.ranks.extend(other.ranks);
        self.ranks_left.extend(other.ranks_left);
        self.ranks_right.extend(other.ranks_right);
        for level in 0..HITS_LEVELS {
            self.hits[level].extend(other.hits[level].iter().copied());
            self.hits_left[level].extend(other.hits_left[level].iter().copied());
            self.hits_right[level].extend(other.hits_right[level].iter().copied());
        }
    }

    /// Number of recorded examples (both directions combined).
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Reduce the lists to their means.
    ///
    /// An empty accumulator finalizes to an all-zero report with
    /// `num_examples == 0`; callers that require at least one example should
    /// check [`RankAccumulator::is_empty`] first.
    pub fn finalize(&self) -> RankingReport {
        let mut report = RankingReport {
            num_examples: self.ranks.len(),
            num_left: self.ranks_left.len(),
            num_right: self.ranks_right.len(),
            ..RankingReport::default()
        };

        for level in 0..HITS_LEVELS {
            report.hits[level] = mean_f32(&self.hits[level]);
            report.hits_left[level] = mean_f32(&self.hits_left[level]);
            report.hits_right[level] = mean_f32(&self.hits_right[level]);
        }
        report.mean_rank = mean_rank(&self.ranks);
        report.mean_rank_left = mean_rank(&self.ranks_left);
        report.mean_rank_right = mean_rank(&self.ranks_right);
        report.mrr = mean_reciprocal(&self.ranks);
        report.mrr_left = mean_reciprocal(&self.ranks_left);
        report.mrr_right = mean_reciprocal(&self.ranks_right);

        report
    }
}

fn mean_f32(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

fn mean_rank(ranks: &[usize]) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }
    ranks.iter().map(|&r| r as f64).sum::<f64>() / ranks.len() as f64
}

fn mean_reciprocal(ranks: &[usize]) -> f64 {
    if ranks.is_empty() {
        return 0.0;
    }
    ranks.iter().map(|&r| 1.0 / r as f64).sum::<f64>() / ranks.len() as f64
}

/// Aggregated metrics of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct RankingReport {
    /// Combined hit rate per cutoff (index k = hits@(k+1)).
    pub hits: [f64; HITS_LEVELS],
    /// Tail-query hit rates.
    pub hits_left: [f64; HITS_LEVELS],
    /// Head-query hit rates.
    pub hits_right: [f64; HITS_LEVELS],
    /// Combined mean rank.
    pub mean_rank: f64,
    /// Tail-query mean rank.
    pub mean_rank_left: f64,
    /// Head-query mean rank.
    pub mean_rank_right: f64,
    /// Combined mean reciprocal rank — the model-selection criterion.
    pub mrr: f64,
    /// Tail-query MRR.
    pub mrr_left: f64,
    /// Head-query MRR.
    pub mrr_right: f64,
    /// Total ranked examples (both directions).
    pub num_examples: usize,
    /// Tail-query examples.
    pub num_left: usize,
    /// Head-query examples.
    pub num_right: usize,
}

impl RankingReport {
    /// The metric lines of one pass, in reporting order.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(3 * HITS_LEVELS + 6);
        for level in 0..HITS_LEVELS {
            lines.push(format!("Hits left @{}: {:.6}", level + 1, self.hits_left[level]));
            lines.push(format!("Hits right @{}: {:.6}", level + 1, self.hits_right[level]));
            lines.push(format!("Hits @{}: {:.6}", level + 1, self.hits[level]));
        }
        lines.push(format!("Mean rank left: {:.6}", self.mean_rank_left));
        lines.push(format!("Mean rank right: {:.6}", self.mean_rank_right));
        lines.push(format!("Mean rank: {:.6}", self.mean_rank));
        lines.push(format!(
            "Mean reciprocal rank left: {:.6}",
            self.mrr_left
        ));
        lines.push(format!(
            "Mean reciprocal rank right: {:.6}",
            self.mrr_right
        ));
        lines.push(format!("Mean reciprocal rank: {:.6}", self.mrr));
        lines
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        format!(
            "MRR: {:.4} | MR: {:.1} | H@1: {:.3} | H@3: {:.3} | H@10: {:.3} (n={})",
            self.mrr,
            self.mean_rank,
            self.hits[0],
            self.hits[2],
            self.hits[9],
            self.num_examples
        )
    }
}

/// Run one full evaluation pass of a model over pre-built batches.
///
/// For every batch, the model scores the tail queries and the reciprocal
/// head queries; each example contributes one rank per direction. Errors if
/// the batches yield no examples at all.
pub fn evaluate<I>(model: &dyn ScoreModel, batches: I) -> Result<RankingReport>
where
    I: IntoIterator<Item = EvalBatch>,
{
    let mut accumulator = RankAccumulator::new();

    for batch in batches {
        let tail_scores = model.forward(&batch.subjects, &batch.relations)?;
        let head_scores = model.forward(&batch.objects, &batch.reverse_relations)?;

        for i in 0..batch.len() {
            let mut row = tail_scores.row(i).to_vec();
            let rank = filtered_rank(&mut row, batch.objects[i], &batch.tail_filters[i])?;
            accumulator.add_example(Direction::Left, rank);
        }
        for i in 0..batch.len() {
            let mut row = head_scores.row(i).to_vec();
            let rank = filtered_rank(&mut row, batch.subjects[i], &batch.head_filters[i])?;
            accumulator.add_example(Direction::Right, rank);
        }
    }

    if accumulator.is_empty() {
        return Err(Error::EmptyEvaluation);
    }
    Ok(accumulator.finalize())
}
