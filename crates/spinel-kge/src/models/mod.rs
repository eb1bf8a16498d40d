//! Decoder implementations.
//!
//! Each decoder implements [`ScoreModel`](crate::ScoreModel): it owns its
//! embedding tables as dense `(rows, dim)` matrices indexed by the dense ids
//! of spinel-core, scores 1-N queries against every candidate entity, and
//! computes its own gradients for the binary cross-entropy objective.
//!
//! | Decoder | Score | Storage |
//! |---------|-------|---------|
//! | [`DistMult`] | `<h, r, t>` | `(n, d)` |
//! | [`ComplEx`] | `Re(<h, r, conj(t)>)` | `(n, 2d)`, re/im interleaved |
//! | [`TransE`] | `-\|\|h + r - t\|\|` | `(n, d)` |
//!
//! Initialization is deterministic: embeddings are derived from a hash of
//! `(seed, row, column)` and row-normalized, so two runs with the same seed
//! start from identical tables without a random-number dependency.

mod complex;
mod distmult;
mod transe;

pub use complex::ComplEx;
pub use distmult::DistMult;
pub use transe::TransE;

use crate::error::{Error, Result};
use ndarray::Array2;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic seeded embedding table, row-normalized.
pub(crate) fn seeded_embeddings(rows: usize, cols: usize, seed: u64) -> Array2<f32> {
    let mut table = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        r.hash(&mut hasher);
        c.hash(&mut hasher);
        let raw = hasher.finish();
        (raw as f64 / u64::MAX as f64 - 0.5) as f32
    });

    for mut row in table.rows_mut() {
        let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-8 {
            row.mapv_inplace(|x| x / norm);
        }
    }

    table
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Binary cross-entropy over logit scores, mean-reduced over all elements.
///
/// Returns the loss together with `dL/dscores` (already divided by the
/// element count), computed in the numerically stable log-sum-exp form.
pub(crate) fn bce_with_logits(scores: &Array2<f32>, targets: &Array2<f32>) -> (f32, Array2<f32>) {
    debug_assert_eq!(scores.dim(), targets.dim());
    let count = scores.len() as f32;

    let mut loss = 0.0f32;
    let mut delta = Array2::<f32>::zeros(scores.raw_dim());
    for ((idx, &s), &y) in scores.indexed_iter().zip(targets.iter()) {
        loss += s.max(0.0) - s * y + (1.0 + (-s.abs()).exp()).ln();
        delta[idx] = (sigmoid(s) - y) / count;
    }

    (loss / count, delta)
}

/// Pull one named tensor out of a checkpoint parameter list, shape-checked.
pub(crate) fn take_param(
    params: &mut Vec<(String, Array2<f32>)>,
    name: &str,
    expected: (usize, usize),
) -> Result<Array2<f32>> {
    let pos = params
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| Error::MissingParameter(name.to_string()))?;
    let (_, tensor) = params.swap_remove(pos);

    if tensor.dim() != expected {
        return Err(Error::ParameterShape {
            name: name.to_string(),
            expected: vec![expected.0, expected.1],
            found: vec![tensor.dim().0, tensor.dim().1],
        });
    }

    Ok(tensor)
}
