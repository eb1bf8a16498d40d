//! Property-based tests for the filtered ranking evaluator.
//!
//! These verify invariants that must hold for any score vector, filter set
//! and rank list:
//! - ranks are always in `[1, num_entities]`
//! - filtering followed by target restoration is idempotent
//! - hits@k is monotonically non-decreasing in k
//! - MRR lies in (0, 1] and is 1 exactly when every rank is 1
//! - a target inside its own filter set never loses its score

use proptest::prelude::*;
use spinel_kge::{filtered_rank, Direction, RankAccumulator, HITS_LEVELS};

/// Score vector plus a valid target index.
fn arb_scores_and_target() -> impl Strategy<Value = (Vec<f32>, u32)> {
    prop::collection::vec(-1.0f32..1.0, 1..40).prop_flat_map(|scores| {
        let len = scores.len() as u32;
        (Just(scores), 0..len)
    })
}

/// Score vector, target, and a filter drawn from valid indices.
fn arb_ranking_input() -> impl Strategy<Value = (Vec<f32>, u32, Vec<u32>)> {
    arb_scores_and_target().prop_flat_map(|(scores, target)| {
        let len = scores.len() as u32;
        (
            Just(scores),
            Just(target),
            prop::collection::vec(0..len, 0..20),
        )
    })
}

mod rank_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn rank_is_within_candidate_range((scores, target, filter) in arb_ranking_input()) {
            let num_entities = scores.len();
            let mut buffer = scores;
            let rank = filtered_rank(&mut buffer, target, &filter).unwrap();

            prop_assert!(rank >= 1, "rank {} below 1", rank);
            prop_assert!(
                rank <= num_entities,
                "rank {} above candidate count {}",
                rank, num_entities
            );
        }

        #[test]
        fn filtering_is_idempotent((scores, target, filter) in arb_ranking_input()) {
            let mut buffer = scores;
            let first = filtered_rank(&mut buffer, target, &filter).unwrap();
            // second pass over the already-filtered vector
            let second = filtered_rank(&mut buffer, target, &filter).unwrap();

            prop_assert_eq!(first, second);
        }

        #[test]
        fn target_keeps_its_score_inside_own_filter((scores, target, mut filter) in arb_ranking_input()) {
            // with the target forced into the filter set
            filter.push(target);
            let mut with_self = scores.clone();
            let rank_with_self = filtered_rank(&mut with_self, target, &filter).unwrap();
            prop_assert!(
                (with_self[target as usize] - scores[target as usize]).abs() < 1e-9,
                "target score was not restored"
            );

            // and with the target removed from it
            let without: Vec<u32> = filter.iter().copied().filter(|&id| id != target).collect();
            let mut plain = scores;
            let rank_without_self = filtered_rank(&mut plain, target, &without).unwrap();

            prop_assert_eq!(rank_with_self, rank_without_self);
        }

        #[test]
        fn unfiltered_rank_counts_strictly_better((scores, target) in arb_scores_and_target()) {
            // with no filter and no ties, rank is 1 + number of strictly
            // higher scores; equal scores resolve by index order
            let mut buffer = scores.clone();
            let rank = filtered_rank(&mut buffer, target, &[]).unwrap();

            let t = scores[target as usize];
            let strictly_better = scores.iter().filter(|&&s| s > t).count();
            let tied_before = scores[..target as usize].iter().filter(|&&s| s == t).count();

            prop_assert_eq!(rank, 1 + strictly_better + tied_before);
        }
    }
}

mod metric_props {
    use super::*;

    fn accumulate(ranks: &[usize]) -> RankAccumulator {
        let mut acc = RankAccumulator::new();
        for (i, &rank) in ranks.iter().enumerate() {
            let direction = if i % 2 == 0 { Direction::Left } else { Direction::Right };
            acc.add_example(direction, rank);
        }
        acc
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn hits_monotone_in_k(ranks in prop::collection::vec(1usize..100, 1..50)) {
            let report = accumulate(&ranks).finalize();

            for level in 1..HITS_LEVELS {
                prop_assert!(
                    report.hits[level] + 1e-12 >= report.hits[level - 1],
                    "hits@{} = {} < hits@{} = {}",
                    level + 1, report.hits[level], level, report.hits[level - 1]
                );
            }
        }

        #[test]
        fn mrr_in_unit_interval(ranks in prop::collection::vec(1usize..100, 1..50)) {
            let report = accumulate(&ranks).finalize();

            prop_assert!(report.mrr > 0.0);
            prop_assert!(report.mrr <= 1.0);

            let all_first = ranks.iter().all(|&r| r == 1);
            prop_assert_eq!(report.mrr == 1.0, all_first);
        }

        #[test]
        fn merge_is_order_independent(
            left in prop::collection::vec(1usize..50, 1..20),
            right in prop::collection::vec(1usize..50, 1..20),
        ) {
            let a = accumulate(&left);
            let b = accumulate(&right);

            let mut ab = a.clone();
            ab.merge(b.clone());
            let mut ba = b;
            ba.merge(a);

            let ra = ab.finalize();
            let rb = ba.finalize();

            prop_assert_eq!(ra.num_examples, rb.num_examples);
            prop_assert!((ra.mrr - rb.mrr).abs() < 1e-12);
            prop_assert!((ra.mean_rank - rb.mean_rank).abs() < 1e-12);
            for level in 0..HITS_LEVELS {
                prop_assert!((ra.hits[level] - rb.hits[level]).abs() < 1e-12);
            }
        }
    }
}
