//! Property tests for the cross-validation engine
//!
//! Leave-one-group-out partition law, aggregate law and worker-count independence

use alignbench_evaluation::{
    aggregate, DecoderSpec, DecodingScore, DesignMatrix, FoldRunner, LeaveOneGroupOut,
};
use alignbench_structures::Subject;
use ndarray::Array2;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Group ids with at least two distinct subjects
fn group_strategy() -> impl Strategy<Value = Vec<Subject>> {
    prop::collection::vec(0u8..5, 2..40)
        .prop_filter("need two distinct groups", |ids| {
            ids.iter().collect::<BTreeSet<_>>().len() >= 2
        })
        .prop_map(|ids| {
            ids.into_iter()
                .map(|id| Subject::new(format!("sub-{:02}", id)))
                .collect()
        })
}

fn design_for(groups: Vec<Subject>, seed: u64) -> DesignMatrix {
    let n = groups.len();
    let features = Array2::from_shape_fn((n, 3), |(i, j)| {
        let x = (i as u64 * 31 + j as u64 * 17 + seed) % 97;
        x as f64 / 97.0 + if i % 2 == 0 { 0.0 } else { 0.5 }
    });
    let labels = (0..n).map(|i| (i % 2).to_string()).collect();
    DesignMatrix::new(features, labels, groups).expect("Failed to build design matrix")
}

// ============================================================================
// Partition law
// ============================================================================

proptest! {
    #[test]
    fn prop_test_sets_cover_every_row_once(groups in group_strategy()) {
        let folds = LeaveOneGroupOut::split(&groups).expect("Split failed");

        let mut seen = vec![0usize; groups.len()];
        for fold in &folds {
            for &row in &fold.test {
                seen[row] += 1;
                prop_assert_eq!(&groups[row], &fold.held_out);
            }
            for &row in &fold.train {
                prop_assert_ne!(&groups[row], &fold.held_out);
            }
            prop_assert_eq!(fold.train.len() + fold.test.len(), groups.len());
        }
        prop_assert!(seen.iter().all(|&count| count == 1));

        let distinct: BTreeSet<&Subject> = groups.iter().collect();
        prop_assert_eq!(folds.len(), distinct.len());
    }
}

// ============================================================================
// Aggregate law and order independence
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_one_worker_equals_many(groups in group_strategy(), seed in 0u64..1000, workers in 2usize..6) {
        let design = design_for(groups, seed);
        let decoder = DecoderSpec::nearest_centroid();

        let single = FoldRunner::new(1).expect("pool").run(&design, &decoder).expect("run");
        let multi = FoldRunner::new(workers).expect("pool").run(&design, &decoder).expect("run");

        prop_assert_eq!(&single, &multi);

        let (single_value, single_scores) = aggregate(&single).expect("aggregate");
        let (multi_value, multi_scores) = aggregate(&multi).expect("aggregate");
        prop_assert_eq!(single_value, multi_value);
        prop_assert_eq!(single_scores, multi_scores);
    }

    #[test]
    fn prop_value_is_mean_of_scores(accuracies in prop::collection::vec(0.0f64..=1.0, 1..20)) {
        let mut scores: Vec<DecodingScore> = accuracies
            .iter()
            .enumerate()
            .map(|(i, &accuracy)| DecodingScore {
                subject: Subject::new(format!("sub-{:02}", i)),
                accuracy,
                n_train: 1,
                n_test: 1,
            })
            .collect();
        scores.reverse();

        let (value, _) = aggregate(&scores).expect("aggregate");
        let mean = accuracies.iter().sum::<f64>() / accuracies.len() as f64;
        prop_assert!((value - mean).abs() <= 1e-9 * mean.abs().max(1.0));
    }
}

#[test]
fn test_logistic_decoder_is_worker_independent() {
    let groups: Vec<Subject> = (0..12).map(|i| Subject::new(format!("sub-{}", i % 4))).collect();
    let design = design_for(groups, 7);
    let decoder = DecoderSpec::logistic(0.2, 50, 1e-3);

    let single = FoldRunner::new(1).expect("pool").run(&design, &decoder).expect("run");
    let multi = FoldRunner::new(4).expect("pool").run(&design, &decoder).expect("run");
    assert_eq!(single, multi);
    assert_eq!(single.len(), 4);
}
