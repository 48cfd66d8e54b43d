// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Leave-one-subject-out cross-validation.

Each fold holds out every row of one subject and trains a freshly built
decoder on the rest. Folds only read the shared [`DesignMatrix`] and write
their own [`DecodingScore`], so they run on a bounded rayon pool with no
locking. Results are sorted by subject before being returned, which makes the
output independent of the worker count and of completion order.
*/

use crate::decoder::DecoderSpec;
use crate::design::DesignMatrix;
use crate::metrics::DecodingScore;
use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Row indices of one leave-one-group-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub held_out: Subject,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splitter producing one fold per distinct group
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveOneGroupOut;

impl LeaveOneGroupOut {
    /// One fold per distinct group, in group order.
    ///
    /// A fold with no training or no test rows is a `FoldImbalance`.
    pub fn split(groups: &[Subject]) -> AlignBenchResult<Vec<Fold>> {
        if groups.is_empty() {
            return Err(AlignBenchError::EmptyTable("cross-validation rows".to_string()));
        }

        let mut distinct: Vec<&Subject> = groups.iter().collect();
        distinct.sort();
        distinct.dedup();

        distinct
            .into_iter()
            .map(|held_out| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..groups.len()).partition(|&row| groups[row] == *held_out);
                if train.is_empty() || test.is_empty() {
                    return Err(AlignBenchError::FoldImbalance {
                        subject: held_out.clone(),
                        train_rows: train.len(),
                        test_rows: test.len(),
                    });
                }
                Ok(Fold {
                    held_out: held_out.clone(),
                    train,
                    test,
                })
            })
            .collect()
    }
}

/// Runs folds on a bounded worker pool
#[derive(Debug)]
pub struct FoldRunner {
    workers: usize,
    pool: ThreadPool,
}

impl FoldRunner {
    pub fn new(workers: usize) -> AlignBenchResult<Self> {
        if workers == 0 {
            return Err(AlignBenchError::InvalidParameter(
                "workers must be at least 1".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("alignbench-fold-{}", i))
            .build()
            .map_err(|e| AlignBenchError::InvalidParameter(format!("failed to build worker pool: {}", e)))?;
        Ok(FoldRunner { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Score every fold; the first failing fold aborts the run
    pub fn run(&self, design: &DesignMatrix, decoder: &DecoderSpec) -> AlignBenchResult<Vec<DecodingScore>> {
        let folds = LeaveOneGroupOut::split(design.groups())?;

        let mut scores = self.pool.install(|| {
            folds
                .par_iter()
                .map(|fold| score_fold(design, fold, decoder))
                .collect::<AlignBenchResult<Vec<_>>>()
        })?;

        scores.sort_by(|a, b| a.subject.cmp(&b.subject));
        Ok(scores)
    }
}

fn score_fold(design: &DesignMatrix, fold: &Fold, decoder: &DecoderSpec) -> AlignBenchResult<DecodingScore> {
    let (train_x, train_y) = design.select(&fold.train);
    let (test_x, test_y) = design.select(&fold.test);

    let mut model = decoder.build();
    model.fit(train_x.view(), &train_y)?;
    let accuracy = model.score(test_x.view(), &test_y)?;

    debug!(
        target: "alignbench-evaluation",
        fold = %fold.held_out,
        accuracy,
        n_train = fold.train.len(),
        n_test = fold.test.len(),
        "Fold scored"
    );

    Ok(DecodingScore {
        subject: fold.held_out.clone(),
        accuracy,
        n_train: fold.train.len(),
        n_test: fold.test.len(),
    })
}
