// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fold loop throughput versus worker count

use alignbench_evaluation::{DecoderSpec, DesignMatrix, FoldRunner};
use alignbench_structures::Subject;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

/// Synthetic design: `subjects` groups of `rows_per_subject` rows, two conditions
fn generate_design(subjects: usize, rows_per_subject: usize, features: usize) -> DesignMatrix {
    let n = subjects * rows_per_subject;
    let data = Array2::from_shape_fn((n, features), |(i, j)| {
        let condition = (i % 2) as f64;
        ((i * 13 + j * 7) % 23) as f64 / 23.0 + condition * 0.3
    });
    let labels = (0..n).map(|i| (i % 2).to_string()).collect();
    let groups = (0..n)
        .map(|i| Subject::new(format!("sub-{:02}", i / rows_per_subject)))
        .collect();
    DesignMatrix::new(data, labels, groups).expect("valid design")
}

fn bench_fold_runner(c: &mut Criterion) {
    let design = generate_design(12, 40, 500);
    let mut group = c.benchmark_group("fold_runner");

    for decoder in [DecoderSpec::nearest_centroid(), DecoderSpec::logistic(0.1, 50, 1e-3)] {
        for workers in [1usize, 2, 4, 8] {
            let runner = FoldRunner::new(workers).expect("worker pool");
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", decoder.kind), workers),
                &workers,
                |b, _| b.iter(|| runner.run(black_box(&design), &decoder).expect("run")),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_fold_runner);
criterion_main!(benches);
