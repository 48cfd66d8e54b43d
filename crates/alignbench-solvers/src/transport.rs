// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Entropic optimal transport between the voxels of two feature blocks.

Each column (voxel) of the source block is a point described by its response
across samples; likewise for the target. The squared Euclidean cost between
points is scaled into `[0, 1]` and the entropy-regularized plan with uniform
marginals is found by Sinkhorn iterations. The plan multiplied by the number of
voxels is row-stochastic and is used directly as the voxel-to-voxel map.
*/

use ndarray::{Array1, Array2, ArrayView2, Axis};
use thiserror::Error;

const MARGINAL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("source has {source_points} voxels but target has {target_points}")]
    UnequalSupport {
        source_points: usize,
        target_points: usize,
    },

    #[error("source and target disagree on sample count ({0} vs {1})")]
    SampleMismatch(usize, usize),

    #[error("epsilon must be positive and finite, got {0}")]
    InvalidEpsilon(f64),

    #[error("Sinkhorn scaling underflowed; increase epsilon")]
    Underflow,
}

/// Squared Euclidean distance between source column `i` and target column `j`
pub fn voxel_cost(source: ArrayView2<'_, f64>, target: ArrayView2<'_, f64>) -> Array2<f64> {
    let p = source.ncols();
    let q = target.ncols();
    let mut cost = Array2::<f64>::zeros((p, q));
    for i in 0..p {
        let a = source.column(i);
        for j in 0..q {
            let b = target.column(j);
            cost[[i, j]] = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        }
    }
    cost
}

/// Sinkhorn plan scaled to a row-stochastic voxel map
pub fn sinkhorn_map(
    source: ArrayView2<'_, f64>,
    target: ArrayView2<'_, f64>,
    epsilon: f64,
    max_iterations: usize,
) -> Result<Array2<f64>, TransportError> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(TransportError::InvalidEpsilon(epsilon));
    }
    if source.nrows() != target.nrows() {
        return Err(TransportError::SampleMismatch(source.nrows(), target.nrows()));
    }
    let p = source.ncols();
    if p != target.ncols() {
        return Err(TransportError::UnequalSupport {
            source_points: p,
            target_points: target.ncols(),
        });
    }

    let mut cost = voxel_cost(source, target);
    let max_cost = cost.fold(0.0_f64, |acc, &c| acc.max(c));
    if max_cost > 0.0 {
        cost.mapv_inplace(|c| c / max_cost);
    }
    let kernel = cost.mapv(|c| (-c / epsilon).exp());

    let marginal = 1.0 / p as f64;
    let mut u = Array1::<f64>::from_elem(p, 1.0);
    let mut v = Array1::<f64>::from_elem(p, 1.0);

    for iteration in 0..max_iterations {
        let kv = kernel.dot(&v);
        if kv.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
            return Err(TransportError::Underflow);
        }
        u = kv.mapv(|x| marginal / x);

        let ktu = kernel.t().dot(&u);
        if ktu.iter().any(|&x| x <= 0.0 || !x.is_finite()) {
            return Err(TransportError::Underflow);
        }
        v = ktu.mapv(|x| marginal / x);

        // column marginals are exact after the v update; check the rows
        let row_sums = &u * &kernel.dot(&v);
        let error: f64 = row_sums.iter().map(|r| (r - marginal).abs()).sum();
        if error < MARGINAL_TOLERANCE {
            tracing::trace!(target: "alignbench-solvers", "Sinkhorn converged after {} iterations", iteration + 1);
            break;
        }
    }

    let mut plan = kernel;
    for (i, mut row) in plan.axis_iter_mut(Axis(0)).enumerate() {
        row *= &v;
        row *= u[i] * p as f64;
    }
    Ok(plan)
}
