// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Deterministic shared response model.

All subjects are fitted jointly: each subject `i` gets an orthonormal basis
`W_i` (features × components) and the group shares a response `S`
(samples × components). Fitting alternates

```text
S   = mean_i(X_i W_i)
W_i = polar(X_iᵀ S)
```

starting from seeded random orthonormal bases, so the same seed and data give
the same model. A subject's data is transformed into the shared space as
`X W_i`.
*/

use crate::estimator::{AlignmentEstimator, OutputSpace};
use crate::linalg::{polar_factor, random_orthonormal};
use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

const METHOD: &str = "srm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrmParams {
    pub n_components: usize,
    pub n_iterations: usize,
    pub seed: u64,
}

impl Default for SrmParams {
    fn default() -> Self {
        SrmParams {
            n_components: 10,
            n_iterations: 10,
            seed: 0,
        }
    }
}

/// Jointly fitted bases for every subject plus the shared response
#[derive(Debug, Clone)]
pub struct SharedResponseModel {
    bases: BTreeMap<Subject, Array2<f64>>,
    shared_response: Array2<f64>,
    n_components: usize,
}

impl SharedResponseModel {
    /// Fit one model over all `(subject, samples × features)` pairs
    pub fn fit(
        subjects: &[Subject],
        data: &[ArrayView2<'_, f64>],
        params: &SrmParams,
    ) -> AlignBenchResult<Self> {
        if subjects.is_empty() {
            return Err(AlignBenchError::fit_failure(None, METHOD, "no subjects to fit"));
        }
        if subjects.len() != data.len() {
            return Err(AlignBenchError::shape_mismatch(
                "srm fit",
                format!("{} data blocks", subjects.len()),
                format!("{} data blocks", data.len()),
            ));
        }

        let (n_samples, n_features) = data[0].dim();
        for (subject, block) in subjects.iter().zip(data) {
            if block.dim() != (n_samples, n_features) {
                return Err(AlignBenchError::shape_mismatch(
                    format!("srm fit for subject '{}'", subject),
                    format!("{:?}", (n_samples, n_features)),
                    format!("{:?}", block.dim()),
                ));
            }
        }

        let k = params.n_components;
        let max_components = n_samples.min(n_features);
        if k == 0 || k > max_components {
            return Err(AlignBenchError::fit_failure(
                None,
                METHOD,
                format!("n_components must be in 1..={}, got {}", max_components, k),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut bases = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let basis = random_orthonormal(n_features, k, &mut rng)
                .map_err(|e| AlignBenchError::fit_failure(Some(subject), METHOD, e.to_string()))?;
            bases.push(basis);
        }

        let mut shared = mean_projection(data, &bases, n_samples, k);
        for iteration in 0..params.n_iterations {
            for ((subject, block), basis) in subjects.iter().zip(data).zip(bases.iter_mut()) {
                let (polar, _) = polar_factor(block.t().dot(&shared).view()).map_err(|e| {
                    AlignBenchError::fit_failure(Some(subject), METHOD, e.to_string())
                })?;
                *basis = polar;
            }
            shared = mean_projection(data, &bases, n_samples, k);

            trace!(
                target: "alignbench-solvers",
                "SRM iteration {}: reconstruction error {:.6}",
                iteration + 1,
                reconstruction_error(data, &bases, &shared)
            );
        }

        debug!(
            target: "alignbench-solvers",
            "Fitted SRM over {} subjects ({} components, {} iterations)",
            subjects.len(),
            k,
            params.n_iterations
        );

        Ok(SharedResponseModel {
            bases: subjects.iter().cloned().zip(bases).collect(),
            shared_response: shared,
            n_components: k,
        })
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Samples × components response shared by all fitted subjects
    pub fn shared_response(&self) -> &Array2<f64> {
        &self.shared_response
    }

    pub fn basis(&self, subject: &Subject) -> Option<&Array2<f64>> {
        self.bases.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.bases.keys()
    }
}

impl AlignmentEstimator for SharedResponseModel {
    fn method(&self) -> &str {
        METHOD
    }

    fn output_space(&self) -> OutputSpace {
        OutputSpace::Shared
    }

    fn transform(&self, subject: &Subject, data: ArrayView2<'_, f64>) -> AlignBenchResult<Array2<f64>> {
        let basis = self
            .bases
            .get(subject)
            .ok_or_else(|| AlignBenchError::UnknownSubject(subject.clone()))?;
        if data.ncols() != basis.nrows() {
            return Err(AlignBenchError::shape_mismatch(
                format!("srm transform for subject '{}'", subject),
                format!("{} features", basis.nrows()),
                format!("{} features", data.ncols()),
            ));
        }
        Ok(data.dot(basis))
    }
}

fn mean_projection(
    data: &[ArrayView2<'_, f64>],
    bases: &[Array2<f64>],
    n_samples: usize,
    k: usize,
) -> Array2<f64> {
    let mut shared = Array2::<f64>::zeros((n_samples, k));
    for (block, basis) in data.iter().zip(bases) {
        shared += &block.dot(basis);
    }
    shared / data.len() as f64
}

fn reconstruction_error(data: &[ArrayView2<'_, f64>], bases: &[Array2<f64>], shared: &Array2<f64>) -> f64 {
    data.iter()
        .zip(bases)
        .map(|(block, basis)| {
            let residual = block.to_owned() - shared.dot(&basis.t());
            residual.iter().map(|r| r * r).sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixture() -> (Vec<Subject>, Vec<Array2<f64>>) {
        let base = array![
            [1.0, 0.0, 0.5],
            [0.0, 1.0, -0.5],
            [0.3, 0.2, 1.0],
            [-1.0, 0.4, 0.0],
        ];
        // second subject sees the same signal with features permuted
        let permuted = array![
            [0.0, 0.5, 1.0],
            [1.0, -0.5, 0.0],
            [0.2, 1.0, 0.3],
            [0.4, 0.0, -1.0],
        ];
        (
            vec![Subject::from("sub-01"), Subject::from("sub-02")],
            vec![base, permuted],
        )
    }

    #[test]
    fn test_same_seed_same_model() {
        let (subjects, data) = fixture();
        let views: Vec<_> = data.iter().map(|d| d.view()).collect();
        let params = SrmParams {
            n_components: 2,
            n_iterations: 5,
            seed: 7,
        };
        let a = SharedResponseModel::fit(&subjects, &views, &params).unwrap();
        let b = SharedResponseModel::fit(&subjects, &views, &params).unwrap();
        assert_eq!(a.shared_response(), b.shared_response());
    }

    #[test]
    fn test_bases_are_orthonormal() {
        let (subjects, data) = fixture();
        let views: Vec<_> = data.iter().map(|d| d.view()).collect();
        let params = SrmParams {
            n_components: 2,
            n_iterations: 3,
            seed: 0,
        };
        let model = SharedResponseModel::fit(&subjects, &views, &params).unwrap();
        for subject in &subjects {
            let w = model.basis(subject).unwrap();
            let gram = w.t().dot(w);
            for i in 0..2 {
                for j in 0..2 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((gram[[i, j]] - expected).abs() < 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_transform_maps_into_shared_space() {
        let (subjects, data) = fixture();
        let views: Vec<_> = data.iter().map(|d| d.view()).collect();
        let params = SrmParams {
            n_components: 3,
            n_iterations: 20,
            seed: 1,
        };
        let model = SharedResponseModel::fit(&subjects, &views, &params).unwrap();
        let a = model.transform(&subjects[0], data[0].view()).unwrap();
        let b = model.transform(&subjects[1], data[1].view()).unwrap();
        assert_eq!(a.dim(), (4, 3));
        assert_eq!(model.output_space(), OutputSpace::Shared);

        // identical signal up to a feature permutation lands on the same point
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_unknown_subject_rejected() {
        let (subjects, data) = fixture();
        let views: Vec<_> = data.iter().map(|d| d.view()).collect();
        let model = SharedResponseModel::fit(&subjects, &views, &SrmParams {
            n_components: 2,
            ..SrmParams::default()
        })
        .unwrap();
        assert_eq!(
            model.transform(&Subject::from("sub-99"), data[0].view()).unwrap_err(),
            AlignBenchError::UnknownSubject(Subject::from("sub-99"))
        );
    }

    #[test]
    fn test_too_many_components() {
        let (subjects, data) = fixture();
        let views: Vec<_> = data.iter().map(|d| d.view()).collect();
        let err = SharedResponseModel::fit(&subjects, &views, &SrmParams::default()).unwrap_err();
        assert!(matches!(err, AlignBenchError::EstimatorFitFailure { .. }));
    }
}
