// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Solver façade.

The evaluator hands an [`AlignmentRequest`] to an [`AlignmentSolver`] and gets
back an [`EstimatorBundle`]. Internally the solver dispatches to one of two
fitting entry points:

- [`AlignmentSolver::fit_independent`]: one estimator per source subject,
  fitted against the target (identity, pairwise methods)
- [`AlignmentSolver::fit_joint`]: one estimator fitted once over every source
  subject (shared response model)

Both are normalized to the same bundle type before reaching the evaluator.
*/

use crate::estimator::{AlignmentEstimator, EstimatorBundle};
use crate::identity::IdentityAlignment;
use crate::pairwise::{PairwiseAlignment, PairwiseMethod, PairwiseParams};
use crate::srm::{SharedResponseModel, SrmParams};
use alignbench_structures::{AlignBenchError, AlignBenchResult, Mask, Subject};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Immutable inputs for one solver invocation
#[derive(Debug, Clone)]
pub struct AlignmentRequest {
    target_subject: Subject,
    source_subjects: Vec<Subject>,
    source_data: Vec<Arc<Array2<f64>>>,
    target_data: Arc<Array2<f64>>,
    mask: Arc<dyn Mask>,
}

impl AlignmentRequest {
    /// Validate and bundle the solver inputs.
    ///
    /// `source_data[i]` is the vectorized alignment volume of `source_subjects[i]`.
    pub fn new(
        target_subject: Subject,
        source_subjects: Vec<Subject>,
        source_data: Vec<Arc<Array2<f64>>>,
        target_data: Arc<Array2<f64>>,
        mask: Arc<dyn Mask>,
    ) -> AlignBenchResult<Self> {
        if source_subjects.is_empty() {
            return Err(AlignBenchError::EmptySourceSet {
                target: target_subject,
            });
        }
        if source_subjects.len() != source_data.len() {
            return Err(AlignBenchError::shape_mismatch(
                "alignment request",
                format!("{} source blocks", source_subjects.len()),
                format!("{} source blocks", source_data.len()),
            ));
        }
        if source_subjects.contains(&target_subject) {
            return Err(AlignBenchError::InvalidParameter(format!(
                "target subject '{}' is listed among the sources",
                target_subject
            )));
        }

        let n_features = mask.n_features();
        if target_data.ncols() != n_features {
            return Err(AlignBenchError::shape_mismatch(
                format!("alignment data for target '{}'", target_subject),
                format!("{} features", n_features),
                format!("{} features", target_data.ncols()),
            ));
        }
        for (subject, data) in source_subjects.iter().zip(&source_data) {
            if data.ncols() != n_features {
                return Err(AlignBenchError::shape_mismatch(
                    format!("alignment data for subject '{}'", subject),
                    format!("{} features", n_features),
                    format!("{} features", data.ncols()),
                ));
            }
        }

        Ok(AlignmentRequest {
            target_subject,
            source_subjects,
            source_data,
            target_data,
            mask,
        })
    }

    pub fn target_subject(&self) -> &Subject {
        &self.target_subject
    }

    pub fn source_subjects(&self) -> &[Subject] {
        &self.source_subjects
    }

    pub fn source_data(&self) -> &[Arc<Array2<f64>>] {
        &self.source_data
    }

    pub fn target_data(&self) -> &Arc<Array2<f64>> {
        &self.target_data
    }

    pub fn mask(&self) -> &Arc<dyn Mask> {
        &self.mask
    }

    /// Source subjects paired with their alignment data
    pub fn sources(&self) -> impl Iterator<Item = (&Subject, &Arc<Array2<f64>>)> {
        self.source_subjects.iter().zip(&self.source_data)
    }
}

/// Which estimator family a solver fits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum SolverSpec {
    Identity,
    Pairwise {
        method: PairwiseMethod,
        #[serde(flatten)]
        params: PairwiseParams,
    },
    SharedResponse(SrmParams),
}

impl SolverSpec {
    /// Resolve a method name: `identity`, `srm`, a pairwise method, or `pairwise:<method>`
    pub fn from_method_name(
        name: &str,
        pairwise: &PairwiseParams,
        srm: &SrmParams,
    ) -> AlignBenchResult<Self> {
        match name {
            "identity" => Ok(SolverSpec::Identity),
            "srm" | "shared_response" => Ok(SolverSpec::SharedResponse(srm.clone())),
            other => {
                let method = other.strip_prefix("pairwise:").unwrap_or(other);
                Ok(SolverSpec::Pairwise {
                    method: method.parse()?,
                    params: pairwise.clone(),
                })
            }
        }
    }

    /// Stable name used in logs and results
    pub fn name(&self) -> String {
        match self {
            SolverSpec::Identity => "identity".to_string(),
            SolverSpec::Pairwise { method, .. } => format!("pairwise:{}", method),
            SolverSpec::SharedResponse(_) => "srm".to_string(),
        }
    }

    pub fn is_joint(&self) -> bool {
        matches!(self, SolverSpec::SharedResponse(_))
    }
}

impl fmt::Display for SolverSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Fits estimators for a request according to its [`SolverSpec`]
#[derive(Debug)]
pub struct AlignmentSolver {
    spec: SolverSpec,
    fit_calls: AtomicUsize,
}

impl AlignmentSolver {
    pub fn new(spec: SolverSpec) -> Self {
        AlignmentSolver {
            spec,
            fit_calls: AtomicUsize::new(0),
        }
    }

    pub fn spec(&self) -> &SolverSpec {
        &self.spec
    }

    /// Number of estimator fits performed so far (one per independent fit, one per joint fit)
    pub fn fit_calls(&self) -> usize {
        self.fit_calls.load(Ordering::Relaxed)
    }

    /// Fit every estimator the request needs and return them keyed by source subject
    pub fn fit(&self, request: &AlignmentRequest) -> AlignBenchResult<EstimatorBundle> {
        info!(
            target: "alignbench-solvers",
            "Fitting {} for target {} over {} source subject(s)",
            self.spec,
            request.target_subject(),
            request.source_subjects().len()
        );

        let bundle = if self.spec.is_joint() {
            let views: Vec<ArrayView2<'_, f64>> =
                request.source_data().iter().map(|d| d.view()).collect();
            let shared = self.fit_joint(request.source_subjects(), &views)?;
            EstimatorBundle::shared(request.source_subjects(), shared)
        } else {
            let mut bundle = EstimatorBundle::new();
            for (subject, data) in request.sources() {
                let estimator = self.fit_independent(
                    subject,
                    request.target_subject(),
                    data.view(),
                    request.target_data().view(),
                )?;
                bundle.insert(subject.clone(), estimator);
            }
            bundle
        };

        info!(
            target: "alignbench-solvers",
            "Fitted {} distinct estimator(s) for {} subject(s)",
            bundle.distinct_estimators(),
            bundle.len()
        );
        Ok(bundle)
    }

    /// Fit one source subject against the target
    pub fn fit_independent(
        &self,
        subject: &Subject,
        target: &Subject,
        source_data: ArrayView2<'_, f64>,
        target_data: ArrayView2<'_, f64>,
    ) -> AlignBenchResult<Arc<dyn AlignmentEstimator>> {
        let estimator: Arc<dyn AlignmentEstimator> = match &self.spec {
            SolverSpec::Identity => Arc::new(IdentityAlignment::fit(
                subject,
                target,
                source_data,
                target_data,
            )?),
            SolverSpec::Pairwise { method, params } => Arc::new(PairwiseAlignment::fit(
                subject,
                target,
                source_data,
                target_data,
                *method,
                params,
            )?),
            SolverSpec::SharedResponse(_) => {
                return Err(AlignBenchError::fit_failure(
                    Some(subject),
                    "srm",
                    "shared response model is fitted jointly, not per subject",
                ))
            }
        };
        self.fit_calls.fetch_add(1, Ordering::Relaxed);
        Ok(estimator)
    }

    /// Fit one estimator over all source subjects at once
    pub fn fit_joint(
        &self,
        subjects: &[Subject],
        source_data: &[ArrayView2<'_, f64>],
    ) -> AlignBenchResult<Arc<dyn AlignmentEstimator>> {
        let params = match &self.spec {
            SolverSpec::SharedResponse(params) => params,
            other => {
                return Err(AlignBenchError::fit_failure(
                    None,
                    other.name(),
                    "method is fitted per subject, not jointly",
                ))
            }
        };
        let model = SharedResponseModel::fit(subjects, source_data, params)?;
        self.fit_calls.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignbench_structures::BinaryMask;
    use ndarray::array;

    fn request(n_sources: usize) -> AlignmentRequest {
        let mask: Arc<dyn Mask> = Arc::new(BinaryMask::full((1, 1, 3)).unwrap());
        let target = Arc::new(array![[1.0, 0.0, 0.2], [0.0, 1.0, 0.4], [0.5, 0.5, 1.0]]);
        let sources: Vec<Subject> = (0..n_sources)
            .map(|i| Subject::new(format!("sub-{:02}", i + 2)))
            .collect();
        let data = sources
            .iter()
            .enumerate()
            .map(|(i, _)| Arc::new(target.mapv(|v| v + 0.1 * (i as f64 + 1.0))))
            .collect();
        AlignmentRequest::new(Subject::from("sub-01"), sources, data, target, mask).unwrap()
    }

    #[test]
    fn test_method_names() {
        let pw = PairwiseParams::default();
        let srm = SrmParams::default();
        assert_eq!(
            SolverSpec::from_method_name("identity", &pw, &srm).unwrap(),
            SolverSpec::Identity
        );
        assert!(SolverSpec::from_method_name("srm", &pw, &srm).unwrap().is_joint());
        assert_eq!(
            SolverSpec::from_method_name("pairwise:ridge", &pw, &srm).unwrap().name(),
            "pairwise:ridge"
        );
        assert_eq!(
            SolverSpec::from_method_name("optimal_transport", &pw, &srm).unwrap().name(),
            "pairwise:optimal_transport"
        );
        assert!(SolverSpec::from_method_name("hyperalignment", &pw, &srm).is_err());
    }

    #[test]
    fn test_independent_fit_gives_distinct_estimators() {
        let solver = AlignmentSolver::new(SolverSpec::Identity);
        let bundle = solver.fit(&request(2)).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.distinct_estimators(), 2);
        assert_eq!(solver.fit_calls(), 2);
    }

    #[test]
    fn test_joint_fit_aliases_one_estimator() {
        let solver = AlignmentSolver::new(SolverSpec::SharedResponse(SrmParams {
            n_components: 2,
            n_iterations: 3,
            seed: 0,
        }));
        let bundle = solver.fit(&request(2)).unwrap();
        assert_eq!(bundle.len(), 2);
        assert!(bundle.is_shared());
        assert_eq!(solver.fit_calls(), 1);
    }

    #[test]
    fn test_request_rejects_target_among_sources() {
        let mask: Arc<dyn Mask> = Arc::new(BinaryMask::full((1, 1, 2)).unwrap());
        let data = Arc::new(Array2::<f64>::zeros((2, 2)));
        let err = AlignmentRequest::new(
            Subject::from("A"),
            vec![Subject::from("A")],
            vec![data.clone()],
            data,
            mask,
        )
        .unwrap_err();
        assert!(matches!(err, AlignBenchError::InvalidParameter(_)));
    }

    #[test]
    fn test_request_rejects_width_mismatch() {
        let mask: Arc<dyn Mask> = Arc::new(BinaryMask::full((1, 1, 3)).unwrap());
        let target = Arc::new(Array2::<f64>::zeros((2, 3)));
        let narrow = Arc::new(Array2::<f64>::zeros((2, 2)));
        let err = AlignmentRequest::new(
            Subject::from("A"),
            vec![Subject::from("B")],
            vec![narrow],
            target,
            mask,
        )
        .unwrap_err();
        assert!(matches!(err, AlignBenchError::DataShapeMismatch { .. }));
    }

    #[test]
    fn test_entry_points_reject_wrong_variant() {
        let solver = AlignmentSolver::new(SolverSpec::Identity);
        let x = Array2::<f64>::zeros((2, 2));
        assert!(solver.fit_joint(&[Subject::from("B")], &[x.view()]).is_err());
        assert_eq!(solver.fit_calls(), 0);
    }
}
