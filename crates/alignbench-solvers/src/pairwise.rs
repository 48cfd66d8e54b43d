// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Pairwise (source → target) alignment.

The feature axis is split into contiguous pieces and one linear map is fitted
per piece between the source subject's and the target subject's alignment
data. Transforming applies each piece's map to the matching columns, so the
output stays in the target's feature space.

## Methods

- `identity`: no-op map
- `scaled_orthogonal`: scaled Procrustes, `R = s · U Vᵀ` from the SVD of `XᵀY`
- `ridge`: `R = (XᵀX + αI)⁻¹ XᵀY`
- `optimal_transport`: Sinkhorn plan between voxels, see [`crate::transport`]
*/

use crate::estimator::{AlignmentEstimator, OutputSpace};
use crate::linalg::{polar_factor, solve_spd};
use crate::parcellation::Parcellation;
use crate::transport::sinkhorn_map;
use alignbench_structures::{AlignBenchError, AlignBenchResult, Subject};
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Per-piece fitting method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairwiseMethod {
    Identity,
    ScaledOrthogonal,
    Ridge,
    OptimalTransport,
}

impl PairwiseMethod {
    pub const ALL: [PairwiseMethod; 4] = [
        PairwiseMethod::Identity,
        PairwiseMethod::ScaledOrthogonal,
        PairwiseMethod::Ridge,
        PairwiseMethod::OptimalTransport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PairwiseMethod::Identity => "identity",
            PairwiseMethod::ScaledOrthogonal => "scaled_orthogonal",
            PairwiseMethod::Ridge => "ridge",
            PairwiseMethod::OptimalTransport => "optimal_transport",
        }
    }
}

impl fmt::Display for PairwiseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PairwiseMethod {
    type Err = AlignBenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PairwiseMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| {
                AlignBenchError::InvalidParameter(format!("unknown pairwise method '{}'", s))
            })
    }
}

/// Tuning knobs shared by all pairwise methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseParams {
    pub n_pieces: usize,
    pub ridge_alpha: f64,
    pub ot_epsilon: f64,
    pub ot_iterations: usize,
}

impl Default for PairwiseParams {
    fn default() -> Self {
        PairwiseParams {
            n_pieces: 1,
            ridge_alpha: 1.0,
            ot_epsilon: 0.1,
            ot_iterations: 200,
        }
    }
}

impl PairwiseParams {
    pub fn validate(&self) -> AlignBenchResult<()> {
        if self.n_pieces == 0 {
            return Err(AlignBenchError::InvalidParameter(
                "n_pieces must be at least 1".to_string(),
            ));
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha > 0.0) {
            return Err(AlignBenchError::InvalidParameter(format!(
                "ridge_alpha must be positive, got {}",
                self.ridge_alpha
            )));
        }
        if !(self.ot_epsilon.is_finite() && self.ot_epsilon > 0.0) {
            return Err(AlignBenchError::InvalidParameter(format!(
                "ot_epsilon must be positive, got {}",
                self.ot_epsilon
            )));
        }
        if self.ot_iterations == 0 {
            return Err(AlignBenchError::InvalidParameter(
                "ot_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PieceMap {
    Identity,
    Dense(Array2<f64>),
}

/// Fitted source → target map, one block per piece
#[derive(Debug, Clone)]
pub struct PairwiseAlignment {
    method: PairwiseMethod,
    source: Subject,
    target: Subject,
    parcellation: Parcellation,
    maps: Vec<PieceMap>,
}

impl PairwiseAlignment {
    /// Fit on the alignment data of `source` (X) and `target` (Y), both samples × features
    pub fn fit(
        source: &Subject,
        target: &Subject,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        method: PairwiseMethod,
        params: &PairwiseParams,
    ) -> AlignBenchResult<Self> {
        if x.dim() != y.dim() {
            return Err(AlignBenchError::shape_mismatch(
                format!("pairwise fit ({} → {})", source, target),
                format!("{:?}", y.dim()),
                format!("{:?}", x.dim()),
            ));
        }
        params.validate()?;

        let fail = |reason: String| AlignBenchError::fit_failure(Some(source), method.as_str(), reason);
        if x.nrows() == 0 {
            return Err(fail("alignment data has no samples".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(fail("alignment data contains non-finite values".to_string()));
        }
        let parcellation = Parcellation::contiguous(x.ncols(), params.n_pieces)
            .map_err(|e| fail(e.to_string()))?;

        let mut maps = Vec::with_capacity(parcellation.pieces().len());
        for piece in parcellation.pieces() {
            let xp = x.slice(s![.., piece.clone()]);
            let yp = y.slice(s![.., piece.clone()]);
            let map = match method {
                PairwiseMethod::Identity => PieceMap::Identity,
                PairwiseMethod::ScaledOrthogonal => {
                    PieceMap::Dense(scaled_orthogonal(xp, yp).map_err(fail)?)
                }
                PairwiseMethod::Ridge => {
                    PieceMap::Dense(ridge(xp, yp, params.ridge_alpha).map_err(fail)?)
                }
                PairwiseMethod::OptimalTransport => PieceMap::Dense(
                    sinkhorn_map(xp, yp, params.ot_epsilon, params.ot_iterations)
                        .map_err(|e| fail(e.to_string()))?,
                ),
            };
            maps.push(map);
        }

        debug!(
            target: "alignbench-solvers",
            "Fitted {} alignment {} → {} over {} piece(s)",
            method,
            source,
            target,
            maps.len()
        );

        Ok(PairwiseAlignment {
            method,
            source: source.clone(),
            target: target.clone(),
            parcellation,
            maps,
        })
    }

    pub fn pairwise_method(&self) -> PairwiseMethod {
        self.method
    }

    pub fn source(&self) -> &Subject {
        &self.source
    }

    pub fn target(&self) -> &Subject {
        &self.target
    }

    pub fn n_pieces(&self) -> usize {
        self.maps.len()
    }
}

impl AlignmentEstimator for PairwiseAlignment {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn output_space(&self) -> OutputSpace {
        OutputSpace::Target
    }

    fn transform(&self, subject: &Subject, data: ArrayView2<'_, f64>) -> AlignBenchResult<Array2<f64>> {
        if *subject != self.source {
            return Err(AlignBenchError::UnknownSubject(subject.clone()));
        }
        let n_features = self.parcellation.n_features();
        if data.ncols() != n_features {
            return Err(AlignBenchError::shape_mismatch(
                format!("{} transform for subject '{}'", self.method, subject),
                format!("{} features", n_features),
                format!("{} features", data.ncols()),
            ));
        }

        let mut out = Array2::<f64>::zeros(data.dim());
        for (piece, map) in self.parcellation.pieces().iter().zip(&self.maps) {
            let block = data.slice(s![.., piece.clone()]);
            let mut target = out.slice_mut(s![.., piece.clone()]);
            match map {
                PieceMap::Identity => target.assign(&block),
                PieceMap::Dense(r) => target.assign(&block.dot(r)),
            }
        }
        Ok(out)
    }
}

/// `s · U Vᵀ` minimising `‖X R − Y‖` over scaled orthogonal `R`
fn scaled_orthogonal(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array2<f64>, String> {
    let k = x.ncols();
    let x_norm_sq: f64 = x.iter().map(|v| v * v).sum();
    let y_norm_sq: f64 = y.iter().map(|v| v * v).sum();
    if x_norm_sq == 0.0 || y_norm_sq == 0.0 {
        return Ok(Array2::eye(k));
    }

    let cross = x.t().dot(&y);
    let (rotation, singular_sum) = polar_factor(cross.view()).map_err(|e| e.to_string())?;
    Ok(rotation * (singular_sum / x_norm_sq))
}

fn ridge(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>, alpha: f64) -> Result<Array2<f64>, String> {
    let k = x.ncols();
    let gram = x.t().dot(&x) + Array2::<f64>::eye(k) * alpha;
    let rhs = x.t().dot(&y);
    solve_spd(gram.view(), rhs.view()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn subjects() -> (Subject, Subject) {
        (Subject::from("sub-01"), Subject::from("sub-02"))
    }

    fn sample() -> Array2<f64> {
        array![
            [1.0, 0.2, -0.5, 0.3],
            [0.1, 1.5, 0.4, -0.2],
            [-0.7, 0.3, 0.9, 0.8],
            [0.4, -0.6, 0.2, 1.1],
            [0.9, 0.9, -0.3, -0.4],
        ]
    }

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in PairwiseMethod::ALL {
            assert_eq!(method.as_str().parse::<PairwiseMethod>().unwrap(), method);
        }
        assert!("procrustes".parse::<PairwiseMethod>().is_err());
    }

    #[test]
    fn test_identity_method_is_noop() {
        let (a, b) = subjects();
        let x = sample();
        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            x.view(),
            PairwiseMethod::Identity,
            &PairwiseParams::default(),
        )
        .unwrap();
        assert_eq!(fitted.transform(&a, x.view()).unwrap(), x);
    }

    #[test]
    fn test_scaled_orthogonal_recovers_scaled_rotation() {
        let (a, b) = subjects();
        let x = sample();
        // rotation in the first two features, swap of the last two, scale 2
        let c = 0.6_f64;
        let s = 0.8_f64;
        let r = array![
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
        ] * 2.0;
        let y = x.dot(&r);

        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            y.view(),
            PairwiseMethod::ScaledOrthogonal,
            &PairwiseParams::default(),
        )
        .unwrap();
        assert_close(&fitted.transform(&a, x.view()).unwrap(), &y, 1e-8);
    }

    #[test]
    fn test_ridge_shrinks_towards_zero() {
        let (a, b) = subjects();
        let x = sample();
        let params = PairwiseParams {
            ridge_alpha: 1e6,
            ..PairwiseParams::default()
        };
        let fitted =
            PairwiseAlignment::fit(&a, &b, x.view(), x.view(), PairwiseMethod::Ridge, &params).unwrap();
        let out = fitted.transform(&a, x.view()).unwrap();
        assert!(out.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_ridge_small_alpha_fits_identity_map() {
        let (a, b) = subjects();
        let x = sample();
        let params = PairwiseParams {
            ridge_alpha: 1e-9,
            ..PairwiseParams::default()
        };
        let fitted =
            PairwiseAlignment::fit(&a, &b, x.view(), x.view(), PairwiseMethod::Ridge, &params).unwrap();
        assert_close(&fitted.transform(&a, x.view()).unwrap(), &x, 1e-6);
    }

    #[test]
    fn test_pieces_are_fitted_independently() {
        let (a, b) = subjects();
        let x = sample();
        let params = PairwiseParams {
            n_pieces: 2,
            ..PairwiseParams::default()
        };
        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            x.view(),
            PairwiseMethod::ScaledOrthogonal,
            &params,
        )
        .unwrap();
        assert_eq!(fitted.n_pieces(), 2);
        assert_close(&fitted.transform(&a, x.view()).unwrap(), &x, 1e-8);
    }

    #[test]
    fn test_optimal_transport_output_in_target_space() {
        let (a, b) = subjects();
        let x = sample();
        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            x.view(),
            PairwiseMethod::OptimalTransport,
            &PairwiseParams::default(),
        )
        .unwrap();
        let out = fitted.transform(&a, x.view()).unwrap();
        assert_eq!(out.dim(), x.dim());
        assert_eq!(fitted.output_space(), OutputSpace::Target);
    }

    #[test]
    fn test_too_many_pieces_is_fit_failure() {
        let (a, b) = subjects();
        let x = sample();
        let params = PairwiseParams {
            n_pieces: 10,
            ..PairwiseParams::default()
        };
        let err = PairwiseAlignment::fit(&a, &b, x.view(), x.view(), PairwiseMethod::Ridge, &params)
            .unwrap_err();
        assert!(matches!(
            err,
            AlignBenchError::EstimatorFitFailure { subject: Some(ref s), .. } if *s == a
        ));
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let (a, b) = subjects();
        let x = sample();
        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            x.view(),
            PairwiseMethod::Identity,
            &PairwiseParams::default(),
        )
        .unwrap();
        let narrow = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            fitted.transform(&a, narrow.view()),
            Err(AlignBenchError::DataShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_transform_rejects_other_subject() {
        let (a, b) = subjects();
        let x = sample();
        let fitted = PairwiseAlignment::fit(
            &a,
            &b,
            x.view(),
            x.view(),
            PairwiseMethod::ScaledOrthogonal,
            &PairwiseParams::default(),
        )
        .unwrap();
        assert_eq!(
            fitted.transform(&b, x.view()).unwrap_err(),
            AlignBenchError::UnknownSubject(b.clone())
        );
    }
}
