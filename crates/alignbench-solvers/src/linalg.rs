// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Dense linear algebra for the estimators, backed by `faer`.

Estimator state lives in `ndarray`; matrices cross into `faer` only for the
factorizations (thin SVD, Cholesky) and come straight back.
*/

use faer::linalg::solvers::Solve;
use faer::{Mat, MatRef, Side};
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use thiserror::Error;

/// Failures of the numerical kernels
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("matrix is empty")]
    Empty,

    #[error("matrix contains non-finite values")]
    NonFinite,

    #[error("SVD failed: {0}")]
    Svd(String),

    #[error("matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("columns are linearly dependent")]
    RankDeficient,
}

/// Thin singular value decomposition `A = U diag(s) Vᵀ`.
///
/// For an m × n input, `u` is m × r, `s` has r entries in descending order and
/// `vt` is r × n, with r = min(m, n).
#[derive(Debug, Clone)]
pub struct Svd {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

fn view_to_faer(array: ArrayView2<'_, f64>) -> Mat<f64> {
    let (rows, cols) = array.dim();
    Mat::from_fn(rows, cols, |i, j| array[[i, j]])
}

fn faer_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

fn check_finite(a: ArrayView2<'_, f64>) -> Result<(), LinalgError> {
    if a.nrows() == 0 || a.ncols() == 0 {
        return Err(LinalgError::Empty);
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(())
}

pub fn thin_svd(a: ArrayView2<'_, f64>) -> Result<Svd, LinalgError> {
    check_finite(a)?;

    let mat = view_to_faer(a);
    let svd = mat
        .as_ref()
        .thin_svd()
        .map_err(|e| LinalgError::Svd(format!("{:?}", e)))?;

    let singular = svd.S();
    let s = Array1::from_shape_fn(singular.dim(), |i| singular[i]);
    let v = svd.V();

    Ok(Svd {
        u: faer_to_array(svd.U()),
        s,
        vt: Array2::from_shape_fn((v.ncols(), v.nrows()), |(i, j)| v[(j, i)]),
    })
}

/// Orthogonal polar factor of `m` and the sum of its singular values.
///
/// The factor `U Vᵀ` is the orthogonal matrix closest to `m` in Frobenius
/// norm, i.e. the solution of the orthogonal Procrustes problem.
pub fn polar_factor(m: ArrayView2<'_, f64>) -> Result<(Array2<f64>, f64), LinalgError> {
    let svd = thin_svd(m)?;
    Ok((svd.u.dot(&svd.vt), svd.s.sum()))
}

fn check_square(a: ArrayView2<'_, f64>) -> Result<(), LinalgError> {
    check_finite(a)?;
    if a.ncols() != a.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    Ok(())
}

/// Lower-triangular Cholesky factor `L` with `A = L Lᵀ`
pub fn cholesky(a: ArrayView2<'_, f64>) -> Result<Array2<f64>, LinalgError> {
    check_square(a)?;
    let mat = view_to_faer(a);
    let llt = mat
        .as_ref()
        .llt(Side::Lower)
        .map_err(|_| LinalgError::NotPositiveDefinite)?;
    let l = llt.L();
    Ok(Array2::from_shape_fn((l.nrows(), l.ncols()), |(i, j)| {
        if j > i {
            0.0
        } else {
            l[(i, j)]
        }
    }))
}

/// Solve `A X = B` for symmetric positive-definite `A`
pub fn solve_spd(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> Result<Array2<f64>, LinalgError> {
    check_square(a)?;
    if b.nrows() != a.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: a.nrows(),
            actual: b.nrows(),
        });
    }
    if b.ncols() == 0 {
        return Ok(b.to_owned());
    }
    if b.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }

    let lhs = view_to_faer(a);
    let rhs = view_to_faer(b);
    let llt = lhs
        .as_ref()
        .llt(Side::Lower)
        .map_err(|_| LinalgError::NotPositiveDefinite)?;
    let solution: Mat<f64> = llt.solve(rhs.as_ref());
    Ok(faer_to_array(solution.as_ref()))
}

/// Random `rows × cols` matrix with orthonormal columns: the polar factor of a
/// uniform draw from `rng`
pub fn random_orthonormal<R: Rng>(
    rows: usize,
    cols: usize,
    rng: &mut R,
) -> Result<Array2<f64>, LinalgError> {
    if rows == 0 || cols == 0 {
        return Err(LinalgError::Empty);
    }
    if cols > rows {
        return Err(LinalgError::RankDeficient);
    }
    let draw = Array2::from_shape_fn((rows, cols), |_| rng.gen::<f64>() - 0.5);
    let (basis, _) = polar_factor(draw.view())?;
    Ok(basis)
}
