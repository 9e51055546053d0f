//! inference::information — linear algebra on information and covariance
//! matrices.
//!
//! Purpose
//! -------
//! Bridge `ndarray` matrices into `nalgebra` for the symmetric operations
//! the pivots need: inverting an active-block information matrix, Schur
//! complements, symmetric pseudo-inverses and square roots, and condition
//! numbers.
//!
//! Key behaviors
//! -------------
//! - [`spd_inverse`] tries a Cholesky factorization and falls back to the
//!   eigen pseudo-inverse (with a `log::warn!`) when it fails.
//! - [`pinv_symmetric`] and [`psd_sqrt`] drop eigenvalues at or below
//!   `EIGEN_EPS · max(λ_max, 1)`.
//! - [`condition_number`] is `λ_max / λ_min` (∞ when `λ_min ≤ 0`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are square and treated as symmetric; only finiteness is
//!   checked here.
//! - Empty (0×0) inputs are valid and return empty outputs.
//!
//! Conventions
//! -----------
//! - No explicit `inverse()` of a possibly singular matrix is ever formed;
//!   singular directions are truncated instead.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::numerical_stability::EIGEN_EPS,
};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis};

pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Square and finite, or an error naming `what`.
pub fn validate_square(what: &'static str, a: &Array2<f64>) -> InferenceResult<()> {
    if a.nrows() != a.ncols() {
        let (expected, found) = (a.nrows(), a.ncols());
        return Err(InferenceError::DimensionMismatch { what, expected, found });
    }
    for ((row, col), &value) in a.indexed_iter() {
        if !value.is_finite() {
            return Err(InferenceError::NonFiniteMatrix { what, row, col, value });
        }
    }
    Ok(())
}

/// `(A + Aᵀ) / 2`.
pub fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

/// `A[rows, cols]`.
pub fn submatrix(a: &Array2<f64>, rows: &[usize], cols: &[usize]) -> Array2<f64> {
    a.select(Axis(0), rows).select(Axis(1), cols)
}

fn eigen(a: &Array2<f64>) -> SymmetricEigen<f64, nalgebra::Dyn> {
    to_dmatrix(&symmetrize(a)).symmetric_eigen()
}

fn eigen_floor(eigenvalues: &nalgebra::DVector<f64>) -> f64 {
    let max = eigenvalues.iter().cloned().fold(0.0_f64, f64::max);
    EIGEN_EPS * max.max(1.0)
}

/// Moore–Penrose pseudo-inverse of a symmetric matrix.
pub fn pinv_symmetric(a: &Array2<f64>) -> InferenceResult<Array2<f64>> {
    validate_square("matrix", a)?;
    let n = a.nrows();
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let eig = eigen(a);
    let floor = eigen_floor(&eig.eigenvalues);
    let q = &eig.eigenvectors;
    let mut out = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        if lambda > floor {
            for i in 0..n {
                let qi = q[(i, k)] / lambda;
                for j in 0..n {
                    out[[i, j]] += qi * q[(j, k)];
                }
            }
        }
    }
    Ok(out)
}

/// Inverse of a symmetric positive-definite matrix; pseudo-inverse when the
/// Cholesky factorization fails.
pub fn spd_inverse(a: &Array2<f64>) -> InferenceResult<Array2<f64>> {
    validate_square("information matrix", a)?;
    if a.nrows() == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    match to_dmatrix(&symmetrize(a)).cholesky() {
        Some(chol) => Ok(symmetrize(&to_array2(&chol.inverse()))),
        None => {
            log::warn!(
                "information block of size {} is not positive definite; using pseudo-inverse",
                a.nrows()
            );
            pinv_symmetric(a)
        }
    }
}

/// Symmetric square root `Q diag(√max(λ, 0)) Qᵀ` of a PSD matrix.
pub fn psd_sqrt(a: &Array2<f64>) -> InferenceResult<Array2<f64>> {
    validate_square("covariance", a)?;
    let n = a.nrows();
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    let eig = eigen(a);
    let floor = eigen_floor(&eig.eigenvalues);
    let q = &eig.eigenvectors;
    let mut out = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        if lambda > floor {
            let root = lambda.sqrt();
            for i in 0..n {
                let qi = q[(i, k)] * root;
                for j in 0..n {
                    out[[i, j]] += qi * q[(j, k)];
                }
            }
        }
    }
    Ok(out)
}

/// Smallest and largest eigenvalue of a symmetric matrix.
pub fn eigen_range(a: &Array2<f64>) -> InferenceResult<(f64, f64)> {
    validate_square("matrix", a)?;
    if a.nrows() == 0 {
        return Ok((1.0, 1.0));
    }
    let eig = eigen(a);
    let min = eig.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = eig.eigenvalues.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Ok((min, max))
}

/// `λ_max / λ_min`, or `∞` when the matrix is not positive definite.
pub fn condition_number(a: &Array2<f64>) -> InferenceResult<f64> {
    let (min, max) = eigen_range(a)?;
    Ok(if min > 0.0 { max / min } else { f64::INFINITY })
}

/// Square roots of the (clamped) diagonal.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}
