//! families::validation — shared guards for designs, responses and subsets.
//!
//! Purpose
//! -------
//! Check inputs once at the boundary so that loss evaluations can assume a
//! non-empty finite design, a response of matching length inside the
//! family's support, and in-range row subsets.
//!
//! Conventions
//! -----------
//! - Validation never mutates or copies data.
//! - The first offending entry is reported, with its index.
use crate::families::errors::{FamilyError, FamilyResult};
use ndarray::{Array1, Array2, Axis};

/// Design must be non-empty with finite entries.
pub fn validate_design(x: &Array2<f64>) -> FamilyResult<()> {
    let (nrows, ncols) = x.dim();
    if nrows == 0 || ncols == 0 {
        return Err(FamilyError::EmptyDesign { nrows, ncols });
    }
    if let Some((index, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(FamilyError::NonFiniteValue { what: "design", index, value });
    }
    Ok(())
}

/// Vector must have `n` finite entries.
pub fn validate_vector(what: &'static str, v: &Array1<f64>, n: usize) -> FamilyResult<()> {
    if v.len() != n {
        return Err(FamilyError::DimensionMismatch { what, expected: n, found: v.len() });
    }
    if let Some((index, &value)) = v.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(FamilyError::NonFiniteValue { what, index, value });
    }
    Ok(())
}

/// Noise level must be finite and strictly positive.
pub fn validate_sigma(sigma: f64) -> FamilyResult<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FamilyError::InvalidSigma { value: sigma });
    }
    Ok(())
}

/// Every entry must satisfy `check`; the first failure is reported with
/// `reason`.
pub fn validate_support<C>(y: &Array1<f64>, check: C, reason: &'static str) -> FamilyResult<()>
where
    C: Fn(usize, f64) -> bool,
{
    match y.iter().enumerate().find(|&(i, &v)| !check(i, v)) {
        Some((index, &value)) => Err(FamilyError::InvalidResponse { index, value, reason }),
        None => Ok(()),
    }
}

/// Row subset must be non-empty and in range.
pub fn validate_rows(rows: &[usize], nobs: usize) -> FamilyResult<()> {
    if rows.is_empty() {
        return Err(FamilyError::EmptySubset);
    }
    if let Some(&index) = rows.iter().find(|&&r| r >= nobs) {
        return Err(FamilyError::RowOutOfRange { index, nobs });
    }
    Ok(())
}

/// Copy the selected rows of a design.
pub fn select_rows(x: &Array2<f64>, rows: &[usize]) -> FamilyResult<Array2<f64>> {
    validate_rows(rows, x.nrows())?;
    Ok(x.select(Axis(0), rows))
}

/// Copy the selected entries of a vector.
pub fn select_entries(v: &Array1<f64>, rows: &[usize]) -> FamilyResult<Array1<f64>> {
    validate_rows(rows, v.len())?;
    Ok(v.select(Axis(0), rows))
}
