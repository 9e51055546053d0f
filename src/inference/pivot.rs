//! Polyhedral lemma: truncation limits for a linear contrast.
//!
//! For `z ~ N(μ, Σ)` restricted to `{A z ≤ b}` and a contrast `η`, write
//! `z = c·(ηᵀz) + r` with `c = Ση / ηᵀΣη`, so `r` is independent of `ηᵀz`.
//! Conditional on `r`, the event is an interval `V⁻ ≤ ηᵀz ≤ V⁺`:
//! rows with `(Ac)_i > 0` bound from above, rows with `(Ac)_i < 0` from
//! below, and rows with `(Ac)_i ≈ 0` do not involve the contrast.
use crate::{
    inference::errors::{InferenceError, InferenceResult},
    optimization::numerical_stability::GENERAL_TOL,
};
use ndarray::{Array1, Array2};

/// Absolute slack a row may be violated by before it is an error.
pub const FEASIBILITY_TOL: f64 = 1e-6;

/// Truncation window and scale of `ηᵀz` given the rest of the statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationLimits {
    pub lower: f64,
    pub upper: f64,
    pub observed: f64,
    pub sd: f64,
}

/// Compute `[V⁻, V⁺]`, the observed contrast and its standard deviation.
///
/// # Errors
/// - `DimensionMismatch` for inconsistent shapes.
/// - `ZeroVariance` when `ηᵀΣη` is numerically zero.
/// - `InfeasibleStatistic` when `z` violates a row by more than
///   `FEASIBILITY_TOL · (1 + |b_i|)`.
pub fn truncation_limits(
    linear_part: &Array2<f64>, offset: &Array1<f64>, covariance: &Array2<f64>,
    eta: &Array1<f64>, z: &Array1<f64>,
) -> InferenceResult<TruncationLimits> {
    let p = z.len();
    for (what, found) in [
        ("contrast", eta.len()),
        ("constraint columns", linear_part.ncols()),
        ("covariance", covariance.nrows()),
        ("covariance columns", covariance.ncols()),
    ] {
        if found != p {
            return Err(InferenceError::DimensionMismatch { what, expected: p, found });
        }
    }
    if offset.len() != linear_part.nrows() {
        return Err(InferenceError::DimensionMismatch {
            what: "constraint offset",
            expected: linear_part.nrows(),
            found: offset.len(),
        });
    }

    let sigma_eta = covariance.dot(eta);
    let variance = eta.dot(&sigma_eta);
    let scale = covariance.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs())) * eta.dot(eta);
    if !variance.is_finite() || variance <= GENERAL_TOL * scale.max(f64::MIN_POSITIVE) {
        return Err(InferenceError::ZeroVariance { value: variance });
    }
    let c = &sigma_eta / variance;
    let observed = eta.dot(z);
    if !observed.is_finite() {
        return Err(InferenceError::NonFiniteStatistic { value: observed });
    }

    let az = linear_part.dot(z);
    let ac = linear_part.dot(&c);
    let (mut lower, mut upper) = (f64::NEG_INFINITY, f64::INFINITY);
    for (i, ((&b, &a_z), &a_c)) in offset.iter().zip(az.iter()).zip(ac.iter()).enumerate() {
        let slack = b - a_z;
        if slack < -FEASIBILITY_TOL * (1.0 + b.abs()) {
            return Err(InferenceError::InfeasibleStatistic { row: i, slack });
        }
        let slack = slack.max(0.0);
        let row_scale = linear_part.row(i).iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let c_scale = c.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if a_c.abs() <= GENERAL_TOL * (row_scale * c_scale).max(f64::MIN_POSITIVE) {
            continue;
        }
        let bound = observed + slack / a_c;
        if a_c > 0.0 {
            upper = upper.min(bound);
        } else {
            lower = lower.max(bound);
        }
    }
    Ok(TruncationLimits { lower, upper, observed, sd: variance.sqrt() })
}
