//! Numerically guarded scalar transforms shared by the loss families,
//! the covariance estimators and the Monte-Carlo layer.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: eigenvalues at or below this are treated as zero when
//!   forming pseudo-inverses and square roots.
//! - [`GENERAL_TOL`]: generic "numerically zero" guard for denominators.
//! - [`MAX_EXP_ARG`]: clamp for linear predictors fed into `exp`.
//! - [`safe_softplus`], [`safe_logistic`], [`safe_exp`]: overflow-free
//!   versions of `ln(1 + eˣ)`, `1 / (1 + e⁻ˣ)` and `eˣ`.
//! - [`log_sum_exp`]: max-shifted `ln Σ eˣⁱ`.
use ndarray::ArrayView1;

/// Eigenvalue floor used when inverting or factoring symmetric matrices.
pub const EIGEN_EPS: f64 = 1e-12;

/// Generic guard for denominators that should be bounded away from zero.
pub const GENERAL_TOL: f64 = 1e-12;

/// Largest exponent accepted before `exp` is clamped.
///
/// `exp(700)` is about `1e304`, just under `f64::MAX`.
pub const MAX_EXP_ARG: f64 = 700.0;

/// Numerically stable softplus `ln(1 + eˣ)`.
///
/// Uses `x + ln1p(e⁻ˣ)` for positive `x` so large linear predictors do not
/// overflow, and `ln1p(eˣ)` otherwise to keep precision in the left tail.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 0.0 { x + (-x).exp().ln_1p() } else { x.exp().ln_1p() }
}

/// Numerically stable logistic function `1 / (1 + e⁻ˣ)`.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `eˣ` with the argument clamped to `[-MAX_EXP_ARG, MAX_EXP_ARG]`.
pub fn safe_exp(x: f64) -> f64 {
    x.clamp(-MAX_EXP_ARG, MAX_EXP_ARG).exp()
}

/// Max-shifted log-sum-exp. Returns `-∞` for an empty view.
pub fn log_sum_exp(values: ArrayView1<f64>) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
