//! families::traits — the capability interface shared by every loss.
//!
//! Purpose
//! -------
//! Describe a smooth convex loss `L(β)` over a design `X` in the terms the
//! rest of the crate needs: its value, gradient and information matrix at a
//! coefficient vector, the inverse link, Pearson residuals for dispersion
//! estimates, and row subsetting for sample splits and bootstrap draws.
//!
//! Invariants & assumptions
//! ------------------------
//! - `loss` is a negative log-likelihood (up to constants) on the scale the
//!   penalty is applied to; the Gaussian loss is divided by `σ²`.
//! - `gradient(β)` has length `nfeatures()`; `information(β)` is the
//!   `p × p` Hessian of `loss` and is symmetric positive semi-definite.
//! - `subset(rows)` keeps the family's hyper-parameters (σ, trials) and may
//!   repeat rows.
//!
//! Conventions
//! -----------
//! - `β` always has the full length `p`; active-set restrictions are the
//!   caller's business.
//! - Families without a closed-form information matrix rely on the default
//!   finite-difference implementation.
use crate::{
    families::errors::{FamilyError, FamilyResult},
    optimization::{errors::OptError, loglik_optimizer::compute_hessian},
};
use ndarray::{Array1, Array2, Axis};

/// Smooth convex loss over a fixed design.
pub trait LossFamily: Clone {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn design(&self) -> &Array2<f64>;

    fn nobs(&self) -> usize {
        self.design().nrows()
    }

    fn nfeatures(&self) -> usize {
        self.design().ncols()
    }

    /// Negative log-likelihood at `beta`.
    fn loss(&self, beta: &Array1<f64>) -> FamilyResult<f64>;

    /// `∇L(β)`.
    fn gradient(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>>;

    /// `∇²L(β)`; by default the Jacobian of [`gradient`](Self::gradient)
    /// by finite differences.
    fn information(&self, beta: &Array1<f64>) -> FamilyResult<Array2<f64>> {
        let grad = |b: &Array1<f64>| self.gradient(b).map_err(OptError::from);
        compute_hessian(&grad, beta).map_err(|e| FamilyError::Derivative { text: e.to_string() })
    }

    /// Inverse link: mean response for linear predictor `eta`.
    fn link(&self, eta: &Array1<f64>) -> Array1<f64>;

    /// Pearson residuals at `beta`, when the family has a meaningful
    /// dispersion. `Ok(None)` otherwise.
    fn pearson_residuals(&self, _beta: &Array1<f64>) -> FamilyResult<Option<Array1<f64>>> {
        Ok(None)
    }

    /// Dispersion the loss already assumes (σ² for the Gaussian loss, 1
    /// otherwise).
    fn scale(&self) -> f64 {
        1.0
    }

    /// Same family restricted to the given rows (repeats allowed).
    fn subset(&self, rows: &[usize]) -> FamilyResult<Self>;

    fn linear_predictor(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        if beta.len() != self.nfeatures() {
            return Err(FamilyError::DimensionMismatch {
                what: "coefficients",
                expected: self.nfeatures(),
                found: beta.len(),
            });
        }
        Ok(self.design().dot(beta))
    }
}

/// `Xᵀ diag(w) X` for a non-negative weight vector.
pub fn weighted_gram(x: &Array2<f64>, w: &Array1<f64>) -> Array2<f64> {
    let scaled = x * &w.view().insert_axis(Axis(1));
    x.t().dot(&scaled)
}

/// Reject non-finite loss values.
pub fn finite_loss(value: f64) -> FamilyResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FamilyError::NonFiniteLoss { value })
    }
}
