//! Unpenalized refits of a loss on a fixed set of columns.
//!
//! [`RestrictedLikelihood`] exposes `θ ↦ −L(embed(θ))` (coefficients outside
//! the active set fixed at zero) to the L-BFGS driver. [`restricted_mle`]
//! is the one-call wrapper used by data splitting, Pearson dispersion
//! estimates and the bootstrap centring of the sandwich estimator.
use crate::{
    families::traits::LossFamily,
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{maximize, Grad, LogLikelihood, MLEOptions, Theta},
    },
};
use ndarray::Array1;

pub struct RestrictedLikelihood<'a, F: LossFamily> {
    family: &'a F,
    active: &'a [usize],
}

impl<'a, F: LossFamily> RestrictedLikelihood<'a, F> {
    pub fn new(family: &'a F, active: &'a [usize]) -> Self {
        Self { family, active }
    }

    /// Full-length coefficient vector with `theta` on the active columns.
    pub fn embed(&self, theta: &Theta) -> Array1<f64> {
        embed(theta, self.active, self.family.nfeatures())
    }
}

impl<'a, F: LossFamily> LogLikelihood for RestrictedLikelihood<'a, F> {
    type Data = ();

    fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
        Ok(-self.family.loss(&self.embed(theta))?)
    }

    fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
        let g = self.family.gradient(&self.embed(theta))?;
        Ok(self.active.iter().map(|&j| -g[j]).collect())
    }

    fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
        if theta.len() != self.active.len() {
            return Err(OptError::GradientDimMismatch {
                expected: self.active.len(),
                found: theta.len(),
            });
        }
        if let Some(&index) = self.active.iter().find(|&&j| j >= self.family.nfeatures()) {
            return Err(OptError::InvalidThetaHat {
                index,
                value: f64::NAN,
                reason: "active index out of range",
            });
        }
        Ok(())
    }
}

/// Scatter `theta` into a length-`p` vector at `active`.
pub fn embed(theta: &Array1<f64>, active: &[usize], p: usize) -> Array1<f64> {
    let mut full = Array1::zeros(p);
    for (&j, &v) in active.iter().zip(theta.iter()) {
        full[j] = v;
    }
    full
}

/// Maximize the restricted likelihood from `start` and return the
/// full-length coefficient vector. An empty active set returns zeros.
///
/// # Errors
/// - Whatever [`maximize`] reports (line-search failure, non-finite loss).
pub fn restricted_mle<F: LossFamily>(
    family: &F, active: &[usize], start: &Array1<f64>, opts: &MLEOptions,
) -> OptResult<Array1<f64>> {
    if active.is_empty() {
        return Ok(Array1::zeros(family.nfeatures()));
    }
    let model = RestrictedLikelihood::new(family, active);
    let outcome = maximize(&model, start.clone(), &(), opts)?;
    if !outcome.converged {
        log::warn!(
            "{} restricted refit stopped without convergence after {} iterations",
            family.name(),
            outcome.iterations
        );
    }
    Ok(model.embed(&outcome.theta_hat))
}
