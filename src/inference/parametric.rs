//! Model-based (parametric) covariance for the selection pivot.
//!
//! `Σ = φ · blockdiag(H_EE⁻¹, H_II − H_IE H_EE⁻¹ H_EI)` with the dispersion
//! `φ` chosen by [`Dispersion`]:
//! - `Model`: `φ = 1`, trusting the family's own scale.
//! - `Known(σ)`: `φ = σ² / family.scale()`.
//! - `Pearson`: `φ = Σ rᵢ² / (n − |E|)` from Pearson residuals of the
//!   unpenalized refit on the active set, with `n − |E|` degrees of freedom
//!   passed on to the pivot. Families without Pearson residuals use `φ = 1`.
use crate::{
    families::{restricted::restricted_mle, traits::LossFamily},
    inference::{
        covariance::{
            regularize, CovarianceEstimate, CovarianceEstimator, PivotLayout,
            DEFAULT_MAX_CONDITION,
        },
        errors::{InferenceError, InferenceResult},
    },
    optimization::loglik_optimizer::MLEOptions,
};
use ndarray::Array1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispersion {
    Model,
    Known(f64),
    Pearson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParametricEstimator {
    dispersion: Dispersion,
    max_condition: f64,
    refit: MLEOptions,
}

impl ParametricEstimator {
    /// # Errors
    /// - `InvalidSigma` when a known σ is not finite and positive.
    pub fn new(dispersion: Dispersion) -> InferenceResult<Self> {
        if let Dispersion::Known(sigma) = dispersion {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(InferenceError::InvalidSigma { value: sigma });
            }
        }
        Ok(Self { dispersion, max_condition: DEFAULT_MAX_CONDITION, refit: MLEOptions::default() })
    }

    /// # Errors
    /// - `InvalidConditionThreshold` when `max_condition ≤ 1`.
    pub fn with_max_condition(mut self, max_condition: f64) -> InferenceResult<Self> {
        if !max_condition.is_finite() || max_condition <= 1.0 {
            return Err(InferenceError::InvalidConditionThreshold { value: max_condition });
        }
        self.max_condition = max_condition;
        Ok(self)
    }

    pub fn with_refit_options(mut self, refit: MLEOptions) -> Self {
        self.refit = refit;
        self
    }

    pub fn dispersion(&self) -> Dispersion {
        self.dispersion
    }

    fn pearson<F: LossFamily>(
        &self, family: &F, layout: &PivotLayout,
    ) -> InferenceResult<(f64, Option<f64>)> {
        let df = family.nobs() as f64 - layout.nactive() as f64;
        if df <= 0.0 {
            return Err(InferenceError::InvalidDegreesOfFreedom { df });
        }
        let start: Array1<f64> = layout.active.iter().map(|&j| layout.beta_hat[j]).collect();
        let refit = restricted_mle(family, &layout.active, &start, &self.refit)?;
        match family.pearson_residuals(&refit)? {
            Some(resid) => {
                let phi = resid.dot(&resid) / df;
                log::debug!(
                    "{} Pearson dispersion {phi:.4} on {df} degrees of freedom",
                    family.name()
                );
                Ok((phi, Some(df)))
            }
            None => {
                log::debug!("{} has no Pearson residuals; using unit dispersion", family.name());
                Ok((1.0, None))
            }
        }
    }
}

impl<F: LossFamily> CovarianceEstimator<F> for ParametricEstimator {
    fn name(&self) -> &'static str {
        "parametric"
    }

    fn estimate(
        &mut self, family: &F, layout: &PivotLayout,
    ) -> InferenceResult<CovarianceEstimate> {
        let (phi, df) = match self.dispersion {
            Dispersion::Model => (1.0, None),
            Dispersion::Known(sigma) => (sigma * sigma / family.scale(), None),
            Dispersion::Pearson => self.pearson(family, layout)?,
        };
        let raw = layout.model_covariance() * phi;
        regularize(&raw, self.max_condition, df, phi)
    }
}

/// Parametric estimator for Gaussian fits: known `sigma` when given,
/// Pearson (residual variance with `n − |E|` df) otherwise.
pub fn gaussian_parametric_estimator(sigma: Option<f64>) -> InferenceResult<ParametricEstimator> {
    match sigma {
        Some(s) => ParametricEstimator::new(Dispersion::Known(s)),
        None => ParametricEstimator::new(Dispersion::Pearson),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::gaussian::Gaussian;
    use ndarray::{array, Array2};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Dispersion handling on a tiny Gaussian problem where the refit and its
    // residuals are known in closed form.
    // -------------------------------------------------------------------------

    fn problem() -> (Gaussian, PivotLayout) {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 0.0], [1.0, -1.0]];
        let y = array![1.0, 2.0, 3.0, 2.0];
        let fam = Gaussian::new(x, y, 1.0).expect("valid");
        let beta = array![2.0, 0.0];
        let h = fam.information(&beta).expect("closed form");
        let lay = PivotLayout::new(vec![0], beta, h, 0.0).expect("layout");
        (fam, lay)
    }

    #[test]
    // Purpose
    // -------
    // A known σ rescales the model covariance by σ² / scale.
    //
    // Given
    // -----
    // - Gaussian family with σ = 1; estimator with σ = 2.
    //
    // Expect
    // ------
    // - Σ = 4 · model covariance; no degrees of freedom.
    fn known_sigma_scales_model_covariance() {
        // Arrange
        let (fam, lay) = problem();
        let mut est = ParametricEstimator::new(Dispersion::Known(2.0)).expect("valid");

        // Act
        let cov = est.estimate(&fam, &lay).expect("estimate");

        // Assert
        let expected: Array2<f64> = lay.model_covariance() * 4.0;
        for (a, b) in cov.matrix.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(cov.df, None);
        assert_eq!(cov.dispersion, 4.0);
    }

    #[test]
    // Purpose
    // -------
    // Pearson dispersion is the residual sum of squares over n − |E|.
    //
    // Given
    // -----
    // - Intercept-only refit: mean 2, residuals (−1, 0, 1, 0).
    //
    // Expect
    // ------
    // - φ = 2 / 3 with df = 3.
    fn pearson_dispersion_uses_residual_degrees_of_freedom() {
        // Arrange
        let (fam, lay) = problem();
        let mut est = gaussian_parametric_estimator(None).expect("valid");

        // Act
        let cov = est.estimate(&fam, &lay).expect("estimate");

        // Assert
        assert!((cov.dispersion - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(cov.df, Some(3.0));
    }

    #[test]
    // Purpose
    // -------
    // A non-positive σ is rejected up front.
    //
    // Given
    // -----
    // - σ = 0.
    //
    // Expect
    // ------
    // - `InvalidSigma`.
    fn rejects_non_positive_sigma() {
        assert!(matches!(
            ParametricEstimator::new(Dispersion::Known(0.0)),
            Err(InferenceError::InvalidSigma { .. })
        ));
    }
}
