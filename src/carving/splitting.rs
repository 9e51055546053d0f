//! Data splitting: Wald inference on the leftover rows.
//!
//! The stage-one active set is refit without penalty on the leftover rows
//! only (argmin L-BFGS). Because those rows played no part in selection,
//! the classical Wald statistic `β̃_j / sd_j` with `sd_j² = (H₂⁻¹)_jj` is
//! valid as is. It serves as the baseline data carving improves on.
use crate::{
    carving::{
        errors::{CarvingError, CarvingResult},
        split::SplitModel,
    },
    families::{restricted::restricted_mle, traits::LossFamily},
    inference::{
        information::{spd_inverse, submatrix},
        truncated::{pvalue_from_cdf, validate_level, PivotLaw, Tail},
    },
    optimization::loglik_optimizer::MLEOptions,
};
use ndarray::{Array1, Array2};

/// Wald test of one coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitTest {
    pub estimate: f64,
    pub sd: f64,
    pub pvalue: f64,
    pub interval: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct DataSplitting<'a, F: LossFamily> {
    model: &'a SplitModel<F>,
    /// Full-length refit on the leftover rows.
    estimate: Array1<f64>,
    /// `H₂⁻¹` on the active set.
    covariance: Array2<f64>,
    law: PivotLaw,
}

impl<'a, F: LossFamily> DataSplitting<'a, F> {
    /// # Errors
    /// - `InsufficientLeftover` when the leftover rows cannot identify the
    ///   active coefficients.
    /// - Refit or information failures.
    pub fn fit(model: &'a SplitModel<F>) -> CarvingResult<Self> {
        Self::fit_with(model, &MLEOptions::default())
    }

    pub fn fit_with(model: &'a SplitModel<F>, refit: &MLEOptions) -> CarvingResult<Self> {
        let active = model.active();
        let leftover = model.family().subset(&model.split().leftover)?;
        if leftover.nobs() <= active.len() {
            return Err(CarvingError::InsufficientLeftover {
                nobs: leftover.nobs(),
                nactive: active.len(),
            });
        }
        let start: Array1<f64> =
            active.iter().map(|&j| model.stage_one().lasso_solution()[j]).collect();
        let estimate = restricted_mle(&leftover, active, &start, refit)?;
        let info = leftover.information(&estimate)?;
        let covariance = spd_inverse(&submatrix(&info, active, active))?;
        Ok(Self { model, estimate, covariance, law: PivotLaw::Gaussian })
    }

    /// Use a Student-t reference law with `df` degrees of freedom.
    pub fn with_df(mut self, df: f64) -> CarvingResult<Self> {
        self.law = PivotLaw::from_df(Some(df))?;
        Ok(self)
    }

    pub fn estimate(&self) -> &Array1<f64> {
        &self.estimate
    }

    /// Two-sided Wald test and equal-tailed `level` interval for
    /// `variable`.
    ///
    /// # Errors
    /// - `VariableNotActive` when `variable` was not selected at stage one.
    /// - `Inference(InvalidLevel)`.
    pub fn hypothesis_test(&self, variable: usize, level: f64) -> CarvingResult<SplitTest> {
        validate_level(level)?;
        let k = self
            .model
            .active()
            .iter()
            .position(|&j| j == variable)
            .ok_or(CarvingError::VariableNotActive { variable })?;
        let estimate = self.estimate[variable];
        let sd = self.covariance[[k, k]].max(0.0).sqrt();
        let pvalue = pvalue_from_cdf(self.law.cdf(estimate / sd), Tail::TwoSided);
        let q = self.law.quantile(1.0 - 0.5 * (1.0 - level));
        Ok(SplitTest { estimate, sd, pvalue, interval: (estimate - q * sd, estimate + q * sd) })
    }
}
