//! Pairs-bootstrap (sandwich) covariance for the selection pivot.
//!
//! Purpose
//! -------
//! Estimate the covariance of `z = (β̄_E, U)` without trusting the model's
//! variance function. Rows are resampled with replacement, the loss
//! gradient is re-evaluated at the unpenalized restricted estimate `β̃`, and
//! each draw is mapped to pivot coordinates with the information at `β̃`:
//! `z* = (β̃_E − H̃_EE⁻¹ g*_E, −g*_I + H̃_IE H̃_EE⁻¹ g*_E)`.
//!
//! Key behaviors
//! -------------
//! - The estimator owns a `StdRng`; a fixed seed gives identical estimates
//!   across runs, and repeated calls continue the stream.
//! - The empirical covariance uses the `B − 1` denominator and goes through
//!   [`regularize`].
//!
//! Invariants & assumptions
//! ------------------------
//! - `B ≥ 2`.
//! - Row resampling keeps the family's hyper-parameters (σ, trials).
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
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Default number of bootstrap resamples.
pub const DEFAULT_BOOTSTRAP_SAMPLES: usize = 1000;

#[derive(Debug, Clone)]
pub struct SandwichEstimator {
    samples: usize,
    rng: StdRng,
    max_condition: f64,
    refit: MLEOptions,
}

impl SandwichEstimator {
    /// # Errors
    /// - `InvalidBootstrap` when `samples < 2`.
    pub fn new(samples: usize, rng: StdRng) -> InferenceResult<Self> {
        if samples < 2 {
            return Err(InferenceError::InvalidBootstrap { samples });
        }
        Ok(Self {
            samples,
            rng,
            max_condition: DEFAULT_MAX_CONDITION,
            refit: MLEOptions::default(),
        })
    }

    pub fn from_seed(samples: usize, seed: u64) -> InferenceResult<Self> {
        Self::new(samples, StdRng::seed_from_u64(seed))
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

    pub fn samples(&self) -> usize {
        self.samples
    }
}

impl<F: LossFamily> CovarianceEstimator<F> for SandwichEstimator {
    fn name(&self) -> &'static str {
        "sandwich"
    }

    fn estimate(
        &mut self, family: &F, layout: &PivotLayout,
    ) -> InferenceResult<CovarianceEstimate> {
        let n = family.nobs();
        let start: Array1<f64> = layout.active.iter().map(|&j| layout.beta_hat[j]).collect();
        let beta_tilde = restricted_mle(family, &layout.active, &start, &self.refit)?;
        let mut info = family.information(&beta_tilde)?;
        info.diag_mut().map_inplace(|h| *h += layout.curvature);
        let centred = PivotLayout::new(layout.active.clone(), beta_tilde, info, layout.curvature)?;

        let mut draws = Array2::<f64>::zeros((self.samples, layout.dim()));
        let mut rows = vec![0usize; n];
        for b in 0..self.samples {
            rows.iter_mut().for_each(|r| *r = self.rng.gen_range(0..n));
            let resampled = family.subset(&rows)?;
            let g_star = resampled.gradient(&centred.beta_hat)?;
            draws.row_mut(b).assign(&centred.score_map(&g_star));
        }

        let mean = draws
            .mean_axis(Axis(0))
            .ok_or(InferenceError::InvalidBootstrap { samples: self.samples })?;
        let deviations = &draws - &mean.insert_axis(Axis(0));
        let raw = deviations.t().dot(&deviations) / (self.samples as f64 - 1.0);
        log::debug!(
            "{} sandwich covariance from {} pairs-bootstrap draws",
            family.name(),
            self.samples
        );
        regularize(&raw, self.max_condition, None, 1.0)
    }
}

/// Pairs-bootstrap estimator with `samples` resamples seeded by `seed`.
pub fn gaussian_sandwich_estimator(
    samples: usize, seed: u64,
) -> InferenceResult<SandwichEstimator> {
    SandwichEstimator::from_seed(samples, seed)
}
