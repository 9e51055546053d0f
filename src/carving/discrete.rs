//! One-parameter exponential family supported on Monte-Carlo draws.
//!
//! Draws `T_1, …, T_B` of a sufficient statistic taken under a reference
//! parameter `θ₀` are reweighted to any other `θ` by
//! `w_i(θ) ∝ exp((θ − θ₀) T_i / τ²)`, the likelihood ratio of the Gaussian
//! location family with variance `τ²`. Tail probabilities are computed
//! from log-weights with a max-shifted log-sum-exp so large tilts do not
//! overflow. Draws that are all on one side of an observed value make the
//! corresponding interval endpoint unbounded, reported as
//! `BracketNotFound`.
use crate::{
    inference::{
        errors::{InferenceError, InferenceResult},
        truncated::{invert_decreasing, validate_level, IntervalSearch, Tail},
    },
    optimization::numerical_stability::log_sum_exp,
};
use ndarray::Array1;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteFamily {
    sufficient_stat: Array1<f64>,
    theta0: f64,
    variance: f64,
}

impl DiscreteFamily {
    /// # Errors
    /// - `DimensionMismatch` for an empty sample.
    /// - `NonFiniteStatistic` for a non-finite draw.
    /// - `ZeroVariance` unless `variance` is finite and positive.
    pub fn new(sufficient_stat: Array1<f64>, theta0: f64, variance: f64) -> InferenceResult<Self> {
        if sufficient_stat.is_empty() {
            return Err(InferenceError::DimensionMismatch {
                what: "discrete family draws",
                expected: 1,
                found: 0,
            });
        }
        if let Some(&value) = sufficient_stat.iter().find(|v| !v.is_finite()) {
            return Err(InferenceError::NonFiniteStatistic { value });
        }
        if !variance.is_finite() || variance <= 0.0 {
            return Err(InferenceError::ZeroVariance { value: variance });
        }
        Ok(Self { sufficient_stat, theta0, variance })
    }

    pub fn len(&self) -> usize {
        self.sufficient_stat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sufficient_stat.is_empty()
    }

    pub fn theta0(&self) -> f64 {
        self.theta0
    }

    fn log_weights(&self, theta: f64) -> Array1<f64> {
        let tilt = (theta - self.theta0) / self.variance;
        self.sufficient_stat.mapv(|t| tilt * t)
    }

    fn log_mass<P: Fn(f64) -> bool>(&self, log_w: &Array1<f64>, keep: P) -> f64 {
        let kept: Array1<f64> =
            self.sufficient_stat
                .iter()
                .zip(log_w.iter())
                .filter(|&(&t, _)| keep(t))
                .map(|(_, &lw)| lw)
                .collect();
        log_sum_exp(kept.view())
    }

    /// `P_θ(T ≤ x)`.
    pub fn cdf(&self, theta: f64, x: f64) -> f64 {
        let log_w = self.log_weights(theta);
        let total = log_sum_exp(log_w.view());
        (self.log_mass(&log_w, |t| t <= x) - total).exp().clamp(0.0, 1.0)
    }

    /// `P_θ(T > x)`, computed from its own tail.
    pub fn ccdf(&self, theta: f64, x: f64) -> f64 {
        let log_w = self.log_weights(theta);
        let total = log_sum_exp(log_w.view());
        (self.log_mass(&log_w, |t| t > x) - total).exp().clamp(0.0, 1.0)
    }

    /// Weighted mean of `T` under `θ`.
    pub fn mean(&self, theta: f64) -> f64 {
        let log_w = self.log_weights(theta);
        let total = log_sum_exp(log_w.view());
        self.sufficient_stat.iter().zip(log_w.iter()).map(|(&t, &lw)| t * (lw - total).exp()).sum()
    }

    /// P-value of `θ = theta` against the observed `x`.
    pub fn pvalue(&self, theta: f64, x: f64, tail: Tail) -> f64 {
        match tail {
            Tail::TwoSided => 2.0 * self.cdf(theta, x).min(self.ccdf(theta, x)).min(0.5),
            Tail::Upper => self.ccdf(theta, x),
            Tail::Lower => self.cdf(theta, x),
        }
    }

    /// Equal-tailed `level` interval for `θ` given the observed `x`.
    ///
    /// # Errors
    /// - `InvalidLevel`.
    /// - `BracketNotFound` when an endpoint is unbounded on these draws.
    pub fn interval(
        &self, x: f64, level: f64, search: &IntervalSearch,
    ) -> InferenceResult<(f64, f64)> {
        validate_level(level)?;
        let alpha = 1.0 - level;
        let step = self.variance.sqrt();
        let f = |theta: f64| self.cdf(theta, x);
        let lower = invert_decreasing(f, 1.0 - 0.5 * alpha, x, step, search)?;
        let upper = invert_decreasing(f, 0.5 * alpha, x, step, search)?;
        Ok((lower, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::{Distribution, StandardNormal};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Tilting Gaussian draws reproduces the Gaussian location family; tails,
    // p-values and intervals behave at the extremes.
    // -------------------------------------------------------------------------

    fn gaussian_draws(n: usize, seed: u64) -> Array1<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| StandardNormal.sample(&mut rng)).collect()
    }

    #[test]
    // Purpose
    // -------
    // Tilting N(0, 1) draws to θ = 0.5 shifts the mean by about 0.5.
    //
    // Given
    // -----
    // - 20 000 standard normal draws, θ₀ = 0, τ² = 1.
    //
    // Expect
    // ------
    // - Tilted mean ≈ 0.5; cdf + ccdf = 1.
    fn tilt_shifts_mean() {
        // Arrange
        let fam = DiscreteFamily::new(gaussian_draws(20_000, 1), 0.0, 1.0).unwrap();

        // Act
        let m = fam.mean(0.5);

        // Assert
        assert!((m - 0.5).abs() < 0.05, "tilted mean {m}");
        assert!((fam.cdf(0.5, 0.3) + fam.ccdf(0.5, 0.3) - 1.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // P-values and intervals at the centre and beyond the draws.
    //
    // Given
    // -----
    // - 20 000 standard normal draws; x = 0 and x = 100.
    //
    // Expect
    // ------
    // - Two-sided p at θ = 0, x = 0 ≈ 1; the 95% interval at x = 0 is about
    //   (−1.96, 1.96); x = 100 has no upper endpoint.
    fn pvalues_and_intervals() {
        // Arrange
        let fam = DiscreteFamily::new(gaussian_draws(20_000, 2), 0.0, 1.0).unwrap();
        let search = IntervalSearch::default();

        // Act
        let p = fam.pvalue(0.0, 0.0, Tail::TwoSided);
        let (lo, hi) = fam.interval(0.0, 0.95, &search).unwrap();
        let unbounded = fam.interval(100.0, 0.95, &search);

        // Assert
        assert!(p > 0.95, "p {p}");
        assert!((lo + 1.96).abs() < 0.3 && (hi - 1.96).abs() < 0.3, "({lo}, {hi})");
        assert!(matches!(unbounded, Err(InferenceError::BracketNotFound { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Bad inputs are rejected at construction.
    //
    // Given
    // -----
    // - An empty sample, a NaN draw, a zero variance.
    //
    // Expect
    // ------
    // - Each returns an error.
    fn invalid_inputs() {
        assert!(DiscreteFamily::new(Array1::zeros(0), 0.0, 1.0).is_err());
        assert!(DiscreteFamily::new(ndarray::array![1.0, f64::NAN], 0.0, 1.0).is_err());
        assert!(DiscreteFamily::new(ndarray::array![1.0], 0.0, 0.0).is_err());
    }
}
