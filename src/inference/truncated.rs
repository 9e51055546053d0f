//! inference::truncated — truncated Gaussian and Student-t pivots.
//!
//! Purpose
//! -------
//! Evaluate the law of a scalar statistic `X = μ + sd·Z` conditioned on
//! `lower ≤ X ≤ upper`, where `Z` is standard normal or Student-t, and
//! invert it in `μ` for confidence intervals.
//!
//! Key behaviors
//! -------------
//! - All tail probabilities are computed in log space. When the truncation
//!   window lies in the upper tail the ratio is formed from survival
//!   functions, in the lower tail from CDFs, so ratios of tiny
//!   probabilities keep their precision.
//! - The Gaussian log-survival switches to the Mills-ratio asymptotic
//!   expansion beyond `z = 30`; the Student-t log-survival sums the
//!   incomplete-beta series once `z² > 9ν`. Neither underflows.
//! - Windows too narrow for the log tails to resolve are treated as flat.
//! - Each interval end is bracketed by doubling steps away from the
//!   observation, then bisected. An end whose target level is never
//!   reached is unbounded.
//!
//! Invariants & assumptions
//! ------------------------
//! - `sd > 0` and `upper − lower` exceeds a relative tolerance; otherwise
//!   construction fails with `ZeroVariance` / `DegenerateInterval`.
//! - The truncated CDF is non-increasing in `μ` for the Gaussian law. The
//!   truncated Student-t CDF is not monotone: far from the window it tends
//!   to neither 0 nor 1, so its intervals may be half-infinite.
//!
//! Testing notes
//! -------------
//! - Untruncated limits reproduce the normal CDF; far-tail windows stay
//!   finite for both laws; interval endpoints invert the CDF; Student-t
//!   intervals are finite or unbounded, never NaN.
use crate::inference::errors::{InferenceError, InferenceResult};
use statrs::{
    distribution::{ContinuousCDF, StudentsT},
    function::{
        beta::ln_beta,
        erf::{erfc, erfc_inv},
    },
};
use std::f64::consts::{PI, SQRT_2};

const MILLS_SWITCH: f64 = 30.0;
/// Below this `ν/z²` the Student-t tail is summed as a series.
const STUDENT_SERIES_SWITCH: f64 = 1.0 / 9.0;
const STUDENT_SERIES_TERMS: usize = 200;
const FLAT_WINDOW: f64 = 1e4 * f64::EPSILON;

/// Relative width below which a truncation window is degenerate.
pub const DEGENERATE_WIDTH: f64 = 1e-10;

/// Tail(s) of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    TwoSided,
    /// `H₁: μ > μ₀`.
    Upper,
    /// `H₁: μ < μ₀`.
    Lower,
}

/// Untruncated reference law of the standardized statistic.
#[derive(Debug, Clone)]
pub enum PivotLaw {
    Gaussian,
    StudentT(StudentsT),
}

impl PivotLaw {
    /// `None` selects the Gaussian law.
    ///
    /// # Errors
    /// - `InvalidDegreesOfFreedom` for a non-positive or non-finite df.
    pub fn from_df(df: Option<f64>) -> InferenceResult<Self> {
        match df {
            None => Ok(PivotLaw::Gaussian),
            Some(df) if df.is_finite() && df > 0.0 => StudentsT::new(0.0, 1.0, df)
                .map(PivotLaw::StudentT)
                .map_err(|_| InferenceError::InvalidDegreesOfFreedom { df }),
            Some(df) => Err(InferenceError::InvalidDegreesOfFreedom { df }),
        }
    }

    /// `ln P(Z > z)`.
    pub fn log_sf(&self, z: f64) -> f64 {
        if z == f64::INFINITY {
            return f64::NEG_INFINITY;
        }
        if z == f64::NEG_INFINITY {
            return 0.0;
        }
        match self {
            PivotLaw::Gaussian => gaussian_log_sf(z),
            PivotLaw::StudentT(t) => {
                if z >= 0.0 {
                    student_log_sf(t, z)
                } else {
                    (-student_log_sf(t, -z).exp()).ln_1p()
                }
            }
        }
    }

    /// `ln P(Z ≤ z)`; the laws are symmetric.
    pub fn log_cdf(&self, z: f64) -> f64 {
        self.log_sf(-z)
    }

    pub fn cdf(&self, z: f64) -> f64 {
        self.log_cdf(z).exp()
    }

    /// Quantile of the untruncated law.
    pub fn quantile(&self, p: f64) -> f64 {
        match self {
            PivotLaw::Gaussian => -SQRT_2 * erfc_inv(2.0 * p),
            PivotLaw::StudentT(t) => t.inverse_cdf(p),
        }
    }

    /// `P(a ≤ Z ≤ x | a ≤ Z ≤ b)` in standardized units.
    pub fn truncated_cdf(&self, a: f64, b: f64, x: f64) -> f64 {
        if x <= a {
            return 0.0;
        }
        if x >= b {
            return 1.0;
        }
        let value = if a >= 0.0 {
            let (la, lx, lb) = (self.log_sf(a), self.log_sf(x), self.log_sf(b));
            if flat_window(la, lb) {
                return uniform_cdf(a, b, x);
            }
            (-(lx - la).exp_m1()) / (-(lb - la).exp_m1())
        } else if b <= 0.0 {
            let (la, lx, lb) = (self.log_cdf(a), self.log_cdf(x), self.log_cdf(b));
            if flat_window(lb, la) {
                return uniform_cdf(a, b, x);
            }
            (lx - lb).exp() * (-(la - lx).exp_m1()) / (-(la - lb).exp_m1())
        } else {
            let fa = self.cdf(a);
            (self.cdf(x) - fa) / (self.cdf(b) - fa)
        };
        if value.is_nan() {
            return uniform_cdf(a, b, x);
        }
        value.clamp(0.0, 1.0)
    }
}

/// The window carries so little mass relative to its near end that the
/// log-tail difference is lost to rounding.
fn flat_window(near: f64, far: f64) -> bool {
    (near - far).abs() <= FLAT_WINDOW * (1.0 + near.abs())
}

/// Conditional CDF of a locally flat density on `[a, b]`.
fn uniform_cdf(a: f64, b: f64, x: f64) -> f64 {
    if a.is_finite() && b.is_finite() && b > a {
        ((x - a) / (b - a)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// `ln P(T > z)` for `z ≥ 0`. Far in the tail the regularized incomplete beta
/// `I_x(ν/2, 1/2)`, `x = ν/(ν+z²)`, is summed as its hypergeometric series in
/// log space, so the result never underflows.
fn student_log_sf(t: &StudentsT, z: f64) -> f64 {
    let nu = t.freedom();
    let r = nu / z / z;
    if r >= STUDENT_SERIES_SWITCH {
        return t.sf(z).ln();
    }
    let (a, b) = (0.5 * nu, 0.5);
    let x = r / (1.0 + r);
    let (mut term, mut sum) = (1.0, 1.0);
    for n in 0..STUDENT_SERIES_TERMS {
        let n = n as f64;
        term *= (a + b + n) / (a + 1.0 + n) * x;
        sum += term;
        if term < f64::EPSILON * sum {
            break;
        }
    }
    let log_x = nu.ln() - 2.0 * z.ln() - r.ln_1p();
    let log_one_minus_x = -r.ln_1p();
    a * log_x + b * log_one_minus_x - a.ln() - ln_beta(a, b) + sum.ln() - std::f64::consts::LN_2
}

fn gaussian_log_sf(z: f64) -> f64 {
    if z < MILLS_SWITCH {
        (0.5 * erfc(z / SQRT_2)).ln()
    } else {
        let z2 = z * z;
        let series = 1.0 - 1.0 / z2 + 3.0 / (z2 * z2) - 15.0 / (z2 * z2 * z2);
        -0.5 * z2 - z.ln() - 0.5 * (2.0 * PI).ln() + series.ln()
    }
}

/// Budget for inverting a pivot in its location parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSearch {
    pub max_iter: usize,
    /// Stop when the bracket is narrower than `tol · sd`.
    pub tol: f64,
    pub max_bracket_doublings: usize,
}

impl Default for IntervalSearch {
    fn default() -> Self {
        Self { max_iter: 200, tol: 1e-8, max_bracket_doublings: 60 }
    }
}

/// Validate a confidence level in `(0, 1)`.
pub fn validate_level(level: f64) -> InferenceResult<()> {
    if level.is_finite() && level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(InferenceError::InvalidLevel { level })
    }
}

/// Two-sided or one-sided p-value from a lower-tail probability `F`.
pub fn pvalue_from_cdf(cdf: f64, tail: Tail) -> f64 {
    let p = match tail {
        Tail::TwoSided => 2.0 * cdf.min(1.0 - cdf),
        Tail::Upper => 1.0 - cdf,
        Tail::Lower => cdf,
    };
    p.clamp(0.0, 1.0)
}

/// Find `θ` with `f(θ) = target` for a non-increasing `f`, starting the
/// bracket at `start` with initial half-width `step`.
///
/// # Errors
/// - `BracketNotFound` when doubling never brackets the target or `f`
///   returns NaN.
pub fn invert_decreasing<G>(
    f: G, target: f64, start: f64, step: f64, search: &IntervalSearch,
) -> InferenceResult<f64>
where
    G: Fn(f64) -> f64,
{
    let lo = walk_to_target(&f, target, start, step, -1.0, search)?
        .ok_or_else(|| exhausted(target, search))?;
    let hi = walk_to_target(&f, target, start, step, 1.0, search)?
        .ok_or_else(|| exhausted(target, search))?;
    Ok(bisect(&f, target, lo, hi, step, search))
}

fn exhausted(target: f64, search: &IntervalSearch) -> InferenceError {
    InferenceError::BracketNotFound { target, iterations: search.max_bracket_doublings }
}

/// Walk away from `start` with doubling steps until `f` reaches `target`:
/// `f ≥ target` walking down (`direction < 0`), `f ≤ target` walking up.
/// `Ok(None)` when the doubling budget runs out on finite values.
fn walk_to_target<G>(
    f: &G, target: f64, start: f64, step: f64, direction: f64, search: &IntervalSearch,
) -> InferenceResult<Option<f64>>
where
    G: Fn(f64) -> f64,
{
    let (mut point, mut width) = (start + direction * step, step);
    for doublings in 0..=search.max_bracket_doublings {
        let v = f(point);
        if v.is_nan() {
            return Err(InferenceError::BracketNotFound { target, iterations: doublings });
        }
        let reached = if direction < 0.0 { v >= target } else { v <= target };
        if reached {
            return Ok(Some(point));
        }
        width *= 2.0;
        point += direction * width;
    }
    Ok(None)
}

/// Bisect `[lo, hi]` keeping `f(lo) ≥ target ≥ f(hi)`.
fn bisect<G>(
    f: &G, target: f64, mut lo: f64, mut hi: f64, step: f64, search: &IntervalSearch,
) -> f64
where
    G: Fn(f64) -> f64,
{
    for _ in 0..search.max_iter {
        if hi - lo <= search.tol * step {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if f(mid) >= target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Law of `X = μ + sd·Z` truncated to `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct TruncatedPivot {
    law: PivotLaw,
    lower: f64,
    upper: f64,
    sd: f64,
}

impl TruncatedPivot {
    /// # Errors
    /// - `ZeroVariance` when `sd` is not finite and positive.
    /// - `DegenerateInterval` when `upper − lower ≤ DEGENERATE_WIDTH · sd`
    ///   or either limit is NaN.
    pub fn new(law: PivotLaw, lower: f64, upper: f64, sd: f64) -> InferenceResult<Self> {
        if !sd.is_finite() || sd <= 0.0 {
            return Err(InferenceError::ZeroVariance { value: sd });
        }
        if lower.is_nan() || upper.is_nan() || upper - lower <= DEGENERATE_WIDTH * sd {
            return Err(InferenceError::DegenerateInterval { lower, upper });
        }
        Ok(Self { law, lower, upper, sd })
    }

    pub fn limits(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    pub fn sd(&self) -> f64 {
        self.sd
    }

    /// `P_μ(X ≤ x | lower ≤ X ≤ upper)`.
    pub fn cdf(&self, mean: f64, x: f64) -> f64 {
        let scale = |v: f64| (v - mean) / self.sd;
        self.law.truncated_cdf(scale(self.lower), scale(self.upper), scale(x))
    }

    /// # Errors
    /// - `NonFiniteStatistic` when the observation or the pivot is not finite.
    pub fn pvalue(&self, null_value: f64, observed: f64, tail: Tail) -> InferenceResult<f64> {
        if !observed.is_finite() {
            return Err(InferenceError::NonFiniteStatistic { value: observed });
        }
        let f = self.cdf(null_value, observed);
        if !f.is_finite() {
            return Err(InferenceError::NonFiniteStatistic { value: f });
        }
        Ok(pvalue_from_cdf(f, tail))
    }

    /// Lower end of the equal-tailed `level` interval: the `μ` with
    /// `F_μ(observed) = 1 − α/2`. It is `−∞` when the CDF never climbs to
    /// that level below the observation, which heavy-tailed laws allow.
    ///
    /// # Errors
    /// - `InvalidLevel`, `NonFiniteStatistic`.
    /// - `BracketNotFound` when no crossing lies above the observation
    ///   either, or the CDF evaluates to NaN.
    pub fn lower_endpoint(
        &self, observed: f64, level: f64, search: &IntervalSearch,
    ) -> InferenceResult<f64> {
        let target = 1.0 - 0.5 * self.alpha(observed, level)?;
        let f = |mu: f64| self.cdf(mu, observed);
        let Some(lo) = walk_to_target(&f, target, observed, self.sd, -1.0, search)? else {
            return Ok(f64::NEG_INFINITY);
        };
        let hi = walk_to_target(&f, target, observed, self.sd, 1.0, search)?
            .ok_or_else(|| exhausted(target, search))?;
        Ok(bisect(&f, target, lo, hi, self.sd, search))
    }

    /// Upper end of the equal-tailed `level` interval: the `μ` with
    /// `F_μ(observed) = α/2`, or `+∞` when the CDF never falls that far.
    ///
    /// # Errors
    /// - As [`TruncatedPivot::lower_endpoint`], mirrored.
    pub fn upper_endpoint(
        &self, observed: f64, level: f64, search: &IntervalSearch,
    ) -> InferenceResult<f64> {
        let target = 0.5 * self.alpha(observed, level)?;
        let f = |mu: f64| self.cdf(mu, observed);
        let Some(hi) = walk_to_target(&f, target, observed, self.sd, 1.0, search)? else {
            return Ok(f64::INFINITY);
        };
        let lo = walk_to_target(&f, target, observed, self.sd, -1.0, search)?
            .ok_or_else(|| exhausted(target, search))?;
        Ok(bisect(&f, target, lo, hi, self.sd, search))
    }

    /// Equal-tailed `level` interval for `μ` given the observation; either
    /// end may be infinite.
    ///
    /// # Errors
    /// - Any endpoint error.
    /// - `DegenerateInterval` when the ends cross, which only a
    ///   non-monotone (Student-t) pivot can produce.
    pub fn interval(
        &self, observed: f64, level: f64, search: &IntervalSearch,
    ) -> InferenceResult<(f64, f64)> {
        let lower = self.lower_endpoint(observed, level, search)?;
        let upper = self.upper_endpoint(observed, level, search)?;
        if lower > upper {
            return Err(InferenceError::DegenerateInterval { lower, upper });
        }
        Ok((lower, upper))
    }

    /// Selective median-unbiased estimate: the `μ` with
    /// `F_μ(observed) = ½`, restricted to `bounds`.
    ///
    /// For the Gaussian law the CDF decreases in `μ`, so the estimate of an
    /// equal-tailed interval always lies between its ends.
    ///
    /// # Errors
    /// - `NonFiniteStatistic`, or NaN while bracketing.
    pub fn median_estimate(
        &self, observed: f64, bounds: (f64, f64), search: &IntervalSearch,
    ) -> InferenceResult<f64> {
        if !observed.is_finite() {
            return Err(InferenceError::NonFiniteStatistic { value: observed });
        }
        let f = |mu: f64| self.cdf(mu, observed);
        let lo = match bounds.0.is_finite() {
            true => Some(bounds.0),
            false => walk_to_target(&f, 0.5, observed, self.sd, -1.0, search)?,
        };
        let hi = match bounds.1.is_finite() {
            true => Some(bounds.1),
            false => walk_to_target(&f, 0.5, observed, self.sd, 1.0, search)?,
        };
        let estimate = match (lo, hi) {
            (Some(lo), Some(hi)) => bisect(&f, 0.5, lo, hi, self.sd, search),
            (None, _) => f64::NEG_INFINITY,
            (_, None) => f64::INFINITY,
        };
        Ok(estimate.max(bounds.0).min(bounds.1))
    }

    fn alpha(&self, observed: f64, level: f64) -> InferenceResult<f64> {
        validate_level(level)?;
        if !observed.is_finite() {
            return Err(InferenceError::NonFiniteStatistic { value: observed });
        }
        Ok(1.0 - level)
    }
}
