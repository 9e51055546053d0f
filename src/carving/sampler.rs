//! carving::sampler — hit-and-run for a Gaussian restricted to a polyhedron.
//!
//! Purpose
//! -------
//! Draw from `N(μ, Σ)` conditioned on `{w : A w ≤ b}` by hit-and-run in
//! whitened coordinates `w = μ + base + Lξ`, `L = Σ^{1/2}`, where `ξ` is
//! standard normal restricted to `A L ξ ≤ b − A(μ + base)`.
//!
//! Key behaviors
//! -------------
//! - Each step picks a direction: the target direction `Lᵀη` with
//!   probability ½, otherwise a uniformly random unit vector.
//! - Along the direction `u` the exact conditional is `N(−ξ·u, 1)`
//!   truncated to the feasible chord; it is drawn by inverse CDF in the
//!   tail-stable form, or by exponential rejection beyond 8 standard
//!   deviations.
//! - Every proposal is re-checked against `A w ≤ b`; a failed check (from
//!   rounding) keeps the chain in place and counts as a rejection.
//! - The run is `burnin + ndraw` steps, optionally capped by `max_steps`.
//!   A capped run or an acceptance rate below `min_acceptance` clears
//!   `mixed` and logs a warning.
//!
//! Invariants & assumptions
//! ------------------------
//! - The start point satisfies the constraints (up to
//!   `FEASIBILITY_TOL · (1 + |b_i|)`).
//! - `base` holds the part of `start − μ` outside the range of `L`; it is
//!   constant along the chain.
//!
//! Conventions
//! -----------
//! - Randomness comes from the caller's RNG; a seeded `StdRng` makes runs
//!   reproducible.
use crate::{
    carving::errors::{CarvingError, CarvingResult},
    inference::{
        information::{pinv_symmetric, psd_sqrt, validate_square},
        pivot::FEASIBILITY_TOL,
    },
    optimization::numerical_stability::GENERAL_TOL,
};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

const TAIL_SWITCH: f64 = 8.0;
const MAX_REJECTION_TRIES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerOptions {
    pub burnin: usize,
    pub ndraw: usize,
    /// Hard cap on `burnin + ndraw`.
    pub max_steps: Option<usize>,
    pub min_acceptance: f64,
}

impl SamplerOptions {
    /// # Errors
    /// - `InvalidSamplerOptions` when `ndraw == 0`, `max_steps ≤ burnin`, or
    ///   `min_acceptance ∉ [0, 1]`.
    pub fn new(
        burnin: usize, ndraw: usize, max_steps: Option<usize>, min_acceptance: f64,
    ) -> CarvingResult<Self> {
        let invalid = |name, reason| Err(CarvingError::InvalidSamplerOptions { name, reason });
        if ndraw == 0 {
            return invalid("ndraw", "must be positive");
        }
        if max_steps.is_some_and(|cap| cap <= burnin) {
            return invalid("max_steps", "must exceed burnin");
        }
        if !(0.0..=1.0).contains(&min_acceptance) {
            return invalid("min_acceptance", "must lie in [0, 1]");
        }
        Ok(Self { burnin, ndraw, max_steps, min_acceptance })
    }

    fn total_steps(&self) -> (usize, bool) {
        let wanted = self.burnin + self.ndraw;
        match self.max_steps {
            Some(cap) if cap < wanted => (cap, true),
            _ => (wanted, false),
        }
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self { burnin: 2000, ndraw: 8000, max_steps: None, min_acceptance: 0.05 }
    }
}

/// Post-burnin draws and chain diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerOutput {
    /// One row per retained step.
    pub draws: Array2<f64>,
    pub acceptance_rate: f64,
    pub steps: usize,
    pub mixed: bool,
}

/// `N(μ, Σ)` restricted to `{A w ≤ b}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedGaussian {
    linear_part: Array2<f64>,
    offset: Array1<f64>,
    mean: Array1<f64>,
    sqrt_cov: Array2<f64>,
}

impl ConstrainedGaussian {
    /// # Errors
    /// - `InvalidSamplerOptions` for inconsistent shapes.
    /// - Covariance validation failures.
    pub fn new(
        linear_part: Array2<f64>, offset: Array1<f64>, mean: Array1<f64>, covariance: &Array2<f64>,
    ) -> CarvingResult<Self> {
        let d = mean.len();
        validate_square("sampler covariance", covariance)?;
        let consistent = covariance.nrows() == d
            && linear_part.ncols() == d
            && offset.len() == linear_part.nrows();
        if !consistent {
            return Err(CarvingError::InvalidSamplerOptions {
                name: "shapes",
                reason: "A, b, mean and covariance disagree",
            });
        }
        let sqrt_cov = psd_sqrt(covariance)?;
        Ok(Self { linear_part, offset, mean, sqrt_cov })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    fn first_violation(&self, w: &Array1<f64>) -> Option<(usize, f64)> {
        let slack = &self.offset - &self.linear_part.dot(w);
        slack
            .iter()
            .zip(self.offset.iter())
            .enumerate()
            .find(|&(_, (&s, &b))| !(s >= -FEASIBILITY_TOL * (1.0 + b.abs())))
            .map(|(row, (&s, _))| (row, s))
    }

    /// Run hit-and-run from `start`. `target` is the contrast `η` whose
    /// direction is proposed half of the time (random directions only when
    /// `None`).
    ///
    /// # Errors
    /// - `InfeasibleStart` when `start` violates a constraint.
    /// - `InvalidSamplerOptions` for a `start` or `target` of the wrong
    ///   length.
    pub fn sample<R: Rng>(
        &self, start: &Array1<f64>, target: Option<&Array1<f64>>, opts: &SamplerOptions,
        rng: &mut R,
    ) -> CarvingResult<SamplerOutput> {
        let d = self.dim();
        if start.len() != d || target.is_some_and(|t| t.len() != d) {
            return Err(CarvingError::InvalidSamplerOptions {
                name: "start",
                reason: "length differs from dimension",
            });
        }
        if let Some((row, slack)) = self.first_violation(start) {
            return Err(CarvingError::InfeasibleStart { row, slack });
        }

        let centred = start - &self.mean;
        let mut xi = pinv_symmetric(&self.sqrt_cov)?.dot(&centred);
        let base = &centred - &self.sqrt_cov.dot(&xi);
        let shifted = &self.mean + &base;
        let g = self.linear_part.dot(&self.sqrt_cov);
        let h = &self.offset - &self.linear_part.dot(&shifted);
        let target_dir = target.map(|eta| self.sqrt_cov.t().dot(eta)).and_then(normalized);

        let (steps, capped) = opts.total_steps();
        let kept = steps.saturating_sub(opts.burnin);
        let mut draws = Array2::<f64>::zeros((kept, d));
        let mut w = start.clone();
        let mut accepted = 0usize;

        for step in 0..steps {
            let u = match &target_dir {
                Some(dir) if rng.gen_bool(0.5) => dir.clone(),
                _ => random_direction(d, rng),
            };
            if let Some(t) = chord_step(&g, &h, &xi, &u, rng) {
                let proposal_xi = &xi + &(&u * t);
                let proposal = &shifted + &self.sqrt_cov.dot(&proposal_xi);
                if self.first_violation(&proposal).is_none() {
                    xi = proposal_xi;
                    w = proposal;
                    accepted += 1;
                }
            }
            if step >= opts.burnin {
                draws.row_mut(step - opts.burnin).assign(&w);
            }
        }

        let acceptance_rate = if steps == 0 { 0.0 } else { accepted as f64 / steps as f64 };
        let mixed = !capped && acceptance_rate >= opts.min_acceptance;
        if !mixed {
            log::warn!(
                "constrained sampler may not have mixed: {steps} steps (capped: {capped}), \
                 acceptance {acceptance_rate:.3}"
            );
        } else {
            log::debug!("constrained sampler: {steps} steps, acceptance {acceptance_rate:.3}");
        }
        Ok(SamplerOutput { draws, acceptance_rate, steps, mixed })
    }
}

fn normalized(v: Array1<f64>) -> Option<Array1<f64>> {
    let norm = v.dot(&v).sqrt();
    (norm > GENERAL_TOL).then(|| v / norm)
}

fn random_direction<R: Rng>(d: usize, rng: &mut R) -> Array1<f64> {
    loop {
        let v: Array1<f64> = (0..d).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        if let Some(u) = normalized(v) {
            return u;
        }
    }
}

/// Exact draw of `t` along `u`; `None` when the chord is empty or the
/// truncated draw failed.
fn chord_step<R: Rng>(
    g: &Array2<f64>, h: &Array1<f64>, xi: &Array1<f64>, u: &Array1<f64>, rng: &mut R,
) -> Option<f64> {
    let gu = g.dot(u);
    let gxi = g.dot(xi);
    let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);
    let scale = gu.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    for ((&a, &hx), &hi_row) in gu.iter().zip(gxi.iter()).zip(h.iter()) {
        if a.abs() <= GENERAL_TOL * scale {
            continue;
        }
        let bound = (hi_row - hx).max(0.0) / a;
        if a > 0.0 {
            hi = hi.min(bound);
        } else {
            lo = lo.max(bound);
        }
    }
    if lo >= hi {
        return None;
    }
    let m = -xi.dot(u);
    truncated_standard_normal(lo - m, hi - m, rng).map(|s| m + s)
}

fn normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// `Z ~ N(0, 1)` conditioned on `a ≤ Z ≤ b`.
pub fn truncated_standard_normal<R: Rng>(a: f64, b: f64, rng: &mut R) -> Option<f64> {
    if a > TAIL_SWITCH {
        return exponential_rejection(a, b, rng);
    }
    if b < -TAIL_SWITCH {
        return exponential_rejection(-b, -a, rng).map(|x| -x);
    }
    let u: f64 = rng.gen();
    let x = if a >= 0.0 {
        let (sa, sb) = (normal_sf(a), normal_sf(b));
        SQRT_2 * erfc_inv(2.0 * (sb + u * (sa - sb)))
    } else {
        let (ca, cb) = (normal_cdf(a), normal_cdf(b));
        -SQRT_2 * erfc_inv(2.0 * (ca + u * (cb - ca)))
    };
    x.is_finite().then(|| x.clamp(a, b))
}

/// Robert's exponential proposal for a far upper-tail window `[a, b]`.
fn exponential_rejection<R: Rng>(a: f64, b: f64, rng: &mut R) -> Option<f64> {
    let alpha = 0.5 * (a + (a * a + 4.0).sqrt());
    for _ in 0..MAX_REJECTION_TRIES {
        let e: f64 = rng.sample(Exp1);
        let x = a + e / alpha;
        if x > b {
            continue;
        }
        let accept = (-0.5 * (x - alpha) * (x - alpha)).exp();
        if rng.gen::<f64>() <= accept {
            return Some(x);
        }
    }
    None
}
