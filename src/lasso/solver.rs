//! lasso::solver — proximal Newton for weighted-L1 penalized losses.
//!
//! Purpose
//! -------
//! Minimize `L(β) + q(β) + Σ_j w_j |β_j|` for a [`LossFamily`] loss `L`, an
//! optional [`IdentityQuadratic`] `q`, and non-negative feature weights.
//!
//! Key behaviors
//! -------------
//! - Each outer iteration forms the quadratic model of `L + q` at the
//!   current iterate from the gradient and the full information matrix.
//! - The model plus penalty is minimized by cyclic coordinate descent with
//!   weighted soft-thresholding, keeping `r = H(z − β)` up to date.
//! - The Newton direction is damped by backtracking on the true objective
//!   (Armijo rule with the proximal predicted decrease).
//! - Convergence: relative change `max|Δβ| / max(1, max|β|) < tol` after at
//!   least `min_its` iterations, or a vanishing predicted decrease. Either
//!   way the subgradient conditions must then hold to
//!   `kkt_tol · max(1, max_j w_j)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `L` is convex and twice differentiable; the information matrix is PSD.
//! - Coordinates with zero curvature and zero weight are left at their
//!   current value.
//!
//! Conventions
//! -----------
//! - Exhausting `max_its`, a stalled line search, or a KKT residual above
//!   tolerance is [`SelectionError::NonConvergence`]; no partial solution is
//!   returned.
//! - Progress is reported with `log::debug!`.
use crate::{
    families::{quadratic::IdentityQuadratic, traits::LossFamily},
    lasso::{
        errors::{SelectionError, SelectionResult},
        weights::FeatureWeights,
    },
};
use ndarray::{Array1, Array2};

const ARMIJO: f64 = 1e-4;
const MAX_HALVINGS: usize = 60;
const CURVATURE_FLOOR: f64 = 1e-14;
const DEFAULT_KKT_TOL: f64 = 1e-5;

/// Iteration budget and tolerance of the penalized solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    pub min_its: usize,
    pub max_its: usize,
    pub tol: f64,
    /// Coordinate-descent sweeps per outer iteration.
    pub inner_max_its: usize,
    /// Largest accepted KKT residual, relative to `max(1, max_j w_j)`.
    pub kkt_tol: f64,
}

impl SolveOptions {
    /// # Errors
    /// - `InvalidSolveOptions` when `max_its == 0`, `min_its > max_its`,
    ///   `inner_max_its == 0`, or `tol` is not finite and positive.
    pub fn new(
        min_its: usize, max_its: usize, tol: f64, inner_max_its: usize,
    ) -> SelectionResult<Self> {
        let invalid =
            |name, value, reason| Err(SelectionError::InvalidSolveOptions { name, value, reason });
        if max_its == 0 {
            return invalid("max_its", 0.0, "must be positive");
        }
        if min_its > max_its {
            return invalid("min_its", min_its as f64, "must not exceed max_its");
        }
        if !tol.is_finite() || tol <= 0.0 {
            return invalid("tol", tol, "must be finite and > 0");
        }
        if inner_max_its == 0 {
            return invalid("inner_max_its", 0.0, "must be positive");
        }
        Ok(Self { min_its, max_its, tol, inner_max_its, kkt_tol: DEFAULT_KKT_TOL })
    }

    /// # Errors
    /// - `InvalidSolveOptions` unless `kkt_tol` is finite and positive.
    pub fn with_kkt_tol(mut self, kkt_tol: f64) -> SelectionResult<Self> {
        if !kkt_tol.is_finite() || kkt_tol <= 0.0 {
            return Err(SelectionError::InvalidSolveOptions {
                name: "kkt_tol",
                value: kkt_tol,
                reason: "must be finite and > 0",
            });
        }
        self.kkt_tol = kkt_tol;
        Ok(self)
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            min_its: 20,
            max_its: 500,
            tol: 1e-10,
            inner_max_its: 1000,
            kkt_tol: DEFAULT_KKT_TOL,
        }
    }
}

/// Diagnostics of a converged solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverReport {
    pub outer_iterations: usize,
    pub inner_sweeps: usize,
    /// Relative change at the last outer iteration.
    pub max_change: f64,
    pub objective: f64,
    /// Largest violation of the subgradient conditions at the solution.
    pub kkt_residual: f64,
}

/// `L + q + Σ w|β|` as a borrowed bundle.
#[derive(Debug, Clone, Copy)]
pub struct PenalizedObjective<'a, F: LossFamily> {
    pub family: &'a F,
    pub weights: &'a FeatureWeights,
    pub quadratic: Option<&'a IdentityQuadratic>,
}

impl<'a, F: LossFamily> PenalizedObjective<'a, F> {
    pub fn smooth_value(&self, beta: &Array1<f64>) -> SelectionResult<f64> {
        let q = self.quadratic.map_or(0.0, |q| q.value(beta));
        Ok(self.family.loss(beta)? + q)
    }

    pub fn smooth_gradient(&self, beta: &Array1<f64>) -> SelectionResult<Array1<f64>> {
        let mut g = self.family.gradient(beta)?;
        if let Some(q) = self.quadratic {
            g += &q.gradient(beta);
        }
        Ok(g)
    }

    /// Information matrix of `L` plus the curvature of `q`.
    pub fn hessian(&self, beta: &Array1<f64>) -> SelectionResult<Array2<f64>> {
        let mut h = self.family.information(beta)?;
        if let Some(q) = self.quadratic {
            q.add_curvature(&mut h);
        }
        Ok(h)
    }

    pub fn value(&self, beta: &Array1<f64>) -> SelectionResult<f64> {
        Ok(self.smooth_value(beta)? + self.weights.penalty(beta))
    }

    /// `max_j` distance of `−∇(L + q)_j` from `w_j ∂|β_j|`.
    pub fn kkt_residual(&self, beta: &Array1<f64>) -> SelectionResult<f64> {
        let g = self.smooth_gradient(beta)?;
        let worst = g.iter().zip(beta.iter()).enumerate().fold(0.0_f64, |m, (j, (&gj, &bj))| {
            let w = self.weights.get(j);
            let v = if bj != 0.0 { (gj + w * bj.signum()).abs() } else { (gj.abs() - w).max(0.0) };
            m.max(v)
        });
        Ok(worst)
    }
}

fn soft_threshold(x: f64, t: f64) -> f64 {
    x.signum() * (x.abs() - t).max(0.0)
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

/// Coordinate descent on `gᵀd + ½ dᵀHd + Σ w|β + d|`; returns the model
/// minimizer `z = β + d` and the number of sweeps.
fn minimize_model(
    beta: &Array1<f64>, g: &Array1<f64>, h: &Array2<f64>, weights: &FeatureWeights,
    opts: &SolveOptions,
) -> (Array1<f64>, usize) {
    let p = beta.len();
    let mut z = beta.clone();
    let mut r = Array1::<f64>::zeros(p);
    let mut sweeps = 0;
    while sweeps < opts.inner_max_its {
        sweeps += 1;
        let mut biggest = 0.0_f64;
        for j in 0..p {
            let hjj = h[[j, j]];
            if hjj <= CURVATURE_FLOOR {
                continue;
            }
            let c = g[j] + r[j] - hjj * (z[j] - beta[j]);
            let updated = soft_threshold(hjj * beta[j] - c, weights.get(j)) / hjj;
            let delta = updated - z[j];
            if delta != 0.0 {
                z[j] = updated;
                r.scaled_add(delta, &h.column(j));
                biggest = biggest.max(delta.abs());
            }
        }
        if biggest <= opts.tol * max_abs(&z).max(1.0) {
            break;
        }
    }
    (z, sweeps)
}

/// Minimize the penalized objective from `start`.
///
/// # Errors
/// - `DimensionMismatch` when `start` or the weights do not have length `p`.
/// - `NonFiniteObjective` when the objective at `start` is not finite.
/// - `NonConvergence` when `max_its` outer iterations do not suffice, or
///   the final iterate violates the subgradient conditions beyond
///   `kkt_tol`.
/// - Family errors from the loss, gradient or information.
pub fn solve<F: LossFamily>(
    objective: &PenalizedObjective<'_, F>, start: Array1<f64>, opts: &SolveOptions,
) -> SelectionResult<(Array1<f64>, SolverReport)> {
    let p = objective.family.nfeatures();
    if start.len() != p {
        return Err(SelectionError::DimensionMismatch {
            what: "warm start",
            expected: p,
            found: start.len(),
        });
    }
    if objective.weights.len() != p {
        let found = objective.weights.len();
        return Err(SelectionError::WeightsDimMismatch { expected: p, found });
    }
    let mut beta = start;
    let mut value = objective.value(&beta)?;
    if !value.is_finite() {
        return Err(SelectionError::NonFiniteObjective { iteration: 0, value });
    }
    let mut inner_sweeps = 0;
    let mut change = f64::INFINITY;

    for iteration in 1..=opts.max_its {
        let g = objective.smooth_gradient(&beta)?;
        let h = objective.hessian(&beta)?;
        let (z, sweeps) = minimize_model(&beta, &g, &h, objective.weights, opts);
        inner_sweeps += sweeps;
        let direction = &z - &beta;
        let predicted =
            g.dot(&direction) + objective.weights.penalty(&z) - objective.weights.penalty(&beta);

        if predicted >= -f64::EPSILON * value.abs().max(1.0) {
            change = 0.0;
            log::debug!("{} lasso stationary at iteration {iteration}", objective.family.name());
            return finish(objective, beta, value, iteration, inner_sweeps, change, opts);
        }

        let mut step = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_HALVINGS {
            let candidate = &beta + &(&direction * step);
            let cand_value = objective.value(&candidate)?;
            if cand_value.is_finite() && cand_value <= value + ARMIJO * step * predicted {
                accepted = Some((candidate, cand_value));
                break;
            }
            step *= 0.5;
        }
        let Some((next, next_value)) = accepted else {
            log::debug!(
                "{} lasso line search stalled at iteration {iteration}; objective {value:.6e}",
                objective.family.name()
            );
            return finish(objective, beta, value, iteration, inner_sweeps, 0.0, opts);
        };

        change = max_abs(&(&next - &beta)) / max_abs(&next).max(1.0);
        beta = next;
        value = next_value;
        log::debug!(
            "{} lasso iteration {iteration}: objective {value:.8e}, change {change:.3e}, \
             step {step}",
            objective.family.name()
        );
        if iteration >= opts.min_its && change < opts.tol {
            return finish(objective, beta, value, iteration, inner_sweeps, change, opts);
        }
    }
    let kkt_residual = objective.kkt_residual(&beta)?;
    Err(SelectionError::NonConvergence {
        iterations: opts.max_its,
        change,
        tol: opts.tol,
        kkt_residual,
    })
}

/// Accept `beta` only if it satisfies the subgradient conditions.
fn finish<F: LossFamily>(
    objective: &PenalizedObjective<'_, F>, beta: Array1<f64>, value: f64, iterations: usize,
    inner_sweeps: usize, change: f64, opts: &SolveOptions,
) -> SelectionResult<(Array1<f64>, SolverReport)> {
    let kkt_residual = objective.kkt_residual(&beta)?;
    let scale = objective.weights.as_array().iter().fold(1.0_f64, |m, &w| m.max(w));
    if kkt_residual.is_nan() || kkt_residual > opts.kkt_tol * scale {
        log::debug!(
            "{} lasso stopped at iteration {iterations} with KKT residual {kkt_residual:.3e}",
            objective.family.name()
        );
        let tol = opts.tol;
        return Err(SelectionError::NonConvergence { iterations, change, tol, kkt_residual });
    }
    let report = SolverReport {
        outer_iterations: iterations,
        inner_sweeps,
        max_change: change,
        objective: value,
        kkt_residual,
    };
    Ok((beta, report))
}
