//! lasso::constraints — the selection event as a polyhedron.
//!
//! Purpose
//! -------
//! Express "the lasso selected this active set with these signs" as affine
//! constraints `A z ≤ b` on the pivot statistic `z = (β̄_E, U)`, obtained by
//! linearizing the KKT conditions at the solution.
//!
//! Key behaviors
//! -------------
//! - [`ActiveSet::from_solution`] keeps every nonzero coefficient plus every
//!   unpenalized feature, with the coefficient's sign.
//! - [`build_constraints`] computes the one-step estimator, the inactive
//!   score and the rows:
//!   - penalized active `k`: `−s_k β̄_k ≤ −s_k δ_k` (so `s_k β̂_k ≥ 0`);
//!   - inactive `m`: `U_m ≤ λ_m − (H_IE δ)_m` and `−U_m ≤ λ_m + (H_IE δ)_m`
//!     (so `|g_m| ≤ λ_m`).
//! - Unpenalized active features contribute no rows.
//! - With an empty active set `z = U = −g` and only the `|U| ≤ λ` rows
//!   remain.
//!
//! Invariants & assumptions
//! ------------------------
//! - The observed statistic satisfies every row up to
//!   `FEASIBILITY_TOL · (1 + |b_i|)`; otherwise the build fails with
//!   `InfeasiblePolyhedron`.
//! - Sign rows come first, so `A[..sign_rows, ..|E|]` is the block of
//!   constraints that only involve active coordinates.
use crate::{
    inference::{
        covariance::PivotLayout,
        errors::InferenceResult,
        information::symmetrize,
        pivot::{truncation_limits, TruncationLimits, FEASIBILITY_TOL},
    },
    lasso::{
        errors::{SelectionError, SelectionResult},
        weights::FeatureWeights,
    },
};
use ndarray::{s, Array1, Array2};

/// Selected features, in increasing index order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSet {
    pub indices: Vec<usize>,
    /// `sign(β̂_j)`; 0 for an unpenalized feature fitted at exactly zero.
    pub signs: Vec<f64>,
    pub penalized: Vec<bool>,
}

impl ActiveSet {
    pub fn from_solution(beta: &Array1<f64>, weights: &FeatureWeights) -> Self {
        let mut out = ActiveSet { indices: Vec::new(), signs: Vec::new(), penalized: Vec::new() };
        for (j, &b) in beta.iter().enumerate() {
            let penalized = weights.is_penalized(j);
            if b != 0.0 || !penalized {
                out.indices.push(j);
                out.signs.push(if b == 0.0 { 0.0 } else { b.signum() });
                out.penalized.push(penalized);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position of feature `j` within the active set.
    pub fn position(&self, j: usize) -> Option<usize> {
        self.indices.iter().position(|&k| k == j)
    }
}

/// `{z : A z ≤ b}` together with the covariance of `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyhedron {
    pub linear_part: Array2<f64>,
    pub offset: Array1<f64>,
    pub covariance: Array2<f64>,
}

impl Polyhedron {
    /// # Errors
    /// - `DimensionMismatch` when `A`, `b` and `Σ` do not fit together.
    pub fn new(
        linear_part: Array2<f64>, offset: Array1<f64>, covariance: Array2<f64>,
    ) -> SelectionResult<Self> {
        if offset.len() != linear_part.nrows() {
            return Err(SelectionError::DimensionMismatch {
                what: "constraint offset",
                expected: linear_part.nrows(),
                found: offset.len(),
            });
        }
        if covariance.dim() != (linear_part.ncols(), linear_part.ncols()) {
            return Err(SelectionError::DimensionMismatch {
                what: "constraint covariance",
                expected: linear_part.ncols(),
                found: covariance.nrows(),
            });
        }
        Ok(Self { linear_part, offset, covariance: symmetrize(&covariance) })
    }

    pub fn dim(&self) -> usize {
        self.linear_part.ncols()
    }

    pub fn nconstraints(&self) -> usize {
        self.linear_part.nrows()
    }

    /// `b − A z`.
    pub fn slack(&self, z: &Array1<f64>) -> Array1<f64> {
        &self.offset - &self.linear_part.dot(z)
    }

    /// `A z ≤ b + tol · (1 + |b|)` row-wise.
    pub fn is_feasible(&self, z: &Array1<f64>, tol: f64) -> bool {
        self.first_violation(z, tol).is_none()
    }

    /// # Errors
    /// - `InfeasiblePolyhedron` naming the first violated row.
    pub fn check_feasible(&self, z: &Array1<f64>, tol: f64) -> SelectionResult<()> {
        match self.first_violation(z, tol) {
            Some((row, slack)) => Err(SelectionError::InfeasiblePolyhedron { row, slack }),
            None => Ok(()),
        }
    }

    fn first_violation(&self, z: &Array1<f64>, tol: f64) -> Option<(usize, f64)> {
        let slack = self.slack(z);
        slack
            .iter()
            .zip(self.offset.iter())
            .enumerate()
            .find(|&(_, (&s, &b))| !(s >= -tol * (1.0 + b.abs())))
            .map(|(row, (&s, _))| (row, s))
    }

    /// Polyhedral-lemma window for the contrast `ηᵀz` at the observed `z`.
    pub fn truncation_limits(
        &self, eta: &Array1<f64>, z: &Array1<f64>,
    ) -> InferenceResult<TruncationLimits> {
        truncation_limits(&self.linear_part, &self.offset, &self.covariance, eta, z)
    }
}

/// Output of [`build_constraints`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent {
    pub polyhedron: Polyhedron,
    /// Observed `z = (β̄_E, U)`.
    pub observed: Array1<f64>,
    /// `δ = H_EE⁻¹ r_E`, so `β̄_E = β̂_E + δ`.
    pub offsets: Array1<f64>,
    /// Number of leading rows that only involve active coordinates.
    pub sign_rows: usize,
}

impl SelectionEvent {
    pub fn onestep(&self, nactive: usize) -> Array1<f64> {
        self.observed.slice(s![..nactive]).to_owned()
    }
}

/// Linearized KKT constraints at a lasso solution.
///
/// `gradient` is `∇(L + q)` at `layout.beta_hat`; `covariance` is the
/// estimate of `Cov(z)` in `(active, inactive)` order.
///
/// # Errors
/// - `DimensionMismatch` for inconsistent lengths.
/// - `InfeasiblePolyhedron` when the observed statistic violates a row.
pub fn build_constraints(
    layout: &PivotLayout, gradient: &Array1<f64>, weights: &FeatureWeights, active: &ActiveSet,
    covariance: Array2<f64>,
) -> SelectionResult<SelectionEvent> {
    let p = layout.dim();
    if gradient.len() != p {
        return Err(SelectionError::DimensionMismatch {
            what: "gradient",
            expected: p,
            found: gradient.len(),
        });
    }
    if weights.len() != p {
        return Err(SelectionError::WeightsDimMismatch { expected: p, found: weights.len() });
    }
    let (e, ni) = (layout.nactive(), layout.inactive.len());

    let r_e: Array1<f64> = layout.active.iter().map(|&j| -gradient[j]).collect();
    let delta = layout.h_ee_inv.dot(&r_e);
    let h_delta = layout.h_ie().dot(&delta);
    let g_i: Array1<f64> = layout.inactive.iter().map(|&j| gradient[j]).collect();
    let u = -&g_i - &h_delta;

    let mut observed = Array1::<f64>::zeros(p);
    for (k, &j) in layout.active.iter().enumerate() {
        observed[k] = layout.beta_hat[j] + delta[k];
    }
    observed.slice_mut(s![e..]).assign(&u);

    let sign_rows = active.penalized.iter().filter(|&&pen| pen).count();
    let nrows = sign_rows + 2 * ni;
    let mut a = Array2::<f64>::zeros((nrows, p));
    let mut b = Array1::<f64>::zeros(nrows);
    let mut row = 0;
    for k in 0..e {
        if active.penalized[k] {
            let s = active.signs[k];
            a[[row, k]] = -s;
            b[row] = -s * delta[k];
            row += 1;
        }
    }
    for (m, &j) in layout.inactive.iter().enumerate() {
        let lam = weights.get(j);
        a[[row, e + m]] = 1.0;
        b[row] = lam - h_delta[m];
        a[[row + 1, e + m]] = -1.0;
        b[row + 1] = lam + h_delta[m];
        row += 2;
    }

    let polyhedron = Polyhedron::new(a, b, covariance)?;
    polyhedron.check_feasible(&observed, FEASIBILITY_TOL)?;
    Ok(SelectionEvent { polyhedron, observed, offsets: delta, sign_rows })
}
