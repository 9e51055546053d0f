//! lasso::fit — penalized fits and their selection events.
//!
//! Purpose
//! -------
//! [`Lasso`] holds a loss family, feature weights, an optional quadratic
//! perturbation and solver options. [`Lasso::fit`] solves the penalized
//! problem, reads off the active set and signs, estimates the covariance of
//! the pivot statistic once and builds the selection polyhedron, returning
//! an immutable [`FittedLasso`].
//!
//! Key behaviors
//! -------------
//! - Without an explicit estimator the model-based covariance (unit
//!   dispersion) is used.
//! - A warm start replaces the zero starting point of the solver.
//! - The polyhedron is checked against the observed statistic before the
//!   fit is returned.
//!
//! Downstream usage
//! ----------------
//! - `FittedLasso::summary` (see `lasso::summary`) and
//!   `nominal_intervals` read the fit.
//! - `carving` borrows the stage-one fit's layout and active constraints.
use crate::{
    families::{
        cox::Cox, gaussian::Gaussian, logistic::Logistic, poisson::Poisson,
        quadratic::IdentityQuadratic, traits::LossFamily,
    },
    inference::{
        covariance::{
            regularize, CovarianceEstimate, CovarianceEstimator, PivotLayout,
            DEFAULT_MAX_CONDITION,
        },
        pivot::FEASIBILITY_TOL,
    },
    lasso::{
        constraints::{build_constraints, ActiveSet, Polyhedron, SelectionEvent},
        errors::{SelectionError, SelectionResult},
        solver::{solve, PenalizedObjective, SolveOptions, SolverReport},
        weights::FeatureWeights,
    },
};
use ndarray::{s, Array1, Array2};

/// Configuration of a penalized fit.
#[derive(Debug, Clone)]
pub struct Lasso<F: LossFamily> {
    family: F,
    weights: FeatureWeights,
    quadratic: Option<IdentityQuadratic>,
    options: SolveOptions,
    warm_start: Option<Array1<f64>>,
}

impl<F: LossFamily> Lasso<F> {
    /// # Errors
    /// - `WeightsDimMismatch` when the weights do not have one entry per
    ///   feature.
    pub fn new(family: F, weights: FeatureWeights) -> SelectionResult<Self> {
        if weights.len() != family.nfeatures() {
            return Err(SelectionError::WeightsDimMismatch {
                expected: family.nfeatures(),
                found: weights.len(),
            });
        }
        Ok(Self {
            family,
            weights,
            quadratic: None,
            options: SolveOptions::default(),
            warm_start: None,
        })
    }

    /// # Errors
    /// - `DimensionMismatch` when the quadratic's dimension is not `p`.
    pub fn with_quadratic(mut self, quadratic: IdentityQuadratic) -> SelectionResult<Self> {
        let p = self.family.nfeatures();
        if quadratic.dim() != p {
            return Err(SelectionError::DimensionMismatch {
                what: "quadratic",
                expected: p,
                found: quadratic.dim(),
            });
        }
        self.quadratic = Some(quadratic);
        Ok(self)
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// # Errors
    /// - `DimensionMismatch` when `start` is not of length `p`.
    pub fn with_warm_start(mut self, start: Array1<f64>) -> SelectionResult<Self> {
        let p = self.family.nfeatures();
        if start.len() != p {
            return Err(SelectionError::DimensionMismatch {
                what: "warm start",
                expected: p,
                found: start.len(),
            });
        }
        self.warm_start = Some(start);
        Ok(self)
    }

    pub fn family(&self) -> &F {
        &self.family
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    fn objective(&self) -> PenalizedObjective<'_, F> {
        PenalizedObjective {
            family: &self.family,
            weights: &self.weights,
            quadratic: self.quadratic.as_ref(),
        }
    }

    /// Solve, select, estimate the pivot covariance and build the
    /// selection polyhedron.
    ///
    /// # Errors
    /// - `NonConvergence` from the solver.
    /// - `InfeasiblePolyhedron` when the observed statistic is outside its
    ///   own selection event.
    /// - Covariance estimation failures as `SelectionError::Inference`.
    pub fn fit(
        &self, covariance: Option<&mut dyn CovarianceEstimator<F>>,
    ) -> SelectionResult<FittedLasso<F>> {
        let objective = self.objective();
        let start =
            self.warm_start.clone().unwrap_or_else(|| Array1::zeros(self.family.nfeatures()));
        let (beta, report) = solve(&objective, start, &self.options)?;
        let active = ActiveSet::from_solution(&beta, &self.weights);

        let gradient = objective.smooth_gradient(&beta)?;
        let hessian = objective.hessian(&beta)?;
        let curvature = self.quadratic.as_ref().map_or(0.0, |q| q.coef());
        let layout = PivotLayout::new(active.indices.clone(), beta.clone(), hessian, curvature)?;

        let estimate = match covariance {
            Some(estimator) => {
                log::debug!("{} covariance via {} estimator", self.family.name(), estimator.name());
                estimator.estimate(&self.family, &layout)?
            }
            None => regularize(&layout.model_covariance(), DEFAULT_MAX_CONDITION, None, 1.0)?,
        };
        let event =
            build_constraints(&layout, &gradient, &self.weights, &active, estimate.matrix.clone())?;
        log::debug!(
            "{} lasso selected {} of {} features after {} iterations",
            self.family.name(),
            active.len(),
            self.family.nfeatures(),
            report.outer_iterations
        );

        Ok(FittedLasso {
            family: self.family.clone(),
            weights: self.weights.clone(),
            quadratic: self.quadratic.clone(),
            lasso_solution: beta,
            active,
            layout,
            event,
            covariance: estimate,
            report,
        })
    }
}

impl Lasso<Gaussian> {
    /// Gaussian loss `‖y − Xβ‖² / 2σ²`.
    pub fn gaussian(
        x: Array2<f64>, y: Array1<f64>, sigma: f64, weights: FeatureWeights,
    ) -> SelectionResult<Self> {
        Self::new(Gaussian::new(x, y, sigma)?, weights)
    }
}

impl Lasso<Logistic> {
    /// Binomial loss with optional trials (default one per row).
    pub fn logistic(
        x: Array2<f64>, successes: Array1<f64>, trials: Option<Array1<f64>>,
        weights: FeatureWeights,
    ) -> SelectionResult<Self> {
        Self::new(Logistic::new(x, successes, trials)?, weights)
    }
}

impl Lasso<Poisson> {
    pub fn poisson(
        x: Array2<f64>, counts: Array1<f64>, weights: FeatureWeights,
    ) -> SelectionResult<Self> {
        Self::new(Poisson::new(x, counts)?, weights)
    }
}

impl Lasso<Cox> {
    /// Cox partial likelihood (Breslow ties).
    pub fn cox(
        x: Array2<f64>, times: Array1<f64>, status: Array1<f64>, weights: FeatureWeights,
    ) -> SelectionResult<Self> {
        Self::new(Cox::new(x, times, status)?, weights)
    }
}

/// Immutable result of [`Lasso::fit`].
#[derive(Debug, Clone)]
pub struct FittedLasso<F: LossFamily> {
    family: F,
    weights: FeatureWeights,
    quadratic: Option<IdentityQuadratic>,
    lasso_solution: Array1<f64>,
    active: ActiveSet,
    layout: PivotLayout,
    event: SelectionEvent,
    covariance: CovarianceEstimate,
    report: SolverReport,
}

impl<F: LossFamily> FittedLasso<F> {
    pub fn family(&self) -> &F {
        &self.family
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    pub fn quadratic(&self) -> Option<&IdentityQuadratic> {
        self.quadratic.as_ref()
    }

    /// Full-length penalized solution `β̂`.
    pub fn lasso_solution(&self) -> &Array1<f64> {
        &self.lasso_solution
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn layout(&self) -> &PivotLayout {
        &self.layout
    }

    pub fn constraints(&self) -> &Polyhedron {
        &self.event.polyhedron
    }

    /// Observed pivot statistic `z = (β̄_E, U)`.
    pub fn observed(&self) -> &Array1<f64> {
        &self.event.observed
    }

    /// One-step estimator `β̄_E = β̂_E + H_EE⁻¹ r_E`.
    pub fn onestep_estimator(&self) -> Array1<f64> {
        self.event.onestep(self.active.len())
    }

    /// `δ = H_EE⁻¹ r_E`.
    pub fn onestep_offsets(&self) -> &Array1<f64> {
        &self.event.offsets
    }

    pub fn covariance(&self) -> &CovarianceEstimate {
        &self.covariance
    }

    pub fn report(&self) -> &SolverReport {
        &self.report
    }

    /// Rows of the selection event that only involve the active
    /// coordinates, restricted to those coordinates: `A_E β̄_E ≤ b_E`.
    pub fn active_constraints(&self) -> (Array2<f64>, Array1<f64>) {
        let (rows, e) = (self.event.sign_rows, self.active.len());
        let poly = &self.event.polyhedron;
        let linear = poly.linear_part.slice(s![..rows, ..e]).to_owned();
        (linear, poly.offset.slice(s![..rows]).to_owned())
    }

    /// Whether the observed statistic lies in the polyhedron.
    pub fn is_feasible(&self) -> bool {
        self.event.polyhedron.is_feasible(&self.event.observed, FEASIBILITY_TOL)
    }
}
