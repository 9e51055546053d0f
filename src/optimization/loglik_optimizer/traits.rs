//! Public configuration and result types for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: what a model implements (`ℓ(θ)` and optionally `∇ℓ(θ)`).
//! - [`MLEOptions`] / [`Tolerances`] / [`LineSearcher`]: solver configuration.
//! - [`OptimOutcome`]: normalized result of [`maximize`](super::maximize).
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
        Cost, FnEvalMap, Grad, Theta,
    },
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood interface consumed by the L-BFGS driver.
///
/// Implementors return `ℓ(θ)`; the driver minimizes `-ℓ(θ)`. When `grad`
/// is provided it must be `∇ℓ(θ)` (the adapter flips the sign). Without it,
/// finite differences of the cost are used.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside L-BFGS. Parses case-insensitively from
/// `"MoreThuente"` / `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer configuration for the unpenalized refits.
///
/// Default: `tol_grad = 1e-8`, `tol_cost = None`, `max_iter = 500`,
/// More–Thuente line search, L-BFGS memory 7.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
}

impl MLEOptions {
    /// Build options; numeric tolerances were already checked by
    /// [`Tolerances::new`].
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] when `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(0) = lbfgs_mem {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self { tols, line_searcher, lbfgs_mem })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-8), tol_cost: None, max_iter: Some(500) },
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
        }
    }
}

/// Stopping rules. At least one must be set; tolerances must be finite and
/// strictly positive and `max_iter > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for bad tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_grad(tol_grad)?;
        verify_tol_cost(tol_cost)?;
        if let Some(0) = max_iter {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Result of [`maximize`](super::maximize).
///
/// `value` is the log-likelihood at `theta_hat` (not the cost). `converged`
/// is `false` only when argmin reports `NotTerminated`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Validate raw solver state and normalize it.
    ///
    /// # Errors
    /// - [`OptError::MissingThetaHat`] / [`OptError::InvalidThetaHat`] for a
    ///   missing or non-finite estimate.
    /// - [`OptError::NonFiniteCost`] for a non-finite value.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let (converged, status) = match termination {
            TerminationStatus::NotTerminated => (false, "Not terminated".to_string()),
            other => (true, format!("{other:?}")),
        };
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm: grad.map(|g| g.l2_norm()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::TerminationReason;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Validation in `Tolerances::new` / `MLEOptions::new`, line-search parsing
    // and outcome normalization.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // At least one stopping rule is required.
    //
    // Given
    // -----
    // - All three tolerances set to `None`.
    //
    // Expect
    // ------
    // - `OptError::NoTolerancesProvided`.
    fn tolerances_new_rejects_all_none() {
        // Act
        let err = Tolerances::new(None, None, None).expect_err("should reject");

        // Assert
        assert_eq!(err, OptError::NoTolerancesProvided);
    }

    #[test]
    // Purpose
    // -------
    // Zero memory and zero iterations are configuration errors.
    //
    // Given
    // -----
    // - `max_iter = Some(0)` and `lbfgs_mem = Some(0)`.
    //
    // Expect
    // ------
    // - `InvalidMaxIter` and `InvalidLBFGSMem` respectively.
    fn options_reject_zero_iterations_and_memory() {
        // Act
        let iter_err = Tolerances::new(Some(1e-6), None, Some(0)).expect_err("zero iters");
        let tols = Tolerances::new(Some(1e-6), None, Some(10)).expect("valid");
        let mem_err = MLEOptions::new(tols, LineSearcher::HagerZhang, Some(0))
            .expect_err("zero memory");

        // Assert
        assert!(matches!(iter_err, OptError::InvalidMaxIter { .. }));
        assert!(matches!(mem_err, OptError::InvalidLBFGSMem { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Line-search names parse case-insensitively.
    //
    // Given
    // -----
    // - "hagerzhang", "MORETHUENTE" and "newton".
    //
    // Expect
    // ------
    // - The first two parse; the third is `InvalidLineSearch`.
    fn line_searcher_parses_known_names() {
        // Act / Assert
        assert_eq!("hagerzhang".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert_eq!("MORETHUENTE".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert!(matches!(
            "newton".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `NotTerminated` maps to `converged = false`, any reason to `true`.
    //
    // Given
    // -----
    // - A finite estimate with each termination status.
    //
    // Expect
    // ------
    // - Flags and gradient norm as described.
    fn outcome_maps_termination_status() {
        // Arrange
        let theta = Some(array![1.0, 2.0]);

        // Act
        let open = OptimOutcome::new(
            theta.clone(),
            -1.0,
            TerminationStatus::NotTerminated,
            3,
            FnEvalMap::new(),
            None,
        )
        .expect("valid outcome");
        let done = OptimOutcome::new(
            theta,
            -1.0,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            3,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
        )
        .expect("valid outcome");

        // Assert
        assert!(!open.converged);
        assert!(done.converged);
        assert_eq!(done.grad_norm, Some(5.0));
    }
}
