//! Entry point for maximizing a [`LogLikelihood`] with argmin's L-BFGS.
//!
//! [`maximize`] validates the starting point, builds the solver for the
//! configured line search, runs the executor and normalizes the final state
//! into an [`OptimOutcome`].
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
        types::{
            Cost, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS,
            DEFAULT_LBFGS_MEM,
        },
        Grad, OptimOutcome, Theta,
    },
};
use argmin::{
    core::{Executor, IterState, Solver, State},
    solver::quasinewton::LBFGS,
};

/// Maximize `ℓ(θ)` starting from `theta0`.
///
/// Parameters
/// ----------
/// - `f`: the model; `f.check(theta0, data)` runs before the solver.
/// - `theta0`: starting point, consumed by the executor. Must be non-empty.
/// - `data`: payload forwarded to `value` / `grad`.
/// - `opts`: tolerances, line search and L-BFGS memory.
///
/// Errors
/// ------
/// - [`OptError::EmptyParameter`] for a zero-length `theta0`.
/// - Anything returned by `f.check`, by tolerance wiring, or by the solver
///   run (line-search failures, non-finite costs).
///
/// Examples
/// --------
/// ```
/// use ndarray::array;
/// use selective_inference::optimization::prelude::*;
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, t: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-(t[0] - 1.0).powi(2) - (t[1] + 2.0).powi(2))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.0, 0.0], &(), &MLEOptions::default())?;
/// assert!((out.theta_hat[0] - 1.0).abs() < 1e-4);
/// # Ok::<(), OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    if theta0.is_empty() {
        return Err(OptError::EmptyParameter);
    }
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = with_tolerances(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = with_tolerances(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

/// Apply the optional gradient and cost-change tolerances.
fn with_tolerances<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    let mut executor = Executor::new(problem, solver).configure(|state| state.param(theta0));
    if let Some(max_iter) = opts.tols.max_iter {
        executor = executor.configure(|state| state.max_iters(max_iter as u64));
    }
    let mut state = executor.run()?.state().clone();
    let iterations = state.get_iter();
    let fn_evals = state.get_func_counts().clone();
    let termination = state.get_termination_status().clone();
    let grad = state.take_gradient();
    let outcome = OptimOutcome::new(
        state.take_best_param(),
        -state.get_best_cost(),
        termination,
        iterations,
        fn_evals,
        grad,
    )?;
    log::debug!(
        "L-BFGS finished after {} iterations ({}), loglik = {:.6}",
        outcome.iterations,
        outcome.status,
        outcome.value
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptResult,
        loglik_optimizer::traits::Tolerances,
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // End-to-end `maximize` on a strictly concave quadratic with both line
    // searches, plus the empty-parameter guard.
    // -------------------------------------------------------------------------

    struct Quadratic {
        center: Theta,
    }

    impl LogLikelihood for Quadratic {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            let d = theta - &self.center;
            Ok(-0.5 * d.dot(&d))
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            Ok(&self.center - theta)
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // Both line searches locate the maximizer of a concave quadratic.
    //
    // Given
    // -----
    // - ℓ(θ) = -½‖θ − c‖² with c = (1.5, -0.5, 2.0) and θ₀ = 0.
    //
    // Expect
    // ------
    // - θ̂ ≈ c to 1e-6 and ℓ(θ̂) ≈ 0.
    fn maximize_recovers_quadratic_center_with_both_line_searches() {
        // Arrange
        let model = Quadratic { center: array![1.5, -0.5, 2.0] };
        let tols = Tolerances::new(Some(1e-10), None, Some(200)).expect("valid");

        for searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            let opts = MLEOptions::new(tols, searcher, None).expect("valid");

            // Act
            let out = maximize(&model, array![0.0, 0.0, 0.0], &(), &opts).expect("should converge");

            // Assert
            for (a, b) in out.theta_hat.iter().zip(model.center.iter()) {
                assert!((a - b).abs() < 1e-6, "{searcher:?}: {a} vs {b}");
            }
            assert!(out.value.abs() < 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // A zero-length start is rejected before argmin is touched.
    //
    // Given
    // -----
    // - An empty θ₀.
    //
    // Expect
    // ------
    // - `OptError::EmptyParameter`.
    fn maximize_rejects_empty_parameter() {
        // Arrange
        let model = Quadratic { center: Theta::zeros(0) };

        // Act
        let err = maximize(&model, Theta::zeros(0), &(), &MLEOptions::default())
            .expect_err("empty start");

        // Assert
        assert_eq!(err, OptError::EmptyParameter);
    }
}
