//! numerical_stability — guarded transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Keep the overflow-prone pieces of GLM arithmetic (softplus, logistic,
//! exponentials of linear predictors, log-sum-exp over risk sets or
//! importance weights) in one place together with the small tolerances used
//! for eigenvalue truncation.
//!
//! Conventions
//! -----------
//! - Pure functions on `f64` / `ndarray` views; no logging, no state.
//! - Callers validate shapes and finiteness upstream.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    log_sum_exp, safe_exp, safe_logistic, safe_softplus, EIGEN_EPS, GENERAL_TOL, MAX_EXP_ARG,
};

pub mod prelude {
    pub use super::transformations::{
        log_sum_exp, safe_exp, safe_logistic, safe_softplus, EIGEN_EPS, GENERAL_TOL,
    };
}
