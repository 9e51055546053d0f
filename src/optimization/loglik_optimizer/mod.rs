//! loglik_optimizer — argmin-backed L-BFGS for unpenalized refits.
//!
//! Purpose
//! -------
//! Maximize smooth log-likelihoods `ℓ(θ)`. In this crate that means the
//! restricted (active-set-only, unpenalized) refits used by data splitting,
//! Pearson dispersion estimates and the bootstrap centring of the sandwich
//! estimator. Penalized fits do not go through here; see `lasso::solver`.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] exposes `c(θ) = -ℓ(θ)` to argmin, with a
//!   finite-difference fallback when no analytic gradient exists.
//! - [`maximize`] validates the start, builds L-BFGS with the requested
//!   line search and tolerances, runs it and returns an [`OptimOutcome`].
//! - [`finite_diff::compute_hessian`] differences a gradient into a
//!   symmetric Hessian.
//!
//! Invariants & assumptions
//! ------------------------
//! - User code always returns the log-likelihood and its gradient, never
//!   the cost.
//! - [`Tolerances`] and [`MLEOptions`] are validated at construction.
//!
//! Conventions
//! -----------
//! - Vectors are `ndarray` (`Theta`, `Grad`), matrices `Hessian`.
//! - Errors are [`OptError`](crate::optimization::errors::OptError); raw
//!   argmin errors never cross this module boundary.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the adapter sign convention, option validation,
//!   outcome normalization, FD Hessians and an end-to-end quadratic solve.

pub mod adapter;
pub mod api;
pub mod finite_diff;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::finite_diff::compute_hessian;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Hessian, Theta, DEFAULT_LBFGS_MEM};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
