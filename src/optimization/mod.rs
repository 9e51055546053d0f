//! optimization — smooth likelihood maximization and numeric guards.
//!
//! Purpose
//! -------
//! Host the pieces of numerical optimization that are not specific to the
//! lasso: an argmin L-BFGS driver for unpenalized refits on an active set,
//! finite-difference Hessians, and overflow-safe scalar transforms used by
//! the GLM and Cox losses.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`; outcomes are
//!   reported in terms of `ℓ`.
//! - Fallible entry points return [`errors::OptResult`]; argmin errors are
//!   converted at the boundary.
//! - Progress is reported through `log::debug!` only.
//!
//! Downstream usage
//! ----------------
//! - `families::restricted` implements [`loglik_optimizer::LogLikelihood`]
//!   for a loss restricted to the active set and calls
//!   [`loglik_optimizer::maximize`].
//! - `families::LossFamily::information` falls back to
//!   [`loglik_optimizer::compute_hessian`].

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
