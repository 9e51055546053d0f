//! families — loss functions the lasso can be fit with.
//!
//! Purpose
//! -------
//! Provide the smooth part of the penalized objective for Gaussian,
//! binomial (logistic with trials), Poisson and Cox proportional-hazards
//! models behind one capability trait, [`LossFamily`], plus the identity
//! quadratic perturbation and unpenalized active-set refits.
//!
//! Key behaviors
//! -------------
//! - Each family validates its data once at construction.
//! - `loss` / `gradient` / `information` are evaluated at full-length
//!   coefficient vectors; GLMs have closed-form information matrices, the
//!   Cox family differences its gradient.
//! - `subset` builds the same family on chosen rows, used for sample
//!   splitting and pairs-bootstrap draws.
//! - [`restricted_mle`] refits on the active columns with argmin L-BFGS.
//!
//! Invariants & assumptions
//! ------------------------
//! - Designs are non-empty and finite; responses match the design length
//!   and lie in the family's support.
//! - Information matrices are symmetric positive semi-definite.
//!
//! Conventions
//! -----------
//! - The Gaussian loss is scaled by `1/σ²`, so penalty levels and
//!   covariance estimates are on the standardized score scale.
//! - Errors are [`FamilyError`]; the optimizer layer converts them into
//!   `OptError::Family`.
//!
//! Testing notes
//! -------------
//! - Every family checks its loss, gradient and information against hand
//!   computations; the Gaussian tests also compare the analytic
//!   information with the finite-difference default.

pub mod cox;
pub mod errors;
pub mod gaussian;
pub mod logistic;
pub mod poisson;
pub mod quadratic;
pub mod restricted;
pub mod traits;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::cox::Cox;
pub use self::errors::{FamilyError, FamilyResult};
pub use self::gaussian::Gaussian;
pub use self::logistic::Logistic;
pub use self::poisson::Poisson;
pub use self::quadratic::IdentityQuadratic;
pub use self::restricted::{embed, restricted_mle, RestrictedLikelihood};
pub use self::traits::LossFamily;

pub mod prelude {
    pub use super::errors::{FamilyError, FamilyResult};
    pub use super::{Cox, Gaussian, IdentityQuadratic, Logistic, LossFamily, Poisson};
}
