//! selective_inference — valid inference after lasso-type variable selection.
//!
//! Purpose
//! -------
//! Fit an ℓ1-penalized model, describe the event that selected its active
//! set and signs as a polyhedron, and report p-values and confidence
//! intervals for the selected coefficients that remain valid conditional on
//! that selection. Sample splitting and data carving are provided for
//! two-stage designs.
//!
//! Key behaviors
//! -------------
//! - [`families`]: Gaussian, logistic (binomial with trials), Poisson and
//!   Cox losses behind the [`families::LossFamily`] trait, the identity
//!   quadratic perturbation, and unpenalized active-set refits.
//! - [`lasso`]: the penalized solver, selection polyhedra, and selective
//!   summaries.
//! - [`inference`]: parametric and pairs-bootstrap (sandwich) covariance
//!   estimators, the polyhedral lemma and truncated Gaussian / Student-t
//!   pivots.
//! - [`carving`]: random splits, data splitting, and data carving with a
//!   constrained Gaussian hit-and-run sampler.
//! - [`simulation`]: synthetic sparse regression instances and bounded
//!   retries.
//! - [`optimization`]: argmin-based likelihood maximization and numerical
//!   guards shared by the families.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything is single-threaded and deterministic given the caller's
//!   RNG; no global state.
//! - Fits are immutable once built and are borrowed by downstream
//!   summaries, splitting and carving.
//!
//! Conventions
//! -----------
//! - Each module owns one error enum (`FamilyError`, `SelectionError`,
//!   `InferenceError`, `CarvingError`, `OptError`) with `From` conversions
//!   between layers.
//! - Diagnostics go through the `log` facade; the library never installs a
//!   logger.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; calibration properties (feasibility
//!   across families, null p-values, estimator agreement, carving vs
//!   splitting) are exercised end to end in `tests/`.

pub mod carving;
pub mod families;
pub mod inference;
pub mod lasso;
pub mod optimization;
pub mod simulation;

pub mod prelude {
    pub use crate::carving::prelude::*;
    pub use crate::families::prelude::*;
    pub use crate::inference::prelude::*;
    pub use crate::lasso::prelude::*;
    pub use crate::simulation::{retry, Instance};
}
