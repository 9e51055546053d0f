//! inference — covariance estimates and truncated pivots after selection.
//!
//! Purpose
//! -------
//! Turn a selection event `{A z ≤ b}` and a covariance for the pivot
//! statistic `z = (β̄_E, U)` into p-values and confidence intervals that
//! are valid conditional on the selection.
//!
//! Key behaviors
//! -------------
//! - [`PivotLayout`] fixes the active/inactive split and the information
//!   matrix at the lasso solution; [`CovarianceEstimator`] implementations
//!   ([`ParametricEstimator`], [`SandwichEstimator`]) produce a
//!   [`CovarianceEstimate`] for `z`.
//! - [`regularize`] repairs ill-conditioned estimates with a ridge and
//!   flags them instead of failing.
//! - [`truncation_limits`] applies the polyhedral lemma to a contrast;
//!   [`TruncatedPivot`] evaluates the truncated Gaussian or Student-t law
//!   in log space and inverts it for intervals.
//!
//! Invariants & assumptions
//! ------------------------
//! - Covariance matrices are symmetric PSD, ordered `(active, inactive)`.
//! - The observed statistic satisfies the constraints up to
//!   [`FEASIBILITY_TOL`]; anything worse is an error, not a p-value.
//!
//! Conventions
//! -----------
//! - Failures are [`InferenceError`] values; per-variable failures in a
//!   summary are stored next to the variable rather than aborting.
//! - Ill-conditioning is reported through `log::warn!` and the
//!   `ill_conditioned` flag.
//!
//! Downstream usage
//! ----------------
//! - `lasso` builds the layout, asks an estimator for Σ and calls
//!   [`truncation_limits`] / [`TruncatedPivot`] per active variable.
//! - `carving` reuses [`information`] helpers and [`PivotLaw`] quantiles.
//!
//! Testing notes
//! -------------
//! - Each submodule tests its closed forms; end-to-end calibration (null
//!   p-value uniformity, coverage) lives in `tests/`.

pub mod covariance;
pub mod errors;
pub mod information;
pub mod parametric;
pub mod pivot;
pub mod sandwich;
pub mod truncated;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::covariance::{
    regularize, CovarianceEstimate, CovarianceEstimator, PivotLayout, DEFAULT_MAX_CONDITION,
};
pub use self::errors::{InferenceError, InferenceResult};
pub use self::parametric::{gaussian_parametric_estimator, Dispersion, ParametricEstimator};
pub use self::pivot::{truncation_limits, TruncationLimits, FEASIBILITY_TOL};
pub use self::sandwich::{gaussian_sandwich_estimator, SandwichEstimator, DEFAULT_BOOTSTRAP_SAMPLES};
pub use self::truncated::{IntervalSearch, PivotLaw, Tail, TruncatedPivot};

pub mod prelude {
    pub use super::covariance::{CovarianceEstimate, CovarianceEstimator, PivotLayout};
    pub use super::errors::{InferenceError, InferenceResult};
    pub use super::parametric::{gaussian_parametric_estimator, Dispersion, ParametricEstimator};
    pub use super::sandwich::{gaussian_sandwich_estimator, SandwichEstimator};
    pub use super::truncated::{IntervalSearch, PivotLaw, Tail, TruncatedPivot};
}
