//! lasso — penalized fits, selection polyhedra and selective summaries.
//!
//! Purpose
//! -------
//! Fit `L(β) + q(β) + Σ_j w_j |β_j|` for any [`LossFamily`], characterize
//! the event that selected the active set and signs as `{A z ≤ b}` in the
//! space of the pivot statistic `z = (β̄_E, U)`, and report selective
//! p-values and intervals for the active variables.
//!
//! Key behaviors
//! -------------
//! - [`solver`]: proximal Newton with coordinate-descent inner solves and
//!   backtracking; non-convergence is an error.
//! - [`constraints`]: linearized KKT rows; unpenalized features carry no
//!   sign constraint; infeasibility aborts the fit.
//! - [`fit`]: [`Lasso`] / [`FittedLasso`], with the covariance estimated
//!   once per fit.
//! - [`summary`]: truncated-pivot p-values and intervals, plus
//!   [`nominal_intervals`].
//!
//! Conventions
//! -----------
//! - Errors are [`SelectionError`]; per-variable inference failures are
//!   stored in [`SummaryRow::failure`].
//!
//! Downstream usage
//! ----------------
//! - `carving::SplitModel` fits a stage-one [`Lasso`] on the selection rows
//!   and hands the immutable [`FittedLasso`] to splitting and carving.
//!
//! [`LossFamily`]: crate::families::LossFamily

pub mod constraints;
pub mod errors;
pub mod fit;
pub mod solver;
pub mod summary;
pub mod weights;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::constraints::{build_constraints, ActiveSet, Polyhedron, SelectionEvent};
pub use self::errors::{SelectionError, SelectionResult};
pub use self::fit::{FittedLasso, Lasso};
pub use self::solver::{solve, PenalizedObjective, SolveOptions, SolverReport};
pub use self::summary::{nominal_intervals, Alternative, SummaryOptions, SummaryRow};
pub use self::weights::{theoretical_lambda, FeatureWeights};

pub mod prelude {
    pub use super::errors::{SelectionError, SelectionResult};
    pub use super::{
        nominal_intervals, Alternative, FeatureWeights, FittedLasso, Lasso, Polyhedron,
        SolveOptions, SummaryOptions, SummaryRow,
    };
}
