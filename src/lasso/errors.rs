//! Error type for penalized fits and the selection polyhedron.
//!
//! Non-convergence and infeasibility abort a fit; they are never turned
//! into a silent result. Covariance and pivot failures surface as
//! [`SelectionError::Inference`].
use crate::{
    families::errors::FamilyError, inference::errors::InferenceError,
    optimization::errors::OptError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    // ---- Configuration ----
    /// Feature weight is negative or non-finite.
    InvalidFeatureWeights { index: usize, value: f64 },

    /// Weights and design disagree in length.
    WeightsDimMismatch { expected: usize, found: usize },

    /// Solver options out of range.
    InvalidSolveOptions { name: &'static str, value: f64, reason: &'static str },

    /// Quadratic perturbation or warm start has the wrong length.
    DimensionMismatch { what: &'static str, expected: usize, found: usize },

    // ---- Solver ----
    /// Outer iterations exhausted before the change fell below `tol`.
    NonConvergence { iterations: usize, change: f64, tol: f64, kkt_residual: f64 },

    /// Objective evaluated to NaN / ±∞ during the line search.
    NonFiniteObjective { iteration: usize, value: f64 },

    // ---- Selection event ----
    /// The observed statistic lies outside its own selection polyhedron.
    InfeasiblePolyhedron { row: usize, slack: f64 },

    // ---- Wrapped ----
    Family(FamilyError),
    Inference(InferenceError),
    Optimization(OptError),
}

pub type SelectionResult<T> = Result<T, SelectionError>;

impl std::error::Error for SelectionError {}

impl From<FamilyError> for SelectionError {
    fn from(err: FamilyError) -> Self {
        SelectionError::Family(err)
    }
}

impl From<InferenceError> for SelectionError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::InfeasibleStatistic { row, slack } => {
                SelectionError::InfeasiblePolyhedron { row, slack }
            }
            other => SelectionError::Inference(other),
        }
    }
}

impl From<OptError> for SelectionError {
    fn from(err: OptError) -> Self {
        SelectionError::Optimization(err)
    }
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            SelectionError::InvalidFeatureWeights { index, value } => {
                write!(
                    f,
                    "Selection Error: feature weight {index} = {value} must be finite and >= 0"
                )
            }
            SelectionError::WeightsDimMismatch { expected, found } => {
                write!(f, "Selection Error: {found} feature weights for {expected} features")
            }
            SelectionError::InvalidSolveOptions { name, value, reason } => {
                write!(f, "Selection Error: invalid solver option {name} = {value}: {reason}")
            }
            SelectionError::DimensionMismatch { what, expected, found } => {
                write!(f, "Selection Error: {what} has length {found}, expected {expected}")
            }

            // ---- Solver ----
            SelectionError::NonConvergence { iterations, change, tol, kkt_residual } => write!(
                f,
                "Selection Error: solver did not converge in {iterations} iterations \
                 (change {change:.3e}, tol {tol:.1e}, KKT residual {kkt_residual:.3e})"
            ),
            SelectionError::NonFiniteObjective { iteration, value } => {
                write!(f, "Selection Error: objective is {value} at iteration {iteration}")
            }

            // ---- Selection event ----
            SelectionError::InfeasiblePolyhedron { row, slack } => write!(
                f,
                "Selection Error: observed statistic violates selection constraint {row} \
                 (slack {slack:.3e})"
            ),

            // ---- Wrapped ----
            SelectionError::Family(err) => write!(f, "Selection Error: {err}"),
            SelectionError::Inference(err) => write!(f, "Selection Error: {err}"),
            SelectionError::Optimization(err) => write!(f, "Selection Error: {err}"),
        }
    }
}
