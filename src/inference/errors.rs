//! Unified error handling for selective inference routines.
//!
//! `InferenceError` covers covariance estimation (shape, finiteness,
//! regularization failures, bootstrap configuration), truncated-pivot
//! evaluation (zero variance, degenerate truncation) and confidence
//! interval inversion (bracketing failures, invalid levels). Per-variable
//! failures in a summary are stored as values of this type rather than
//! aborting the whole summary.
use crate::{families::errors::FamilyError, optimization::errors::OptError};

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Matrices ----
    /// Matrix or vector has the wrong size.
    DimensionMismatch { what: &'static str, expected: usize, found: usize },

    /// Matrix entry is NaN or ±∞.
    NonFiniteMatrix { what: &'static str, row: usize, col: usize, value: f64 },

    /// Covariance could not be repaired by a ridge term.
    IllConditionedCovariance { condition_number: f64 },

    /// Condition-number threshold must exceed 1.
    InvalidConditionThreshold { value: f64 },

    // ---- Estimators ----
    /// Bootstrap needs at least two resamples.
    InvalidBootstrap { samples: usize },

    /// Known noise level must be finite and positive.
    InvalidSigma { value: f64 },

    /// Residual degrees of freedom must be positive.
    InvalidDegreesOfFreedom { df: f64 },

    // ---- Pivots ----
    /// The contrast has (numerically) zero variance.
    ZeroVariance { value: f64 },

    /// The truncation interval is empty or a single point.
    DegenerateInterval { lower: f64, upper: f64 },

    /// Observed statistic violates a constraint by more than tolerance.
    InfeasibleStatistic { row: usize, slack: f64 },

    /// Observed statistic or pivot evaluated to NaN / ±∞.
    NonFiniteStatistic { value: f64 },

    // ---- Intervals ----
    /// Confidence level must lie strictly between 0 and 1.
    InvalidLevel { level: f64 },

    /// Bisection could not bracket the target quantile.
    BracketNotFound { target: f64, iterations: usize },

    // ---- Wrapped ----
    Family(FamilyError),
    Optimization(OptError),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl std::error::Error for InferenceError {}

impl From<FamilyError> for InferenceError {
    fn from(err: FamilyError) -> Self {
        InferenceError::Family(err)
    }
}

impl From<OptError> for InferenceError {
    fn from(err: OptError) -> Self {
        InferenceError::Optimization(err)
    }
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Matrices ----
            InferenceError::DimensionMismatch { what, expected, found } => {
                write!(f, "Inference Error: {what} has size {found}, expected {expected}")
            }
            InferenceError::NonFiniteMatrix { what, row, col, value } => {
                write!(f, "Inference Error: non-finite {what} entry at ({row}, {col}): {value}")
            }
            InferenceError::IllConditionedCovariance { condition_number } => write!(
                f,
                "Inference Error: covariance could not be regularized \
                 (condition number {condition_number})"
            ),
            InferenceError::InvalidConditionThreshold { value } => {
                write!(f, "Inference Error: condition threshold {value} must be finite and > 1")
            }

            // ---- Estimators ----
            InferenceError::InvalidBootstrap { samples } => {
                write!(f, "Inference Error: bootstrap needs at least 2 samples, got {samples}")
            }
            InferenceError::InvalidSigma { value } => {
                write!(f, "Inference Error: sigma = {value} must be finite and > 0")
            }
            InferenceError::InvalidDegreesOfFreedom { df } => {
                write!(f, "Inference Error: degrees of freedom {df} must be positive")
            }

            // ---- Pivots ----
            InferenceError::ZeroVariance { value } => {
                write!(f, "Inference Error: contrast variance {value} is numerically zero")
            }
            InferenceError::DegenerateInterval { lower, upper } => {
                write!(f, "Inference Error: degenerate truncation interval [{lower}, {upper}]")
            }
            InferenceError::InfeasibleStatistic { row, slack } => {
                write!(
                    f,
                    "Inference Error: observed statistic violates constraint {row} (slack {slack})"
                )
            }
            InferenceError::NonFiniteStatistic { value } => {
                write!(f, "Inference Error: non-finite statistic {value}")
            }

            // ---- Intervals ----
            InferenceError::InvalidLevel { level } => {
                write!(f, "Inference Error: confidence level {level} must lie in (0, 1)")
            }
            InferenceError::BracketNotFound { target, iterations } => write!(
                f,
                "Inference Error: could not bracket quantile {target} after {iterations} expansions"
            ),

            // ---- Wrapped ----
            InferenceError::Family(err) => write!(f, "Inference Error: {err}"),
            InferenceError::Optimization(err) => write!(f, "Inference Error: {err}"),
        }
    }
}
