//! Error type for sample splitting, data carving and the constrained
//! sampler.
use crate::{
    families::errors::FamilyError, inference::errors::InferenceError, lasso::errors::SelectionError,
    optimization::errors::OptError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CarvingError {
    // ---- Splits ----
    /// Split fraction must lie strictly between 0 and 1.
    InvalidSplitFraction { value: f64 },

    /// One side of the split has no rows.
    EmptySplit { which: &'static str, nobs: usize },

    /// Split indices do not partition `0..n`.
    InvalidSplit { reason: &'static str },

    /// Penalty multiplier must be finite and positive.
    InvalidLambdaFraction { value: f64 },

    // ---- Tests ----
    /// Hypothesis tests are only defined for stage-one active variables.
    VariableNotActive { variable: usize },

    /// Leftover rows cannot support a refit of the active set.
    InsufficientLeftover { nobs: usize, nactive: usize },

    // ---- Sampler ----
    InvalidSamplerOptions { name: &'static str, reason: &'static str },

    /// The starting point violates the constraints.
    InfeasibleStart { row: usize, slack: f64 },

    // ---- Simulation ----
    /// Simulation parameters outside their domain.
    InvalidInstance { reason: &'static str },

    // ---- Retry ----
    /// Every attempt of a bounded retry failed; carries the last error.
    GaveUp { attempts: usize, last: Box<CarvingError> },

    // ---- Wrapped ----
    Family(FamilyError),
    Selection(SelectionError),
    Inference(InferenceError),
    Optimization(OptError),
}

pub type CarvingResult<T> = Result<T, CarvingError>;

impl std::error::Error for CarvingError {}

impl From<FamilyError> for CarvingError {
    fn from(err: FamilyError) -> Self {
        CarvingError::Family(err)
    }
}

impl From<SelectionError> for CarvingError {
    fn from(err: SelectionError) -> Self {
        CarvingError::Selection(err)
    }
}

impl From<InferenceError> for CarvingError {
    fn from(err: InferenceError) -> Self {
        CarvingError::Inference(err)
    }
}

impl From<OptError> for CarvingError {
    fn from(err: OptError) -> Self {
        CarvingError::Optimization(err)
    }
}

impl std::fmt::Display for CarvingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Splits ----
            CarvingError::InvalidSplitFraction { value } => {
                write!(f, "Carving Error: split fraction {value} must lie in (0, 1)")
            }
            CarvingError::EmptySplit { which, nobs } => {
                write!(f, "Carving Error: {which} split of {nobs} observations is empty")
            }
            CarvingError::InvalidSplit { reason } => {
                write!(f, "Carving Error: invalid split: {reason}")
            }
            CarvingError::InvalidLambdaFraction { value } => {
                write!(f, "Carving Error: lambda fraction {value} must be finite and > 0")
            }

            // ---- Tests ----
            CarvingError::VariableNotActive { variable } => {
                write!(f, "Carving Error: variable {variable} is not in the selected model")
            }
            CarvingError::InsufficientLeftover { nobs, nactive } => write!(
                f,
                "Carving Error: {nobs} leftover observations cannot support \
                 {nactive} active variables"
            ),

            // ---- Sampler ----
            CarvingError::InvalidSamplerOptions { name, reason } => {
                write!(f, "Carving Error: invalid sampler option {name}: {reason}")
            }
            CarvingError::InfeasibleStart { row, slack } => write!(
                f,
                "Carving Error: sampler start violates constraint {row} (slack {slack:.3e})"
            ),

            // ---- Simulation ----
            CarvingError::InvalidInstance { reason } => {
                write!(f, "Carving Error: invalid instance: {reason}")
            }

            // ---- Retry ----
            CarvingError::GaveUp { attempts, last } => {
                write!(f, "Carving Error: gave up after {attempts} attempts; last error: {last}")
            }

            // ---- Wrapped ----
            CarvingError::Family(err) => write!(f, "Carving Error: {err}"),
            CarvingError::Selection(err) => write!(f, "Carving Error: {err}"),
            CarvingError::Inference(err) => write!(f, "Carving Error: {err}"),
            CarvingError::Optimization(err) => write!(f, "Carving Error: {err}"),
        }
    }
}
