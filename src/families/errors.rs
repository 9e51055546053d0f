//! Error surface for loss families and their input data.
//!
//! `FamilyError` covers malformed designs and responses caught at
//! construction, bad row subsets, and numerical failures while evaluating
//! a loss or its derivatives. [`FamilyResult<T>`] is the shared alias.

#[derive(Debug, Clone, PartialEq)]
pub enum FamilyError {
    // ---- Shapes ----
    /// Design matrix with zero rows or zero columns.
    EmptyDesign { nrows: usize, ncols: usize },

    /// Length of an input does not match the design.
    DimensionMismatch { what: &'static str, expected: usize, found: usize },

    // ---- Values ----
    /// Design or response contains NaN / ±∞.
    NonFiniteValue { what: &'static str, index: usize, value: f64 },

    /// Response outside the family's support.
    InvalidResponse { index: usize, value: f64, reason: &'static str },

    /// Noise level must be finite and strictly positive.
    InvalidSigma { value: f64 },

    /// Quadratic coefficient must be finite and non-negative.
    InvalidQuadratic { value: f64, reason: &'static str },

    // ---- Subsets ----
    /// Row subset is empty.
    EmptySubset,

    /// Row index out of range.
    RowOutOfRange { index: usize, nobs: usize },

    // ---- Numerics ----
    /// Loss evaluated to a non-finite value at the given coefficients.
    NonFiniteLoss { value: f64 },

    /// Finite-difference information matrix could not be formed.
    Derivative { text: String },
}

pub type FamilyResult<T> = Result<T, FamilyError>;

impl std::error::Error for FamilyError {}

impl std::fmt::Display for FamilyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shapes ----
            FamilyError::EmptyDesign { nrows, ncols } => {
                write!(f, "Design matrix must be non-empty, got {nrows}x{ncols}")
            }
            FamilyError::DimensionMismatch { what, expected, found } => {
                write!(f, "Length of {what} mismatch: expected {expected}, found {found}")
            }

            // ---- Values ----
            FamilyError::NonFiniteValue { what, index, value } => {
                write!(f, "Non-finite entry in {what} at index {index}: {value}")
            }
            FamilyError::InvalidResponse { index, value, reason } => {
                write!(f, "Invalid response at index {index}: {value}: {reason}")
            }
            FamilyError::InvalidSigma { value } => {
                write!(f, "Invalid noise level sigma = {value}, must be finite and > 0")
            }
            FamilyError::InvalidQuadratic { value, reason } => {
                write!(f, "Invalid quadratic term {value}: {reason}")
            }

            // ---- Subsets ----
            FamilyError::EmptySubset => write!(f, "Row subset must be non-empty"),
            FamilyError::RowOutOfRange { index, nobs } => {
                write!(f, "Row index {index} out of range for {nobs} observations")
            }

            // ---- Numerics ----
            FamilyError::NonFiniteLoss { value } => write!(f, "Non-finite loss value: {value}"),
            FamilyError::Derivative { text } => {
                write!(f, "Information matrix by finite differences failed: {text}")
            }
        }
    }
}
