//! carving — sample splitting and data carving after a lasso selection.
//!
//! Purpose
//! -------
//! Split the rows once, select variables with a lasso on the selection
//! rows, then test the selected coefficients either on the leftover rows
//! only (data splitting) or on all rows conditional on the stage-one
//! selection event (data carving).
//!
//! Key behaviors
//! -------------
//! - [`split_model`] / [`SplitModel::fit`] produce the immutable stage-one
//!   value both procedures borrow.
//! - [`DataSplitting`] refits the active set on the leftover rows and
//!   reports Wald tests.
//! - [`DataCarving`] samples the full-data target and the stage-one
//!   randomization jointly with [`ConstrainedGaussian`] (hit-and-run) and
//!   converts the draws into p-values and intervals with
//!   [`DiscreteFamily`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Hypothesis tests are defined for stage-one active variables only.
//! - All randomness flows through caller-provided `rand::Rng` handles.
//!
//! Conventions
//! -----------
//! - Errors are [`CarvingError`]; slow mixing is a flag plus `log::warn!`,
//!   not an error.
//!
//! Testing notes
//! -------------
//! - Unit tests use a fixed 8-row split with closed-form estimators;
//!   carving vs splitting comparisons on simulated data live in `tests/`.

pub mod data_carving;
pub mod discrete;
pub mod errors;
pub mod sampler;
pub mod split;
pub mod splitting;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::data_carving::{CarvingOptions, CarvingTest, DataCarving};
pub use self::discrete::DiscreteFamily;
pub use self::errors::{CarvingError, CarvingResult};
pub use self::sampler::{
    truncated_standard_normal, ConstrainedGaussian, SamplerOptions, SamplerOutput,
};
pub use self::split::{split_model, SplitModel, SplitState, LAMBDA_DRAWS};
pub use self::splitting::{DataSplitting, SplitTest};

pub mod prelude {
    pub use super::errors::{CarvingError, CarvingResult};
    pub use super::{
        split_model, CarvingOptions, CarvingTest, DataCarving, DataSplitting, SamplerOptions,
        SplitModel, SplitState, SplitTest,
    };
}
