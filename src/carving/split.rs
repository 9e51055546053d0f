//! carving::split — random selection/leftover splits and the stage-one fit.
//!
//! Purpose
//! -------
//! Partition the rows once per experiment, fit the lasso on the selection
//! rows and keep both as an immutable [`SplitModel`] that data splitting
//! and data carving borrow.
//!
//! Key behaviors
//! -------------
//! - [`SplitState::random`] puts `⌊n · split_frac⌋` uniformly chosen rows
//!   in the selection split and the rest in the leftover split, both
//!   sorted.
//! - [`split_model`] sets `λ = lam_frac · theoretical_lambda` on the
//!   selection design with `σ = √scale` and fits the stage-one lasso.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both splits are non-empty and together partition `0..n`.
//! - The stage-one fit never sees leftover rows.
use crate::{
    carving::errors::{CarvingError, CarvingResult},
    families::traits::LossFamily,
    inference::covariance::CovarianceEstimator,
    lasso::{
        fit::{FittedLasso, Lasso},
        solver::SolveOptions,
        weights::{theoretical_lambda, FeatureWeights},
    },
};
use rand::{seq::SliceRandom, Rng};

/// Monte-Carlo draws behind the default penalty level.
pub const LAMBDA_DRAWS: usize = 2000;

/// Row indices of the selection and leftover splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitState {
    pub selection: Vec<usize>,
    pub leftover: Vec<usize>,
}

impl SplitState {
    /// # Errors
    /// - `InvalidSplitFraction` unless `0 < split_frac < 1`.
    /// - `EmptySplit` when either side would be empty.
    pub fn random<R: Rng>(n: usize, split_frac: f64, rng: &mut R) -> CarvingResult<Self> {
        if !split_frac.is_finite() || split_frac <= 0.0 || split_frac >= 1.0 {
            return Err(CarvingError::InvalidSplitFraction { value: split_frac });
        }
        let split_n = (n as f64 * split_frac).floor() as usize;
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(rng);
        let mut selection = rows[..split_n].to_vec();
        let mut leftover = rows[split_n..].to_vec();
        selection.sort_unstable();
        leftover.sort_unstable();
        Self::new(selection, leftover, n)
    }

    /// A caller-fixed split.
    ///
    /// # Errors
    /// - `EmptySplit` for an empty side, `InvalidSplit` when the indices do
    ///   not partition `0..n`.
    pub fn new(selection: Vec<usize>, leftover: Vec<usize>, n: usize) -> CarvingResult<Self> {
        if selection.is_empty() {
            return Err(CarvingError::EmptySplit { which: "selection", nobs: n });
        }
        if leftover.is_empty() {
            return Err(CarvingError::EmptySplit { which: "leftover", nobs: n });
        }
        let mut seen = vec![false; n];
        for &i in selection.iter().chain(leftover.iter()) {
            if i >= n {
                return Err(CarvingError::InvalidSplit { reason: "row index out of range" });
            }
            if seen[i] {
                return Err(CarvingError::InvalidSplit { reason: "row appears twice" });
            }
            seen[i] = true;
        }
        if seen.iter().any(|&s| !s) {
            return Err(CarvingError::InvalidSplit { reason: "rows missing from both splits" });
        }
        Ok(Self { selection, leftover })
    }

    pub fn nobs(&self) -> usize {
        self.selection.len() + self.leftover.len()
    }

    /// Selection share of the rows.
    pub fn fraction(&self) -> f64 {
        self.selection.len() as f64 / self.nobs() as f64
    }
}

/// Full-data family, split and stage-one fit.
#[derive(Debug, Clone)]
pub struct SplitModel<F: LossFamily> {
    family: F,
    split: SplitState,
    weights: FeatureWeights,
    stage_one: FittedLasso<F>,
}

impl<F: LossFamily> SplitModel<F> {
    /// Fit the stage-one lasso on `split.selection` with model-based
    /// covariance.
    pub fn fit(family: F, weights: FeatureWeights, split: SplitState) -> CarvingResult<Self> {
        Self::fit_with(family, weights, split, SolveOptions::default(), None)
    }

    /// As [`fit`](Self::fit), with explicit solver options and covariance
    /// estimator for the stage-one fit.
    ///
    /// # Errors
    /// - `InvalidSplit` when the split does not cover the family's rows.
    /// - Stage-one fit failures as `CarvingError::Selection`.
    pub fn fit_with(
        family: F, weights: FeatureWeights, split: SplitState, options: SolveOptions,
        covariance: Option<&mut dyn CovarianceEstimator<F>>,
    ) -> CarvingResult<Self> {
        if split.nobs() != family.nobs() {
            return Err(CarvingError::InvalidSplit {
                reason: "split does not match the number of observations",
            });
        }
        let selection_family = family.subset(&split.selection)?;
        let stage_one =
            Lasso::new(selection_family, weights.clone())?.with_options(options).fit(covariance)?;
        log::debug!(
            "{} stage-one fit on {} of {} rows selected {:?}",
            family.name(),
            split.selection.len(),
            split.nobs(),
            stage_one.active().indices
        );
        Ok(Self { family, split, weights, stage_one })
    }

    pub fn family(&self) -> &F {
        &self.family
    }

    pub fn split(&self) -> &SplitState {
        &self.split
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    pub fn stage_one(&self) -> &FittedLasso<F> {
        &self.stage_one
    }

    /// Stage-one active set.
    pub fn active(&self) -> &[usize] {
        &self.stage_one.active().indices
    }
}

/// Random split plus a stage-one lasso at `lam_frac` times the theoretical
/// penalty of the selection design.
///
/// # Errors
/// - `InvalidLambdaFraction`, `InvalidSplitFraction`, `EmptySplit`.
/// - Stage-one fit failures.
pub fn split_model<F: LossFamily, R: Rng>(
    family: F, split_frac: f64, lam_frac: f64, rng: &mut R,
) -> CarvingResult<SplitModel<F>> {
    if !lam_frac.is_finite() || lam_frac <= 0.0 {
        return Err(CarvingError::InvalidLambdaFraction { value: lam_frac });
    }
    let split = SplitState::random(family.nobs(), split_frac, rng)?;
    let selection_design = family.subset(&split.selection)?.design().clone();
    let sigma = family.scale().sqrt();
    let lam = lam_frac * theoretical_lambda(&selection_design, sigma, LAMBDA_DRAWS, rng);
    let weights = FeatureWeights::uniform(lam, family.nfeatures())?;
    SplitModel::fit(family, weights, split)
}
