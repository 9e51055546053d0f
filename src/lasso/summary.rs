//! lasso::summary — selective p-values and intervals for a fitted lasso.
//!
//! Purpose
//! -------
//! For each active variable, condition the law of its one-step estimate on
//! the selection polyhedron and report a truncated-pivot p-value and
//! confidence interval, next to the unadjusted (nominal) interval.
//!
//! Key behaviors
//! -------------
//! - The contrast for active position `k` is `e_k` in `z`-space; the
//!   polyhedral lemma gives the window `[V⁻, V⁺]`.
//! - The reference law is Gaussian, or Student-t when the covariance
//!   estimate carries residual degrees of freedom (or `df` is set).
//! - One-sided tests use the fitted sign: `s > 0` tests `β > β₀`,
//!   `s < 0` tests `β < β₀`; unsigned (unpenalized, exactly zero) rows fall
//!   back to two-sided.
//! - A failing variable (degenerate window) gets `None` entries and its
//!   error in `failure`; the other rows continue. An interval end that
//!   cannot be bracketed is reported infinite with its error in `failure`,
//!   keeping the p-value and the other end.
//! - The point estimate of a selective row is the median-unbiased `μ̂`
//!   with `F_μ̂(β̄) = ½`. Unlike the one-step `β̄`, it always lies inside
//!   the equal-tailed interval; `β̄` can fall outside when it sits close to
//!   the truncation boundary.
//!
//! Invariants & assumptions
//! ------------------------
//! - Rows are reported in active-set order.
//! - `level ∈ (0, 1)`; anything else fails the whole summary up front.
use crate::{
    families::traits::LossFamily,
    inference::{
        errors::{InferenceError, InferenceResult},
        information::standard_errors,
        truncated::{validate_level, IntervalSearch, PivotLaw, Tail, TruncatedPivot},
    },
    lasso::{errors::SelectionResult, fit::FittedLasso},
};
use ndarray::Array1;

/// Alternative hypothesis for the selective tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    /// In the direction of the fitted sign.
    OneSided,
    TwoSided,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    pub alternative: Alternative,
    pub compute_intervals: bool,
    pub level: f64,
    pub null_value: f64,
    /// Overrides the degrees of freedom of the covariance estimate.
    pub df: Option<f64>,
    pub search: IntervalSearch,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            alternative: Alternative::TwoSided,
            compute_intervals: false,
            level: 0.95,
            null_value: 0.0,
            df: None,
            search: IntervalSearch::default(),
        }
    }
}

/// One active variable of a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub variable: usize,
    pub lasso: f64,
    pub onestep: f64,
    pub sd: f64,
    pub pvalue: Option<f64>,
    /// Equal-tailed interval; an end is infinite when unbounded or when
    /// its search failed (see `failure`).
    pub interval: Option<(f64, f64)>,
    /// Selective median-unbiased estimate, always inside `interval`.
    pub estimate: Option<f64>,
    pub failure: Option<InferenceError>,
}

impl<F: LossFamily> FittedLasso<F> {
    /// Selective inference for every active variable.
    ///
    /// # Errors
    /// - `Inference(InvalidLevel)` / `Inference(InvalidDegreesOfFreedom)`
    ///   for bad options. Per-variable failures are stored in the rows.
    pub fn summary(&self, opts: &SummaryOptions) -> SelectionResult<Vec<SummaryRow>> {
        validate_level(opts.level)?;
        let law = PivotLaw::from_df(opts.df.or(self.covariance().df))?;
        let z = self.observed();
        let sds = standard_errors(&self.constraints().covariance);
        let onestep = self.onestep_estimator();
        let active = self.active();

        let rows = active
            .indices
            .iter()
            .enumerate()
            .map(|(k, &j)| {
                let mut row = SummaryRow {
                    variable: j,
                    lasso: self.lasso_solution()[j],
                    onestep: onestep[k],
                    sd: sds[k],
                    pvalue: None,
                    interval: None,
                    estimate: None,
                    failure: None,
                };
                let tail = match (opts.alternative, active.signs[k]) {
                    (Alternative::OneSided, s) if s > 0.0 => Tail::Upper,
                    (Alternative::OneSided, s) if s < 0.0 => Tail::Lower,
                    _ => Tail::TwoSided,
                };
                if let Err(err) = self.selective_row(&mut row, k, z, &law, tail, opts) {
                    log::warn!("selective inference for variable {j} failed: {err}");
                    row.failure = Some(err);
                }
                row
            })
            .collect();
        Ok(rows)
    }

    /// Fill the p-value, then the interval end by end. A failing end is
    /// reported unbounded with its error kept; the p-value survives.
    fn selective_row(
        &self, row: &mut SummaryRow, k: usize, z: &Array1<f64>, law: &PivotLaw, tail: Tail,
        opts: &SummaryOptions,
    ) -> InferenceResult<()> {
        let mut eta = Array1::<f64>::zeros(z.len());
        eta[k] = 1.0;
        let limits = self.constraints().truncation_limits(&eta, z)?;
        let pivot = TruncatedPivot::new(law.clone(), limits.lower, limits.upper, limits.sd)?;
        row.pvalue = Some(pivot.pvalue(opts.null_value, limits.observed, tail)?);
        if !opts.compute_intervals {
            return Ok(());
        }

        let mut failure = None;
        let mut end = |value: InferenceResult<f64>, unbounded: f64| {
            value.unwrap_or_else(|err| {
                failure.get_or_insert(err);
                unbounded
            })
        };
        let (observed, level, search) = (limits.observed, opts.level, &opts.search);
        let lower = end(pivot.lower_endpoint(observed, level, search), f64::NEG_INFINITY);
        let upper = end(pivot.upper_endpoint(observed, level, search), f64::INFINITY);
        let (lower, upper) = match lower <= upper {
            true => (lower, upper),
            false => {
                failure.get_or_insert(InferenceError::DegenerateInterval { lower, upper });
                (f64::NEG_INFINITY, f64::INFINITY)
            }
        };
        row.interval = Some((lower, upper));
        row.estimate = Some(pivot.median_estimate(limits.observed, (lower, upper), &opts.search)?);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Unadjusted intervals `β̄_j ± q_{1−α/2} sd_j` for the active variables,
/// ignoring selection.
///
/// # Errors
/// - `Inference(InvalidLevel)` for a level outside `(0, 1)`.
pub fn nominal_intervals<F: LossFamily>(
    fitted: &FittedLasso<F>, level: f64,
) -> SelectionResult<Vec<SummaryRow>> {
    validate_level(level)?;
    let law = PivotLaw::from_df(fitted.covariance().df)?;
    let q = law.quantile(1.0 - 0.5 * (1.0 - level));
    let sds = standard_errors(&fitted.constraints().covariance);
    let onestep = fitted.onestep_estimator();
    Ok(fitted
        .active()
        .indices
        .iter()
        .enumerate()
        .map(|(k, &j)| SummaryRow {
            variable: j,
            lasso: fitted.lasso_solution()[j],
            onestep: onestep[k],
            sd: sds[k],
            pvalue: None,
            interval: Some((onestep[k] - q * sds[k], onestep[k] + q * sds[k])),
            estimate: Some(onestep[k]),
            failure: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inference::parametric::gaussian_parametric_estimator,
        lasso::{errors::SelectionError, fit::Lasso, weights::FeatureWeights},
        simulation::Instance,
    };
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Summary rows on the orthogonal design, where the truncation window of
    // β̄₀ is [λ/2, ∞) = [1, ∞) and everything is available in closed form.
    // -------------------------------------------------------------------------

    fn fitted() -> FittedLasso<crate::families::gaussian::Gaussian> {
        let x = array![[1.0, 1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let y = array![2.5, 3.5, 0.25, 0.25];
        let weights = FeatureWeights::uniform(2.0, 3).unwrap();
        Lasso::gaussian(x, y, 1.0, weights).unwrap().fit(None).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The selective p-value matches the truncated-normal tail computed by
    // hand.
    //
    // Given
    // -----
    // - β̄₀ = 3, sd = 1/√2, window [1, ∞), one-sided (sign +).
    //
    // Expect
    // ------
    // - p = Φ̄(3√2) / Φ̄(√2).
    fn one_sided_pvalue_matches_truncated_normal() {
        // Arrange
        let fit = fitted();
        let opts =
            SummaryOptions { alternative: Alternative::OneSided, ..SummaryOptions::default() };

        // Act
        let rows = fit.summary(&opts).expect("summary");

        // Assert
        let law = PivotLaw::Gaussian;
        let s2 = 2.0_f64.sqrt();
        let expected = (law.log_sf(3.0 * s2) - law.log_sf(s2)).exp();
        assert_eq!(rows.len(), 1);
        let p = rows[0].pvalue.expect("pvalue");
        assert!((p - expected).abs() < 1e-10 * expected.max(1e-300), "p {p} vs {expected}");
    }

    #[test]
    // Purpose
    // -------
    // Selective intervals contain the one-step estimate and are wider below
    // than the nominal interval.
    //
    // Given
    // -----
    // - Level 0.9.
    //
    // Expect
    // ------
    // - selective lower < nominal lower; both contain β̄₀ = 3.
    fn selective_interval_is_wider_below() {
        // Arrange
        let fit = fitted();
        let opts =
            SummaryOptions { compute_intervals: true, level: 0.9, ..SummaryOptions::default() };

        // Act
        let sel = fit.summary(&opts).expect("summary");
        let nom = nominal_intervals(&fit, 0.9).expect("nominal");

        // Assert
        let (sl, su) = sel[0].interval.expect("interval");
        let (nl, nu) = nom[0].interval.expect("interval");
        assert!(sl < nl);
        assert!(sl < 3.0 && su > 3.0);
        assert!(nl < 3.0 && nu > 3.0);
    }

    #[test]
    // Purpose
    // -------
    // Invalid levels fail the call.
    //
    // Given
    // -----
    // - level = 1.5.
    //
    // Expect
    // ------
    // - `Inference(InvalidLevel)`.
    fn invalid_level_is_rejected() {
        let fit = fitted();
        let opts = SummaryOptions { level: 1.5, ..SummaryOptions::default() };
        assert!(matches!(
            fit.summary(&opts),
            Err(SelectionError::Inference(InferenceError::InvalidLevel { .. }))
        ));
    }

    #[test]
    // Purpose
    // -------
    // The selective point estimate sits inside the interval even when the
    // one-step estimate hugs the truncation boundary.
    //
    // Given
    // -----
    // - The orthogonal design at level 0.9.
    //
    // Expect
    // ------
    // - lower ≤ estimate ≤ upper and F at the estimate is ½.
    fn estimate_lies_inside_interval() {
        // Arrange
        let fit = fitted();
        let opts =
            SummaryOptions { compute_intervals: true, level: 0.9, ..SummaryOptions::default() };

        // Act
        let row = fit.summary(&opts).expect("summary").remove(0);

        // Assert
        let (lo, hi) = row.interval.expect("interval");
        let estimate = row.estimate.expect("estimate");
        assert!(lo <= estimate && estimate <= hi, "{estimate} outside ({lo}, {hi})");
        let s2 = 2.0_f64.sqrt();
        let pivot = TruncatedPivot::new(PivotLaw::Gaussian, 1.0, f64::INFINITY, 1.0 / s2).unwrap();
        assert!((pivot.cdf(estimate, 3.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // With Pearson dispersion the pivots are Student-t, and computing
    // intervals keeps every p-value and yields well-formed intervals.
    //
    // Given
    // -----
    // - `Instance::gaussian(100, 20, 5, σ = 1, ρ = 0.3, snr = 8)`, λ = 2,
    //   parametric estimator with Pearson dispersion.
    // - Summaries with and without intervals.
    //
    // Expect
    // ------
    // - Identical p-values in both summaries, all in [0, 1].
    // - Every interval is present, NaN-free, ordered, and contains its
    //   estimate.
    fn pearson_intervals_keep_pvalues() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(100);
        let inst = Instance::gaussian(100, 20, 5, 1.0, 0.3, 8.0, None, &mut rng).unwrap();
        let mut pearson = gaussian_parametric_estimator(None).unwrap();
        let fit = Lasso::gaussian(inst.x, inst.y, 1.0, FeatureWeights::uniform(2.0, 20).unwrap())
            .unwrap()
            .fit(Some(&mut pearson))
            .unwrap();
        assert!(fit.covariance().df.is_some());

        // Act
        let plain = fit.summary(&SummaryOptions::default()).unwrap();
        let opts = SummaryOptions { compute_intervals: true, ..SummaryOptions::default() };
        let full = fit.summary(&opts).unwrap();

        // Assert
        assert!(!full.is_empty());
        for (a, b) in plain.iter().zip(full.iter()) {
            let p = b.pvalue.expect("pvalue kept");
            assert_eq!(a.pvalue, Some(p));
            assert!((0.0..=1.0).contains(&p));
            let (lo, hi) = b.interval.expect("interval");
            let estimate = b.estimate.expect("estimate");
            let variable = b.variable;
            assert!(!lo.is_nan() && !hi.is_nan() && lo < hi, "variable {variable}: ({lo}, {hi})");
            assert!(lo <= estimate && estimate <= hi);
        }
    }
}
