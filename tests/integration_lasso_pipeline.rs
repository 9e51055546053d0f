//! Integration tests for penalized fits and selective summaries.
//!
//! Purpose
//! -------
//! - Validate the end-to-end lasso pipeline: from simulated data, through
//!   the penalized fit and covariance estimation, to selection polyhedra,
//!   selective p-values and intervals.
//! - Exercise every loss family, with and without quadratic perturbations,
//!   unpenalized features and explicit covariance estimators.
//!
//! Coverage
//! --------
//! - `lasso::fit`: feasibility of the observed statistic for Gaussian,
//!   logistic (with and without trials), Poisson and Cox fits, including
//!   an empty active set.
//! - `lasso::solver`: the KKT identity under linear and ridge
//!   perturbations.
//! - `lasso::summary`: one- and two-sided null p-value uniformity
//!   (Kolmogorov–Smirnov), interval coverage and the n = 100, p = 20, s = 5
//!   scenario.
//! - `inference::{parametric, sandwich}`: null uniformity under each
//!   estimator and agreement of their standard errors.
//!
//! Exclusions
//! ----------
//! - Closed-form checks of individual building blocks (truncated laws,
//!   polyhedral limits, solver steps); those are unit tests.
//! - Carving and splitting; see `integration_carving_pipeline.rs`.
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Binomial, Exp1, Poisson as PoissonLaw, StandardNormal};
use selective_inference::{
    families::{quadratic::IdentityQuadratic, traits::LossFamily},
    inference::{
        information::spd_inverse, parametric::gaussian_parametric_estimator, pivot::FEASIBILITY_TOL,
        sandwich::gaussian_sandwich_estimator,
    },
    lasso::{
        fit::{FittedLasso, Lasso},
        solver::SolveOptions,
        summary::{nominal_intervals, Alternative, SummaryOptions},
        weights::{theoretical_lambda, FeatureWeights},
    },
    simulation::Instance,
};

/// Route library `log` output through the test harness (`RUST_LOG=debug`).
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Standard normal `n × p` design.
fn normal_design(n: usize, p: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
}

fn uniform(lam: f64, p: usize) -> FeatureWeights {
    FeatureWeights::uniform(lam, p).unwrap()
}

/// Panics unless the observed statistic satisfies every constraint.
fn assert_feasible<F: LossFamily>(fit: &FittedLasso<F>, what: &str) {
    let slack = fit.constraints().slack(fit.observed());
    for (row, (&s, &b)) in slack.iter().zip(fit.constraints().offset.iter()).enumerate() {
        let floor = -FEASIBILITY_TOL * (1.0 + b.abs());
        assert!(s >= floor, "{what}: constraint {row} violated by {s}");
    }
    assert!(fit.is_feasible(), "{what}: fit reports infeasible");
}

#[test]
// Purpose
// -------
// The observed statistic lies in its own selection polyhedron for every
// Gaussian configuration the pipeline supports.
//
// Given
// -----
// - n = 100, p = 20 pure-noise data, λ = ½ · theoretical.
// - Uniform weights and weights with three unpenalized features.
// - No perturbation and a ridge perturbation with c = 0.01.
// - Model-based and pairs-bootstrap covariance estimates.
//
// Expect
// ------
// - Every fit is feasible; every summary p-value lies in [0, 1].
fn gaussian_fits_are_feasible() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(2024);
    let (n, p) = (100, 20);
    let x = normal_design(n, p, &mut rng);
    let y: Array1<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let lam = 0.5 * theoretical_lambda(&x, 1.0, 500, &mut rng);

    let uniform = FeatureWeights::uniform(lam, p).unwrap();
    let with_zeros = uniform.clone().with_unpenalized(&[0, 1, 2]).unwrap();
    for weights in [uniform, with_zeros] {
        for ridge in [None, Some(0.01)] {
            let mut lasso = Lasso::gaussian(x.clone(), y.clone(), 1.0, weights.clone()).unwrap();
            if let Some(c) = ridge {
                lasso = lasso.with_quadratic(IdentityQuadratic::ridge(c, p).unwrap()).unwrap();
            }

            let model_based = lasso.fit(None).expect("model-based fit");
            assert_feasible(&model_based, "gaussian / model-based");

            let mut sandwich = gaussian_sandwich_estimator(200, 7).unwrap();
            let bootstrapped = lasso.fit(Some(&mut sandwich)).expect("sandwich fit");
            assert_feasible(&bootstrapped, "gaussian / sandwich");

            for alternative in [Alternative::OneSided, Alternative::TwoSided] {
                let opts = SummaryOptions {
                    alternative,
                    compute_intervals: true,
                    ..SummaryOptions::default()
                };
                for row in bootstrapped.summary(&opts).unwrap() {
                    if let Some(pv) = row.pvalue {
                        assert!((0.0..=1.0).contains(&pv));
                    }
                }
            }
        }
    }
}

#[test]
// Purpose
// -------
// Non-Gaussian families produce feasible selection events.
//
// Given
// -----
// - Logistic: n = 40, p = 5, binary responses with implicit and explicit
//   unit trials, and binomial(3) responses with 3 trials.
// - Poisson: n = 50, p = 5, counts ~ Poisson(10).
// - Cox: n = 100, p = 5, exponential times, fair-coin censoring, ridge
//   perturbation c = 0.01.
// - λ = 0.1 throughout.
//
// Expect
// ------
// - Every fit is feasible and summarizes without a hard error.
fn glm_and_cox_fits_are_feasible() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(99);

    let x = normal_design(40, 5, &mut rng);
    let bernoulli = Binomial::new(1, 0.5).unwrap();
    let binomial3 = Binomial::new(3, 0.5).unwrap();
    let binary: Array1<f64> = (0..40).map(|_| rng.sample(bernoulli) as f64).collect();
    let threes: Array1<f64> = (0..40).map(|_| rng.sample(binomial3) as f64).collect();
    let cases = [
        (binary.clone(), None),
        (binary, Some(Array1::ones(40))),
        (threes, Some(Array1::from_elem(40, 3.0))),
    ];
    for (successes, trials) in cases {
        let fit = Lasso::logistic(x.clone(), successes, trials, uniform(0.1, 5))
            .unwrap()
            .fit(None)
            .expect("logistic fit");
        assert_feasible(&fit, "logistic");
        fit.summary(&SummaryOptions::default()).expect("logistic summary");
    }

    let x = normal_design(50, 5, &mut rng);
    let law = PoissonLaw::new(10.0).unwrap();
    let counts: Array1<f64> = (0..50).map(|_| rng.sample::<f64, _>(law)).collect();
    let fit = Lasso::poisson(x, counts, uniform(0.1, 5)).unwrap().fit(None).expect("poisson");
    assert_feasible(&fit, "poisson");
    fit.summary(&SummaryOptions::default()).expect("poisson summary");

    let x = normal_design(100, 5, &mut rng);
    let times: Array1<f64> = (0..100).map(|_| rng.sample::<f64, _>(Exp1)).collect();
    let status: Array1<f64> = (0..100).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
    let fit = Lasso::cox(x, times, status, uniform(0.1, 5))
        .unwrap()
        .with_quadratic(IdentityQuadratic::ridge(0.01, 5).unwrap())
        .unwrap()
        .fit(None)
        .expect("cox fit");
    assert_feasible(&fit, "cox");
    fit.summary(&SummaryOptions::default()).expect("cox summary");
}

#[test]
// Purpose
// -------
// A penalty large enough to zero every coefficient still gives a valid,
// feasible (inactive-only) selection event and an empty summary.
//
// Given
// -----
// - n = 30, p = 4 Gaussian data, λ = 10⁶.
//
// Expect
// ------
// - Empty active set; feasible; no summary rows.
fn empty_active_set_is_feasible() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(3);
    let x = normal_design(30, 4, &mut rng);
    let y: Array1<f64> = (0..30).map(|_| rng.sample(StandardNormal)).collect();

    let fit = Lasso::gaussian(x, y, 1.0, uniform(1e6, 4)).unwrap().fit(None).unwrap();

    assert!(fit.active().is_empty());
    assert_feasible(&fit, "empty active set");
    assert!(fit.summary(&SummaryOptions::default()).unwrap().is_empty());
}

#[test]
// Purpose
// -------
// At the solution, active coordinates satisfy the KKT identity
// `∇(L + q)_j = −λ s_j` for linear and ridge perturbations.
//
// Given
// -----
// - `Instance::gaussian(300, 50, 5, …)`, λ = 20 on the loss scale.
// - A random linear term; a ridge c = 0.01 with a random linear term.
// - Tight solver options (tol 1e-12, at least 50 iterations).
//
// Expect
// ------
// - `|∇(L + q)_j s_j + λ| ≤ 1e-6 λ` for every active j.
// - `|∇(L + q)_j| ≤ λ` (to rounding) for every inactive j.
fn kkt_identity_with_quadratic_perturbation() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(17);
    let inst = Instance::gaussian(300, 50, 5, 1.0, 0.2, 30.0, None, &mut rng).unwrap();
    let lam = 20.0;
    let options = SolveOptions::new(50, 2000, 1e-12, 5000).unwrap();

    for coef in [0.0, 0.01] {
        let linear: Array1<f64> = (0..50).map(|_| rng.sample(StandardNormal)).collect();
        let q = IdentityQuadratic::new(coef, Array1::zeros(50), linear, 0.0).unwrap();
        let fit = Lasso::gaussian(inst.x.clone(), inst.y.clone(), 1.0, uniform(lam, 50))
            .unwrap()
            .with_quadratic(q.clone())
            .unwrap()
            .with_options(options)
            .fit(None)
            .expect("perturbed fit");

        let beta = fit.lasso_solution();
        let grad = fit.family().gradient(beta).unwrap() + q.gradient(beta);
        assert!(!fit.active().is_empty());
        for (&j, &s) in fit.active().indices.iter().zip(fit.active().signs.iter()) {
            let stationarity = grad[j] * s;
            assert!(
                (stationarity + lam).abs() <= 1e-6 * lam,
                "coef {coef}, variable {j}: {stationarity}"
            );
        }
        for j in (0..50).filter(|j| fit.active().position(*j).is_none()) {
            assert!(grad[j].abs() <= lam * (1.0 + 1e-6), "coef {coef}, inactive {j}: {}", grad[j]);
        }
    }
}

/// Covariance estimator used by a null-calibration run.
#[derive(Debug, Clone, Copy)]
enum NullEstimator {
    KnownSigma,
    Pearson,
    Sandwich,
}

/// Selective p-values of every selected variable over `reps` pure-noise
/// replicates with n = 100, p = 20, λ = 0.7 · theoretical.
fn null_pvalues(
    estimator: NullEstimator, alternative: Alternative, reps: usize, seed: u64,
) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sandwich = gaussian_sandwich_estimator(200, seed).unwrap();
    let mut pearson = gaussian_parametric_estimator(None).unwrap();
    let opts = SummaryOptions { alternative, ..SummaryOptions::default() };
    let mut pvalues = Vec::new();
    for _ in 0..reps {
        let inst = Instance::gaussian(100, 20, 0, 1.0, 0.0, 0.0, None, &mut rng).unwrap();
        let lam = 0.7 * theoretical_lambda(&inst.x, 1.0, 300, &mut rng);
        let lasso = Lasso::gaussian(inst.x, inst.y, 1.0, uniform(lam, 20)).unwrap();
        let fit = match estimator {
            NullEstimator::KnownSigma => lasso.fit(None),
            NullEstimator::Pearson => lasso.fit(Some(&mut pearson)),
            NullEstimator::Sandwich => lasso.fit(Some(&mut sandwich)),
        }
        .unwrap();
        pvalues.extend(fit.summary(&opts).unwrap().iter().filter_map(|row| row.pvalue));
    }
    pvalues
}

/// Kolmogorov–Smirnov distance between the sample and Uniform(0, 1).
fn ks_uniform(sample: &[f64]) -> f64 {
    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    sorted.iter().enumerate().fold(0.0_f64, |d, (i, &p)| {
        let i = i as f64;
        d.max((i + 1.0) / n - p).max(p - i / n)
    })
}

/// Asserts `sample` is plausibly uniform: KS below its 0.1% critical value
/// `1.95/√n` and mean in (0.35, 0.65).
fn assert_uniform(sample: &[f64], what: &str) {
    assert!(sample.len() >= 100, "{what}: only {} p-values", sample.len());
    assert!(sample.iter().all(|p| (0.0..=1.0).contains(p)), "{what}: p-value outside [0, 1]");
    let ks = ks_uniform(sample);
    let critical = 1.95 / (sample.len() as f64).sqrt();
    assert!(ks < critical, "{what}: KS {ks:.4} ≥ {critical:.4} over {} p-values", sample.len());
    let mean = sample.iter().sum::<f64>() / sample.len() as f64;
    assert!((0.35..0.65).contains(&mean), "{what}: mean null p-value {mean}");
}

#[test]
// Purpose
// -------
// Under the global null, selective p-values of whatever gets selected are
// uniform, for both alternatives.
//
// Given
// -----
// - 150 pure-noise replicates with n = 100, p = 20, σ = 1 (known),
//   λ = 0.7 · theoretical.
// - Two-sided and one-sided (fitted sign) summaries.
//
// Expect
// ------
// - At least 100 pooled p-values per alternative; KS distance from
//   Uniform(0, 1) below 1.95/√n; mean in (0.35, 0.65).
fn null_pvalues_are_calibrated() {
    init_logging();
    let two_sided = null_pvalues(NullEstimator::KnownSigma, Alternative::TwoSided, 150, 4242);
    let one_sided = null_pvalues(NullEstimator::KnownSigma, Alternative::OneSided, 150, 4242);

    assert_uniform(&two_sided, "two-sided");
    assert_uniform(&one_sided, "one-sided");
}

#[test]
// Purpose
// -------
// With homoscedastic noise the parametric (Pearson, Student-t pivots) and
// pairs-bootstrap sandwich estimators both give uniform null p-values.
//
// Given
// -----
// - 150 pure-noise replicates each, as above; sandwich with 200 draws.
//
// Expect
// ------
// - KS distance below 1.95/√n and mean in (0.35, 0.65) for both.
fn null_pvalues_are_uniform_for_both_estimators() {
    init_logging();
    let pearson = null_pvalues(NullEstimator::Pearson, Alternative::TwoSided, 150, 77);
    let sandwich = null_pvalues(NullEstimator::Sandwich, Alternative::TwoSided, 150, 78);

    assert_uniform(&pearson, "parametric / Pearson");
    assert_uniform(&sandwich, "sandwich");
}

#[test]
// Purpose
// -------
// The n = 100, p = 20, s = 5 scenario: a fixed-penalty fit is feasible and
// its two-sided summary is complete and well formed.
//
// Given
// -----
// - `Instance::gaussian(100, 20, 5, σ = 1, ρ = 0.3, snr = 8)`;
//   λ = theoretical.
// - Two-sided summary with 95% intervals.
//
// Expect
// ------
// - Feasible; the five signals are selected; one summary row per active
//   variable, in active-set order.
// - Every p-value lies in [0, 1]; every row has an interval with
//   lower ≤ point estimate ≤ upper.
// - Nominal intervals are `β̄ ± 1.96 sd`.
fn scenario_n100_p20_s5() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(100);
    let inst = Instance::gaussian(100, 20, 5, 1.0, 0.3, 8.0, None, &mut rng).unwrap();
    let lam = theoretical_lambda(&inst.x, 1.0, 1000, &mut rng);
    let fit = Lasso::gaussian(inst.x.clone(), inst.y.clone(), 1.0, uniform(lam, 20))
        .unwrap()
        .fit(None)
        .unwrap();

    let opts = SummaryOptions {
        alternative: Alternative::TwoSided,
        compute_intervals: true,
        ..SummaryOptions::default()
    };
    let rows = fit.summary(&opts).unwrap();
    assert_feasible(&fit, "scenario");
    for j in &inst.active {
        assert!(fit.active().position(*j).is_some(), "signal {j} not selected");
    }
    let variables: Vec<usize> = rows.iter().map(|r| r.variable).collect();
    assert_eq!(variables, fit.active().indices);
    for row in &rows {
        let variable = row.variable;
        let pv = row.pvalue.unwrap_or_else(|| panic!("variable {variable}: {:?}", row.failure));
        assert!((0.0..=1.0).contains(&pv));
        let (lo, hi) = row.interval.expect("interval");
        let estimate = row.estimate.expect("point estimate");
        assert!(
            lo <= estimate && estimate <= hi,
            "variable {variable}: {estimate} outside ({lo}, {hi})"
        );
    }
    for row in nominal_intervals(&fit, 0.95).unwrap() {
        let (lo, hi) = row.interval.unwrap();
        assert_abs_diff_eq!(hi - lo, 2.0 * 1.959_963_985 * row.sd, epsilon = 1e-6);
    }
}

#[test]
// Purpose
// -------
// Parametric (Pearson) and sandwich covariance estimates agree when the
// noise is homoscedastic.
//
// Given
// -----
// - `Instance::gaussian(400, 10, 3, σ = 1, snr = 10)`, λ = theoretical.
// - Parametric estimator with Pearson dispersion; sandwich with 400
//   bootstrap draws.
//
// Expect
// ------
// - Same active set; per-variable sd ratios in (0.75, 1.33).
fn parametric_and_sandwich_agree() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(8);
    let inst = Instance::gaussian(400, 10, 3, 1.0, 0.0, 10.0, None, &mut rng).unwrap();
    let lam = theoretical_lambda(&inst.x, 1.0, 500, &mut rng);
    let lasso = Lasso::gaussian(inst.x, inst.y, 1.0, uniform(lam, 10)).unwrap();

    let mut parametric = gaussian_parametric_estimator(None).unwrap();
    let mut sandwich = gaussian_sandwich_estimator(400, 21).unwrap();
    let fit_p = lasso.fit(Some(&mut parametric)).unwrap();
    let fit_s = lasso.fit(Some(&mut sandwich)).unwrap();

    assert_eq!(fit_p.active().indices, fit_s.active().indices);
    let rows_p = fit_p.summary(&SummaryOptions::default()).unwrap();
    let rows_s = fit_s.summary(&SummaryOptions::default()).unwrap();
    for (rp, rs) in rows_p.iter().zip(rows_s.iter()) {
        let ratio = rs.sd / rp.sd;
        assert!((0.75..1.33).contains(&ratio), "variable {}: sd ratio {ratio}", rp.variable);
    }
}

#[test]
// Purpose
// -------
// Selective intervals cover the projected target `(X_Eᵀ X_E)⁻¹ X_Eᵀ μ`
// at the nominal rate.
//
// Given
// -----
// - 200 replicates of `Instance::gaussian(100, 20, 3, σ = 1, snr = 3)`,
//   λ = theoretical, 90% two-sided intervals.
//
// Expect
// ------
// - Pooled coverage within 3 standard errors of 0.90, using the number of
//   replicates as the (conservative) sample size.
fn selective_intervals_cover() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(555);
    let (mut covered, mut total) = (0usize, 0usize);
    let nsim = 200;
    for _ in 0..nsim {
        let inst = Instance::gaussian(100, 20, 3, 1.0, 0.0, 3.0, None, &mut rng).unwrap();
        let lam = theoretical_lambda(&inst.x, 1.0, 200, &mut rng);
        let mu = inst.x.dot(&inst.beta);
        let fit = Lasso::gaussian(inst.x.clone(), inst.y.clone(), 1.0, uniform(lam, 20))
            .unwrap()
            .fit(None)
            .unwrap();
        let active = &fit.active().indices;
        if active.is_empty() {
            continue;
        }
        let xe = inst.x.select(Axis(1), active);
        let target = spd_inverse(&xe.t().dot(&xe)).unwrap().dot(&xe.t().dot(&mu));

        let opts =
            SummaryOptions { compute_intervals: true, level: 0.9, ..SummaryOptions::default() };
        for (k, row) in fit.summary(&opts).unwrap().iter().enumerate() {
            if let Some((lo, hi)) = row.interval {
                total += 1;
                if lo <= target[k] && target[k] <= hi {
                    covered += 1;
                }
            }
        }
    }

    assert!(total >= nsim, "only {total} intervals");
    let coverage = covered as f64 / total as f64;
    let se = (0.9 * 0.1 / nsim as f64).sqrt();
    assert!((coverage - 0.9).abs() <= 3.0 * se, "coverage {coverage} (se {se})");
}
