//! simulation — synthetic regression instances and bounded retries.
//!
//! Purpose
//! -------
//! Generate the sparse Gaussian-regression instances used to calibrate
//! selective p-values (null uniformity, coverage, carving vs splitting)
//! and wrap randomized procedures that can legitimately fail (a selection
//! that misses the true support) in a bounded retry.
//!
//! Key behaviors
//! -------------
//! - [`Instance::gaussian`] draws an equicorrelated design
//!   `X = √(1−ρ) Z + √ρ w 1ᵀ`, centres every column and scales it to unit
//!   Euclidean norm, sets the first `s` coefficients to `snr`, and returns
//!   `y = (Xβ + ε) σ` with the coefficients reported on the scale of `y`
//!   (`β σ`).
//! - Noise is standard normal, or Student-t with `df` degrees of freedom
//!   rescaled to unit variance when `df > 2`.
//! - [`retry`] calls a fallible closure at most `max_attempts` times and
//!   returns `CarvingError::GaveUp` with the last error otherwise.
//!
//! Conventions
//! -----------
//! - All randomness comes from the caller's RNG.
use crate::carving::errors::{CarvingError, CarvingResult};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, StudentT};

/// A simulated regression problem with known support.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// True coefficients on the scale of `y`.
    pub beta: Array1<f64>,
    pub active: Vec<usize>,
    pub sigma: f64,
}

impl Instance {
    /// # Errors
    /// - `InvalidInstance` for `s > p`, `ρ ∉ [0, 1)`, a
    ///   non-positive `σ`, or `df ≤ 0`.
    #[allow(clippy::too_many_arguments)]
    pub fn gaussian<R: Rng>(
        n: usize, p: usize, s: usize, sigma: f64, rho: f64, snr: f64, df: Option<f64>, rng: &mut R,
    ) -> CarvingResult<Self> {
        let invalid = |reason| Err(CarvingError::InvalidInstance { reason });
        if s > p {
            return invalid("sparsity exceeds the number of features");
        }
        if !(0.0..1.0).contains(&rho) {
            return invalid("equicorrelation must lie in [0, 1)");
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return invalid("noise level must be finite and > 0");
        }

        let mut x = Array2::<f64>::from_shape_fn((n, p), |_| rng.sample(StandardNormal))
            * (1.0 - rho).sqrt();
        let shared: Array1<f64> =
            (0..n).map(|_| rng.sample::<f64, _>(StandardNormal) * rho.sqrt()).collect();
        for mut col in x.axis_iter_mut(Axis(1)) {
            col += &shared;
            let mean = col.sum() / n as f64;
            col -= mean;
            let norm = col.dot(&col).sqrt();
            if norm > 0.0 {
                col /= norm;
            }
        }

        let mut beta = Array1::<f64>::zeros(p);
        beta.slice_mut(ndarray::s![..s]).fill(snr);
        let noise = noise(n, df, rng)?;
        let y = (x.dot(&beta) + noise) * sigma;
        Ok(Self { x, y, beta: beta * sigma, active: (0..s).collect(), sigma })
    }
}

fn noise<R: Rng>(n: usize, df: Option<f64>, rng: &mut R) -> CarvingResult<Array1<f64>> {
    match df {
        None => Ok((0..n).map(|_| rng.sample(StandardNormal)).collect()),
        Some(df) => {
            let law = StudentT::new(df).map_err(|_| CarvingError::InvalidInstance {
                reason: "degrees of freedom must be finite and > 0",
            })?;
            let scale = if df > 2.0 { ((df - 2.0) / df).sqrt() } else { 1.0 };
            Ok((0..n).map(|_| law.sample(rng) * scale).collect())
        }
    }
}

/// Run `attempt(k)` for `k = 0, 1, …` until it succeeds, at most
/// `max_attempts` times (at least once).
///
/// # Errors
/// - `GaveUp { attempts, last }` when every attempt failed.
pub fn retry<T, G>(max_attempts: usize, mut attempt: G) -> CarvingResult<T>
where
    G: FnMut(usize) -> CarvingResult<T>,
{
    let attempts = max_attempts.max(1);
    let mut last = None;
    for k in 0..attempts {
        match attempt(k) {
            Ok(value) => return Ok(value),
            Err(err) => {
                log::debug!("attempt {} of {attempts} failed: {err}", k + 1);
                last = Some(err);
            }
        }
    }
    let last = last.unwrap_or(CarvingError::InvalidInstance { reason: "no attempt was made" });
    Err(CarvingError::GaveUp { attempts, last: Box::new(last) })
}
