//! Per-feature penalty weights and the theoretical penalty level.
use crate::lasso::errors::{SelectionError, SelectionResult};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::StandardNormal;

/// Weighted L1 penalty `Σ_j w_j |β_j|`. A zero weight leaves the feature
/// unpenalized: it is always active and never sign-constrained.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWeights {
    weights: Array1<f64>,
}

impl FeatureWeights {
    /// # Errors
    /// - `InvalidFeatureWeights` for a negative or non-finite entry.
    pub fn new(weights: Array1<f64>) -> SelectionResult<Self> {
        let bad = weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0);
        if let Some((index, &value)) = bad {
            return Err(SelectionError::InvalidFeatureWeights { index, value });
        }
        Ok(Self { weights })
    }

    /// Same weight `lam` on all `p` features.
    pub fn uniform(lam: f64, p: usize) -> SelectionResult<Self> {
        Self::new(Array1::from_elem(p, lam))
    }

    /// Zero the weights of `unpenalized` (an intercept, say).
    ///
    /// # Errors
    /// - `DimensionMismatch` if an index is out of range.
    pub fn with_unpenalized(mut self, unpenalized: &[usize]) -> SelectionResult<Self> {
        let p = self.weights.len();
        for &j in unpenalized {
            if j >= p {
                return Err(SelectionError::DimensionMismatch {
                    what: "unpenalized index",
                    expected: p,
                    found: j,
                });
            }
            self.weights[j] = 0.0;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn get(&self, j: usize) -> f64 {
        self.weights[j]
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn is_penalized(&self, j: usize) -> bool {
        self.weights[j] > 0.0
    }

    /// `Σ_j w_j |β_j|`.
    pub fn penalty(&self, beta: &Array1<f64>) -> f64 {
        self.weights.iter().zip(beta.iter()).map(|(w, b)| w * b.abs()).sum()
    }
}

/// Monte-Carlo estimate of `E max_j |X_jᵀ ε| / σ²` for `ε ~ N(0, σ² I)`:
/// the size of the pure-noise score of the Gaussian loss `‖y − Xβ‖² / 2σ²`,
/// i.e. the smallest penalty that keeps noise features out of the model.
pub fn theoretical_lambda<R: Rng>(x: &Array2<f64>, sigma: f64, draws: usize, rng: &mut R) -> f64 {
    let n = x.nrows();
    let draws = draws.max(1);
    let mut total = 0.0;
    for _ in 0..draws {
        let z: Array1<f64> = (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        total += x.t().dot(&z).iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    }
    total / draws as f64 / sigma
}
