//! inference::covariance — the pivot layout, covariance estimates and the
//! estimator trait.
//!
//! Purpose
//! -------
//! Describe where the selection pivot lives and how its covariance is
//! obtained. [`PivotLayout`] fixes the active/inactive split of the
//! coefficients and the information matrix at the lasso solution;
//! [`CovarianceEstimator`] turns a family and a layout into a
//! [`CovarianceEstimate`] for the statistic `z = (β̄_E, U)`.
//!
//! Key behaviors
//! -------------
//! - [`PivotLayout::model_covariance`] is the model-based block diagonal
//!   `blockdiag(H_EE⁻¹, H_II − H_IE H_EE⁻¹ H_EI)`.
//! - [`regularize`] symmetrizes a raw estimate, measures its condition
//!   number and adds the smallest ridge that brings it under the threshold,
//!   flagging the result and logging a warning.
//!
//! Invariants & assumptions
//! ------------------------
//! - `active` and `inactive` partition `0..p` and are each sorted.
//! - `hessian` already includes any quadratic curvature.
//! - Every `CovarianceEstimate::matrix` is symmetric positive semi-definite
//!   of size `p × p`, ordered as `(active, inactive)`.
//!
//! Downstream usage
//! ----------------
//! - `lasso::fit` builds the layout and asks its estimator for Σ once.
//! - `lasso::constraints::Polyhedron` stores the resulting matrix.
use crate::{
    families::traits::LossFamily,
    inference::{
        errors::{InferenceError, InferenceResult},
        information::{
            condition_number, eigen_range, spd_inverse, submatrix, symmetrize, validate_square,
        },
    },
};
use ndarray::{s, Array1, Array2};

/// Default largest acceptable condition number before a ridge is added.
pub const DEFAULT_MAX_CONDITION: f64 = 1e10;

/// Coordinates of the pivot statistic at a lasso solution.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotLayout {
    pub active: Vec<usize>,
    pub inactive: Vec<usize>,
    pub beta_hat: Array1<f64>,
    /// `∇²L(β̂) + c·I`, full `p × p`.
    pub hessian: Array2<f64>,
    /// `H_EE⁻¹` (pseudo-inverse when singular).
    pub h_ee_inv: Array2<f64>,
    /// Quadratic perturbation coefficient `c` folded into `hessian`.
    pub curvature: f64,
}

impl PivotLayout {
    /// # Errors
    /// - `DimensionMismatch` when `beta_hat` and `hessian` disagree in size
    ///   or an active index is out of range.
    /// - `NonFiniteMatrix` for non-finite Hessian entries.
    pub fn new(
        active: Vec<usize>, beta_hat: Array1<f64>, hessian: Array2<f64>, curvature: f64,
    ) -> InferenceResult<Self> {
        let p = beta_hat.len();
        validate_square("hessian", &hessian)?;
        if hessian.nrows() != p {
            return Err(InferenceError::DimensionMismatch {
                what: "hessian",
                expected: p,
                found: hessian.nrows(),
            });
        }
        if let Some(&j) = active.iter().find(|&&j| j >= p) {
            return Err(InferenceError::DimensionMismatch {
                what: "active index",
                expected: p,
                found: j,
            });
        }
        let inactive: Vec<usize> = (0..p).filter(|j| !active.contains(j)).collect();
        let h_ee_inv = spd_inverse(&submatrix(&hessian, &active, &active))?;
        Ok(Self { active, inactive, beta_hat, hessian, h_ee_inv, curvature })
    }

    pub fn dim(&self) -> usize {
        self.beta_hat.len()
    }

    pub fn nactive(&self) -> usize {
        self.active.len()
    }

    /// `H_IE`.
    pub fn h_ie(&self) -> Array2<f64> {
        submatrix(&self.hessian, &self.inactive, &self.active)
    }

    /// `H_II − H_IE H_EE⁻¹ H_EI`.
    pub fn inactive_schur(&self) -> Array2<f64> {
        let h_ii = submatrix(&self.hessian, &self.inactive, &self.inactive);
        let h_ie = self.h_ie();
        let correction = h_ie.dot(&self.h_ee_inv).dot(&h_ie.t());
        symmetrize(&(h_ii - correction))
    }

    /// Model-based covariance of `z = (β̄_E, U)`.
    pub fn model_covariance(&self) -> Array2<f64> {
        let (e, p) = (self.nactive(), self.dim());
        let mut sigma = Array2::<f64>::zeros((p, p));
        sigma.slice_mut(s![..e, ..e]).assign(&self.h_ee_inv);
        sigma.slice_mut(s![e.., e..]).assign(&self.inactive_schur());
        sigma
    }

    /// Map a loss gradient `g` (full length) to the pivot coordinates
    /// `(−H_EE⁻¹ g_E, −g_I + H_IE H_EE⁻¹ g_E)`.
    pub fn score_map(&self, g: &Array1<f64>) -> Array1<f64> {
        let g_e: Array1<f64> = self.active.iter().map(|&j| g[j]).collect();
        let g_i: Array1<f64> = self.inactive.iter().map(|&j| g[j]).collect();
        let delta = self.h_ee_inv.dot(&g_e);
        let u = self.h_ie().dot(&delta) - g_i;
        let mut z = Array1::zeros(self.dim());
        z.slice_mut(s![..self.nactive()]).assign(&(-delta));
        z.slice_mut(s![self.nactive()..]).assign(&u);
        z
    }
}

/// A covariance matrix for the pivot statistic with its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceEstimate {
    pub matrix: Array2<f64>,
    /// Ridge added to the diagonal (0 when none was needed).
    pub ridge: f64,
    /// Condition number before regularization.
    pub condition_number: f64,
    pub ill_conditioned: bool,
    /// Residual degrees of freedom when the dispersion was estimated.
    pub df: Option<f64>,
    /// Multiplier applied to the model-based covariance (1 for sandwich).
    pub dispersion: f64,
}

/// Estimates the covariance of `z = (β̄_E, U)` at a lasso solution.
pub trait CovarianceEstimator<F: LossFamily> {
    fn name(&self) -> &'static str;

    fn estimate(&mut self, family: &F, layout: &PivotLayout) -> InferenceResult<CovarianceEstimate>;
}

/// Symmetrize `raw`, clamp its condition number at `max_condition` with a
/// diagonal ridge, and package the diagnostics.
///
/// # Errors
/// - `InvalidConditionThreshold` when `max_condition ≤ 1`.
/// - `NonFiniteMatrix` / `DimensionMismatch` for malformed input.
/// - `IllConditionedCovariance` when the largest eigenvalue is not
///   positive, so no ridge can help.
pub fn regularize(
    raw: &Array2<f64>, max_condition: f64, df: Option<f64>, dispersion: f64,
) -> InferenceResult<CovarianceEstimate> {
    if !max_condition.is_finite() || max_condition <= 1.0 {
        return Err(InferenceError::InvalidConditionThreshold { value: max_condition });
    }
    validate_square("covariance", raw)?;
    let matrix = symmetrize(raw);
    let clean = |matrix, condition_number| CovarianceEstimate {
        matrix,
        ridge: 0.0,
        condition_number,
        ill_conditioned: false,
        df,
        dispersion,
    };
    if matrix.nrows() == 0 {
        return Ok(clean(matrix, 1.0));
    }
    let (min, max) = eigen_range(&matrix)?;
    if max <= 0.0 {
        return Err(InferenceError::IllConditionedCovariance { condition_number: f64::INFINITY });
    }
    let kappa = condition_number(&matrix)?;
    if kappa <= max_condition {
        return Ok(clean(matrix, kappa));
    }
    // (max + r) / (min + r) = max_condition
    let ridge = ((max - max_condition * min) / (max_condition - 1.0)).max(0.0);
    log::warn!(
        "covariance condition number {kappa:.3e} exceeds {max_condition:.1e}; \
         adding ridge {ridge:.3e}"
    );
    let mut repaired = matrix;
    repaired.diag_mut().map_inplace(|v| *v += ridge);
    Ok(CovarianceEstimate {
        matrix: repaired,
        ridge,
        condition_number: kappa,
        ill_conditioned: true,
        df,
        dispersion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Layout construction, the model-based block covariance and the score
    // map on a 3×3 information matrix; ridge regularization.
    // -------------------------------------------------------------------------

    fn layout() -> PivotLayout {
        let h = array![[2.0, 0.5, 0.2], [0.5, 1.0, 0.1], [0.2, 0.1, 3.0]];
        PivotLayout::new(vec![0, 2], array![1.0, 0.0, -0.5], h, 0.0).expect("valid layout")
    }

    #[test]
    // Purpose
    // -------
    // The inactive block of the model covariance is the Schur complement.
    //
    // Given
    // -----
    // - Active {0, 2}, inactive {1}.
    //
    // Expect
    // ------
    // - Σ_II = H_11 − H_1E H_EE⁻¹ H_E1; off-diagonal blocks are zero.
    fn model_covariance_uses_schur_complement() {
        // Arrange
        let lay = layout();
        let h_ee = array![[2.0, 0.2], [0.2, 3.0]];
        let det = 2.0 * 3.0 - 0.04;
        let inv = array![[3.0, -0.2], [-0.2, 2.0]] / det;
        let h_1e = array![0.5, 0.1];

        // Act
        let sigma = lay.model_covariance();

        // Assert
        let expected_ii = 1.0 - h_1e.dot(&inv.dot(&h_1e));
        assert!((sigma[[2, 2]] - expected_ii).abs() < 1e-12);
        assert!((sigma[[0, 0]] - inv[[0, 0]]).abs() < 1e-12);
        assert_eq!(sigma[[0, 2]], 0.0);
        assert_eq!(lay.inactive, vec![1]);
        assert!((h_ee.dot(&lay.h_ee_inv)[[0, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The score map is linear with the documented blocks.
    //
    // Given
    // -----
    // - g = e₁ (only the inactive coordinate moves).
    //
    // Expect
    // ------
    // - Active part zero, inactive part −1.
    fn score_map_on_inactive_unit_vector() {
        // Arrange
        let lay = layout();

        // Act
        let z = lay.score_map(&array![0.0, 1.0, 0.0]);

        // Assert
        assert_eq!(z[0], 0.0);
        assert_eq!(z[1], 0.0);
        assert!((z[2] + 1.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // An ill-conditioned matrix receives a ridge that meets the threshold;
    // a well-conditioned one is left alone.
    //
    // Given
    // -----
    // - diag(1, 1e-14) with threshold 1e10; the identity.
    //
    // Expect
    // ------
    // - Flagged with a positive ridge and condition ≤ threshold afterwards;
    //   the identity has ridge 0.
    fn regularize_adds_ridge_only_when_needed() {
        // Arrange
        let bad = array![[1.0, 0.0], [0.0, 1e-14]];

        // Act
        let fixed = regularize(&bad, DEFAULT_MAX_CONDITION, None, 1.0).expect("repairable");
        let fine = regularize(&Array2::eye(2), DEFAULT_MAX_CONDITION, None, 1.0).expect("fine");

        // Assert
        assert!(fixed.ill_conditioned);
        assert!(fixed.ridge > 0.0);
        let after = condition_number(&fixed.matrix).unwrap();
        assert!(after <= DEFAULT_MAX_CONDITION * (1.0 + 1e-6));
        assert!(!fine.ill_conditioned);
        assert_eq!(fine.ridge, 0.0);
        assert!(matches!(
            regularize(&Array2::zeros((2, 2)), DEFAULT_MAX_CONDITION, None, 1.0),
            Err(InferenceError::IllConditionedCovariance { .. })
        ));
    }
}
