//! Poisson loss with a log link.
//!
//! `L(β) = Σ exp(ηᵢ) − yᵢηᵢ`, `∇L = Xᵀ(μ − y)`, `∇²L = Xᵀ diag(μ) X`
//! with `μ = exp(η)`, `η` clamped before exponentiation.
use crate::{
    families::{
        errors::FamilyResult,
        traits::{finite_loss, weighted_gram, LossFamily},
        validation::{
            select_entries, select_rows, validate_design, validate_support, validate_vector,
        },
    },
    optimization::numerical_stability::{safe_exp, GENERAL_TOL},
};
use ndarray::{Array1, Array2, Zip};

#[derive(Debug, Clone, PartialEq)]
pub struct Poisson {
    x: Array2<f64>,
    counts: Array1<f64>,
}

impl Poisson {
    /// # Errors
    /// - Shape and finiteness errors from validation.
    /// - `InvalidResponse` for negative counts.
    pub fn new(x: Array2<f64>, counts: Array1<f64>) -> FamilyResult<Self> {
        validate_design(&x)?;
        validate_vector("counts", &counts, x.nrows())?;
        validate_support(&counts, |_, c| c >= 0.0, "counts must be non-negative")?;
        Ok(Self { x, counts })
    }

    pub fn counts(&self) -> &Array1<f64> {
        &self.counts
    }
}

impl LossFamily for Poisson {
    fn name(&self) -> &'static str {
        "poisson"
    }

    fn design(&self) -> &Array2<f64> {
        &self.x
    }

    fn loss(&self, beta: &Array1<f64>) -> FamilyResult<f64> {
        let eta = self.linear_predictor(beta)?;
        let total =
            Zip::from(&eta).and(&self.counts).fold(0.0, |acc, &e, &y| acc + safe_exp(e) - y * e);
        finite_loss(total)
    }

    fn gradient(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        let mu = self.link(&self.linear_predictor(beta)?);
        Ok(self.x.t().dot(&(mu - &self.counts)))
    }

    fn information(&self, beta: &Array1<f64>) -> FamilyResult<Array2<f64>> {
        let mu = self.link(&self.linear_predictor(beta)?);
        Ok(weighted_gram(&self.x, &mu))
    }

    fn link(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(safe_exp)
    }

    fn pearson_residuals(&self, beta: &Array1<f64>) -> FamilyResult<Option<Array1<f64>>> {
        let mu = self.link(&self.linear_predictor(beta)?);
        let r = Zip::from(&mu)
            .and(&self.counts)
            .map_collect(|&m, &y| (y - m) / m.max(GENERAL_TOL).sqrt());
        Ok(Some(r))
    }

    fn subset(&self, rows: &[usize]) -> FamilyResult<Self> {
        Ok(Self { x: select_rows(&self.x, rows)?, counts: select_entries(&self.counts, rows)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Closed-form values at a point and the Pearson residual definition.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // With an intercept-only design and β = ln 2, μ = 2 for every row.
    //
    // Given
    // -----
    // - Counts (1, 3), X = 1.
    //
    // Expect
    // ------
    // - L = 4 − 4 ln 2, ∇L = 0, information = 4, residuals (∓1/√2).
    fn intercept_model_values() {
        // Arrange
        let fam = Poisson::new(array![[1.0], [1.0]], array![1.0, 3.0]).expect("valid");
        let beta = array![2f64.ln()];

        // Act
        let loss = fam.loss(&beta).expect("finite");
        let grad = fam.gradient(&beta).expect("finite");
        let info = fam.information(&beta).expect("finite");
        let r = fam.pearson_residuals(&beta).expect("finite").expect("defined");

        // Assert
        assert!((loss - (4.0 - 4.0 * 2f64.ln())).abs() < 1e-12);
        assert!(grad[0].abs() < 1e-12);
        assert!((info[[0, 0]] - 4.0).abs() < 1e-12);
        assert!((r[0] + 0.5f64.sqrt()).abs() < 1e-12);
        assert!((r[1] - 0.5f64.sqrt()).abs() < 1e-12);
    }
}
