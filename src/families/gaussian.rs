//! Gaussian (squared-error) loss with a known noise level.
//!
//! `L(β) = ‖y − Xβ‖² / (2σ²)`, so `∇L = Xᵀ(Xβ − y)/σ²` and the information
//! matrix `XᵀX/σ²` does not depend on `β`. Pearson residuals are
//! `(y − Xβ)/σ`; their mean square estimates `σ_true² / σ²`.
use crate::families::{
    errors::FamilyResult,
    traits::{finite_loss, LossFamily},
    validation::{select_entries, select_rows, validate_design, validate_sigma, validate_vector},
};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian {
    x: Array2<f64>,
    y: Array1<f64>,
    sigma: f64,
}

impl Gaussian {
    /// # Errors
    /// - `EmptyDesign` / `NonFiniteValue` for a bad design or response.
    /// - `DimensionMismatch` when `y.len() != x.nrows()`.
    /// - `InvalidSigma` unless `sigma` is finite and `> 0`.
    pub fn new(x: Array2<f64>, y: Array1<f64>, sigma: f64) -> FamilyResult<Self> {
        validate_design(&x)?;
        validate_vector("response", &y, x.nrows())?;
        validate_sigma(sigma)?;
        Ok(Self { x, y, sigma })
    }

    pub fn response(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Same data under a different assumed noise level.
    pub fn with_sigma(&self, sigma: f64) -> FamilyResult<Self> {
        validate_sigma(sigma)?;
        Ok(Self { sigma, ..self.clone() })
    }

    fn residuals(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        Ok(&self.y - &self.linear_predictor(beta)?)
    }
}

impl LossFamily for Gaussian {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn design(&self) -> &Array2<f64> {
        &self.x
    }

    fn loss(&self, beta: &Array1<f64>) -> FamilyResult<f64> {
        let r = self.residuals(beta)?;
        finite_loss(0.5 * r.dot(&r) / (self.sigma * self.sigma))
    }

    fn gradient(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        let r = self.residuals(beta)?;
        Ok(self.x.t().dot(&r) * (-1.0 / (self.sigma * self.sigma)))
    }

    fn information(&self, _beta: &Array1<f64>) -> FamilyResult<Array2<f64>> {
        Ok(self.x.t().dot(&self.x) / (self.sigma * self.sigma))
    }

    fn link(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.clone()
    }

    fn pearson_residuals(&self, beta: &Array1<f64>) -> FamilyResult<Option<Array1<f64>>> {
        Ok(Some(self.residuals(beta)? / self.sigma))
    }

    fn scale(&self) -> f64 {
        self.sigma * self.sigma
    }

    fn subset(&self, rows: &[usize]) -> FamilyResult<Self> {
        let y = select_entries(&self.y, rows)?;
        Ok(Self { x: select_rows(&self.x, rows)?, y, sigma: self.sigma })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::errors::FamilyError;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Loss, gradient and information against hand computations; agreement
    // of the analytic information with the finite-difference default;
    // subsetting; constructor validation.
    // -------------------------------------------------------------------------

    fn small() -> Gaussian {
        let x = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let y = array![1.0, 2.0, 0.5];
        Gaussian::new(x, y, 2.0).expect("valid data")
    }

    #[test]
    // Purpose
    // -------
    // Loss and gradient carry the 1/σ² scaling.
    //
    // Given
    // -----
    // - σ = 2 and β = 0.
    //
    // Expect
    // ------
    // - L = ‖y‖²/8 and ∇L = −Xᵀy/4.
    fn loss_and_gradient_scale_with_sigma() {
        // Arrange
        let fam = small();
        let beta = Array1::zeros(2);

        // Act
        let loss = fam.loss(&beta).expect("finite");
        let grad = fam.gradient(&beta).expect("finite");

        // Assert
        assert!((loss - 5.25 / 8.0).abs() < 1e-12);
        assert!((grad[0] + 1.5 / 4.0).abs() < 1e-12);
        assert!((grad[1] + 4.5 / 4.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The closed-form information equals the finite-difference Jacobian of
    // the gradient produced by the trait default.
    //
    // Given
    // -----
    // - A wrapper that forwards everything except `information`.
    //
    // Expect
    // ------
    // - Entrywise agreement to 1e-6.
    fn analytic_information_matches_finite_difference_default() {
        #[derive(Clone)]
        struct NoHessian(Gaussian);
        impl LossFamily for NoHessian {
            fn name(&self) -> &'static str {
                "fd"
            }
            fn design(&self) -> &Array2<f64> {
                self.0.design()
            }
            fn loss(&self, b: &Array1<f64>) -> FamilyResult<f64> {
                self.0.loss(b)
            }
            fn gradient(&self, b: &Array1<f64>) -> FamilyResult<Array1<f64>> {
                self.0.gradient(b)
            }
            fn link(&self, eta: &Array1<f64>) -> Array1<f64> {
                eta.clone()
            }
            fn subset(&self, rows: &[usize]) -> FamilyResult<Self> {
                Ok(NoHessian(self.0.subset(rows)?))
            }
        }

        // Arrange
        let fam = small();
        let beta = array![0.3, -0.7];

        // Act
        let exact = fam.information(&beta).expect("closed form");
        let fd = NoHessian(fam).information(&beta).expect("finite differences");

        // Assert
        for (a, b) in exact.iter().zip(fd.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Subsetting keeps σ and copies rows; construction validates σ.
    //
    // Given
    // -----
    // - Rows [2, 2] and σ = −1.
    //
    // Expect
    // ------
    // - Two identical rows; `InvalidSigma`.
    fn subset_keeps_sigma_and_constructor_checks_it() {
        // Arrange
        let fam = small();

        // Act
        let sub = fam.subset(&[2, 2]).expect("valid rows");
        let err = Gaussian::new(array![[1.0]], array![1.0], -1.0).expect_err("bad sigma");

        // Assert
        assert_eq!(sub.nobs(), 2);
        assert_eq!(sub.sigma(), 2.0);
        assert_eq!(sub.response(), &array![0.5, 0.5]);
        assert_eq!(err, FamilyError::InvalidSigma { value: -1.0 });
    }
}
