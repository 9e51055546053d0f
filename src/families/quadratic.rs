//! Identity quadratic perturbation added to a penalized objective.
//!
//! `q(β) = (c/2)‖β − center‖² + linearᵀβ + constant`. Randomized or
//! ridge-stabilized fits add `q` to the loss; the KKT conditions, the
//! one-step estimator and the selection polyhedron all account for it.
use crate::families::{
    errors::{FamilyError, FamilyResult},
    validation::validate_vector,
};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityQuadratic {
    coef: f64,
    center: Array1<f64>,
    linear: Array1<f64>,
    constant: f64,
}

impl IdentityQuadratic {
    /// # Errors
    /// - `InvalidQuadratic` when `coef` is negative or non-finite, or the
    ///   constant is non-finite.
    /// - `DimensionMismatch` / `NonFiniteValue` when `center` and `linear`
    ///   disagree in length or contain non-finite entries.
    pub fn new(
        coef: f64, center: Array1<f64>, linear: Array1<f64>, constant: f64,
    ) -> FamilyResult<Self> {
        if !coef.is_finite() || coef < 0.0 {
            return Err(FamilyError::InvalidQuadratic {
                value: coef,
                reason: "coefficient must be finite and non-negative",
            });
        }
        if !constant.is_finite() {
            return Err(FamilyError::InvalidQuadratic {
                value: constant,
                reason: "constant must be finite",
            });
        }
        validate_vector("quadratic center", &center, center.len())?;
        validate_vector("quadratic linear term", &linear, center.len())?;
        Ok(Self { coef, center, linear, constant })
    }

    /// Pure ridge term `(c/2)‖β‖²` in dimension `p`.
    pub fn ridge(coef: f64, p: usize) -> FamilyResult<Self> {
        Self::new(coef, Array1::zeros(p), Array1::zeros(p), 0.0)
    }

    /// Pure linear term `linearᵀβ`.
    pub fn linear(linear: Array1<f64>) -> FamilyResult<Self> {
        let p = linear.len();
        Self::new(0.0, Array1::zeros(p), linear, 0.0)
    }

    pub fn coef(&self) -> f64 {
        self.coef
    }

    pub fn dim(&self) -> usize {
        self.center.len()
    }

    pub fn value(&self, beta: &Array1<f64>) -> f64 {
        let d = beta - &self.center;
        0.5 * self.coef * d.dot(&d) + self.linear.dot(beta) + self.constant
    }

    pub fn gradient(&self, beta: &Array1<f64>) -> Array1<f64> {
        (beta - &self.center) * self.coef + &self.linear
    }

    /// Add `c·I` to a Hessian in place.
    pub fn add_curvature(&self, hessian: &mut Array2<f64>) {
        hessian.diag_mut().map_inplace(|h| *h += self.coef);
    }
}
