//! Cox proportional-hazards partial likelihood (Breslow ties).
//!
//! For event indicators `δᵢ`, times `tᵢ` and risk sets
//! `Rᵢ = { j : tⱼ ≥ tᵢ }`:
//!
//! `L(β) = −Σ_{δᵢ=1} [ ηᵢ − ln Σ_{j∈Rᵢ} exp(ηⱼ) ]`.
//!
//! Risk-set sums are accumulated in one pass over rows sorted by
//! decreasing time, with exponentials shifted by `max η`. The information
//! matrix comes from the finite-difference default of [`LossFamily`].
use crate::families::{
    errors::FamilyResult,
    traits::{finite_loss, LossFamily},
    validation::{select_entries, select_rows, validate_design, validate_support, validate_vector},
};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct Cox {
    x: Array2<f64>,
    times: Array1<f64>,
    status: Array1<f64>,
    order: Vec<usize>,
}

/// Per-event quantities of one pass over the risk sets.
struct RiskPass {
    loss: f64,
    gradient: Array1<f64>,
}

impl Cox {
    /// # Errors
    /// - Shape and finiteness errors from validation.
    /// - `InvalidResponse` for non-positive times or a status outside {0, 1}.
    pub fn new(x: Array2<f64>, times: Array1<f64>, status: Array1<f64>) -> FamilyResult<Self> {
        validate_design(&x)?;
        validate_vector("times", &times, x.nrows())?;
        validate_vector("status", &status, x.nrows())?;
        validate_support(&times, |_, t| t > 0.0, "survival times must be positive")?;
        validate_support(&status, |_, s| s == 0.0 || s == 1.0, "status must be 0 or 1")?;
        let order = descending_order(&times);
        Ok(Self { x, times, status, order })
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    pub fn status(&self) -> &Array1<f64> {
        &self.status
    }

    fn risk_pass(&self, beta: &Array1<f64>) -> FamilyResult<RiskPass> {
        let eta = self.linear_predictor(beta)?;
        let shift = eta.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let p = self.nfeatures();

        let mut risk = 0.0;
        let mut risk_x = Array1::<f64>::zeros(p);
        let mut loss = 0.0;
        let mut gradient = Array1::<f64>::zeros(p);

        let mut start = 0;
        while start < self.order.len() {
            let t = self.times[self.order[start]];
            let mut end = start;
            while end < self.order.len() && self.times[self.order[end]] == t {
                let j = self.order[end];
                let w = (eta[j] - shift).exp();
                risk += w;
                risk_x.scaled_add(w, &self.x.row(j));
                end += 1;
            }
            for &i in &self.order[start..end] {
                if self.status[i] == 1.0 {
                    loss -= eta[i] - shift - risk.ln();
                    gradient -= &self.x.row(i);
                    gradient.scaled_add(1.0 / risk, &risk_x);
                }
            }
            start = end;
        }
        Ok(RiskPass { loss: finite_loss(loss)?, gradient })
    }
}

fn descending_order(times: &Array1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[b].total_cmp(&times[a]));
    order
}

impl LossFamily for Cox {
    fn name(&self) -> &'static str {
        "cox"
    }

    fn design(&self) -> &Array2<f64> {
        &self.x
    }

    fn loss(&self, beta: &Array1<f64>) -> FamilyResult<f64> {
        Ok(self.risk_pass(beta)?.loss)
    }

    fn gradient(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        Ok(self.risk_pass(beta)?.gradient)
    }

    fn link(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(f64::exp)
    }

    fn subset(&self, rows: &[usize]) -> FamilyResult<Self> {
        let times = select_entries(&self.times, rows)?;
        let order = descending_order(&times);
        let status = select_entries(&self.status, rows)?;
        Ok(Self { x: select_rows(&self.x, rows)?, times, status, order })
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
    // Partial likelihood at β = 0 (pure risk-set counting), tie handling,
    // the FD information default, and input validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // At β = 0 the loss is Σ_events ln |Rᵢ|; ties share the full risk set.
    //
    // Given
    // -----
    // - Times (1, 2, 2, 3), all events.
    //
    // Expect
    // ------
    // - Risk set sizes 4, 3, 3, 1, so L = ln 4 + 2 ln 3.
    fn loss_at_zero_counts_risk_sets_with_breslow_ties() {
        // Arrange
        let x = array![[0.1], [0.2], [-0.3], [0.4]];
        let fam =
            Cox::new(x, array![1.0, 2.0, 2.0, 3.0], array![1.0, 1.0, 1.0, 1.0]).expect("valid");

        // Act
        let loss = fam.loss(&array![0.0]).expect("finite");

        // Assert
        assert!((loss - (4f64.ln() + 2.0 * 3f64.ln())).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient agrees with a central difference of the loss,
    // and the FD information is positive.
    //
    // Given
    // -----
    // - Five rows, two censored, β = (0.4, −0.2).
    //
    // Expect
    // ------
    // - Gradient agreement to 1e-6; positive diagonal information.
    fn gradient_matches_central_difference() {
        // Arrange
        let x = array![[0.5, 1.0], [-1.0, 0.3], [0.2, -0.4], [1.5, 0.0], [-0.3, 0.8]];
        let fam = Cox::new(x, array![2.0, 1.0, 4.0, 3.0, 5.0], array![1.0, 0.0, 1.0, 1.0, 0.0])
            .expect("valid");
        let beta = array![0.4, -0.2];
        let h = 1e-6;

        // Act
        let grad = fam.gradient(&beta).expect("finite");
        let info = fam.information(&beta).expect("fd information");

        // Assert
        for k in 0..2 {
            let mut up = beta.clone();
            let mut down = beta.clone();
            up[k] += h;
            down[k] -= h;
            let fd = (fam.loss(&up).unwrap() - fam.loss(&down).unwrap()) / (2.0 * h);
            assert!((grad[k] - fd).abs() < 1e-6, "coordinate {k}: {} vs {fd}", grad[k]);
            assert!(info[[k, k]] > 0.0);
        }
    }

    #[test]
    // Purpose
    // -------
    // Status must be binary.
    //
    // Given
    // -----
    // - status = (1, 2).
    //
    // Expect
    // ------
    // - `InvalidResponse { index: 1 }`.
    fn status_must_be_binary() {
        // Act
        let err = Cox::new(array![[1.0], [2.0]], array![1.0, 2.0], array![1.0, 2.0])
            .expect_err("bad status");

        // Assert
        assert!(matches!(err, FamilyError::InvalidResponse { index: 1, .. }));
    }
}
