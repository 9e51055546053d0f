//! Binomial loss with a logit link and per-row trial counts.
//!
//! For successes `yᵢ` out of `nᵢ` trials and `η = Xβ`:
//! `L(β) = Σ nᵢ·softplus(ηᵢ) − yᵢηᵢ`, `∇L = Xᵀ(n∘π − y)` and
//! `∇²L = Xᵀ diag(nᵢπᵢ(1 − πᵢ)) X` with `π = logistic(η)`.
use crate::{
    families::{
        errors::FamilyResult,
        traits::{finite_loss, weighted_gram, LossFamily},
        validation::{
            select_entries, select_rows, validate_design, validate_support, validate_vector,
        },
    },
    optimization::numerical_stability::{safe_logistic, safe_softplus, GENERAL_TOL},
};
use ndarray::{Array1, Array2, Zip};

#[derive(Debug, Clone, PartialEq)]
pub struct Logistic {
    x: Array2<f64>,
    successes: Array1<f64>,
    trials: Array1<f64>,
}

impl Logistic {
    /// Build a binomial family. `trials = None` means one trial per row.
    ///
    /// # Errors
    /// - Shape and finiteness errors from validation.
    /// - `InvalidResponse` if a trial count is not positive or a success
    ///   count lies outside `[0, trials]`.
    pub fn new(
        x: Array2<f64>, successes: Array1<f64>, trials: Option<Array1<f64>>,
    ) -> FamilyResult<Self> {
        validate_design(&x)?;
        let n = x.nrows();
        validate_vector("successes", &successes, n)?;
        let trials = trials.unwrap_or_else(|| Array1::ones(n));
        validate_vector("trials", &trials, n)?;
        validate_support(&trials, |_, t| t > 0.0, "trial counts must be positive")?;
        validate_support(
            &successes,
            |i, y| y >= 0.0 && y <= trials[i],
            "successes must lie in [0, trials]",
        )?;
        Ok(Self { x, successes, trials })
    }

    pub fn successes(&self) -> &Array1<f64> {
        &self.successes
    }

    pub fn trials(&self) -> &Array1<f64> {
        &self.trials
    }
}

impl LossFamily for Logistic {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn design(&self) -> &Array2<f64> {
        &self.x
    }

    fn loss(&self, beta: &Array1<f64>) -> FamilyResult<f64> {
        let eta = self.linear_predictor(beta)?;
        let mut total = 0.0;
        Zip::from(&eta).and(&self.successes).and(&self.trials).for_each(|&e, &y, &n| {
            total += n * safe_softplus(e) - y * e;
        });
        finite_loss(total)
    }

    fn gradient(&self, beta: &Array1<f64>) -> FamilyResult<Array1<f64>> {
        let eta = self.linear_predictor(beta)?;
        let resid = &self.trials * &self.link(&eta) - &self.successes;
        Ok(self.x.t().dot(&resid))
    }

    fn information(&self, beta: &Array1<f64>) -> FamilyResult<Array2<f64>> {
        let pi = self.link(&self.linear_predictor(beta)?);
        let w = Zip::from(&pi).and(&self.trials).map_collect(|&p, &n| n * p * (1.0 - p));
        Ok(weighted_gram(&self.x, &w))
    }

    fn link(&self, eta: &Array1<f64>) -> Array1<f64> {
        eta.mapv(safe_logistic)
    }

    fn pearson_residuals(&self, beta: &Array1<f64>) -> FamilyResult<Option<Array1<f64>>> {
        let pi = self.link(&self.linear_predictor(beta)?);
        let r = Zip::from(&pi).and(&self.successes).and(&self.trials).map_collect(|&p, &y, &n| {
            let var = (n * p * (1.0 - p)).max(GENERAL_TOL);
            (y - n * p) / var.sqrt()
        });
        Ok(Some(r))
    }

    fn subset(&self, rows: &[usize]) -> FamilyResult<Self> {
        Ok(Self {
            x: select_rows(&self.x, rows)?,
            successes: select_entries(&self.successes, rows)?,
            trials: select_entries(&self.trials, rows)?,
        })
    }
}
