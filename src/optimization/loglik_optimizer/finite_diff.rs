//! loglik_optimizer::finite_diff — Hessians by differencing a gradient.
//!
//! Purpose
//! -------
//! Turn an analytic (possibly fallible) gradient into a validated,
//! symmetric second-derivative matrix. Loss families without a closed-form
//! information matrix (Cox partial likelihood) get theirs from here.
//!
//! Key behaviors
//! -------------
//! - Central differences first; forward differences when the central
//!   matrix fails validation or a gradient evaluation failed.
//! - Errors raised by the gradient inside the `finitediff` closure are
//!   captured and re-raised after differencing.
//! - The returned matrix is symmetrized in place.
//!
//! Invariants & assumptions
//! ------------------------
//! - The gradient has the same length as `theta`.
//! - Returned Hessians satisfy `validate_hessian(h, theta.len())`.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        types::Hessian,
        validation::{validate_grad, validate_hessian},
        Grad, Theta,
    },
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Finite-difference Jacobian of a fallible gradient map.
///
/// Parameters
/// ----------
/// - `grad`: `θ ↦ ∇f(θ)`; errors are captured and returned.
/// - `theta`: evaluation point.
///
/// Errors
/// ------
/// - The first error raised by `grad` during differencing.
/// - [`OptError::InvalidHessian`] when both difference schemes produce
///   non-finite entries.
pub fn compute_hessian<G>(grad: &G, theta: &Theta) -> OptResult<Hessian>
where
    G: Fn(&Theta) -> OptResult<Grad>,
{
    let dim = theta.len();
    let failure: RefCell<Option<OptError>> = RefCell::new(None);
    let wrapped = |t: &Theta| -> Grad {
        match grad(t).and_then(|g| validate_grad(&g, dim).map(|_| g)) {
            Ok(g) => g,
            Err(e) => {
                failure.borrow_mut().get_or_insert(e);
                Grad::from_elem(dim, f64::NAN)
            }
        }
    };

    let mut hess = theta.central_hessian(&wrapped);
    if failure.borrow().is_some() || validate_hessian(&hess, dim).is_err() {
        failure.replace(None);
        hess = theta.forward_hessian(&wrapped);
        if let Some(err) = failure.take() {
            return Err(err);
        }
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
