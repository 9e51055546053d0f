//! loglik_optimizer::types — numeric aliases and pre-wired L-BFGS solvers.
//!
//! Everything in the optimizer speaks `Theta` / `Grad` / `Hessian` / `Cost`
//! so that the `ndarray` and `argmin` generics stay confined to this file.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` (for refits: the coefficients on the active set).
pub type Theta = Array1<f64>;

/// Gradient vector, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `dim × dim` second-derivative matrix.
pub type Hessian = Array2<f64>;

/// Scalar cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters keyed by argmin's counter names.
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
