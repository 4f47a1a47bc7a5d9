//! Multi-equation least squares solver.
//!
//! Every VAR equation shares the same design matrix `X` (intercept plus `p`
//! lags of all variables), so we solve all equations at once:
//!
//! ```text
//! minimize ||Y - X B||²    (Y: n × k, X: n × m, B: m × k)
//! ```
//!
//! Implementation choices:
//! - SVD least squares, which handles tall design matrices directly.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - An explicit rank check with a relative tolerance. A rank-deficient design
//!   is reported as `None` instead of silently returning a minimum-norm
//!   solution, because a VAR with collinear regressors is not identified.

use nalgebra::{Cholesky, DMatrix};

/// Solve `X B ≈ Y` for every column of `Y`.
///
/// Returns `None` if `X` is rank deficient or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if x.nrows() != y.nrows() || x.nrows() < x.ncols() {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    if !(max_sv.is_finite() && max_sv > 0.0) {
        return None;
    }

    let tol = max_sv * (x.nrows().max(x.ncols()) as f64) * f64::EPSILON;
    if svd.rank(tol) < x.ncols() {
        return None;
    }

    let beta = svd.solve(y, tol).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

/// `(X'X)^{-1}`, used for coefficient standard errors.
pub fn gram_inverse(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let xtx = x.transpose() * x;
    Cholesky::new(xtx).map(|c| c.inverse())
}
