//! Conversions between the serializable `VarMatrix` arrays and `nalgebra`
//! fixed-size matrices, plus Cholesky-based helpers for covariance matrices.

use nalgebra::{Cholesky, Matrix3, Vector3};

use crate::domain::{VarMatrix, VarVector};

pub fn to_matrix(m: &VarMatrix) -> Matrix3<f64> {
    Matrix3::from_fn(|i, j| m[i][j])
}

pub fn from_matrix(m: &Matrix3<f64>) -> VarMatrix {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = m[(i, j)];
        }
    }
    out
}

pub fn to_vector(v: &VarVector) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

pub fn from_vector(v: &Vector3<f64>) -> VarVector {
    [v[0], v[1], v[2]]
}

/// Lower Cholesky factor `P` with `P P' = m`; `None` if `m` is not positive definite.
pub fn cholesky_lower(m: &VarMatrix) -> Option<Matrix3<f64>> {
    Cholesky::new(to_matrix(m)).map(|c| c.l())
}

/// `ln det m` for a symmetric positive-definite matrix.
pub fn log_det_spd(m: &VarMatrix) -> Option<f64> {
    let l = cholesky_lower(m)?;
    let ld = 2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>();
    ld.is_finite().then_some(ld)
}

/// Correlation matrix implied by a covariance matrix.
pub fn covariance_to_correlation(cov: &VarMatrix) -> VarMatrix {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let denom = (cov[i][i] * cov[j][j]).sqrt();
            out[i][j] = if denom > 0.0 { cov[i][j] / denom } else { f64::NAN };
        }
    }
    out
}
