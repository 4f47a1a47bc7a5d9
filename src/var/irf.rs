//! Moving-average representation, impulse responses, FEVD, and forecast MSE.
//!
//! - `Φ_0 = I`, `Φ_i = Σ_{j=1..min(i,p)} Φ_{i-j} A_j`
//! - orthogonalized responses `Θ_i = Φ_i P`, where `P` is the lower Cholesky
//!   factor of `Σu`
//! - h-step forecast MSE `Σ(h) = Σ_{i<h} Φ_i Σu Φ_i'`

use nalgebra::Matrix3;

use crate::domain::{
    FittedVar, ImpulseResponse, NUM_VARS, VarMatrix, VarianceDecomposition, Variable,
};
use crate::error::{VarError, VarResult};
use crate::math::{cholesky_lower, from_matrix, to_matrix};

impl FittedVar {
    /// `Φ_0..=Φ_periods`.
    pub fn ma_rep(&self, periods: usize) -> Vec<Matrix3<f64>> {
        let a: Vec<Matrix3<f64>> = self.coefs.iter().map(to_matrix).collect();
        let mut phis = Vec::with_capacity(periods + 1);
        phis.push(Matrix3::identity());
        for i in 1..=periods {
            let mut phi = Matrix3::zeros();
            for j in 1..=i.min(self.lag_order) {
                phi += phis[i - j] * a[j - 1];
            }
            phis.push(phi);
        }
        phis
    }

    /// `Θ_0..=Θ_periods`.
    pub fn orth_ma_rep(&self, periods: usize) -> VarResult<Vec<Matrix3<f64>>> {
        let p = cholesky_lower(&self.sigma_u).ok_or_else(|| {
            VarError::Estimation("residual covariance is not positive definite".to_string())
        })?;
        Ok(self.ma_rep(periods).into_iter().map(|phi| phi * p).collect())
    }

    /// Impulse responses for `0..=periods`.
    pub fn impulse_response(&self, periods: usize) -> VarResult<ImpulseResponse> {
        if periods == 0 {
            return Err(VarError::InvalidArgument("IRF periods must be at least 1".to_string()));
        }
        let irfs = self.ma_rep(periods).iter().map(from_matrix).collect();
        let orth_irfs = self.orth_ma_rep(periods)?.iter().map(from_matrix).collect();
        Ok(ImpulseResponse {
            variables: Variable::ALL.to_vec(),
            periods,
            irfs,
            orth_irfs,
        })
    }

    /// Share of each variable's h-step forecast error variance due to each
    /// orthogonalized shock, for `h = 1..=periods`.
    pub fn variance_decomposition(&self, periods: usize) -> VarResult<VarianceDecomposition> {
        if periods == 0 {
            return Err(VarError::InvalidArgument("FEVD periods must be at least 1".to_string()));
        }
        let theta = self.orth_ma_rep(periods)?;

        let mut decomp = vec![Vec::with_capacity(periods); NUM_VARS];
        let mut cumulative = Matrix3::<f64>::zeros();
        for th in theta.iter().take(periods) {
            cumulative += th.component_mul(th);
            for (j, var_rows) in decomp.iter_mut().enumerate() {
                let total: f64 = (0..NUM_VARS).map(|k| cumulative[(j, k)]).sum();
                let mut shares = [0.0; NUM_VARS];
                for (k, share) in shares.iter_mut().enumerate() {
                    *share = if total > 0.0 { cumulative[(j, k)] / total } else { f64::NAN };
                }
                var_rows.push(shares);
            }
        }

        Ok(VarianceDecomposition {
            variables: Variable::ALL.to_vec(),
            periods,
            decomp,
        })
    }

    /// `Σ(1)..=Σ(steps)`.
    pub fn forecast_mse(&self, steps: usize) -> Vec<VarMatrix> {
        let sigma = to_matrix(&self.sigma_u);
        let mut acc = Matrix3::<f64>::zeros();
        self.ma_rep(steps.saturating_sub(1))
            .iter()
            .take(steps)
            .map(|phi| {
                acc += phi * sigma * phi.transpose();
                from_matrix(&acc)
            })
            .collect()
    }
}
