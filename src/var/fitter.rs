//! Least-squares estimation of a three-variable VAR(p).
//!
//! Given `T` rows `y_t` and a lag order `p`, each equation regresses the
//! current value on an intercept and `p` lags of all three variables:
//!
//! ```text
//! y_t = c + A_1 y_{t-1} + ... + A_p y_{t-p} + u_t,   t = p..T-1
//! ```
//!
//! All equations share one design matrix, so they are solved together. The
//! information criteria follow the usual VAR conventions, with
//! `n = T - p` effective observations and `Σu_mle = U'U / n`.

use std::f64::consts::PI;

use nalgebra::DMatrix;
use statrs::function::erf::erfc;
use tracing::debug;

use crate::domain::{
    FittedVar, InformationCriteria, LagSource, ModelDiagnostics, NUM_VARS, VarMatrix,
    VarSeriesTable, VarVector, Variable,
};
use crate::error::{VarError, VarResult};
use crate::math::{gram_inverse, log_det_spd, solve_least_squares};

/// Per-coefficient statistics for the model summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientStat {
    pub name: String,
    pub coef: f64,
    pub stderr: f64,
    pub tvalue: f64,
    pub pvalue: f64,
}

/// Fit a VAR(`lag_order`) over the full table.
pub fn fit_var(table: &VarSeriesTable, lag_order: usize, lag_source: LagSource) -> VarResult<FittedVar> {
    let data = table.values();
    let t = data.len();
    let p = lag_order;

    if p == 0 {
        return Err(VarError::Estimation("lag order must be at least 1".to_string()));
    }
    if p >= t {
        return Err(VarError::Estimation(format!(
            "lag order {p} is not below the number of observations ({t})"
        )));
    }

    let n = t - p;
    let df_model = regressors_per_equation(p);
    if n <= df_model {
        return Err(VarError::Estimation(format!(
            "VAR({p}) has {df_model} regressors per equation but only {n} usable observations"
        )));
    }

    let x = design_matrix(&data, p);
    let y = DMatrix::from_fn(n, NUM_VARS, |r, c| data[r + p][c]);

    let beta = solve_least_squares(&x, &y).ok_or_else(|| {
        VarError::Estimation(format!("VAR({p}) design matrix is rank deficient"))
    })?;

    let resid = &y - &x * &beta;
    let ssr = resid.transpose() * &resid;

    let mut sigma_u_mle = [[0.0; NUM_VARS]; NUM_VARS];
    let mut sigma_u = [[0.0; NUM_VARS]; NUM_VARS];
    for i in 0..NUM_VARS {
        for j in 0..NUM_VARS {
            sigma_u_mle[i][j] = ssr[(i, j)] / n as f64;
            sigma_u[i][j] = ssr[(i, j)] / (n - df_model) as f64;
        }
    }

    let ld = log_det_spd(&sigma_u_mle).ok_or_else(|| {
        VarError::Estimation(format!("VAR({p}) residual covariance is not positive definite"))
    })?;

    let criteria = information_criteria(ld, n, p);
    let log_likelihood = -(n as f64 / 2.0) * (NUM_VARS as f64 * (2.0 * PI).ln() + ld + NUM_VARS as f64);

    let xtx_inv = gram_inverse(&x)
        .ok_or_else(|| VarError::Estimation(format!("VAR({p}) normal equations are singular")))?;

    let mut intercept = [0.0; NUM_VARS];
    let mut coefs = vec![[[0.0; NUM_VARS]; NUM_VARS]; p];
    let mut stderr = vec![[0.0; NUM_VARS]; df_model];
    for eq in 0..NUM_VARS {
        intercept[eq] = beta[(0, eq)];
        for (l, lag_matrix) in coefs.iter_mut().enumerate() {
            for var in 0..NUM_VARS {
                lag_matrix[eq][var] = beta[(1 + l * NUM_VARS + var, eq)];
            }
        }
        for (r, row) in stderr.iter_mut().enumerate() {
            row[eq] = (xtx_inv[(r, r)] * sigma_u[eq][eq]).max(0.0).sqrt();
        }
    }

    let residuals = (0..n)
        .map(|r| [resid[(r, 0)], resid[(r, 1)], resid[(r, 2)]])
        .collect();

    debug!(lag = p, nobs = n, aic = criteria.aic, bic = criteria.bic, "fitted VAR");

    Ok(FittedVar {
        lag_order: p,
        lag_source,
        nobs: n,
        intercept,
        coefs,
        stderr,
        sigma_u,
        sigma_u_mle,
        residuals,
        log_likelihood,
        criteria,
    })
}

/// Intercept plus `p` lags of every variable.
pub fn regressors_per_equation(lag_order: usize) -> usize {
    1 + NUM_VARS * lag_order
}

/// Free parameters of the whole system: `p · k² + k`.
pub fn free_parameters(lag_order: usize) -> usize {
    lag_order * NUM_VARS * NUM_VARS + NUM_VARS
}

/// AIC / BIC / FPE / HQIC from `ln det Σu_mle`.
pub fn information_criteria(log_det_sigma_mle: f64, nobs: usize, lag_order: usize) -> InformationCriteria {
    let n = nobs as f64;
    let free = free_parameters(lag_order) as f64;
    let df_model = regressors_per_equation(lag_order) as f64;
    let k = NUM_VARS as i32;

    InformationCriteria {
        aic: log_det_sigma_mle + 2.0 * free / n,
        bic: log_det_sigma_mle + n.ln() * free / n,
        hqic: log_det_sigma_mle + 2.0 * n.ln().ln() * free / n,
        fpe: ((n + df_model) / (n - df_model)).powi(k) * log_det_sigma_mle.exp(),
    }
}

fn design_matrix(data: &[VarVector], p: usize) -> DMatrix<f64> {
    let n = data.len() - p;
    let m = regressors_per_equation(p);
    DMatrix::from_fn(n, m, |r, c| {
        if c == 0 {
            return 1.0;
        }
        let lag = (c - 1) / NUM_VARS + 1;
        let var = (c - 1) % NUM_VARS;
        data[r + p - lag][var]
    })
}

impl FittedVar {
    /// Diagnostics snapshot; `num_params = p · k² + k`.
    pub fn diagnostics(&self) -> ModelDiagnostics {
        ModelDiagnostics {
            lag_order: self.lag_order,
            log_likelihood: self.log_likelihood,
            aic: self.criteria.aic,
            bic: self.criteria.bic,
            fpe: self.criteria.fpe,
            hqic: self.criteria.hqic,
            num_obs: self.nobs,
            num_params: free_parameters(self.lag_order),
        }
    }

    /// Lag-`lag` coefficient matrix (1-based lag).
    pub fn lag_matrix(&self, lag: usize) -> Option<&VarMatrix> {
        lag.checked_sub(1).and_then(|l| self.coefs.get(l))
    }

    /// Regressor names in design-matrix order (`const`, `L1.gdp_growth`, ...).
    pub fn regressor_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(regressors_per_equation(self.lag_order));
        names.push("const".to_string());
        for lag in 1..=self.lag_order {
            for var in Variable::ALL {
                names.push(format!("L{lag}.{}", var.column_name()));
            }
        }
        names
    }

    /// Coefficient of regressor row `r` in equation `eq` (row 0 is the intercept).
    pub fn coefficient(&self, r: usize, eq: Variable) -> f64 {
        if r == 0 {
            return self.intercept[eq.index()];
        }
        let l = (r - 1) / NUM_VARS;
        let var = (r - 1) % NUM_VARS;
        self.coefs[l][eq.index()][var]
    }

    /// Estimates with standard errors, t-statistics, and two-sided normal p-values.
    pub fn coefficient_stats(&self, eq: Variable) -> Vec<CoefficientStat> {
        self.regressor_names()
            .into_iter()
            .enumerate()
            .map(|(r, name)| {
                let coef = self.coefficient(r, eq);
                let stderr = self.stderr.get(r).map(|row| row[eq.index()]).unwrap_or(f64::NAN);
                let tvalue = coef / stderr;
                let pvalue = if tvalue.is_finite() {
                    erfc(tvalue.abs() / std::f64::consts::SQRT_2)
                } else {
                    f64::NAN
                };
                CoefficientStat {
                    name,
                    coef,
                    stderr,
                    tvalue,
                    pvalue,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var_table;

    #[test]
    fn recovers_known_coefficients() {
        let table = simulate_var_table(7, 2000);
        let fit = fit_var(&table, 1, LagSource::Explicit).unwrap();
        let truth = crate::data::sample::TRUE_A1;
        for eq in 0..NUM_VARS {
            for var in 0..NUM_VARS {
                let est = fit.coefs[0][eq][var];
                assert!(
                    (est - truth[eq][var]).abs() < 0.1,
                    "A1[{eq}][{var}] estimated {est}, true {}",
                    truth[eq][var]
                );
            }
        }
    }

    #[test]
    fn shapes_and_counts() {
        let table = simulate_var_table(1, 120);
        let fit = fit_var(&table, 3, LagSource::Explicit).unwrap();
        assert_eq!(fit.nobs, 117);
        assert_eq!(fit.coefs.len(), 3);
        assert_eq!(fit.residuals.len(), 117);
        assert_eq!(fit.stderr.len(), 10);
        assert_eq!(fit.regressor_names().len(), 10);
        assert_eq!(fit.regressor_names()[4], "L2.gdp_growth");
        assert_eq!(fit.diagnostics().num_params, 3 * 9 + 3);
    }

    #[test]
    fn residuals_are_centered_with_intercept() {
        let table = simulate_var_table(3, 150);
        let fit = fit_var(&table, 2, LagSource::Explicit).unwrap();
        for var in 0..NUM_VARS {
            let mean = fit.residuals.iter().map(|r| r[var]).sum::<f64>() / fit.nobs as f64;
            assert!(mean.abs() < 1e-9, "residual mean {mean}");
        }
    }

    #[test]
    fn criteria_are_consistent_with_log_det() {
        let table = simulate_var_table(5, 100);
        let fit = fit_var(&table, 2, LagSource::Explicit).unwrap();
        let ld = log_det_spd(&fit.sigma_u_mle).unwrap();
        let n = fit.nobs as f64;
        assert!((fit.criteria.aic - (ld + 2.0 * 21.0 / n)).abs() < 1e-10);
        assert!(fit.criteria.bic > fit.criteria.aic);
        let expected_llf = -(n / 2.0) * (3.0 * (2.0 * PI).ln() + ld + 3.0);
        assert!((fit.log_likelihood - expected_llf).abs() < 1e-8);
    }

    #[test]
    fn degenerate_lag_orders_fail() {
        let table = simulate_var_table(1, 10);
        assert!(matches!(fit_var(&table, 0, LagSource::Explicit), Err(VarError::Estimation(_))));
        assert!(matches!(fit_var(&table, 10, LagSource::Explicit), Err(VarError::Estimation(_))));
        assert!(matches!(fit_var(&table, 25, LagSource::Explicit), Err(VarError::Estimation(_))));
        // 10 rows, p=3: n=7 <= 10 regressors.
        assert!(matches!(fit_var(&table, 3, LagSource::Explicit), Err(VarError::Estimation(_))));
    }

    #[test]
    fn constant_series_is_rank_deficient() {
        let rows = (0..40)
            .map(|i| crate::domain::VarRow {
                month: format!("m{i}"),
                values: [1.0, 0.5, (i as f64 * 0.7).sin()],
            })
            .collect();
        let err = fit_var(&VarSeriesTable::new(rows), 1, LagSource::Explicit).unwrap_err();
        assert!(matches!(err, VarError::Estimation(_)));
    }

    #[test]
    fn pvalues_are_probabilities() {
        let table = simulate_var_table(11, 200);
        let fit = fit_var(&table, 1, LagSource::Explicit).unwrap();
        for var in Variable::ALL {
            for stat in fit.coefficient_stats(var) {
                assert!(stat.stderr > 0.0);
                assert!((0.0..=1.0).contains(&stat.pvalue), "{stat:?}");
            }
        }
    }
}
