//! Approximate forecast confidence bands.
//!
//! Two approximations are available:
//!
//! - `ResidualStd`: `point ± z · s_j`, where `s_j` is the sample standard
//!   deviation of residual column `j`. The band has the same width at every step.
//! - `ForecastMse`: `point ± z · sqrt(Σ(h)_jj)` with the analytic h-step forecast
//!   MSE, so the band widens with the horizon.
//!
//! `z` is the two-sided standard normal quantile for `confidence`.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::domain::{ForecastInterval, ForecastRow, ForecastTable, IntervalMethod, NUM_VARS, VarVector, Variable};
use crate::error::{VarError, VarResult};
use crate::math::sample_std;
use crate::var::VarModelBuilder;

/// Two-sided standard normal critical value.
pub fn z_score(confidence: f64) -> VarResult<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(VarError::InvalidArgument(format!(
            "confidence must be in (0, 1), got {confidence}"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| VarError::Estimation(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + confidence / 2.0))
}

/// Point forecast with symmetric bands.
pub fn forecast_intervals(
    builder: &VarModelBuilder,
    steps: usize,
    confidence: f64,
    method: IntervalMethod,
) -> VarResult<ForecastInterval> {
    let z = z_score(confidence)?;
    let model = builder.fitted()?;
    let point = builder.forecast(steps)?;

    let widths: Vec<VarVector> = match method {
        IntervalMethod::ResidualStd => {
            let mut std = [0.0; NUM_VARS];
            for var in Variable::ALL {
                let column: Vec<f64> = model.residuals.iter().map(|r| r[var.index()]).collect();
                std[var.index()] = sample_std(&column);
            }
            vec![std; steps]
        }
        IntervalMethod::ForecastMse => model
            .forecast_mse(steps)
            .iter()
            .map(|sigma| {
                let mut sd = [0.0; NUM_VARS];
                for (j, v) in sd.iter_mut().enumerate() {
                    *v = sigma[j][j].max(0.0).sqrt();
                }
                sd
            })
            .collect(),
    };

    let band = |sign: f64| ForecastTable {
        rows: point
            .rows
            .iter()
            .zip(&widths)
            .map(|(row, width)| {
                let mut values = row.values;
                for (v, w) in values.iter_mut().zip(width) {
                    *v += sign * z * w;
                }
                ForecastRow {
                    step: row.step,
                    values,
                }
            })
            .collect(),
    };
    let lower = band(-1.0);
    let upper = band(1.0);

    Ok(ForecastInterval {
        confidence,
        method,
        point,
        lower,
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var_table;

    fn fitted_builder() -> VarModelBuilder {
        let mut builder = VarModelBuilder::new(simulate_var_table(31, 180));
        builder.fit_model(Some(1)).unwrap();
        builder
    }

    #[test]
    fn z_scores_match_normal_table() {
        assert!((z_score(0.95).unwrap() - 1.959964).abs() < 1e-5);
        assert!((z_score(0.90).unwrap() - 1.644854).abs() < 1e-5);
        assert!(z_score(1.0).is_err());
        assert!(z_score(0.0).is_err());
        assert!(z_score(f64::NAN).is_err());
    }

    #[test]
    fn residual_std_bands_have_constant_width() {
        let builder = fitted_builder();
        let ci = forecast_intervals(&builder, 5, 0.95, IntervalMethod::ResidualStd).unwrap();
        let first = ci.upper.rows[0].values[0] - ci.lower.rows[0].values[0];
        for step in 0..5 {
            for var in 0..3 {
                assert!(ci.lower.rows[step].values[var] < ci.point.rows[step].values[var]);
                assert!(ci.upper.rows[step].values[var] > ci.point.rows[step].values[var]);
            }
            let width = ci.upper.rows[step].values[0] - ci.lower.rows[step].values[0];
            assert!((width - first).abs() < 1e-12);
        }
    }

    #[test]
    fn forecast_mse_bands_widen_with_horizon() {
        let builder = fitted_builder();
        let ci = forecast_intervals(&builder, 8, 0.9, IntervalMethod::ForecastMse).unwrap();
        for var in 0..3 {
            let widths: Vec<f64> = (0..8)
                .map(|s| ci.upper.rows[s].values[var] - ci.lower.rows[s].values[var])
                .collect();
            assert!(widths.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        }
        // One step ahead the band is z * sqrt(Σu_jj).
        let model = builder.model().unwrap();
        let expected = 2.0 * z_score(0.9).unwrap() * model.sigma_u[0][0].sqrt();
        let width = ci.upper.rows[0].values[0] - ci.lower.rows[0].values[0];
        assert!((width - expected).abs() < 1e-10);
    }

    #[test]
    fn invalid_confidence_is_rejected_before_fit_check() {
        let builder = VarModelBuilder::new(simulate_var_table(31, 60));
        assert!(matches!(
            forecast_intervals(&builder, 3, 1.5, IntervalMethod::ResidualStd),
            Err(VarError::InvalidArgument(_))
        ));
        assert_eq!(
            forecast_intervals(&builder, 3, 0.95, IntervalMethod::ResidualStd).unwrap_err(),
            VarError::NotFitted
        );
    }
}
