//! Batches of point forecasts: several horizons, shocked scenarios, and
//! quarterly averages.

use serde::Serialize;
use tracing::debug;

use crate::domain::{ForecastRow, ForecastTable, NUM_VARS, Scenario, Variable};
use crate::error::{VarError, VarResult};
use crate::var::VarModelBuilder;

/// Forecast for one horizon of a multi-horizon batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonForecast {
    pub horizon: usize,
    pub forecast: ForecastTable,
}

/// Forecast for one shocked scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioForecast {
    pub name: String,
    pub shocks: Vec<(Variable, f64)>,
    pub forecast: ForecastTable,
}

impl ScenarioForecast {
    /// Scenario minus base, per step.
    pub fn deltas(&self, base: &ForecastTable) -> Vec<[f64; NUM_VARS]> {
        self.forecast
            .rows
            .iter()
            .zip(&base.rows)
            .map(|(s, b)| {
                let mut d = [0.0; NUM_VARS];
                for (i, v) in d.iter_mut().enumerate() {
                    *v = s.values[i] - b.values[i];
                }
                d
            })
            .collect()
    }
}

/// Base forecast plus one forecast per scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub base: ForecastTable,
    pub scenarios: Vec<ScenarioForecast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Monthly,
    Quarterly,
}

/// A forecast table labelled with its period length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub periodicity: Periodicity,
    /// `step` is the month or the quarter number (1-based).
    pub table: ForecastTable,
}

/// One forecast per horizon, in the order given.
pub fn multi_step_forecast(
    builder: &VarModelBuilder,
    horizons: &[usize],
) -> VarResult<Vec<HorizonForecast>> {
    if horizons.is_empty() {
        return Err(VarError::InvalidArgument("at least one horizon is required".to_string()));
    }
    horizons
        .iter()
        .map(|&horizon| {
            let forecast = builder.forecast(horizon)?;
            debug!(horizon, "horizon forecast complete");
            Ok(HorizonForecast { horizon, forecast })
        })
        .collect()
}

/// Forecast each scenario by shocking the last observed row.
///
/// Shocks are added to the final row of the history and the recursion is
/// re-seeded from the shocked history. Coefficients are not re-estimated.
pub fn compare_scenarios(
    builder: &VarModelBuilder,
    scenarios: &[Scenario],
    steps: usize,
) -> VarResult<ScenarioComparison> {
    let model = builder.fitted()?;
    let base = builder.forecast(steps)?;
    let history = builder.data().values();

    let mut out = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        if scenario.name.trim().is_empty() {
            return Err(VarError::InvalidArgument("scenario name must not be empty".to_string()));
        }
        let mut shocked = history.clone();
        let last = shocked.last_mut().ok_or_else(|| {
            VarError::InsufficientData("no observations to shock".to_string())
        })?;
        for &(var, shock) in &scenario.shocks {
            last[var.index()] += shock;
        }
        let forecast = model.forecast_from(&shocked, steps)?;
        debug!(scenario = %scenario.name, shocks = scenario.shocks.len(), "scenario forecast complete");
        out.push(ScenarioForecast {
            name: scenario.name.clone(),
            shocks: scenario.shocks.clone(),
            forecast,
        });
    }

    Ok(ScenarioComparison {
        base,
        scenarios: out,
    })
}

/// Mean of consecutive 3-month blocks; tables shorter than 3 rows are kept monthly.
pub fn quarterly_summary(forecast: &ForecastTable) -> PeriodSummary {
    if forecast.rows.len() < 3 {
        return PeriodSummary {
            periodicity: Periodicity::Monthly,
            table: forecast.clone(),
        };
    }

    let rows = forecast
        .rows
        .chunks(3)
        .enumerate()
        .map(|(q, chunk)| {
            let mut values = [0.0; NUM_VARS];
            for row in chunk {
                for (acc, v) in values.iter_mut().zip(row.values) {
                    *acc += v;
                }
            }
            for v in &mut values {
                *v /= chunk.len() as f64;
            }
            ForecastRow { step: q + 1, values }
        })
        .collect();

    PeriodSummary {
        periodicity: Periodicity::Quarterly,
        table: ForecastTable { rows },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var_table;

    fn fitted_builder() -> VarModelBuilder {
        let mut builder = VarModelBuilder::new(simulate_var_table(12, 160));
        builder.fit_model(Some(2)).unwrap();
        builder
    }

    #[test]
    fn horizons_come_back_in_order() {
        let builder = fitted_builder();
        let batch = multi_step_forecast(&builder, &[12, 24, 36]).unwrap();
        assert_eq!(batch.iter().map(|h| h.horizon).collect::<Vec<_>>(), vec![12, 24, 36]);
        assert_eq!(batch[2].forecast.steps(), 36);
        // Shorter horizons are prefixes of longer ones.
        assert_eq!(batch[0].forecast.rows[..], batch[1].forecast.rows[..12]);
        assert!(multi_step_forecast(&builder, &[]).is_err());
        assert!(multi_step_forecast(&builder, &[6, 0]).is_err());
    }

    #[test]
    fn scenarios_move_the_forecast() {
        let builder = fitted_builder();
        let comparison = compare_scenarios(&builder, &Scenario::defaults(), 6).unwrap();
        assert_eq!(comparison.scenarios.len(), 3);
        assert_eq!(comparison.base, builder.forecast(6).unwrap());

        for scenario in &comparison.scenarios {
            assert_ne!(scenario.forecast, comparison.base, "{} was a no-op", scenario.name);
        }

        // With a zero shock the scenario equals the base.
        let flat = Scenario {
            name: "flat".to_string(),
            shocks: vec![(Variable::CpiChange, 0.0)],
        };
        let comparison = compare_scenarios(&builder, &[flat], 6).unwrap();
        assert_eq!(comparison.scenarios[0].forecast, comparison.base);
        assert!(comparison.scenarios[0].deltas(&comparison.base).iter().all(|d| d == &[0.0; 3]));
    }

    #[test]
    fn one_step_delta_is_linear_in_the_shock() {
        let builder = fitted_builder();
        let a1 = builder.model().unwrap().coefs[0];
        let shock = Scenario {
            name: "spread".to_string(),
            shocks: vec![(Variable::YieldSpread, -1.0)],
        };
        let comparison = compare_scenarios(&builder, &[shock], 1).unwrap();
        let delta = comparison.scenarios[0].deltas(&comparison.base)[0];
        for eq in 0..3 {
            assert!((delta[eq] + a1[eq][2]).abs() < 1e-10);
        }
    }

    #[test]
    fn scenarios_need_a_fitted_model() {
        let builder = VarModelBuilder::new(simulate_var_table(12, 60));
        assert_eq!(
            compare_scenarios(&builder, &Scenario::defaults(), 3).unwrap_err(),
            VarError::NotFitted
        );
    }

    #[test]
    fn quarterly_means_of_three_month_blocks() {
        let rows = (1..=7)
            .map(|step| ForecastRow {
                step,
                values: [step as f64, 2.0 * step as f64, 0.0],
            })
            .collect();
        let summary = quarterly_summary(&ForecastTable { rows });
        assert_eq!(summary.periodicity, Periodicity::Quarterly);
        assert_eq!(summary.table.steps(), 3);
        assert_eq!(summary.table.rows[0].values, [2.0, 4.0, 0.0]);
        assert_eq!(summary.table.rows[1].values, [5.0, 10.0, 0.0]);
        // Partial final quarter averages what it has.
        assert_eq!(summary.table.rows[2].values, [7.0, 14.0, 0.0]);
        assert_eq!(summary.table.rows[2].step, 3);
    }

    #[test]
    fn short_tables_stay_monthly() {
        let table = ForecastTable {
            rows: vec![ForecastRow { step: 1, values: [1.0, 2.0, 3.0] }],
        };
        let summary = quarterly_summary(&table);
        assert_eq!(summary.periodicity, Periodicity::Monthly);
        assert_eq!(summary.table, table);
    }
}
