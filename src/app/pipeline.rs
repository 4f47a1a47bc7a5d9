//! Shared "VAR pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load raw table -> prepare series -> select lags -> fit -> forecast -> analyses
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use tracing::info;

use crate::analysis::{
    HorizonForecast, PeriodSummary, ScenarioComparison, compare_scenarios, forecast_intervals,
    multi_step_forecast, quarterly_summary,
};
use crate::data::{prepare_var_data, simulate_raw_table};
use crate::domain::{
    DataSource, ForecastInterval, ForecastTable, ImpulseResponse, RawObservationTable, RunConfig,
    VarSeriesTable, VarianceDecomposition,
};
use crate::error::{AppError, VarError};
use crate::io::load_raw_table;
use crate::var::VarModelBuilder;

/// All computed outputs of a single `mvar run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub raw: RawObservationTable,
    /// Raw rows skipped by ingest (unreadable month, CSV errors).
    pub skipped_rows: usize,
    pub builder: VarModelBuilder,
    pub forecast: ForecastTable,
    pub horizons: Vec<HorizonForecast>,
    pub impulse_response: Option<ImpulseResponse>,
    pub fevd: Option<VarianceDecomposition>,
    pub intervals: Option<ForecastInterval>,
    pub scenarios: Option<ScenarioComparison>,
    pub quarterly: Option<PeriodSummary>,
}

/// Model-only settings (the subset the TUI adjusts interactively).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSettings {
    pub max_lags: usize,
    pub lag_order: Option<usize>,
    pub skip_selection: bool,
    pub steps: usize,
}

impl From<&RunConfig> for ModelSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            max_lags: config.max_lags,
            lag_order: config.lag_order,
            skip_selection: config.skip_selection,
            steps: config.steps,
        }
    }
}

/// Load the raw table from CSV or generate it.
pub fn load_raw(source: &DataSource) -> Result<(RawObservationTable, usize), AppError> {
    match source {
        DataSource::Csv(path) => {
            let ingested = load_raw_table(path)?;
            Ok((ingested.table, ingested.row_errors.len()))
        }
        DataSource::Synthetic(config) => Ok((simulate_raw_table(config)?, 0)),
    }
}

/// Derive the three model series; fewer than two rows is reported as insufficient data.
pub fn prepare(raw: &RawObservationTable, verbose: bool) -> Result<VarSeriesTable, AppError> {
    let data = prepare_var_data(raw, verbose)?;
    if data.len() < 2 {
        return Err(VarError::InsufficientData(format!(
            "prepared table has {} complete rows",
            data.len()
        ))
        .into());
    }
    Ok(data)
}

/// Select (unless skipped), fit, and forecast.
pub fn fit_and_forecast(
    data: VarSeriesTable,
    settings: &ModelSettings,
) -> Result<(VarModelBuilder, ForecastTable), AppError> {
    let mut builder = VarModelBuilder::new(data);
    if !settings.skip_selection {
        builder.select_optimal_lag(settings.max_lags)?;
    }
    builder.fit_model(settings.lag_order)?;
    let forecast = builder.forecast(settings.steps)?;
    Ok((builder, forecast))
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Load and prepare.
    let (raw, skipped_rows) = load_raw(&config.data)?;
    let data = prepare(&raw, config.verbose)?;
    info!(raw_rows = raw.len(), rows = data.len(), "data prepared");

    // 2) Select, fit, and forecast.
    let (builder, forecast) = fit_and_forecast(data, &ModelSettings::from(config))?;

    // 3) Optional analyses.
    let horizons = if config.horizons.is_empty() {
        Vec::new()
    } else {
        multi_step_forecast(&builder, &config.horizons)?
    };
    let impulse_response = config
        .irf_periods
        .map(|p| builder.impulse_response(p))
        .transpose()?;
    let fevd = config
        .fevd_periods
        .map(|p| builder.forecast_error_variance_decomposition(p))
        .transpose()?;
    let intervals = config
        .confidence
        .map(|c| forecast_intervals(&builder, config.steps, c, config.interval_method))
        .transpose()?;
    let scenarios = if config.scenarios.is_empty() {
        None
    } else {
        Some(compare_scenarios(&builder, &config.scenarios, config.steps)?)
    };
    let quarterly = config.quarterly.then(|| quarterly_summary(&forecast));

    Ok(RunOutput {
        raw,
        skipped_rows,
        builder,
        forecast,
        horizons,
        impulse_response,
        fevd,
        intervals,
        scenarios,
        quarterly,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SampleConfig, Scenario};

    #[test]
    fn default_config_runs_end_to_end() {
        let config = RunConfig {
            max_lags: 4,
            steps: 6,
            irf_periods: Some(5),
            fevd_periods: Some(5),
            confidence: Some(0.9),
            horizons: vec![3, 6],
            scenarios: Scenario::defaults(),
            quarterly: true,
            ..RunConfig::default()
        };
        let out = run_pipeline(&config).unwrap();
        assert_eq!(out.raw.len(), SampleConfig::default().months);
        assert_eq!(out.builder.data().len(), out.raw.len() - 1);
        assert_eq!(out.forecast.steps(), 6);
        assert_eq!(out.horizons.len(), 2);
        assert!(out.builder.lag_selection().is_some());
        assert_eq!(out.impulse_response.unwrap().irfs.len(), 6);
        assert_eq!(out.fevd.unwrap().decomp[0].len(), 5);
        assert_eq!(out.scenarios.unwrap().scenarios.len(), 3);
        assert_eq!(out.quarterly.unwrap().table.steps(), 2);
        assert!(out.intervals.is_some());
    }

    #[test]
    fn skipping_selection_uses_default_lag() {
        let config = RunConfig {
            skip_selection: true,
            steps: 3,
            ..RunConfig::default()
        };
        let out = run_pipeline(&config).unwrap();
        assert!(out.builder.lag_selection().is_none());
        let model = out.builder.model().unwrap();
        assert_eq!(model.lag_order, crate::domain::DEFAULT_LAG_ORDER);
        assert_eq!(model.lag_source, crate::domain::LagSource::Default);
    }

    #[test]
    fn tiny_samples_report_insufficient_data() {
        let config = RunConfig {
            data: DataSource::Synthetic(SampleConfig {
                months: 2,
                ..SampleConfig::default()
            }),
            ..RunConfig::default()
        };
        assert_eq!(run_pipeline(&config).unwrap_err().exit_code(), 3);

        let config = RunConfig {
            data: DataSource::Synthetic(SampleConfig {
                months: 30,
                ..SampleConfig::default()
            }),
            max_lags: 12,
            ..RunConfig::default()
        };
        assert_eq!(run_pipeline(&config).unwrap_err().exit_code(), 3);
    }
}
