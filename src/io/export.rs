//! Export forecasts, diagnostics, and reports.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts:
//! - forecast CSV (first column is the relative forecast month)
//! - diagnostics CSV (`Metric,Value` rows)
//! - JSON report (model info + forecast + per-variable statistics)
//! - plain-text summary
//! - raw observation CSV (same layout `ingest` reads back)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::{
    COL_CPI, COL_GDP_INDEX, COL_LONG_RATE, COL_SHORT_RATE, ForecastTable, LagSource, ModelDiagnostics,
    RawObservationTable, Variable,
};
use crate::error::AppError;
use crate::report::{ColumnStats, describe_forecast, format_forecast_table};
use crate::var::{MODEL_FILE_TOOL, VarModelBuilder};

/// Write forecast rows: `forecast_month,gdp_growth,cpi_change,yield_spread`.
pub fn write_forecast_csv(path: &Path, forecast: &ForecastTable) -> Result<(), AppError> {
    let mut file = create(path, "forecast CSV")?;

    let header = Variable::ALL.map(Variable::column_name).join(",");
    writeln!(file, "forecast_month,{header}")
        .map_err(|e| AppError::new(2, format!("Failed to write forecast CSV header: {e}")))?;

    for row in &forecast.rows {
        writeln!(
            file,
            "{},{},{},{}",
            row.step, row.values[0], row.values[1], row.values[2]
        )
        .map_err(|e| AppError::new(2, format!("Failed to write forecast CSV row: {e}")))?;
    }

    finish(file, path, "forecast CSV")
}

/// Write diagnostics as `Metric,Value` rows.
pub fn write_diagnostics_csv(path: &Path, diagnostics: &ModelDiagnostics) -> Result<(), AppError> {
    let mut file = create(path, "diagnostics CSV")?;

    writeln!(file, "Metric,Value")
        .map_err(|e| AppError::new(2, format!("Failed to write diagnostics CSV header: {e}")))?;
    for (name, value) in diagnostics.to_pairs() {
        writeln!(file, "{name},{value}")
            .map_err(|e| AppError::new(2, format!("Failed to write diagnostics CSV row: {e}")))?;
    }

    finish(file, path, "diagnostics CSV")
}

#[derive(Debug, Serialize)]
struct ForecastReport<'a> {
    tool: &'a str,
    generated_at: String,
    model: ModelInfo<'a>,
    forecast: Vec<ForecastRecord>,
    summary: Vec<ColumnStats>,
}

#[derive(Debug, Serialize)]
struct ModelInfo<'a> {
    variables: Vec<&'static str>,
    lag_order: usize,
    lag_source: LagSource,
    first_month: Option<&'a str>,
    last_month: Option<&'a str>,
    diagnostics: ModelDiagnostics,
}

#[derive(Debug, Serialize)]
struct ForecastRecord {
    forecast_month: usize,
    gdp_growth: f64,
    cpi_change: f64,
    yield_spread: f64,
}

/// Write a JSON report with model info, forecast rows, and summary statistics.
pub fn write_forecast_report_json(
    path: &Path,
    builder: &VarModelBuilder,
    forecast: &ForecastTable,
) -> Result<(), AppError> {
    let model = builder.fitted()?;
    let report = ForecastReport {
        tool: MODEL_FILE_TOOL,
        generated_at: chrono::Utc::now().to_rfc3339(),
        model: ModelInfo {
            variables: Variable::ALL.map(Variable::column_name).to_vec(),
            lag_order: model.lag_order,
            lag_source: model.lag_source,
            first_month: builder.data().first_month(),
            last_month: builder.data().last_month(),
            diagnostics: model.diagnostics(),
        },
        forecast: forecast
            .rows
            .iter()
            .map(|r| ForecastRecord {
                forecast_month: r.step,
                gdp_growth: r.values[0],
                cpi_change: r.values[1],
                yield_spread: r.values[2],
            })
            .collect(),
        summary: describe_forecast(forecast),
    };

    let mut file = create(path, "JSON report")?;
    serde_json::to_writer_pretty(&mut file, &report)
        .map_err(|e| AppError::new(2, format!("Failed to write JSON report: {e}")))?;
    finish(file, path, "JSON report")
}

/// Write the model summary followed by the forecast table.
pub fn write_summary_txt(
    path: &Path,
    builder: &VarModelBuilder,
    forecast: &ForecastTable,
) -> Result<(), AppError> {
    let mut file = create(path, "summary")?;
    write!(
        file,
        "{}\n\n{}-month forecast:\n{}",
        builder.summary(),
        forecast.steps(),
        format_forecast_table(forecast)
    )
    .map_err(|e| AppError::new(2, format!("Failed to write summary: {e}")))?;
    finish(file, path, "summary")
}

/// Write a raw observation table with the input column names; missing cells stay empty.
pub fn write_raw_table_csv(path: &Path, table: &RawObservationTable) -> Result<(), AppError> {
    let mut file = create(path, "raw CSV")?;

    writeln!(file, "date,{COL_GDP_INDEX},{COL_CPI},{COL_LONG_RATE},{COL_SHORT_RATE}")
        .map_err(|e| AppError::new(2, format!("Failed to write raw CSV header: {e}")))?;

    let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for row in &table.rows {
        writeln!(
            file,
            "{}-01,{},{},{},{}",
            row.month,
            cell(row.gdp_index),
            cell(row.cpi),
            cell(row.long_rate),
            cell(row.short_rate)
        )
        .map_err(|e| AppError::new(2, format!("Failed to write raw CSV row: {e}")))?;
    }

    finish(file, path, "raw CSV")
}

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))
}

fn finish(mut file: BufWriter<File>, path: &Path, what: &str) -> Result<(), AppError> {
    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write {what}: {e}")))?;
    info!(path = %path.display(), "{what} written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var_table;

    fn fitted() -> (VarModelBuilder, ForecastTable) {
        let mut builder = VarModelBuilder::new(simulate_var_table(23, 120));
        builder.fit_model(Some(2)).unwrap();
        let forecast = builder.forecast(4).unwrap();
        (builder, forecast)
    }

    #[test]
    fn forecast_csv_starts_with_month_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.csv");
        let (_, forecast) = fitted();
        write_forecast_csv(&path, &forecast).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "forecast_month,gdp_growth,cpi_change,yield_spread");
        assert_eq!(lines.len(), 5);
        let first: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(first[0], 1.0);
        assert_eq!(first[1..], forecast.rows[0].values[..]);
    }

    #[test]
    fn diagnostics_csv_has_metric_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostics.csv");
        let (builder, _) = fitted();
        write_diagnostics_csv(&path, &builder.model_diagnostics().unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Metric,Value\nlag_order,2\n"));
        assert!(text.contains("\nnum_params,21\n"));
        assert!(text.contains("\nnum_obs,118\n"));
    }

    #[test]
    fn json_report_carries_forecast_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let (builder, forecast) = fitted();
        write_forecast_report_json(&path, &builder, &forecast).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["model"]["lag_order"], 2);
        assert_eq!(value["model"]["lag_source"], "explicit");
        assert_eq!(value["forecast"].as_array().unwrap().len(), 4);
        assert_eq!(value["forecast"][3]["forecast_month"], 4);
        assert_eq!(value["summary"][2]["variable"], "yield_spread");
    }

    #[test]
    fn json_report_requires_fitted_model() {
        let dir = tempfile::tempdir().unwrap();
        let builder = VarModelBuilder::new(simulate_var_table(23, 50));
        let forecast = ForecastTable { rows: Vec::new() };
        let err = write_forecast_report_json(&dir.path().join("r.json"), &builder, &forecast).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn raw_csv_reads_back_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let mut raw = crate::data::simulate_raw_table(&crate::domain::SampleConfig {
            months: 6,
            ..Default::default()
        })
        .unwrap();
        raw.rows[2].cpi = None;
        write_raw_table_csv(&path, &raw).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,Monthly Nominal GDP Index,CPIAUCSL,10 yr,3 mo\n1992-01-01,"));

        let loaded = crate::io::load_raw_table(&path).unwrap();
        assert!(loaded.row_errors.is_empty());
        assert_eq!(loaded.table, raw);
    }

    #[test]
    fn summary_txt_contains_model_and_forecast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let (builder, forecast) = fitted();
        write_summary_txt(&path, &builder, &forecast).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("=== VAR model summary ==="));
        assert!(text.contains("4-month forecast:"));
    }
}
