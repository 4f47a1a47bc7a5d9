//! Reporting utilities: descriptive statistics and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{ForecastTable, NUM_VARS, VarMatrix, VarSeriesTable, Variable};
use crate::math::{mean, pearson, sample_std};

/// count / mean / std / min / max of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub variable: Variable,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (`n - 1`); NaN with fewer than two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn from_values(variable: Variable, values: &[f64]) -> Self {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (min, max) = if values.is_empty() { (f64::NAN, f64::NAN) } else { (min, max) };
        Self {
            variable,
            count: values.len(),
            mean: mean(values),
            std: sample_std(values),
            min,
            max,
        }
    }
}

/// Per-column statistics of the model input.
pub fn describe(table: &VarSeriesTable) -> Vec<ColumnStats> {
    Variable::ALL
        .into_iter()
        .map(|var| ColumnStats::from_values(var, &table.column(var)))
        .collect()
}

/// Per-column statistics of a forecast.
pub fn describe_forecast(forecast: &ForecastTable) -> Vec<ColumnStats> {
    Variable::ALL
        .into_iter()
        .map(|var| ColumnStats::from_values(var, &forecast.column(var)))
        .collect()
}

/// Pearson correlations between the three series.
pub fn correlation_matrix(table: &VarSeriesTable) -> VarMatrix {
    let columns: Vec<Vec<f64>> = Variable::ALL.iter().map(|&v| table.column(v)).collect();
    let mut out = [[0.0; NUM_VARS]; NUM_VARS];
    for i in 0..NUM_VARS {
        for j in 0..NUM_VARS {
            out[i][j] = if i == j { 1.0 } else { pearson(&columns[i], &columns[j]) };
        }
    }
    out
}
