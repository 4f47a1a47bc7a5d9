//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during estimation and forecasting
//! - exported to JSON/CSV
//! - reloaded later from a saved model file

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of series in the system. The model is conceptually fixed at three.
pub const NUM_VARS: usize = 3;

/// One value per variable, in [`Variable::ALL`] order.
pub type VarVector = [f64; NUM_VARS];

/// Row-major 3×3 matrix indexed `[equation][variable]`.
pub type VarMatrix = [[f64; NUM_VARS]; NUM_VARS];

/// Source column names the preparer reads from the raw table.
pub const COL_GDP_INDEX: &str = "Monthly Nominal GDP Index";
pub const COL_CPI: &str = "CPIAUCSL";
pub const COL_LONG_RATE: &str = "10 yr";
pub const COL_SHORT_RATE: &str = "3 mo";

pub const DEFAULT_MAX_LAGS: usize = 12;
pub const DEFAULT_STEPS: usize = 24;
/// Lag order used by `fit_model` when no lag was given or selected.
pub const DEFAULT_LAG_ORDER: usize = 2;
pub const DEFAULT_HORIZONS: [usize; 3] = [12, 24, 36];
pub const DEFAULT_IRF_PERIODS: usize = 10;
pub const DEFAULT_FEVD_PERIODS: usize = 24;
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// A modelled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    /// Month-over-month % change of the nominal GDP index.
    #[value(name = "gdp_growth")]
    GdpGrowth,
    /// Month-over-month % change of CPI.
    #[value(name = "cpi_change")]
    CpiChange,
    /// Long rate minus short rate (input units, no conversion).
    #[value(name = "yield_spread")]
    YieldSpread,
}

impl Variable {
    /// Builder-defined variable order. Every `VarVector` follows it.
    pub const ALL: [Variable; NUM_VARS] =
        [Variable::GdpGrowth, Variable::CpiChange, Variable::YieldSpread];

    /// Position of this variable inside a `VarVector`.
    pub fn index(self) -> usize {
        match self {
            Variable::GdpGrowth => 0,
            Variable::CpiChange => 1,
            Variable::YieldSpread => 2,
        }
    }

    /// Column name used in tables and exports.
    pub fn column_name(self) -> &'static str {
        match self {
            Variable::GdpGrowth => "gdp_growth",
            Variable::CpiChange => "cpi_change",
            Variable::YieldSpread => "yield_spread",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Variable::GdpGrowth => "GDP Growth",
            Variable::CpiChange => "CPI Change",
            Variable::YieldSpread => "Yield Spread",
        }
    }

    pub fn unit_label(self) -> &'static str {
        match self {
            Variable::GdpGrowth | Variable::CpiChange => "%",
            Variable::YieldSpread => "pts",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.column_name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % NUM_VARS]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + NUM_VARS - 1) % NUM_VARS]
    }
}

/// One month of raw inputs. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Calendar month label, `YYYY-MM`.
    pub month: String,
    pub gdp_index: Option<f64>,
    pub cpi: Option<f64>,
    pub long_rate: Option<f64>,
    pub short_rate: Option<f64>,
}

/// Month-keyed raw table (unique labels, chronological order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservationTable {
    pub rows: Vec<RawObservation>,
}

impl RawObservationTable {
    pub fn new(rows: Vec<RawObservation>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn gdp_index(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.gdp_index).collect()
    }

    pub fn cpi(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.cpi).collect()
    }

    pub fn long_rate(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.long_rate).collect()
    }

    pub fn short_rate(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.short_rate).collect()
    }
}

/// One complete row of model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRow {
    pub month: String,
    pub values: VarVector,
}

/// Derived three-series table; never contains a missing value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarSeriesTable {
    pub rows: Vec<VarRow>,
}

impl VarSeriesTable {
    pub fn new(rows: Vec<VarRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, var: Variable) -> Vec<f64> {
        self.rows.iter().map(|r| r.values[var.index()]).collect()
    }

    pub fn values(&self) -> Vec<VarVector> {
        self.rows.iter().map(|r| r.values).collect()
    }

    /// The last `n` rows (or all rows if fewer).
    pub fn tail(&self, n: usize) -> &[VarRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    pub fn first_month(&self) -> Option<&str> {
        self.rows.first().map(|r| r.month.as_str())
    }

    pub fn last_month(&self) -> Option<&str> {
        self.rows.last().map(|r| r.month.as_str())
    }
}

/// One forecast step (relative index, 1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub step: usize,
    pub values: VarVector,
}

/// Point forecasts for steps `1..=steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn steps(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, var: Variable) -> Vec<f64> {
        self.rows.iter().map(|r| r.values[var.index()]).collect()
    }

    /// Value at a 1-based forecast step.
    pub fn value(&self, step: usize, var: Variable) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.values[var.index()])
    }
}

/// Information criteria for a fitted VAR (lower is better for all four).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationCriteria {
    pub aic: f64,
    pub bic: f64,
    pub fpe: f64,
    pub hqic: f64,
}

/// Criteria for one candidate lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagCriteria {
    pub lag: usize,
    pub criteria: InformationCriteria,
}

/// Output of lag-order selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagSelection {
    pub max_lag: usize,
    /// One entry per candidate lag, ascending.
    pub table: Vec<LagCriteria>,
    pub aic_lag: usize,
    pub bic_lag: usize,
    pub fpe_lag: usize,
    pub hqic_lag: usize,
    /// Most frequent vote; ties resolved to the smallest lag.
    pub optimal_lag: usize,
}

impl LagSelection {
    pub fn votes(&self) -> [usize; 4] {
        [self.aic_lag, self.bic_lag, self.fpe_lag, self.hqic_lag]
    }
}

/// Where a fitted model's lag order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LagSource {
    /// Passed explicitly to `fit_model`.
    Explicit,
    /// Taken from the cached lag selection.
    Selected,
    /// Hardcoded fallback (no selection was available).
    Default,
}

/// Estimated VAR(p) system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedVar {
    pub lag_order: usize,
    pub lag_source: LagSource,
    /// Effective observations (`T - p`).
    pub nobs: usize,
    pub intercept: VarVector,
    /// `coefs[l][eq][var]`: effect of `var` at lag `l + 1` on equation `eq`.
    pub coefs: Vec<VarMatrix>,
    /// Coefficient standard errors, one row per regressor
    /// (`const`, then lag blocks), one column per equation.
    pub stderr: Vec<VarVector>,
    /// Residual covariance, degrees-of-freedom adjusted.
    pub sigma_u: VarMatrix,
    /// Residual covariance, maximum-likelihood (divided by `nobs`).
    pub sigma_u_mle: VarMatrix,
    pub residuals: Vec<VarVector>,
    pub log_likelihood: f64,
    pub criteria: InformationCriteria,
}

/// Key diagnostics of a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub lag_order: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub fpe: f64,
    pub hqic: f64,
    pub num_obs: usize,
    pub num_params: usize,
}

impl ModelDiagnostics {
    /// Named values in a stable order (for tables and `Metric,Value` exports).
    pub fn to_pairs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("lag_order", self.lag_order as f64),
            ("log_likelihood", self.log_likelihood),
            ("aic", self.aic),
            ("bic", self.bic),
            ("fpe", self.fpe),
            ("hqic", self.hqic),
            ("num_obs", self.num_obs as f64),
            ("num_params", self.num_params as f64),
        ]
    }
}

/// Impulse responses over `0..=periods`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseResponse {
    pub variables: Vec<Variable>,
    pub periods: usize,
    /// MA coefficients, `irfs[i][response][impulse]`.
    pub irfs: Vec<VarMatrix>,
    /// Cholesky-orthogonalized responses, same layout.
    pub orth_irfs: Vec<VarMatrix>,
}

/// Forecast error variance decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceDecomposition {
    pub variables: Vec<Variable>,
    pub periods: usize,
    /// `decomp[variable][horizon][shock]`; each innermost row sums to 1.
    pub decomp: Vec<Vec<VarVector>>,
}

/// Additive shock scenario applied to the last observed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub shocks: Vec<(Variable, f64)>,
}

impl Scenario {
    /// The three stock scenarios: inflation surprise, curve inversion, GDP contraction.
    pub fn defaults() -> Vec<Scenario> {
        vec![
            Scenario {
                name: "high_inflation".to_string(),
                shocks: vec![(Variable::CpiChange, 0.5)],
            },
            Scenario {
                name: "yield_inversion".to_string(),
                shocks: vec![(Variable::YieldSpread, -1.0)],
            },
            Scenario {
                name: "recession".to_string(),
                shocks: vec![(Variable::GdpGrowth, -0.5)],
            },
        ]
    }
}

/// How forecast bands are approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// point ± z · sample std of each residual column (same width every step).
    #[value(name = "residual-std")]
    ResidualStd,
    /// point ± z · sqrt of the h-step forecast MSE diagonal.
    #[value(name = "forecast-mse")]
    ForecastMse,
}

/// Point forecast with lower/upper bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub confidence: f64,
    pub method: IntervalMethod,
    pub point: ForecastTable,
    pub lower: ForecastTable,
    pub upper: ForecastTable,
}

/// Settings for the synthetic data generator.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub seed: u64,
    pub months: usize,
    pub start: NaiveDate,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            months: 160,
            start: NaiveDate::from_ymd_opt(1992, 1, 1).unwrap_or_default(),
        }
    }
}

/// Where the raw table comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic(SampleConfig),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data: DataSource,
    pub max_lags: usize,
    /// Explicit lag order; `None` means "use the selected lag".
    pub lag_order: Option<usize>,
    /// Skip information-criteria selection entirely.
    pub skip_selection: bool,
    pub steps: usize,
    /// Extra horizons for the multi-horizon batch (empty disables it).
    pub horizons: Vec<usize>,
    pub irf_periods: Option<usize>,
    pub fevd_periods: Option<usize>,
    pub confidence: Option<f64>,
    pub interval_method: IntervalMethod,
    pub scenarios: Vec<Scenario>,
    pub quarterly: bool,
    pub verbose: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_forecast: Option<PathBuf>,
    pub export_diagnostics: Option<PathBuf>,
    pub export_report: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
    pub save_model: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: DataSource::Synthetic(SampleConfig::default()),
            max_lags: DEFAULT_MAX_LAGS,
            lag_order: None,
            skip_selection: false,
            steps: DEFAULT_STEPS,
            horizons: Vec::new(),
            irf_periods: None,
            fevd_periods: None,
            confidence: None,
            interval_method: IntervalMethod::ResidualStd,
            scenarios: Vec::new(),
            quarterly: false,
            verbose: false,
            plot: false,
            plot_width: 72,
            plot_height: 12,
            export_forecast: None,
            export_diagnostics: None,
            export_report: None,
            export_summary: None,
            save_model: None,
        }
    }
}

/// A saved builder (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub variables: Vec<Variable>,
    pub data: VarSeriesTable,
    pub lag_selection: Option<LagSelection>,
    pub model: Option<FittedVar>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_order_is_stable() {
        for (i, v) in Variable::ALL.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
        assert_eq!(Variable::YieldSpread.next(), Variable::GdpGrowth);
        assert_eq!(Variable::GdpGrowth.prev(), Variable::YieldSpread);
        assert_eq!(Variable::from_column_name(" CPI_change "), Some(Variable::CpiChange));
        assert_eq!(Variable::from_column_name("unemployment"), None);
    }

    #[test]
    fn table_tail_clamps_to_length() {
        let table = VarSeriesTable::new(vec![
            VarRow { month: "2020-01".to_string(), values: [1.0, 2.0, 3.0] },
            VarRow { month: "2020-02".to_string(), values: [4.0, 5.0, 6.0] },
        ]);
        assert_eq!(table.tail(1)[0].month, "2020-02");
        assert_eq!(table.tail(10).len(), 2);
        assert_eq!(table.column(Variable::CpiChange), vec![2.0, 5.0]);
    }
}
