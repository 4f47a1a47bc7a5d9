//! Command-line parsing for the VAR macro forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimation code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::data::SourceSpec;
use crate::domain::{
    DEFAULT_MAX_LAGS, DEFAULT_STEPS, DataSource, IntervalMethod, SampleConfig, Scenario, Variable,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mvar", version, about = "VAR forecaster for GDP growth, inflation, and the yield spread")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full walkthrough: prepare, select lags, fit, diagnose, forecast, and optionally export.
    Run(RunArgs),
    /// Print the lag-selection table only (useful for scripting).
    Lags(LagsArgs),
    /// Join month-keyed CSV downloads into one raw table.
    Join(JoinArgs),
    /// Write a synthetic raw table for demos and tests.
    Simulate(SimulateArgs),
    /// Forecast from a previously saved model file.
    Load(LoadArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `mvar run`, but renders results
    /// in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Where the raw table comes from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Raw month-keyed CSV (date/month column, `Monthly Nominal GDP Index`, `CPIAUCSL`, `10 yr`, `3 mo`).
    /// When omitted, a synthetic sample is generated.
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Random seed for the synthetic sample.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Months in the synthetic sample.
    #[arg(long, default_value_t = 160)]
    pub months: usize,

    /// First month of the synthetic sample (YYYY-MM).
    #[arg(long, value_parser = parse_start_month)]
    pub start: Option<NaiveDate>,
}

impl DataArgs {
    pub fn source(&self) -> DataSource {
        match &self.data {
            Some(path) => DataSource::Csv(path.clone()),
            None => DataSource::Synthetic(self.sample_config()),
        }
    }

    pub fn sample_config(&self) -> SampleConfig {
        let default = SampleConfig::default();
        SampleConfig {
            seed: self.seed,
            months: self.months,
            start: self.start.unwrap_or(default.start),
        }
    }
}

/// Options for the full walkthrough.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Largest lag order considered by the selection.
    #[arg(long, default_value_t = DEFAULT_MAX_LAGS)]
    pub max_lags: usize,

    /// Fit this lag order instead of the selected one.
    #[arg(short = 'p', long = "lags")]
    pub lag_order: Option<usize>,

    /// Skip information-criteria selection (uses `--lags`, or the default lag of 2).
    #[arg(long)]
    pub skip_selection: bool,

    /// Forecast horizon in months.
    #[arg(short = 's', long, default_value_t = DEFAULT_STEPS)]
    pub steps: usize,

    /// Extra forecast horizons, comma separated (e.g. `12,24,36`).
    #[arg(long, value_delimiter = ',')]
    pub horizons: Vec<usize>,

    /// Run the multi-horizon batch with the default horizons (12, 24, 36).
    #[arg(long)]
    pub multi_horizon: bool,

    /// Print impulse responses over PERIODS (default 10).
    #[arg(long, value_name = "PERIODS", num_args = 0..=1, default_missing_value = "10")]
    pub irf: Option<usize>,

    /// Print the forecast error variance decomposition over PERIODS (default 24).
    #[arg(long, value_name = "PERIODS", num_args = 0..=1, default_missing_value = "24")]
    pub fevd: Option<usize>,

    /// Print forecast intervals at CONFIDENCE (default 0.95).
    #[arg(long, value_name = "CONFIDENCE", num_args = 0..=1, default_missing_value = "0.95")]
    pub intervals: Option<f64>,

    /// How interval widths are approximated.
    #[arg(long, value_enum, default_value_t = IntervalMethod::ResidualStd)]
    pub interval_method: IntervalMethod,

    /// Shock scenario `NAME:VAR=SHOCK[,VAR=SHOCK...]` (repeatable),
    /// e.g. `stagflation:cpi_change=0.5,gdp_growth=-0.3`.
    #[arg(long = "scenario", value_parser = parse_scenario)]
    pub scenarios: Vec<Scenario>,

    /// Add the built-in scenarios (high_inflation, yield_inversion, recession).
    #[arg(long)]
    pub default_scenarios: bool,

    /// Also print 3-month averages of the forecast.
    #[arg(long)]
    pub quarterly: bool,

    /// Log descriptive statistics of the prepared data.
    #[arg(long)]
    pub describe: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,

    /// Export the forecast to CSV.
    #[arg(long)]
    pub export_forecast: Option<PathBuf>,

    /// Export diagnostics to CSV (`Metric,Value`).
    #[arg(long)]
    pub export_diagnostics: Option<PathBuf>,

    /// Export a JSON report (model info + forecast + statistics).
    #[arg(long)]
    pub export_report: Option<PathBuf>,

    /// Export the model summary and forecast as text.
    #[arg(long)]
    pub export_summary: Option<PathBuf>,

    /// Save the whole model (data, lag selection, fit) as JSON.
    #[arg(long)]
    pub save_model: Option<PathBuf>,
}

/// Options for `lags`.
#[derive(Debug, Args, Clone)]
pub struct LagsArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Largest lag order considered.
    #[arg(long, default_value_t = DEFAULT_MAX_LAGS)]
    pub max_lags: usize,
}

/// Options for `join`.
#[derive(Debug, Args, Clone)]
pub struct JoinArgs {
    /// Source `PATH[:DATE_COLUMN[:POLICY]]` (repeatable). POLICY is `first`
    /// (earliest observation per month, default) or `day-one` (1st of month only).
    #[arg(long = "source", required = true, value_parser = parse_source)]
    pub sources: Vec<SourceSpec>,

    /// Output CSV.
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Options for `simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of months.
    #[arg(long, default_value_t = 160)]
    pub months: usize,

    /// First month (YYYY-MM).
    #[arg(long, value_parser = parse_start_month)]
    pub start: Option<NaiveDate>,

    /// Output CSV.
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Options for `load`.
#[derive(Debug, Args, Clone)]
pub struct LoadArgs {
    /// Model JSON written by `mvar run --save-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Forecast horizon in months.
    #[arg(short = 's', long, default_value_t = DEFAULT_STEPS)]
    pub steps: usize,

    /// Print the model summary before the forecast.
    #[arg(long)]
    pub summary: bool,

    /// Render an ASCII plot per variable.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 12)]
    pub height: usize,

    /// Export the forecast to CSV.
    #[arg(long)]
    pub export_forecast: Option<PathBuf>,
}

/// Options for the TUI.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Initial maximum lag for the selection.
    #[arg(long, default_value_t = DEFAULT_MAX_LAGS)]
    pub max_lags: usize,

    /// Initial forecast horizon.
    #[arg(short = 's', long, default_value_t = DEFAULT_STEPS)]
    pub steps: usize,

    /// Where `s` saves the model.
    #[arg(long, default_value = "var_model.json")]
    pub save_path: PathBuf,

    /// Where `e` exports the forecast.
    #[arg(long, default_value = "var_forecast.csv")]
    pub export_path: PathBuf,
}

/// Parse `NAME:VAR=SHOCK[,VAR=SHOCK...]`.
pub fn parse_scenario(raw: &str) -> Result<Scenario, String> {
    let (name, body) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VAR=SHOCK[,VAR=SHOCK...], got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("scenario name must not be empty".to_string());
    }

    let mut shocks = Vec::new();
    for part in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (var, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected VAR=SHOCK, got '{part}'"))?;
        let variable = Variable::from_column_name(var).ok_or_else(|| {
            format!("unknown variable '{}' (expected gdp_growth, cpi_change, or yield_spread)", var.trim())
        })?;
        let shock: f64 = value
            .trim()
            .parse()
            .map_err(|_| format!("invalid shock '{}' for {}", value.trim(), variable.column_name()))?;
        if !shock.is_finite() {
            return Err(format!("shock for {} must be finite", variable.column_name()));
        }
        shocks.push((variable, shock));
    }
    if shocks.is_empty() {
        return Err(format!("scenario '{name}' has no shocks"));
    }

    Ok(Scenario {
        name: name.to_string(),
        shocks,
    })
}

fn parse_source(raw: &str) -> Result<SourceSpec, String> {
    SourceSpec::parse(raw).map_err(|e| e.message().to_string())
}

fn parse_start_month(raw: &str) -> Result<NaiveDate, String> {
    crate::io::ingest::parse_month(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_CONFIDENCE, DEFAULT_FEVD_PERIODS, DEFAULT_IRF_PERIODS};

    #[test]
    fn scenario_parsing() {
        let s = parse_scenario("stagflation: cpi_change=0.5, gdp_growth=-0.3").unwrap();
        assert_eq!(s.name, "stagflation");
        assert_eq!(
            s.shocks,
            vec![(Variable::CpiChange, 0.5), (Variable::GdpGrowth, -0.3)]
        );

        assert!(parse_scenario("no-colon").is_err());
        assert!(parse_scenario(":cpi_change=1").is_err());
        assert!(parse_scenario("x:unemployment=1").is_err());
        assert!(parse_scenario("x:cpi_change=lots").is_err());
        assert!(parse_scenario("x:").is_err());
    }

    #[test]
    fn run_args_defaults_and_optional_values() {
        let cli = Cli::parse_from(["mvar", "run", "--irf", "--fevd", "6", "--horizons", "3,6"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.irf, Some(DEFAULT_IRF_PERIODS));
        assert_eq!(args.fevd, Some(6));
        assert_eq!(args.intervals, None);
        assert_eq!(args.horizons, vec![3, 6]);
        assert_eq!(args.max_lags, DEFAULT_MAX_LAGS);
        assert_eq!(args.steps, DEFAULT_STEPS);
        assert!(matches!(args.data.source(), DataSource::Synthetic(_)));
    }

    #[test]
    fn bare_analysis_flags_use_default_settings() {
        let cli = Cli::parse_from(["mvar", "run", "--fevd", "--intervals"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.fevd, Some(DEFAULT_FEVD_PERIODS));
        assert_eq!(args.intervals, Some(DEFAULT_CONFIDENCE));
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["mvar", "lags", "-vv", "--max-lags", "4"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn start_month_accepts_bare_months() {
        let cli = Cli::parse_from(["mvar", "simulate", "--start", "2001-07", "-o", "out.csv"]);
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2001, 7, 1));
    }
}
