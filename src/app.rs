//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads or simulates the raw table
//! - runs lag selection + VAR fitting
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, JoinArgs, LagsArgs, LoadArgs, RunArgs, SimulateArgs};
use crate::domain::{DEFAULT_HORIZONS, RunConfig, Scenario, Variable};
use crate::error::AppError;
use crate::report;

pub mod pipeline;

/// Parse argv (with the `tui` default applied).
pub fn parse_cli() -> Cli {
    // We want `mvar` and `mvar -d data.csv` to behave like `mvar tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing. This preserves a clean clap structure while
    // retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    Cli::parse_from(argv)
}

/// Dispatch a parsed command.
pub fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Lags(args) => handle_lags(&args),
        Command::Join(args) => handle_join(&args),
        Command::Simulate(args) => handle_simulate(&args),
        Command::Load(args) => handle_load(&args),
        Command::Tui(args) => crate::tui::run(args),
    }
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let run = pipeline::run_pipeline(&config)?;
    let builder = &run.builder;
    let data = builder.data();

    println!("=== mvar - VAR forecast ===");
    if run.skipped_rows > 0 {
        println!("(skipped {} unreadable raw rows)", run.skipped_rows);
    }
    println!("{}", report::format_data_summary(data));
    println!("First rows:\n{}", report::format_rows(&data.rows[..data.len().min(5)]));
    println!("Last rows:\n{}", report::format_rows(data.tail(5)));
    println!("Correlation matrix:\n{}", report::format_correlation(data));

    if let Some(selection) = builder.lag_selection() {
        println!("{}", report::format_lag_selection(selection));
    }
    println!("{}", builder.summary());
    println!("{}", report::format_diagnostics(&builder.model_diagnostics()?));

    println!("{}-month forecast:\n{}", run.forecast.steps(), report::format_forecast_table(&run.forecast));
    println!("{}", report::format_forecast_summary(&run.forecast));

    if !run.horizons.is_empty() {
        println!("{}", report::format_horizon_batch(&run.horizons));
    }
    if let Some(quarterly) = &run.quarterly {
        println!("{}", report::format_period_summary(quarterly));
    }
    if let Some(irf) = &run.impulse_response {
        println!("{}", report::format_impulse_response(irf, true));
    }
    if let Some(fevd) = &run.fevd {
        println!("{}", report::format_fevd(fevd));
    }
    if let Some(ci) = &run.intervals {
        println!("{}", report::format_intervals(ci));
    }
    if let Some(scenarios) = &run.scenarios {
        println!("{}", report::format_scenarios(scenarios));
    }

    if config.plot {
        for var in Variable::ALL {
            let history: Vec<f64> = data.tail(config.plot_width / 2).iter().map(|r| r.values[var.index()]).collect();
            let lower = run.intervals.as_ref().map(|ci| ci.lower.column(var));
            let upper = run.intervals.as_ref().map(|ci| ci.upper.column(var));
            let bands = lower.as_deref().zip(upper.as_deref());
            let plot = crate::plot::render_forecast_plot(
                var,
                &history,
                &run.forecast.column(var),
                bands,
                config.plot_width,
                config.plot_height,
            );
            println!("{plot}");
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_forecast {
        crate::io::write_forecast_csv(path, &run.forecast)?;
    }
    if let Some(path) = &config.export_diagnostics {
        crate::io::write_diagnostics_csv(path, &builder.model_diagnostics()?)?;
    }
    if let Some(path) = &config.export_report {
        crate::io::write_forecast_report_json(path, builder, &run.forecast)?;
    }
    if let Some(path) = &config.export_summary {
        crate::io::write_summary_txt(path, builder, &run.forecast)?;
    }
    if let Some(path) = &config.save_model {
        crate::io::save_model(path, builder)?;
    }

    Ok(())
}

fn handle_lags(args: &LagsArgs) -> Result<(), AppError> {
    let (raw, _) = pipeline::load_raw(&args.data.source())?;
    let data = pipeline::prepare(&raw, false)?;
    let mut builder = crate::var::VarModelBuilder::new(data);
    let selection = builder.select_optimal_lag(args.max_lags)?;
    println!("{}", report::format_lag_selection(selection));
    Ok(())
}

fn handle_join(args: &JoinArgs) -> Result<(), AppError> {
    let joined = crate::data::join_sources(&args.sources)?;
    crate::data::write_joined_csv(&joined, &args.output)?;
    println!(
        "Joined {} sources: {} months x {} columns -> {}",
        args.sources.len(),
        joined.len(),
        joined.columns.len(),
        args.output.display()
    );
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = crate::domain::SampleConfig {
        seed: args.seed,
        months: args.months,
        start: args.start.unwrap_or(crate::domain::SampleConfig::default().start),
    };
    let raw = crate::data::simulate_raw_table(&config)?;
    crate::io::write_raw_table_csv(&args.output, &raw)?;
    println!(
        "Wrote {} simulated months (seed {}) -> {}",
        raw.len(),
        args.seed,
        args.output.display()
    );
    Ok(())
}

fn handle_load(args: &LoadArgs) -> Result<(), AppError> {
    let builder = crate::io::load_model(&args.model)?;
    if args.summary {
        println!("{}", builder.summary());
    }
    let forecast = builder.forecast(args.steps)?;
    println!("{}-month forecast:\n{}", forecast.steps(), report::format_forecast_table(&forecast));

    if args.plot {
        for var in Variable::ALL {
            let history: Vec<f64> = builder.data().tail(args.width / 2).iter().map(|r| r.values[var.index()]).collect();
            let plot = crate::plot::render_forecast_plot(
                var,
                &history,
                &forecast.column(var),
                None,
                args.width,
                args.height,
            );
            println!("{plot}");
        }
    }
    if let Some(path) = &args.export_forecast {
        crate::io::write_forecast_csv(path, &forecast)?;
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    let horizons = if !args.horizons.is_empty() {
        args.horizons.clone()
    } else if args.multi_horizon {
        DEFAULT_HORIZONS.to_vec()
    } else {
        Vec::new()
    };

    let mut scenarios = args.scenarios.clone();
    if args.default_scenarios {
        scenarios.extend(Scenario::defaults());
    }

    RunConfig {
        data: args.data.source(),
        max_lags: args.max_lags,
        lag_order: args.lag_order,
        skip_selection: args.skip_selection,
        steps: args.steps,
        horizons,
        irf_periods: args.irf,
        fevd_periods: args.fevd,
        confidence: args.intervals,
        interval_method: args.interval_method,
        scenarios,
        quarterly: args.quarterly,
        verbose: args.describe,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_forecast: args.export_forecast.clone(),
        export_diagnostics: args.export_diagnostics.clone(),
        export_report: args.export_report.clone(),
        export_summary: args.export_summary.clone(),
        save_model: args.save_model.clone(),
    }
}

/// Rewrite argv so `mvar` defaults to `mvar tui`.
///
/// Rules:
/// - `mvar`                        -> `mvar tui`
/// - `mvar -d data.csv ...`        -> `mvar tui -d data.csv ...`
/// - `mvar --help/--version/-h`    -> unchanged (show top-level help/version)
/// - `mvar -v run ...`             -> unchanged (global flag before a subcommand)
pub fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    const SUBCOMMANDS: [&str; 6] = ["run", "lags", "join", "simulate", "load", "tui"];

    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if SUBCOMMANDS.contains(&arg1.as_str()) {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags" unless a
    // subcommand follows the global verbosity flags.
    if arg1.starts_with('-') {
        let has_subcommand = argv[1..]
            .iter()
            .find(|a| !is_verbose_flag(a))
            .is_some_and(|a| SUBCOMMANDS.contains(&a.as_str()));
        if !has_subcommand {
            argv.insert(1, "tui".to_string());
        }
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

fn is_verbose_flag(arg: &str) -> bool {
    arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rewrite_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["mvar"])), argv(&["mvar", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["mvar", "-d", "x.csv"])),
            argv(&["mvar", "tui", "-d", "x.csv"])
        );
        assert_eq!(rewrite_args(argv(&["mvar", "run", "-s", "6"])), argv(&["mvar", "run", "-s", "6"]));
        assert_eq!(rewrite_args(argv(&["mvar", "-vv", "lags"])), argv(&["mvar", "-vv", "lags"]));
        assert_eq!(rewrite_args(argv(&["mvar", "-v"])), argv(&["mvar", "tui", "-v"]));
        assert_eq!(rewrite_args(argv(&["mvar", "--help"])), argv(&["mvar", "--help"]));
    }

    #[test]
    fn run_config_merges_scenarios_and_horizons() {
        let cli = Cli::parse_from([
            "mvar",
            "run",
            "--multi-horizon",
            "--default-scenarios",
            "--scenario",
            "calm:yield_spread=0.25",
            "--no-plot",
            "--describe",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = run_config_from_args(&args);
        assert_eq!(config.horizons, DEFAULT_HORIZONS.to_vec());
        assert_eq!(config.scenarios.len(), 4);
        assert_eq!(config.scenarios[0].name, "calm");
        assert!(!config.plot);
        assert!(config.verbose);
    }
}
