//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the estimation code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use crate::analysis::{HorizonForecast, PeriodSummary, Periodicity, ScenarioComparison};
use crate::domain::{
    FittedVar, ForecastInterval, ForecastTable, ImpulseResponse, IntervalMethod, LagSelection,
    ModelDiagnostics, VarMatrix, VarRow, VarSeriesTable, VarianceDecomposition, Variable,
};
use crate::math::covariance_to_correlation;
use crate::report::{ColumnStats, correlation_matrix, describe, describe_forecast};

/// Row count, month range, and per-column statistics of the model input.
pub fn format_data_summary(table: &VarSeriesTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Observations: {} | months: {} to {}\n",
        table.len(),
        table.first_month().unwrap_or("-"),
        table.last_month().unwrap_or("-"),
    ));
    out.push_str(&format_column_stats(&describe(table)));
    out
}

/// count / mean / std / min / max, one line per variable.
pub fn format_column_stats(stats: &[ColumnStats]) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<14} {:>6} {:>10} {:>10} {:>10} {:>10}",
            "variable", "count", "mean", "std", "min", "max"
        ),
    );
    push_line(&mut out, format!("{:-<14} {:-<6} {:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "", "", ""));
    for s in stats {
        push_line(
            &mut out,
            format!(
                "{:<14} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                s.variable.column_name(),
                s.count,
                s.mean,
                s.std,
                s.min,
                s.max
            ),
        );
    }
    out
}

/// Month-labelled rows (used for head/tail views).
pub fn format_rows(rows: &[VarRow]) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{:<8} {}", "month", variable_header()));
    for row in rows {
        push_line(
            &mut out,
            format!(
                "{:<8} {:>14.4} {:>14.4} {:>14.4}",
                row.month, row.values[0], row.values[1], row.values[2]
            ),
        );
    }
    out
}

/// 3×3 matrix with variable row/column labels.
pub fn format_matrix(matrix: &VarMatrix) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{:<14} {}", "", variable_header()));
    for var in Variable::ALL {
        let row = &matrix[var.index()];
        push_line(
            &mut out,
            format!("{:<14} {:>14.4} {:>14.4} {:>14.4}", var.column_name(), row[0], row[1], row[2]),
        );
    }
    out
}

pub fn format_correlation(table: &VarSeriesTable) -> String {
    format_matrix(&correlation_matrix(table))
}

/// Per-lag criteria with the winning lag of each criterion starred.
pub fn format_lag_selection(selection: &LagSelection) -> String {
    let mut out = String::new();
    out.push_str(&format!("Lag order selection (max lag {}):\n", selection.max_lag));
    push_line(
        &mut out,
        format!("{:>4} {:>13} {:>13} {:>13} {:>13}", "lag", "AIC", "BIC", "FPE", "HQIC"),
    );
    for row in &selection.table {
        let c = &row.criteria;
        let mark = |best: usize| if best == row.lag { "*" } else { " " };
        push_line(
            &mut out,
            format!(
                "{:>4} {:>12.6}{} {:>12.6}{} {:>12.4e}{} {:>12.6}{}",
                row.lag,
                c.aic,
                mark(selection.aic_lag),
                c.bic,
                mark(selection.bic_lag),
                c.fpe,
                mark(selection.fpe_lag),
                c.hqic,
                mark(selection.hqic_lag),
            ),
        );
    }
    out.push_str(&format!(
        "Recommended lags: AIC={} BIC={} FPE={} HQIC={}\n",
        selection.aic_lag, selection.bic_lag, selection.fpe_lag, selection.hqic_lag
    ));
    out.push_str(&format!("Optimal lag (majority vote): {}\n", selection.optimal_lag));
    out
}

pub fn format_diagnostics(diag: &ModelDiagnostics) -> String {
    let mut out = String::new();
    out.push_str("Model diagnostics:\n");
    out.push_str(&format!("  Lag order:        {}\n", diag.lag_order));
    out.push_str(&format!("  Log-likelihood:   {:.4}\n", diag.log_likelihood));
    out.push_str(&format!("  AIC:              {:.4}\n", diag.aic));
    out.push_str(&format!("  BIC:              {:.4}\n", diag.bic));
    out.push_str(&format!("  FPE:              {:.4e}\n", diag.fpe));
    out.push_str(&format!("  HQIC:             {:.4}\n", diag.hqic));
    out.push_str(&format!("  Observations:     {}\n", diag.num_obs));
    out.push_str(&format!("  Parameters:       {}\n", diag.num_params));
    out
}

/// Equation-by-equation estimates plus the residual correlation matrix.
pub fn format_model_summary(model: &FittedVar, data: &VarSeriesTable) -> String {
    let mut out = String::new();
    let diag = model.diagnostics();

    out.push_str("=== VAR model summary ===\n");
    out.push_str(&format!(
        "Lag order: {} ({:?}) | variables: {}\n",
        model.lag_order,
        model.lag_source,
        Variable::ALL.map(Variable::column_name).join(", ")
    ));
    out.push_str(&format!(
        "Sample: {} to {} | observations used: {}\n",
        data.tail(model.nobs).first().map(|r| r.month.as_str()).unwrap_or("-"),
        data.last_month().unwrap_or("-"),
        model.nobs
    ));
    out.push_str(&format!(
        "Log-likelihood: {:.4} | AIC: {:.4} | BIC: {:.4} | HQIC: {:.4} | FPE: {:.4e}\n",
        diag.log_likelihood, diag.aic, diag.bic, diag.hqic, diag.fpe
    ));

    for eq in Variable::ALL {
        out.push_str(&format!("\nEquation {}:\n", eq.column_name()));
        push_line(
            &mut out,
            format!("{:<20} {:>12} {:>12} {:>10} {:>8}", "", "coefficient", "std. error", "t-stat", "prob"),
        );
        for stat in model.coefficient_stats(eq) {
            push_line(
                &mut out,
                format!(
                    "{:<20} {:>12.6} {:>12.6} {:>10.3} {:>8.3}",
                    stat.name, stat.coef, stat.stderr, stat.tvalue, stat.pvalue
                ),
            );
        }
    }

    out.push_str("\nCorrelation matrix of residuals:\n");
    out.push_str(&format_matrix(&covariance_to_correlation(&model.sigma_u)));
    out
}

/// Forecast rows indexed by relative month.
pub fn format_forecast_table(forecast: &ForecastTable) -> String {
    format_step_table(forecast, "month")
}

fn format_step_table(forecast: &ForecastTable, step_label: &str) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{:>7} {}", step_label, variable_header()));
    for row in &forecast.rows {
        push_line(
            &mut out,
            format!(
                "{:>7} {:>14.4} {:>14.4} {:>14.4}",
                row.step, row.values[0], row.values[1], row.values[2]
            ),
        );
    }
    out
}

/// Descriptive statistics, averages, and ranges of a forecast.
pub fn format_forecast_summary(forecast: &ForecastTable) -> String {
    let stats = describe_forecast(forecast);
    let mut out = String::new();
    out.push_str(&format!("{}-month forecast summary:\n", forecast.steps()));
    out.push_str(&format_column_stats(&stats));
    out.push_str("\nForecast averages:\n");
    for s in &stats {
        out.push_str(&format!(
            "  {:<14} {:>9.4} {}\n",
            s.variable.display_name(),
            s.mean,
            s.variable.unit_label()
        ));
    }
    out.push_str("\nForecast ranges:\n");
    for s in &stats {
        out.push_str(&format!(
            "  {:<14} {:>9.4} to {:>9.4} {}\n",
            s.variable.display_name(),
            s.min,
            s.max,
            s.variable.unit_label()
        ));
    }
    out
}

/// Average of each horizon's forecast, one line per horizon.
pub fn format_horizon_batch(batch: &[HorizonForecast]) -> String {
    let mut out = String::new();
    out.push_str("Multi-horizon forecasts (averages):\n");
    push_line(&mut out, format!("{:>7} {}", "horizon", variable_header()));
    for h in batch {
        let stats = describe_forecast(&h.forecast);
        push_line(
            &mut out,
            format!(
                "{:>7} {:>14.4} {:>14.4} {:>14.4}",
                h.horizon, stats[0].mean, stats[1].mean, stats[2].mean
            ),
        );
    }
    out
}

/// One block per impulse variable.
pub fn format_impulse_response(irf: &ImpulseResponse, orthogonalized: bool) -> String {
    let (title, responses) = if orthogonalized {
        ("Orthogonalized impulse responses", &irf.orth_irfs)
    } else {
        ("Impulse responses", &irf.irfs)
    };
    let mut out = String::new();
    out.push_str(&format!("{title} ({} periods):\n", irf.periods));
    for impulse in &irf.variables {
        out.push_str(&format!("\nShock to {}:\n", impulse.column_name()));
        push_line(&mut out, format!("{:>7} {}", "period", variable_header()));
        for (i, m) in responses.iter().enumerate() {
            let j = impulse.index();
            push_line(
                &mut out,
                format!("{:>7} {:>14.6} {:>14.6} {:>14.6}", i, m[0][j], m[1][j], m[2][j]),
            );
        }
    }
    out
}

/// One block per explained variable; shares in percent.
pub fn format_fevd(fevd: &VarianceDecomposition) -> String {
    let mut out = String::new();
    out.push_str(&format!("Forecast error variance decomposition ({} periods):\n", fevd.periods));
    for (var, rows) in fevd.variables.iter().zip(&fevd.decomp) {
        out.push_str(&format!("\nFEVD for {}:\n", var.column_name()));
        push_line(&mut out, format!("{:>7} {}", "horizon", variable_header()));
        for (h, shares) in rows.iter().enumerate() {
            push_line(
                &mut out,
                format!(
                    "{:>7} {:>13.2}% {:>13.2}% {:>13.2}%",
                    h + 1,
                    shares[0] * 100.0,
                    shares[1] * 100.0,
                    shares[2] * 100.0
                ),
            );
        }
    }
    out
}

pub fn format_intervals(ci: &ForecastInterval) -> String {
    let method = match ci.method {
        IntervalMethod::ResidualStd => "residual std",
        IntervalMethod::ForecastMse => "forecast MSE",
    };
    let mut out = String::new();
    out.push_str(&format!(
        "{:.0}% forecast intervals ({method}):\n",
        ci.confidence * 100.0
    ));
    for var in Variable::ALL {
        out.push_str(&format!("\n{}:\n", var.display_name()));
        push_line(&mut out, format!("{:>7} {:>12} {:>12} {:>12}", "month", "lower", "point", "upper"));
        for ((p, lo), hi) in ci.point.rows.iter().zip(&ci.lower.rows).zip(&ci.upper.rows) {
            let j = var.index();
            push_line(
                &mut out,
                format!("{:>7} {:>12.4} {:>12.4} {:>12.4}", p.step, lo.values[j], p.values[j], hi.values[j]),
            );
        }
    }
    out
}

/// Scenario averages next to the base case, with the change from base.
pub fn format_scenarios(comparison: &ScenarioComparison) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Scenario comparison ({}-month averages):\n",
        comparison.base.steps()
    ));
    push_line(&mut out, format!("{:<18} {}", "scenario", variable_header()));

    let base = describe_forecast(&comparison.base);
    push_line(
        &mut out,
        format!("{:<18} {:>14.4} {:>14.4} {:>14.4}", "base", base[0].mean, base[1].mean, base[2].mean),
    );
    for s in &comparison.scenarios {
        let stats = describe_forecast(&s.forecast);
        push_line(
            &mut out,
            format!(
                "{:<18} {:>14.4} {:>14.4} {:>14.4}",
                truncate(&s.name, 18),
                stats[0].mean,
                stats[1].mean,
                stats[2].mean
            ),
        );
        push_line(
            &mut out,
            format!(
                "{:<18} {:>+14.4} {:>+14.4} {:>+14.4}",
                "  vs base",
                stats[0].mean - base[0].mean,
                stats[1].mean - base[1].mean,
                stats[2].mean - base[2].mean
            ),
        );
    }
    out
}

pub fn format_period_summary(summary: &PeriodSummary) -> String {
    match summary.periodicity {
        Periodicity::Quarterly => {
            let mut out = String::from("Quarterly forecast (3-month averages):\n");
            out.push_str(&format_step_table(&summary.table, "quarter"));
            out
        }
        Periodicity::Monthly => {
            let mut out = String::from("Monthly forecast (too short to aggregate):\n");
            out.push_str(&format_forecast_table(&summary.table));
            out
        }
    }
}

fn variable_header() -> String {
    Variable::ALL
        .map(|v| format!("{:>14}", v.column_name()))
        .join(" ")
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
