//! Data preparer: raw month table → three aligned model series.
//!
//! - `gdp_growth`: month-over-month % change of the nominal GDP index
//! - `cpi_change`: month-over-month % change of CPI
//! - `yield_spread`: long rate minus short rate, passed through in the input units
//!
//! Missing values are `None` throughout; derivations propagate them instead of
//! failing, and `prepare_var_data` drops every row that is incomplete.

use tracing::{debug, info};

use crate::domain::{RawObservationTable, VarRow, VarSeriesTable};
use crate::error::{VarError, VarResult};

/// Percent change against the previous element.
///
/// Element 0 is always missing. A missing or zero denominator, a missing
/// current value, or a non-finite result yields a missing element.
pub fn calculate_growth_rate(series: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(series.len());
    for (i, cur) in series.iter().enumerate() {
        if i == 0 {
            out.push(None);
            continue;
        }
        let value = match (series[i - 1], *cur) {
            (Some(prev), Some(cur)) if prev != 0.0 => {
                let g = (cur - prev) / prev * 100.0;
                g.is_finite().then_some(g)
            }
            _ => None,
        };
        out.push(value);
    }
    out
}

/// Element-wise `long - short` over positionally aligned series.
pub fn calculate_yield_spread(
    long_rate_series: &[Option<f64>],
    short_rate_series: &[Option<f64>],
) -> VarResult<Vec<Option<f64>>> {
    if long_rate_series.len() != short_rate_series.len() {
        return Err(VarError::DimensionMismatch {
            left: long_rate_series.len(),
            right: short_rate_series.len(),
        });
    }

    Ok(long_rate_series
        .iter()
        .zip(short_rate_series)
        .map(|(long, short)| match (long, short) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect())
}

/// Derive the three model series and drop incomplete rows.
///
/// Fewer than two input rows is not an error: the result is simply empty, and
/// downstream steps report insufficient data. With `verbose`, descriptive
/// statistics are logged; this never changes the result.
pub fn prepare_var_data(table: &RawObservationTable, verbose: bool) -> VarResult<VarSeriesTable> {
    let gdp_growth = calculate_growth_rate(&table.gdp_index());
    let cpi_change = calculate_growth_rate(&table.cpi());
    let yield_spread = calculate_yield_spread(&table.long_rate(), &table.short_rate())?;

    let mut rows = Vec::with_capacity(table.len().saturating_sub(1));
    for (i, raw) in table.rows.iter().enumerate() {
        match (gdp_growth[i], cpi_change[i], yield_spread[i]) {
            (Some(g), Some(c), Some(s)) => rows.push(VarRow {
                month: raw.month.clone(),
                values: [g, c, s],
            }),
            _ => debug!(month = %raw.month, "dropping incomplete row"),
        }
    }

    let prepared = VarSeriesTable::new(rows);
    info!(
        raw_rows = table.len(),
        rows = prepared.len(),
        dropped = table.len() - prepared.len(),
        "prepared VAR data"
    );

    if verbose {
        let summary = crate::report::format_data_summary(&prepared);
        for line in summary.lines() {
            info!("{line}");
        }
    }

    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawObservation, Variable};

    fn raw(month: &str, gdp: f64, cpi: f64, long: f64, short: f64) -> RawObservation {
        RawObservation {
            month: month.to_string(),
            gdp_index: Some(gdp),
            cpi: Some(cpi),
            long_rate: Some(long),
            short_rate: Some(short),
        }
    }

    #[test]
    fn constant_series_has_zero_growth() {
        let series = vec![Some(5.0); 6];
        let g = calculate_growth_rate(&series);
        assert_eq!(g.len(), 6);
        assert_eq!(g[0], None);
        assert!(g[1..].iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn growth_propagates_missing_on_bad_denominators() {
        let series = vec![Some(0.0), Some(1.0), None, Some(2.0), Some(3.0)];
        let g = calculate_growth_rate(&series);
        assert_eq!(g[1], None); // zero denominator
        assert_eq!(g[2], None); // missing current
        assert_eq!(g[3], None); // missing previous
        assert!((g[4].unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn yield_spread_is_exact_difference() {
        let spread = calculate_yield_spread(&[Some(5.0), None], &[Some(1.5), Some(1.0)]).unwrap();
        assert_eq!(spread, vec![Some(3.5), None]);
    }

    #[test]
    fn yield_spread_rejects_misaligned_lengths() {
        let err = calculate_yield_spread(&[Some(1.0)], &[Some(1.0), Some(2.0)]).unwrap_err();
        assert_eq!(err, VarError::DimensionMismatch { left: 1, right: 2 });
    }

    #[test]
    fn three_month_scenario() {
        let table = RawObservationTable::new(vec![
            raw("2020-01", 100.0, 200.0, 4.0, 5.0),
            raw("2020-02", 101.0, 201.0, 4.0, 5.0),
            raw("2020-03", 102.5, 202.0, 4.1, 5.0),
        ]);
        let out = prepare_var_data(&table, true).unwrap();
        assert_eq!(out.len(), 2);

        assert_eq!(out.rows[0].month, "2020-02");
        let [g, c, s] = out.rows[0].values;
        assert!((g - 1.0).abs() < 1e-12);
        assert!((c - 0.5).abs() < 1e-12);
        assert!((s + 1.0).abs() < 1e-12);

        assert_eq!(out.rows[1].month, "2020-03");
        let [g, c, s] = out.rows[1].values;
        assert!((g - 1.4851485).abs() < 1e-6);
        assert!((c - 0.4975124).abs() < 1e-6);
        assert!((s + 0.9).abs() < 1e-12);
    }

    #[test]
    fn n_rows_yield_n_minus_one() {
        let rows: Vec<RawObservation> = (0..10)
            .map(|i| raw(&format!("2021-{:02}", i + 1), 100.0 + i as f64, 200.0 + i as f64, 3.0, 1.0))
            .collect();
        let out = prepare_var_data(&RawObservationTable::new(rows), false).unwrap();
        assert_eq!(out.len(), 9);
        assert!(out.column(Variable::YieldSpread).iter().all(|v| (*v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn short_tables_yield_empty_output() {
        let one = RawObservationTable::new(vec![raw("2020-01", 100.0, 200.0, 4.0, 5.0)]);
        assert!(prepare_var_data(&one, true).unwrap().is_empty());
        assert!(prepare_var_data(&RawObservationTable::default(), false).unwrap().is_empty());
    }

    #[test]
    fn rows_with_missing_inputs_are_dropped() {
        let mut rows = vec![
            raw("2020-01", 100.0, 200.0, 4.0, 5.0),
            raw("2020-02", 101.0, 201.0, 4.0, 5.0),
            raw("2020-03", 102.0, 202.0, 4.0, 5.0),
            raw("2020-04", 103.0, 203.0, 4.0, 5.0),
        ];
        rows[2].short_rate = None;
        let out = prepare_var_data(&RawObservationTable::new(rows), false).unwrap();
        let months: Vec<&str> = out.rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2020-02", "2020-04"]);
    }
}
