//! Synthetic macro sample generation.
//!
//! The generator simulates a stable VAR(1) in
//! `(gdp_growth, cpi_change, yield_spread)` and, for the raw table, integrates
//! it back into the levels the preparer expects:
//!
//! - GDP index starts at 100 and CPI at 200, compounding the simulated growth
//! - the short rate is a mean-reverting AR(1)
//! - the long rate is the short rate plus the simulated spread
//!
//! Everything is driven by a seeded `StdRng`, so samples are reproducible.

use chrono::Datelike;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::domain::{
    NUM_VARS, RawObservation, RawObservationTable, SampleConfig, VarMatrix, VarRow,
    VarSeriesTable, VarVector,
};
use crate::error::AppError;

/// Lag-1 coefficient matrix of the simulated system.
pub const TRUE_A1: VarMatrix = [
    [0.5, 0.05, 0.1],
    [0.1, 0.4, -0.05],
    [0.05, -0.1, 0.9],
];

/// Unconditional means: monthly GDP growth %, CPI change %, spread in points.
pub const TRUE_MEAN: VarVector = [0.35, 0.25, 1.5];

/// Innovation standard deviations (independent shocks).
pub const NOISE_STD: VarVector = [0.3, 0.2, 0.25];

const BURN_IN: usize = 100;
const GDP_START: f64 = 100.0;
const CPI_START: f64 = 200.0;
const SHORT_RATE_MEAN: f64 = 3.0;
const SHORT_RATE_PERSISTENCE: f64 = 0.97;
const SHORT_RATE_NOISE: f64 = 0.15;
const SHORT_RATE_FLOOR: f64 = 0.05;

/// Simulate `n` rows of the VAR(1) directly as model input.
///
/// Month labels start at the default sample start month.
pub fn simulate_var_table(seed: u64, n: usize) -> VarSeriesTable {
    let start = SampleConfig::default().start;
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = simulate_path(&mut rng, n)
        .into_iter()
        .enumerate()
        .map(|(i, values)| VarRow {
            month: month_label(start, i),
            values,
        })
        .collect();
    VarSeriesTable::new(rows)
}

/// Simulate a raw month-keyed table with GDP/CPI levels and two rates.
pub fn simulate_raw_table(config: &SampleConfig) -> Result<RawObservationTable, AppError> {
    if config.months < 2 {
        return Err(AppError::new(2, "Sample must cover at least 2 months."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let path = simulate_path(&mut rng, config.months);

    let mut gdp = GDP_START;
    let mut cpi = CPI_START;
    let mut short = SHORT_RATE_MEAN;
    let mut rows = Vec::with_capacity(config.months);

    for (i, values) in path.iter().enumerate() {
        if i > 0 {
            gdp *= 1.0 + values[0] / 100.0;
            cpi *= 1.0 + values[1] / 100.0;
            let z: f64 = StandardNormal.sample(&mut rng);
            short = SHORT_RATE_MEAN
                + SHORT_RATE_PERSISTENCE * (short - SHORT_RATE_MEAN)
                + SHORT_RATE_NOISE * z;
            short = short.max(SHORT_RATE_FLOOR);
        }
        rows.push(RawObservation {
            month: month_label(config.start, i),
            gdp_index: Some(gdp),
            cpi: Some(cpi),
            long_rate: Some(short + values[2]),
            short_rate: Some(short),
        });
    }

    debug!(
        seed = config.seed,
        months = config.months,
        first = %rows[0].month,
        "simulated raw table"
    );

    Ok(RawObservationTable::new(rows))
}

/// `YYYY-MM` label `offset` months after `start`.
pub fn month_label(start: chrono::NaiveDate, offset: usize) -> String {
    let total = start.year() as i64 * 12 + start.month0() as i64 + offset as i64;
    format!("{:04}-{:02}", total.div_euclid(12), total.rem_euclid(12) + 1)
}

fn simulate_path(rng: &mut StdRng, n: usize) -> Vec<VarVector> {
    let intercept = intercept_for_mean(&TRUE_A1, &TRUE_MEAN);
    let mut state = TRUE_MEAN;
    let mut path = Vec::with_capacity(n);

    for t in 0..BURN_IN + n {
        let mut next = intercept;
        for (eq, value) in next.iter_mut().enumerate() {
            for var in 0..NUM_VARS {
                *value += TRUE_A1[eq][var] * state[var];
            }
            let z: f64 = StandardNormal.sample(&mut *rng);
            *value += NOISE_STD[eq] * z;
        }
        state = next;
        if t >= BURN_IN {
            path.push(state);
        }
    }
    path
}

/// `c = (I - A) μ`, so the process is centered on `μ`.
fn intercept_for_mean(a: &VarMatrix, mean: &VarVector) -> VarVector {
    let mut c = *mean;
    for (eq, value) in c.iter_mut().enumerate() {
        for var in 0..NUM_VARS {
            *value -= a[eq][var] * mean[var];
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::prepare_var_data;
    use crate::math::mean;

    #[test]
    fn simulation_is_reproducible() {
        let a = simulate_var_table(42, 50);
        let b = simulate_var_table(42, 50);
        let c = simulate_var_table(43, 50);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 50);
        assert_eq!(a.first_month(), Some("1992-01"));
        assert_eq!(a.last_month(), Some("1996-02"));
    }

    #[test]
    fn sample_means_are_near_targets() {
        let table = simulate_var_table(3, 20_000);
        for (i, var) in crate::domain::Variable::ALL.into_iter().enumerate() {
            let m = mean(&table.column(var));
            assert!((m - TRUE_MEAN[i]).abs() < 0.15, "{var:?} mean {m}");
        }
    }

    #[test]
    fn month_labels_roll_over_years() {
        let start = chrono::NaiveDate::from_ymd_opt(2019, 11, 1).unwrap();
        assert_eq!(month_label(start, 0), "2019-11");
        assert_eq!(month_label(start, 2), "2020-01");
        assert_eq!(month_label(start, 14), "2021-01");
    }

    #[test]
    fn raw_table_prepares_back_to_growth_rates() {
        let config = SampleConfig {
            seed: 5,
            months: 24,
            ..SampleConfig::default()
        };
        let raw = simulate_raw_table(&config).unwrap();
        assert_eq!(raw.len(), 24);
        assert_eq!(raw.rows[0].gdp_index, Some(100.0));
        assert_eq!(raw.rows[0].cpi, Some(200.0));

        let prepared = prepare_var_data(&raw, false).unwrap();
        assert_eq!(prepared.len(), 23);
        assert_eq!(prepared.first_month(), Some("1992-02"));
        for row in &raw.rows {
            let spread = row.long_rate.unwrap() - row.short_rate.unwrap();
            assert!(spread.is_finite());
            assert!(row.short_rate.unwrap() >= SHORT_RATE_FLOOR);
        }
    }

    #[test]
    fn too_short_sample_is_rejected() {
        let config = SampleConfig {
            months: 1,
            ..SampleConfig::default()
        };
        assert_eq!(simulate_raw_table(&config).unwrap_err().exit_code(), 2);
    }
}
