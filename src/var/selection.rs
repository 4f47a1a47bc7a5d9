//! Lag-order selection by information-criteria voting.
//!
//! For each candidate lag `L = 1..=max_lag` we fit a VAR(L) over the full table
//! and record AIC, BIC, FPE, and HQIC. Each criterion votes for its arg-min
//! lag; the selected lag is the most frequent vote.
//!
//! Tie-breaking (deterministic):
//! 1. within one criterion, equal scores go to the smaller lag
//! 2. when several lags share the highest vote count (including the case where
//!    all four criteria disagree), the smallest of them is chosen

use rayon::prelude::*;
use tracing::info;

use crate::domain::{InformationCriteria, LagCriteria, LagSelection, LagSource, NUM_VARS, VarSeriesTable};
use crate::error::{VarError, VarResult};
use crate::var::fitter::fit_var;

/// Run lag selection over `1..=max_lag`.
///
/// Fails with `InsufficientData` when `max_lag` is zero or the largest
/// candidate would leave no residual degrees of freedom
/// (`T - max_lag <= 3·max_lag + 1`).
///
/// This is the exact degrees-of-freedom bound for VAR(`max_lag`), used in
/// place of the rough `max_lag < T / (3·max_lag + 1)` rule of thumb, which
/// would demand ~445 observations for `max_lag = 12`.
pub fn select_lag_order(table: &VarSeriesTable, max_lag: usize) -> VarResult<LagSelection> {
    let t = table.len();
    if max_lag == 0 {
        return Err(VarError::InsufficientData("max_lag must be at least 1".to_string()));
    }
    let needed = max_lag + NUM_VARS * max_lag + 1;
    if t <= needed {
        return Err(VarError::InsufficientData(format!(
            "max_lag={max_lag} needs more than {needed} observations, have {t}"
        )));
    }

    // Candidates are independent; collect keeps lag order.
    let table_rows: Vec<LagCriteria> = (1..=max_lag)
        .into_par_iter()
        .map(|lag| {
            fit_var(table, lag, LagSource::Explicit).map(|fit| LagCriteria {
                lag,
                criteria: fit.criteria,
            })
        })
        .collect::<VarResult<Vec<_>>>()?;

    let aic_lag = argmin_lag(&table_rows, |c| c.aic);
    let bic_lag = argmin_lag(&table_rows, |c| c.bic);
    let fpe_lag = argmin_lag(&table_rows, |c| c.fpe);
    let hqic_lag = argmin_lag(&table_rows, |c| c.hqic);
    let optimal_lag = majority_vote(&[aic_lag, bic_lag, fpe_lag, hqic_lag]);

    info!(aic_lag, bic_lag, fpe_lag, hqic_lag, optimal_lag, "lag selection complete");

    Ok(LagSelection {
        max_lag,
        table: table_rows,
        aic_lag,
        bic_lag,
        fpe_lag,
        hqic_lag,
        optimal_lag,
    })
}

/// Lag with the lowest finite score; ties and non-finite scores favour the
/// earlier (smaller) lag.
fn argmin_lag(rows: &[LagCriteria], key: impl Fn(&InformationCriteria) -> f64) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for row in rows {
        let v = key(&row.criteria);
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((row.lag, v)),
        }
    }
    best.map(|(lag, _)| lag)
        .or_else(|| rows.first().map(|r| r.lag))
        .unwrap_or(1)
}

/// Most frequent vote; the smallest lag wins among equally frequent votes.
pub(crate) fn majority_vote(votes: &[usize]) -> usize {
    let mut best_lag = usize::MAX;
    let mut best_count = 0;
    for &lag in votes {
        let count = votes.iter().filter(|&&v| v == lag).count();
        if count > best_count || (count == best_count && lag < best_lag) {
            best_lag = lag;
            best_count = count;
        }
    }
    if best_count == 0 { 1 } else { best_lag }
}
