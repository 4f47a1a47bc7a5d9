//! Deterministic point forecasts.
//!
//! Seeded with the last `p` observed rows, each step applies
//!
//! ```text
//! ŷ_{t+h} = c + Σ_{k=1..p} A_k · ŷ_{t+h-k}
//! ```
//!
//! and appends the result to the state. No shocks are injected.

use crate::domain::{FittedVar, ForecastRow, ForecastTable, VarVector};
use crate::error::{VarError, VarResult};
use crate::math::{from_vector, to_matrix, to_vector};

impl FittedVar {
    /// One step ahead from `state` (chronological; the last `p` rows are used).
    pub fn predict_next(&self, state: &[VarVector]) -> VarVector {
        let mut next = to_vector(&self.intercept);
        for (k, lagged) in state.iter().rev().take(self.lag_order).enumerate() {
            if let Some(a) = self.lag_matrix(k + 1) {
                next += to_matrix(a) * to_vector(lagged);
            }
        }
        from_vector(&next)
    }

    /// Forecast `steps` rows ahead of `history`.
    pub fn forecast_from(&self, history: &[VarVector], steps: usize) -> VarResult<ForecastTable> {
        if steps == 0 {
            return Err(VarError::InvalidArgument("forecast steps must be at least 1".to_string()));
        }
        let p = self.lag_order;
        if history.len() < p {
            return Err(VarError::InsufficientData(format!(
                "forecast needs {p} seed rows, have {}",
                history.len()
            )));
        }

        let mut state: Vec<VarVector> = history[history.len() - p..].to_vec();
        let mut rows = Vec::with_capacity(steps);
        for step in 1..=steps {
            let next = self.predict_next(&state);
            state.push(next);
            rows.push(ForecastRow { step, values: next });
        }

        Ok(ForecastTable { rows })
    }
}
