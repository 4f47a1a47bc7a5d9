//! Stateful VAR model builder.
//!
//! The builder owns the three-series table plus two cached results:
//!
//! - the last lag selection (`select_optimal_lag`)
//! - the fitted model (`fit_model`)
//!
//! Its lifecycle is `Unfitted -> Fitted -> Fitted`. Every transition replaces
//! a cached value wholesale, and a failed call leaves the previous state
//! untouched.

use tracing::{info, warn};

use crate::domain::{
    DEFAULT_LAG_ORDER, FittedVar, ForecastTable, ImpulseResponse, LagSelection, LagSource,
    ModelDiagnostics, ModelFile, VarSeriesTable, VarianceDecomposition, Variable,
};
use crate::error::{VarError, VarResult};
use crate::var::{fit_var, regressors_per_equation, select_lag_order};

/// Identifier written into saved model files.
pub const MODEL_FILE_TOOL: &str = "macro-var";

#[derive(Debug, Clone, PartialEq)]
pub struct VarModelBuilder {
    data: VarSeriesTable,
    lag_selection: Option<LagSelection>,
    model: Option<FittedVar>,
}

impl VarModelBuilder {
    pub fn new(data: VarSeriesTable) -> Self {
        Self {
            data,
            lag_selection: None,
            model: None,
        }
    }

    /// Restore a builder from previously computed parts.
    pub fn from_parts(
        data: VarSeriesTable,
        lag_selection: Option<LagSelection>,
        model: Option<FittedVar>,
    ) -> VarResult<Self> {
        if let Some(model) = &model {
            check_model_shape(model, data.len())?;
        }
        Ok(Self {
            data,
            lag_selection,
            model,
        })
    }

    pub fn data(&self) -> &VarSeriesTable {
        &self.data
    }

    pub fn variables(&self) -> [Variable; 3] {
        Variable::ALL
    }

    pub fn lag_selection(&self) -> Option<&LagSelection> {
        self.lag_selection.as_ref()
    }

    pub fn model(&self) -> Option<&FittedVar> {
        self.model.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// The fitted model, or `NotFitted`.
    pub fn fitted(&self) -> VarResult<&FittedVar> {
        self.model.as_ref().ok_or(VarError::NotFitted)
    }

    /// Score lags `1..=max_lag` and cache the result. Does not touch the model.
    pub fn select_optimal_lag(&mut self, max_lag: usize) -> VarResult<&LagSelection> {
        let selection = select_lag_order(&self.data, max_lag)?;
        let cached = self.lag_selection.insert(selection);
        Ok(&*cached)
    }

    /// Fit a VAR at the given lag, the cached optimal lag, or the fallback.
    pub fn fit_model(&mut self, lag_order: Option<usize>) -> VarResult<&FittedVar> {
        let (lag, source) = match (lag_order, &self.lag_selection) {
            (Some(lag), _) => (lag, LagSource::Explicit),
            (None, Some(selection)) => (selection.optimal_lag, LagSource::Selected),
            (None, None) => {
                warn!(
                    lag = DEFAULT_LAG_ORDER,
                    "no lag order given and no lag selection available; using default"
                );
                (DEFAULT_LAG_ORDER, LagSource::Default)
            }
        };

        let fitted = fit_var(&self.data, lag, source)?;
        info!(lag, source = ?source, nobs = fitted.nobs, "VAR model fitted");
        let model = self.model.insert(fitted);
        Ok(&*model)
    }

    pub fn model_diagnostics(&self) -> VarResult<ModelDiagnostics> {
        Ok(self.fitted()?.diagnostics())
    }

    /// Point forecast seeded with the last `p` rows of the table.
    pub fn forecast(&self, steps: usize) -> VarResult<ForecastTable> {
        let model = self.fitted()?;
        model.forecast_from(&self.data.values(), steps)
    }

    /// Impulse responses tagged with the builder's variable order.
    pub fn impulse_response(&self, periods: usize) -> VarResult<ImpulseResponse> {
        let mut irf = self.fitted()?.impulse_response(periods)?;
        irf.variables = self.variables().to_vec();
        Ok(irf)
    }

    pub fn forecast_error_variance_decomposition(
        &self,
        periods: usize,
    ) -> VarResult<VarianceDecomposition> {
        let mut fevd = self.fitted()?.variance_decomposition(periods)?;
        fevd.variables = self.variables().to_vec();
        Ok(fevd)
    }

    /// Human-readable model summary.
    pub fn summary(&self) -> String {
        match &self.model {
            Some(model) => crate::report::format_model_summary(model, &self.data),
            None => "Model not yet fitted".to_string(),
        }
    }

    pub fn to_model_file(&self) -> ModelFile {
        ModelFile {
            tool: MODEL_FILE_TOOL.to_string(),
            variables: self.variables().to_vec(),
            data: self.data.clone(),
            lag_selection: self.lag_selection.clone(),
            model: self.model.clone(),
        }
    }

    pub fn from_model_file(file: ModelFile) -> VarResult<Self> {
        if file.variables != Variable::ALL {
            return Err(VarError::InvalidArgument(format!(
                "model file variables {:?} do not match {:?}",
                file.variables,
                Variable::ALL
            )));
        }
        Self::from_parts(file.data, file.lag_selection, file.model)
    }
}

/// Fit at a fixed lag (no selection) and forecast in one call.
pub fn quick_forecast(
    data: VarSeriesTable,
    steps: usize,
    lag_order: usize,
) -> VarResult<(VarModelBuilder, ForecastTable)> {
    let mut builder = VarModelBuilder::new(data);
    builder.fit_model(Some(lag_order))?;
    let forecast = builder.forecast(steps)?;
    Ok((builder, forecast))
}

/// Reject restored models whose parts disagree with their lag order.
fn check_model_shape(model: &FittedVar, rows: usize) -> VarResult<()> {
    let p = model.lag_order;
    let problem = if p == 0 {
        Some("lag order is 0".to_string())
    } else if p > rows {
        return Err(VarError::InsufficientData(format!(
            "model has lag order {p} but the table has {rows} rows"
        )));
    } else if model.coefs.len() != p {
        Some(format!("{} lag matrices for lag order {p}", model.coefs.len()))
    } else if model.stderr.len() != regressors_per_equation(p) {
        Some(format!(
            "{} standard-error rows, expected {}",
            model.stderr.len(),
            regressors_per_equation(p)
        ))
    } else if model.residuals.len() != model.nobs {
        Some(format!("{} residual rows for {} observations", model.residuals.len(), model.nobs))
    } else {
        None
    };

    match problem {
        Some(msg) => Err(VarError::InvalidArgument(format!("inconsistent fitted model: {msg}"))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var_table;

    #[test]
    fn unfitted_builder_rejects_model_queries() {
        let builder = VarModelBuilder::new(simulate_var_table(2, 100));
        assert_eq!(builder.forecast(3), Err(VarError::NotFitted));
        assert_eq!(builder.model_diagnostics(), Err(VarError::NotFitted));
        assert_eq!(builder.impulse_response(5).err(), Some(VarError::NotFitted));
        assert_eq!(
            builder.forecast_error_variance_decomposition(5).err(),
            Some(VarError::NotFitted)
        );
        assert_eq!(builder.summary(), "Model not yet fitted");
    }

    #[test]
    fn fallback_lag_is_recorded() {
        let mut builder = VarModelBuilder::new(simulate_var_table(2, 100));
        let model = builder.fit_model(None).unwrap();
        assert_eq!(model.lag_order, DEFAULT_LAG_ORDER);
        assert_eq!(model.lag_source, LagSource::Default);
    }

    #[test]
    fn selected_lag_is_used_when_no_lag_given() {
        let mut builder = VarModelBuilder::new(simulate_var_table(3, 200));
        let optimal = builder.select_optimal_lag(4).unwrap().optimal_lag;
        assert!(!builder.is_fitted());
        let model = builder.fit_model(None).unwrap();
        assert_eq!(model.lag_order, optimal);
        assert_eq!(model.lag_source, LagSource::Selected);

        let model = builder.fit_model(Some(3)).unwrap();
        assert_eq!(model.lag_order, 3);
        assert_eq!(model.lag_source, LagSource::Explicit);
    }

    #[test]
    fn forecast_is_idempotent() {
        let mut builder = VarModelBuilder::new(simulate_var_table(5, 150));
        builder.fit_model(Some(2)).unwrap();
        let a = builder.forecast(12).unwrap();
        let b = builder.forecast(12).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.steps(), 12);
    }

    #[test]
    fn failed_fit_keeps_previous_model() {
        let mut builder = VarModelBuilder::new(simulate_var_table(5, 40));
        builder.fit_model(Some(1)).unwrap();
        let before = builder.model().cloned();

        let err = builder.fit_model(Some(40)).unwrap_err();
        assert!(matches!(err, VarError::Estimation(_)));
        assert_eq!(builder.model().cloned(), before);
    }

    #[test]
    fn diagnostics_count_parameters() {
        let mut builder = VarModelBuilder::new(simulate_var_table(5, 150));
        builder.fit_model(Some(2)).unwrap();
        let diag = builder.model_diagnostics().unwrap();
        assert_eq!(diag.num_params, 2 * 9 + 3);
        assert_eq!(diag.num_obs, 148);
    }

    #[test]
    fn model_file_round_trip_preserves_forecasts() {
        let mut builder = VarModelBuilder::new(simulate_var_table(11, 180));
        builder.select_optimal_lag(4).unwrap();
        builder.fit_model(None).unwrap();
        let forecast = builder.forecast(6).unwrap();
        let restored = VarModelBuilder::from_model_file(builder.to_model_file()).unwrap();
        assert_eq!(restored.forecast(6).unwrap(), forecast);
        assert_eq!(restored.lag_selection(), builder.lag_selection());
    }

    #[test]
    fn quick_forecast_fits_the_given_lag_without_selection() {
        let (builder, forecast) = quick_forecast(simulate_var_table(11, 180), 6, 2).unwrap();
        assert!(builder.lag_selection().is_none());
        let model = builder.model().unwrap();
        assert_eq!(model.lag_order, 2);
        assert_eq!(model.lag_source, LagSource::Explicit);
        assert_eq!(forecast.steps(), 6);
    }

    #[test]
    fn inconsistent_models_are_rejected_on_restore() {
        let mut builder = VarModelBuilder::new(simulate_var_table(3, 120));
        builder.fit_model(Some(2)).unwrap();
        let good = builder.model().unwrap().clone();
        let data = builder.data().clone();

        let mut lag_mismatch = good.clone();
        lag_mismatch.lag_order = 1;
        let mut zero_lag = good.clone();
        zero_lag.lag_order = 0;
        let mut short_stderr = good.clone();
        short_stderr.stderr.pop();
        let mut short_resid = good.clone();
        short_resid.residuals.pop();

        for model in [lag_mismatch, zero_lag, short_stderr, short_resid] {
            let err = VarModelBuilder::from_parts(data.clone(), None, Some(model)).unwrap_err();
            assert!(matches!(err, VarError::InvalidArgument(_)), "{err:?}");
        }
        assert!(VarModelBuilder::from_parts(data, None, Some(good)).is_ok());
    }

    #[test]
    fn analyses_are_tagged_in_builder_order() {
        let mut builder = VarModelBuilder::new(simulate_var_table(6, 150));
        builder.fit_model(Some(1)).unwrap();
        assert_eq!(builder.impulse_response(4).unwrap().variables, builder.variables().to_vec());
        assert_eq!(
            builder.forecast_error_variance_decomposition(4).unwrap().variables,
            builder.variables().to_vec()
        );
    }
}
