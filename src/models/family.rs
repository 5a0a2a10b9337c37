//! Uniform interface over the model families compared by the analysis.
//!
//! Each family turns a training series and an [`AnalysisConfig`] into a
//! [`FittedModel`]. Call sites never branch on the family: they fit, then
//! forecast through the fitted model.

use crate::config::AnalysisConfig;
use crate::core::{Forecast, TimeSeries};
use crate::error::Result;
use crate::models::arima::{ArimaGridSearch, AutoArimaSearch, OrderSearch, SearchStrategy, ARIMA};
use crate::models::exponential::{HoltWinters, SeasonalType};
use crate::models::regression::AdditiveRegression;
use crate::models::Forecaster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted model of any family.
///
/// Fitting is a pure function of the training series and the configuration,
/// so a serialized `FittedModel` can be cached under a [`ModelCacheKey`].
///
/// A restored model forecasts bit-for-bit like the original only if the
/// format keeps every float exactly. With `serde_json` that means enabling
/// its `float_roundtrip` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedModel {
    Arima(ARIMA),
    HoltWinters(HoltWinters),
    AdditiveRegression(AdditiveRegression),
}

impl FittedModel {
    fn forecaster(&self) -> &dyn Forecaster {
        match self {
            FittedModel::Arima(m) => m,
            FittedModel::HoltWinters(m) => m,
            FittedModel::AdditiveRegression(m) => m,
        }
    }

    /// Point forecasts for the next `horizon` periods.
    pub fn forecast(&self, horizon: usize) -> Result<Forecast> {
        self.forecaster().predict(horizon)
    }

    pub fn forecast_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.forecaster().predict_with_intervals(horizon, level)
    }

    /// Information criterion of the fit (lower is better).
    pub fn aic(&self) -> Option<f64> {
        match self {
            FittedModel::Arima(m) => m.aic(),
            FittedModel::HoltWinters(m) => m.aic(),
            FittedModel::AdditiveRegression(m) => m.aic(),
        }
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.forecaster().residuals()
    }

    pub fn name(&self) -> &str {
        self.forecaster().name()
    }

    /// One-line description of the fitted specification.
    pub fn summary(&self) -> String {
        let aic = self
            .aic()
            .map_or_else(|| "n/a".to_string(), |a| format!("{:.3}", a));
        match self {
            FittedModel::Arima(m) => {
                format!("{} AIC={} sigma2={:.4}", m.order(), aic, m.sigma2())
            }
            FittedModel::HoltWinters(m) => match m.smoothing() {
                Some(s) => format!(
                    "{} alpha={:.3} beta={:.3} gamma={:.3} phi={:.3} AIC={}",
                    m.name(),
                    s.alpha,
                    s.beta,
                    s.gamma,
                    s.phi,
                    aic
                ),
                None => format!("{} (unfitted)", m.name()),
            },
            FittedModel::AdditiveRegression(m) => format!(
                "{} m={} fourier={} changepoints={} AIC={}",
                m.name(),
                m.seasonal_period(),
                m.effective_fourier_order(),
                m.changepoints().len(),
                aic
            ),
        }
    }
}

impl fmt::Display for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// A model family that can be fitted to a training series.
pub trait ModelFamily {
    /// Label used in metric tables and cache keys.
    fn name(&self) -> &str;

    fn fit(&self, train: &TimeSeries, config: &AnalysisConfig) -> Result<FittedModel>;
}

/// Exhaustive ARIMA grid search over `config.order_search_ranges`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArimaFamily;

impl ModelFamily for ArimaFamily {
    fn name(&self) -> &str {
        "ARIMA"
    }

    fn fit(&self, train: &TimeSeries, config: &AnalysisConfig) -> Result<FittedModel> {
        let outcome = ArimaGridSearch::from_config(config).search(train)?;
        Ok(FittedModel::Arima(outcome.model))
    }
}

/// Heuristic ARIMA search over explicit `(d, D)` combinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoArimaFamily {
    pub strategy: SearchStrategy,
}

impl ModelFamily for AutoArimaFamily {
    fn name(&self) -> &str {
        "AUTO-ARIMA"
    }

    fn fit(&self, train: &TimeSeries, config: &AnalysisConfig) -> Result<FittedModel> {
        let outcome = AutoArimaSearch::from_config(config)
            .with_strategy(self.strategy)
            .search(train)?;
        Ok(FittedModel::Arima(outcome.model))
    }
}

/// Holt-Winters with additive trend, optimised smoothing constants and bias removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialSmoothing {
    pub seasonal_type: SeasonalType,
    pub damped: bool,
    pub remove_bias: bool,
}

impl Default for ExponentialSmoothing {
    fn default() -> Self {
        Self {
            seasonal_type: SeasonalType::Additive,
            damped: false,
            remove_bias: true,
        }
    }
}

impl ModelFamily for ExponentialSmoothing {
    fn name(&self) -> &str {
        "Holt-Winters"
    }

    fn fit(&self, train: &TimeSeries, config: &AnalysisConfig) -> Result<FittedModel> {
        let mut model = HoltWinters::auto(config.seasonal_period, self.seasonal_type)
            .damped(self.damped)
            .with_remove_bias(self.remove_bias);
        model.fit(train)?;
        let fitted = FittedModel::HoltWinters(model);
        log::info!("{}: {}", self.name(), fitted);
        Ok(fitted)
    }
}

/// Piecewise-linear trend plus Fourier seasonality at `config.seasonal_period`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdditiveRegressionFamily {
    /// Regular differences applied before fitting.
    pub d: usize,
}

impl ModelFamily for AdditiveRegressionFamily {
    fn name(&self) -> &str {
        "AdditiveRegression"
    }

    fn fit(&self, train: &TimeSeries, config: &AnalysisConfig) -> Result<FittedModel> {
        let mut model = AdditiveRegression::new(config.seasonal_period).with_differencing(self.d);
        model.fit(train)?;
        Ok(FittedModel::AdditiveRegression(model))
    }
}

/// The four families compared by default, in reporting order.
pub fn default_families() -> Vec<Box<dyn ModelFamily>> {
    vec![
        Box::new(AutoArimaFamily::default()),
        Box::new(ArimaFamily),
        Box::new(ExponentialSmoothing::default()),
        Box::new(AdditiveRegressionFamily::default()),
    ]
}

/// Deterministic key under which a fitted model may be cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCacheKey {
    pub dataset: String,
    pub family: String,
    pub seasonal_period: usize,
    pub series_len: usize,
}

impl ModelCacheKey {
    pub fn new(
        dataset: impl Into<String>,
        family: impl Into<String>,
        seasonal_period: usize,
        series_len: usize,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            family: family.into(),
            seasonal_period,
            series_len,
        }
    }

    /// Key for fitting `family` on `train` under `config`.
    pub fn for_fit(
        dataset: impl Into<String>,
        family: &dyn ModelFamily,
        train: &TimeSeries,
        config: &AnalysisConfig,
    ) -> Self {
        Self::new(dataset, family.name(), config.seasonal_period, train.len())
    }
}

impl fmt::Display for ModelCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.dataset, self.family, self.seasonal_period, self.series_len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrderSearchRanges;
    use crate::core::Frequency;
    use chrono::{TimeZone, Utc};

    fn monthly(n: usize) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2016, 1, 31, 0, 0, 0).unwrap();
        let values = (0..n)
            .map(|i| {
                50.0 + 0.3 * i as f64
                    + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 4.0).sin()
                    + ((i * 7) % 5) as f64 * 0.3
            })
            .collect();
        TimeSeries::regular(start, Frequency::MonthEnd, values).unwrap()
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig::default()
            .with_seasonal_period(4)
            .with_order_search_ranges(
                OrderSearchRanges::default()
                    .with_nonseasonal(0..=1, 0..=1, 0..=1)
                    .with_seasonal(0..=0, 0..=1, 0..=0),
            )
    }

    #[test]
    fn every_family_forecasts_through_the_same_interface() {
        let train = monthly(48);
        let config = small_config();
        let families: Vec<Box<dyn ModelFamily>> = vec![
            Box::new(ArimaFamily),
            Box::new(AutoArimaFamily {
                strategy: SearchStrategy::Stepwise,
            }),
            Box::new(ExponentialSmoothing::default()),
            Box::new(AdditiveRegressionFamily::default()),
        ];
        for family in &families {
            let model = family.fit(&train, &config).unwrap();
            let forecast = model.forecast(6).unwrap();
            assert_eq!(forecast.horizon(), 6, "{}", family.name());
            assert!(forecast.values().iter().all(|v| v.is_finite()));
            assert!(!model.summary().is_empty());
        }
    }

    #[test]
    fn fitted_model_serializes_as_opaque_value() {
        let model = ArimaFamily.fit(&monthly(40), &small_config()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.forecast(4).unwrap(), model.forecast(4).unwrap());
        assert!(back.summary().starts_with("ARIMA("));
    }

    #[test]
    fn cache_key_has_deterministic_string_form() {
        let config = AnalysisConfig::default();
        let train = monthly(30);
        let key = ModelCacheKey::for_fit("airline", &ArimaFamily, &train, &config);
        assert_eq!(key.to_string(), "airline_ARIMA_12_30");
        assert_eq!(key, ModelCacheKey::new("airline", "ARIMA", 12, 30));
    }

    #[test]
    fn default_families_are_in_reporting_order() {
        let names: Vec<_> = default_families()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["AUTO-ARIMA", "ARIMA", "Holt-Winters", "AdditiveRegression"]
        );
    }
}
