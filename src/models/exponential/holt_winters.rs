//! Holt-Winters forecasting model.
//!
//! Also known as triple exponential smoothing, this model handles
//! data with both trend and seasonality.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::quantile_normal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const PARAM_BOUNDS: (f64, f64) = (0.0001, 0.9999);
const PHI_BOUNDS: (f64, f64) = (0.8, 0.98);

/// Type of seasonal component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeasonalType {
    /// Additive seasonality: y_t = l_t + b_t + s_t + e_t
    #[default]
    Additive,
    /// Multiplicative seasonality: y_t = (l_t + b_t) * s_t + e_t
    Multiplicative,
}

impl FromStr for SeasonalType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" | "additive" => Ok(SeasonalType::Additive),
            "mul" | "multiplicative" => Ok(SeasonalType::Multiplicative),
            other => Err(ForecastError::InvalidConfiguration(format!(
                "unknown seasonal type '{}', expected 'add' or 'mul'",
                other
            ))),
        }
    }
}

/// Type of trend component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendType {
    None,
    #[default]
    Additive,
}

impl FromStr for TrendType {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" | "additive" => Ok(TrendType::Additive),
            "none" => Ok(TrendType::None),
            other => Err(ForecastError::InvalidConfiguration(format!(
                "unknown trend type '{}', expected 'add' or 'none'",
                other
            ))),
        }
    }
}

/// Smoothing constants. `beta` and `phi` are ignored without a trend,
/// `gamma` without a seasonal component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub phi: f64,
}

/// Final state and in-sample fit of one smoothing pass.
struct Pass {
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
    fitted: Vec<f64>,
    sse: f64,
}

/// Holt-Winters forecaster.
///
/// The model equations for additive seasonality:
/// - Level: `l_t = α(y_t - s_{t-m}) + (1-α)(l_{t-1} + φb_{t-1})`
/// - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)φb_{t-1}`
/// - Seasonal: `s_t = γ(y_t - l_t) + (1-γ)s_{t-m}`
/// - Forecast: `ŷ_{t+h} = l_t + (φ + ... + φ^h)b_t + s_{t+h-m}`
///
/// Without damping φ = 1. For multiplicative seasonality the seasonal term
/// divides the observation in the level update and scales the forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoltWinters {
    /// Seasonal period (1 disables the seasonal component).
    seasonal_period: usize,
    seasonal_type: Option<SeasonalType>,
    trend_type: TrendType,
    damped: bool,
    /// Add the mean in-sample residual to every forecast.
    remove_bias: bool,
    /// Fixed constants; optimised when `None` at fit time.
    fixed: Option<Smoothing>,
    smoothing: Option<Smoothing>,
    level: Option<f64>,
    trend: Option<f64>,
    seasonals: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    bias: f64,
    aic: Option<f64>,
    /// Original series length.
    n: usize,
}

impl HoltWinters {
    /// Optimised model with additive trend and the given seasonality.
    pub fn auto(seasonal_period: usize, seasonal_type: SeasonalType) -> Self {
        let seasonal_type = (seasonal_period > 1).then_some(seasonal_type);
        Self {
            seasonal_period: seasonal_period.max(1),
            seasonal_type,
            trend_type: TrendType::Additive,
            damped: false,
            remove_bias: false,
            fixed: None,
            smoothing: None,
            level: None,
            trend: None,
            seasonals: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
            bias: 0.0,
            aic: None,
            n: 0,
        }
    }

    /// Additive model with fixed smoothing constants.
    pub fn additive(alpha: f64, beta: f64, gamma: f64, seasonal_period: usize) -> Self {
        Self::auto(seasonal_period, SeasonalType::Additive).with_params(alpha, beta, gamma)
    }

    /// Multiplicative model with fixed smoothing constants.
    pub fn multiplicative(alpha: f64, beta: f64, gamma: f64, seasonal_period: usize) -> Self {
        Self::auto(seasonal_period, SeasonalType::Multiplicative).with_params(alpha, beta, gamma)
    }

    /// Fix the smoothing constants instead of optimising them.
    pub fn with_params(mut self, alpha: f64, beta: f64, gamma: f64) -> Self {
        let (lo, hi) = PARAM_BOUNDS;
        self.fixed = Some(Smoothing {
            alpha: alpha.clamp(lo, hi),
            beta: beta.clamp(lo, hi),
            gamma: gamma.clamp(lo, hi),
            phi: 1.0,
        });
        self
    }

    pub fn with_trend(mut self, trend_type: TrendType) -> Self {
        self.trend_type = trend_type;
        self
    }

    /// Damp the trend; φ is optimised in \[0.8, 0.98\].
    pub fn damped(mut self, damped: bool) -> Self {
        self.damped = damped;
        self
    }

    pub fn with_remove_bias(mut self, remove_bias: bool) -> Self {
        self.remove_bias = remove_bias;
        self
    }

    /// Get the smoothing constants used by the last fit.
    pub fn smoothing(&self) -> Option<Smoothing> {
        self.smoothing
    }

    pub fn alpha(&self) -> Option<f64> {
        self.smoothing.or(self.fixed).map(|s| s.alpha)
    }

    /// Get the seasonal period.
    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    /// Get the seasonal type (`None` for a non-seasonal model).
    pub fn seasonal_type(&self) -> Option<SeasonalType> {
        self.seasonal_type
    }

    pub fn trend_type(&self) -> TrendType {
        self.trend_type
    }

    /// Get the current level.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Get the seasonal indices.
    pub fn seasonals(&self) -> Option<&[f64]> {
        self.seasonals.as_deref()
    }

    /// Mean in-sample residual added to forecasts (0 unless bias removal is on).
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    fn has_trend(&self) -> bool {
        self.trend_type == TrendType::Additive
    }

    /// Observations used to initialise the state.
    fn warmup(&self) -> usize {
        if self.seasonal_type.is_some() {
            self.seasonal_period
        } else {
            1
        }
    }

    /// Initialize state from first complete season(s).
    fn initialize_state(&self, values: &[f64]) -> (f64, f64, Vec<f64>) {
        let period = self.warmup();
        // Initial level: average of first season
        let first_season = &values[..period];
        let level = first_season.iter().sum::<f64>() / period as f64;

        let trend = if !self.has_trend() {
            0.0
        } else if self.seasonal_type.is_some() {
            // average of seasonal differences over the first two seasons
            (0..period)
                .map(|i| (values[period + i] - values[i]) / period as f64)
                .sum::<f64>()
                / period as f64
        } else {
            values[1] - values[0]
        };

        let mut seasonals: Vec<f64> = match self.seasonal_type {
            None => vec![0.0],
            Some(SeasonalType::Additive) => first_season.iter().map(|y| y - level).collect(),
            Some(SeasonalType::Multiplicative) => first_season
                .iter()
                .map(|y| if level.abs() > 1e-10 { y / level } else { 1.0 })
                .collect(),
        };
        if let Some(seasonal_type) = self.seasonal_type {
            normalize_seasonals(&mut seasonals, seasonal_type);
        }

        (level, trend, seasonals)
    }

    /// One smoothing pass over `values`.
    fn smooth(&self, values: &[f64], params: Smoothing) -> Pass {
        let period = self.warmup();
        let Smoothing {
            alpha,
            beta,
            gamma,
            phi,
        } = params;
        let (mut level, mut trend, mut seasonals) = self.initialize_state(values);

        // the first season only seeds the state
        let mut fitted = values[..period].to_vec();
        fitted.reserve(values.len() - period);
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate().skip(period) {
            let season_idx = t % period;
            let s = seasonals[season_idx];
            let damped_trend = phi * trend;

            let forecast = match self.seasonal_type {
                Some(SeasonalType::Multiplicative) => (level + damped_trend) * s,
                _ => level + damped_trend + s,
            };
            fitted.push(forecast);
            let error = y - forecast;
            sse += error * error;

            let level_prev = level;
            match self.seasonal_type {
                None => {
                    level = alpha * y + (1.0 - alpha) * (level_prev + damped_trend);
                }
                Some(SeasonalType::Additive) => {
                    level = alpha * (y - s) + (1.0 - alpha) * (level_prev + damped_trend);
                    seasonals[season_idx] = gamma * (y - level) + (1.0 - gamma) * s;
                }
                Some(SeasonalType::Multiplicative) => {
                    let y_deseasonalized = if s.abs() > 1e-10 { y / s } else { y };
                    level = alpha * y_deseasonalized + (1.0 - alpha) * (level_prev + damped_trend);
                    if level.abs() > 1e-10 {
                        seasonals[season_idx] = gamma * (y / level) + (1.0 - gamma) * s;
                    }
                }
            }
            if self.has_trend() {
                trend = beta * (level - level_prev) + (1.0 - beta) * damped_trend;
            }
        }

        Pass {
            level,
            trend,
            seasonals,
            fitted,
            sse,
        }
    }

    /// Map an optimiser point onto smoothing constants for this model's components.
    fn unpack(&self, point: &[f64]) -> Smoothing {
        let mut values = point.iter().copied();
        let alpha = values.next().unwrap_or(0.3);
        let beta = if self.has_trend() {
            values.next().unwrap_or(0.1)
        } else {
            0.0
        };
        let gamma = if self.seasonal_type.is_some() {
            values.next().unwrap_or(0.1)
        } else {
            0.0
        };
        let phi = if self.has_trend() && self.damped {
            values.next().unwrap_or(0.9)
        } else {
            1.0
        };
        Smoothing {
            alpha,
            beta,
            gamma,
            phi,
        }
    }

    /// Optimize parameters using Nelder-Mead.
    fn optimize_params(&self, values: &[f64]) -> Result<Smoothing> {
        let mut initial = vec![0.3];
        let mut bounds = vec![PARAM_BOUNDS];
        if self.has_trend() {
            initial.push(0.1);
            bounds.push(PARAM_BOUNDS);
        }
        if self.seasonal_type.is_some() {
            initial.push(0.1);
            bounds.push(PARAM_BOUNDS);
        }
        if self.has_trend() && self.damped {
            initial.push(0.9);
            bounds.push(PHI_BOUNDS);
        }

        let config = NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        };
        let result = nelder_mead(
            |point| self.smooth(values, self.unpack(point)).sse,
            &initial,
            Some(&bounds),
            config,
        );
        if !result.is_finite() {
            return Err(ForecastError::NonConvergence(
                "Holt-Winters: smoothing objective is not finite".to_string(),
            ));
        }
        Ok(self.unpack(&result.optimal_point))
    }

    fn num_params(&self) -> usize {
        let smoothing = 1
            + usize::from(self.has_trend())
            + usize::from(self.seasonal_type.is_some())
            + usize::from(self.has_trend() && self.damped);
        let initial_states = 1
            + usize::from(self.has_trend())
            + self.seasonal_type.map_or(0, |_| self.seasonal_period);
        smoothing + initial_states
    }

    /// Sum of φ^1..φ^h.
    fn damped_steps(&self, h: usize) -> f64 {
        let phi = self.smoothing.map_or(1.0, |s| s.phi);
        (1..=h).map(|i| phi.powi(i as i32)).sum()
    }
}

/// Normalize seasonal components to maintain constraints.
/// Additive: seasonals sum to 0
/// Multiplicative: seasonals average to 1
fn normalize_seasonals(seasonals: &mut [f64], seasonal_type: SeasonalType) {
    let period = seasonals.len();
    if period == 0 {
        return;
    }

    match seasonal_type {
        SeasonalType::Additive => {
            let adjustment = seasonals.iter().sum::<f64>() / period as f64;
            for s in seasonals.iter_mut() {
                *s -= adjustment;
            }
        }
        SeasonalType::Multiplicative => {
            let mean: f64 = seasonals.iter().sum::<f64>() / period as f64;
            if mean.abs() > 1e-10 {
                for s in seasonals.iter_mut() {
                    *s /= mean;
                }
            }
        }
    }
}

impl Default for HoltWinters {
    fn default() -> Self {
        Self::auto(12, SeasonalType::Additive)
    }
}

impl Forecaster for HoltWinters {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues);
        }
        let needed = if self.seasonal_type.is_some() {
            2 * self.seasonal_period
        } else {
            3
        };
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if self.seasonal_type == Some(SeasonalType::Multiplicative)
            && values.iter().any(|&v| v <= 0.0)
        {
            return Err(ForecastError::InvalidParameter(
                "multiplicative seasonality requires strictly positive data".to_string(),
            ));
        }

        let params = match self.fixed {
            Some(fixed) => fixed,
            None => self.optimize_params(values)?,
        };
        let pass = self.smooth(values, params);

        let warmup = self.warmup();
        let residuals: Vec<f64> = values
            .iter()
            .zip(pass.fitted.iter())
            .map(|(y, f)| y - f)
            .collect();
        let effective = &residuals[warmup..];
        let n_eff = effective.len() as f64;
        let variance = pass.sse / n_eff;
        if !variance.is_finite() {
            return Err(ForecastError::NonConvergence(
                "Holt-Winters: residual variance is not finite".to_string(),
            ));
        }

        self.n = values.len();
        self.smoothing = Some(params);
        self.level = Some(pass.level);
        self.trend = Some(pass.trend);
        self.seasonals = Some(pass.seasonals);
        self.fitted = Some(pass.fitted);
        self.bias = if self.remove_bias {
            effective.iter().sum::<f64>() / n_eff
        } else {
            0.0
        };
        // a perfect fit has an unbounded likelihood
        self.aic = (variance > 0.0)
            .then(|| n_eff * variance.ln() + 2.0 * self.num_params() as f64);
        self.residual_variance = Some(variance);
        self.residuals = Some(residuals);

        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(ForecastError::FitRequired)?;
        let trend = self.trend.ok_or(ForecastError::FitRequired)?;
        let seasonals = self.seasonals.as_ref().ok_or(ForecastError::FitRequired)?;
        let period = self.warmup();

        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let predictions: Vec<f64> = (1..=horizon)
            .map(|h| {
                let season_idx = (self.n + h - 1) % period;
                let s = seasonals[season_idx];
                let base = level + self.damped_steps(h) * trend;
                let point = match self.seasonal_type {
                    Some(SeasonalType::Multiplicative) => base * s,
                    _ => base + s,
                };
                point + self.bias
            })
            .collect();

        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let variance = self.residual_variance.unwrap_or(0.0);
        let period = self.warmup();
        let z = quantile_normal((1.0 + level) / 2.0);

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (i, pred) in forecast.values().iter().enumerate() {
            // Simplified standard error approximation
            let k = (i / period) + 1;
            let se = (variance * k as f64).sqrt();
            lower.push(pred - z * se);
            upper.push(pred + z * se);
        }

        Ok(Forecast::from_values_with_intervals(
            forecast.values().to_vec(),
            lower,
            upper,
        ))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        match self.seasonal_type {
            Some(SeasonalType::Additive) => "HoltWinters(additive)",
            Some(SeasonalType::Multiplicative) => "HoltWinters(multiplicative)",
            None => "HoltWinters(non-seasonal)",
        }
    }
}
