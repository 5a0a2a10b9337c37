//! Additive regression forecaster.
//!
//! `y(t) = g(t) + s(t) + e_t` where `g` is a piecewise-linear trend whose
//! slope may change at evenly spaced changepoints inside the first part of
//! the history, and `s` is a Fourier series at the seasonal period. All
//! coefficients come from one ridge-penalised least squares solve: the
//! changepoint slope adjustments are shrunk according to the changepoint
//! prior scale, the Fourier terms according to the seasonality prior scale.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, undifference};
use crate::models::Forecaster;
use crate::utils::ols::ridge_least_squares;
use crate::utils::stats::quantile_normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fourier order used for the common seasonal periods.
///
/// Weekly cycles of daily data get 5 harmonics, monthly data 15, weekly data
/// 20 and anything else 10. The order is capped at `period / 2`.
pub fn default_fourier_order(period: usize) -> usize {
    let order = match period {
        7 => 5,
        12 => 15,
        52 => 20,
        _ => 10,
    };
    order.min(period / 2)
}

/// Design columns and their ridge penalties.
struct Design {
    columns: Vec<Vec<f64>>,
    penalties: Vec<f64>,
}

/// Piecewise-linear trend plus Fourier seasonality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveRegression {
    seasonal_period: usize,
    fourier_order: Option<usize>,
    n_changepoints: usize,
    /// Fraction of the history in which changepoints are placed.
    changepoint_range: f64,
    changepoint_prior_scale: f64,
    seasonality_prior_scale: f64,
    /// Regular differences applied before fitting.
    d: usize,
    // fitted state
    changepoints: Vec<f64>,
    coefficients: Option<Vec<f64>>,
    y_scale: f64,
    /// Rows of the design (length of the differenced training series).
    rows: usize,
    head: Vec<f64>,
    differenced: Vec<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: f64,
    aic: Option<f64>,
}

impl AdditiveRegression {
    /// Model with seasonal period `m` and the default priors
    /// (25 changepoints in the first 80%, changepoint scale 0.05,
    /// seasonality scale 10).
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            fourier_order: None,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            d: 0,
            changepoints: Vec::new(),
            coefficients: None,
            y_scale: 1.0,
            rows: 0,
            head: Vec::new(),
            differenced: Vec::new(),
            fitted: None,
            residuals: None,
            sigma2: 0.0,
            aic: None,
        }
    }

    pub fn with_fourier_order(mut self, order: usize) -> Self {
        self.fourier_order = Some(order);
        self
    }

    pub fn with_changepoints(mut self, n_changepoints: usize, changepoint_range: f64) -> Self {
        self.n_changepoints = n_changepoints;
        self.changepoint_range = changepoint_range;
        self
    }

    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Self {
        self.changepoint_prior_scale = scale;
        self
    }

    pub fn with_seasonality_prior_scale(mut self, scale: f64) -> Self {
        self.seasonality_prior_scale = scale;
        self
    }

    /// Fit on the `d`-times differenced series and integrate forecasts back.
    pub fn with_differencing(mut self, d: usize) -> Self {
        self.d = d;
        self
    }

    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    /// Harmonics actually used for the seasonal period.
    pub fn effective_fourier_order(&self) -> usize {
        if self.seasonal_period < 2 {
            return 0;
        }
        self.fourier_order
            .unwrap_or_else(|| default_fourier_order(self.seasonal_period))
            .min(self.seasonal_period / 2)
    }

    /// Changepoint locations on the scaled time axis \[0, 1\].
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Evenly spaced changepoints within the first `changepoint_range` of the rows.
    fn place_changepoints(&self, rows: usize) -> Vec<f64> {
        let hist = ((rows as f64) * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(hist.saturating_sub(1));
        if count == 0 || rows < 2 {
            return Vec::new();
        }
        let last = (hist - 1) as f64;
        let denom = (rows - 1) as f64;
        (1..=count)
            .map(|j| (last * j as f64 / count as f64).round() / denom)
            .collect()
    }

    fn scaled_time(&self, index: usize) -> f64 {
        if self.rows < 2 {
            0.0
        } else {
            index as f64 / (self.rows - 1) as f64
        }
    }

    /// Design rows for time indices `indices`.
    fn design(&self, indices: &[usize]) -> Design {
        let time: Vec<f64> = indices.iter().map(|&i| self.scaled_time(i)).collect();
        let mut columns = vec![vec![1.0; indices.len()], time.clone()];
        let mut penalties = vec![0.0, 0.0];

        let changepoint_penalty = 1.0 / (2.0 * self.changepoint_prior_scale.powi(2));
        for &c in &self.changepoints {
            columns.push(time.iter().map(|&t| (t - c).max(0.0)).collect());
            penalties.push(changepoint_penalty);
        }

        let period = self.seasonal_period as f64;
        let seasonal_penalty = 1.0 / (2.0 * self.seasonality_prior_scale.powi(2));
        for k in 1..=self.effective_fourier_order() {
            let freq = 2.0 * PI * k as f64 / period;
            columns.push(indices.iter().map(|&i| (freq * i as f64).cos()).collect());
            penalties.push(seasonal_penalty);
            // sin vanishes at the Nyquist harmonic
            if 2 * k != self.seasonal_period {
                columns.push(indices.iter().map(|&i| (freq * i as f64).sin()).collect());
                penalties.push(seasonal_penalty);
            }
        }

        Design { columns, penalties }
    }

    fn evaluate(&self, coefficients: &[f64], indices: &[usize]) -> Vec<f64> {
        let design = self.design(indices);
        (0..indices.len())
            .map(|row| {
                design
                    .columns
                    .iter()
                    .zip(coefficients)
                    .map(|(col, b)| col[row] * b)
                    .sum::<f64>()
                    * self.y_scale
            })
            .collect()
    }
}

impl Forecaster for AdditiveRegression {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues);
        }
        if !(0.0..=1.0).contains(&self.changepoint_range) {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint range must lie in [0, 1], got {}",
                self.changepoint_range
            )));
        }
        if self.changepoint_prior_scale <= 0.0 || self.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "prior scales must be positive".to_string(),
            ));
        }
        let needed = self.d + 3;
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let w = difference(values, self.d);
        let scale = w.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        self.y_scale = if scale > 0.0 { scale } else { 1.0 };
        self.rows = w.len();
        self.changepoints = self.place_changepoints(w.len());

        let indices: Vec<usize> = (0..w.len()).collect();
        let design = self.design(&indices);
        let scaled: Vec<f64> = w.iter().map(|v| v / self.y_scale).collect();
        let coefficients = ridge_least_squares(&design.columns, &scaled, &design.penalties)?;

        let fitted = self.evaluate(&coefficients, &indices);
        let residuals: Vec<f64> = w.iter().zip(fitted.iter()).map(|(y, f)| y - f).collect();
        let n = residuals.len() as f64;
        let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / n;
        if !sigma2.is_finite() {
            return Err(ForecastError::NonConvergence(
                "additive regression: residual variance is not finite".to_string(),
            ));
        }

        let k = design.columns.len() as f64 + 1.0;
        self.aic = (sigma2 > 0.0).then(|| {
            let ll = -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0);
            -2.0 * ll + 2.0 * k
        });
        self.sigma2 = sigma2;
        self.coefficients = Some(coefficients);
        self.head = values[..self.d].to_vec();
        self.differenced = w;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let coefficients = self.coefficients.as_ref().ok_or(ForecastError::FitRequired)?;
        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let indices: Vec<usize> = (self.rows..self.rows + horizon).collect();
        let future = self.evaluate(coefficients, &indices);
        if self.d == 0 {
            return Ok(Forecast::from_values(future));
        }

        let mut extended = self.differenced.clone();
        extended.extend_from_slice(&future);
        let restored = undifference(&extended, &self.head, 1, self.d, 0)?;
        Ok(Forecast::from_values(
            restored[restored.len() - horizon..].to_vec(),
        ))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let z = quantile_normal((1.0 + level) / 2.0);
        let (lower, upper) = forecast
            .values()
            .iter()
            .enumerate()
            .map(|(h, p)| {
                // integrated noise accumulates once per difference
                let steps = if self.d == 0 { 1.0 } else { (h + 1) as f64 };
                let se = (self.sigma2 * steps).sqrt();
                (p - z * se, p + z * se)
            })
            .unzip();
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
        "AdditiveRegression"
    }
}
