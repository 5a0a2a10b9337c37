//! Seasonal ARIMA model fitted by conditional sum of squares.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{consumed_observations, difference_values, undifference};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::quantile_normal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model order (p, d, q)(P, D, Q)\[s\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Seasonal period.
    pub s: usize,
}

impl ModelOrder {
    /// Non-seasonal ARIMA(p, d, q).
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            s: 1,
        }
    }

    /// Add the seasonal part (P, D, Q)\[s\].
    pub fn with_seasonal(mut self, cap_p: usize, cap_d: usize, cap_q: usize, s: usize) -> Self {
        self.cap_p = cap_p;
        self.cap_d = cap_d;
        self.cap_q = cap_q;
        self.s = s;
        self
    }

    /// Check if this is a seasonal model.
    pub fn is_seasonal(&self) -> bool {
        self.s > 1 && (self.cap_p > 0 || self.cap_d > 0 || self.cap_q > 0)
    }

    /// A mean term is estimated when the model differences fewer than twice.
    pub fn has_intercept(&self) -> bool {
        self.d + self.cap_d < 2
    }

    /// Number of estimated coefficients (excluding the innovation variance).
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q + usize::from(self.has_intercept())
    }

    /// Leading observations of the original series consumed by differencing
    /// and by the ARMA recursion before the first residual is defined.
    pub fn warmup(&self) -> usize {
        consumed_observations(self.s, self.d, self.cap_d) + self.ar_span().max(self.ma_span())
    }

    fn ar_span(&self) -> usize {
        self.p + self.s * self.cap_p
    }

    fn ma_span(&self) -> usize {
        self.q + self.s * self.cap_q
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ARIMA({},{},{})({},{},{})[{}]",
            self.p, self.d, self.q, self.cap_p, self.cap_d, self.cap_q, self.s
        )
    }
}

/// Coefficients of the multiplicative seasonal ARMA operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Coefficients {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    fn from_params(order: &ModelOrder, params: &[f64]) -> Self {
        let mut idx = 0;
        let mut take = |len: usize| {
            let slice = params[idx..idx + len].to_vec();
            idx += len;
            slice
        };
        let intercept = if order.has_intercept() { take(1)[0] } else { 0.0 };
        Self {
            intercept,
            ar: take(order.p),
            ma: take(order.q),
            seasonal_ar: take(order.cap_p),
            seasonal_ma: take(order.cap_q),
        }
    }

    /// Lag weights `a_k` of the expanded AR operator, `w_t = Σ a_k w_{t-k} + ...`.
    fn ar_weights(&self, s: usize) -> Vec<f64> {
        let mut weights = vec![0.0; self.ar.len() + s * self.seasonal_ar.len() + 1];
        for (i, phi) in self.ar.iter().enumerate() {
            weights[i + 1] += phi;
        }
        for (j, cap_phi) in self.seasonal_ar.iter().enumerate() {
            weights[s * (j + 1)] += cap_phi;
            for (i, phi) in self.ar.iter().enumerate() {
                weights[i + 1 + s * (j + 1)] -= phi * cap_phi;
            }
        }
        weights
    }

    /// Lag weights `b_k` of the expanded MA operator, `... + e_t + Σ b_k e_{t-k}`.
    fn ma_weights(&self, s: usize) -> Vec<f64> {
        let mut weights = vec![0.0; self.ma.len() + s * self.seasonal_ma.len() + 1];
        for (i, theta) in self.ma.iter().enumerate() {
            weights[i + 1] += theta;
        }
        for (j, cap_theta) in self.seasonal_ma.iter().enumerate() {
            weights[s * (j + 1)] += cap_theta;
            for (i, theta) in self.ma.iter().enumerate() {
                weights[i + 1 + s * (j + 1)] += theta * cap_theta;
            }
        }
        weights
    }
}

/// One-step residuals of the ARMA recursion, zero before `start`.
fn arma_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64], start: usize) -> Vec<f64> {
    let mut residuals = vec![0.0; w.len()];
    for t in start..w.len() {
        let mut pred = mu;
        for (k, a) in ar.iter().enumerate().skip(1) {
            pred += a * (w[t - k] - mu);
        }
        for (k, b) in ma.iter().enumerate().skip(1) {
            pred += b * residuals[t - k];
        }
        residuals[t] = w[t] - pred;
    }
    residuals
}

/// Seasonal ARIMA(p, d, q)(P, D, Q)\[s\] forecasting model.
///
/// The series is differenced (seasonal first), the multiplicative ARMA
/// coefficients are estimated by minimising the conditional sum of squares
/// with Nelder-Mead, and forecasts are integrated back to the original scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ARIMA {
    order: ModelOrder,
    coefficients: Coefficients,
    /// Leading observations consumed by differencing.
    head: Vec<f64>,
    differenced: Vec<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: f64,
    aic: Option<f64>,
    bic: Option<f64>,
    /// First index of the original series whose residual enters the
    /// likelihood; never earlier than the order's own warmup.
    scoring_start: Option<usize>,
    n: usize,
}

impl ARIMA {
    /// Create an unfitted model with the given order.
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            coefficients: Coefficients::default(),
            head: Vec::new(),
            differenced: Vec::new(),
            fitted: None,
            residuals: None,
            sigma2: 0.0,
            aic: None,
            bic: None,
            scoring_start: None,
            n: 0,
        }
    }

    /// Score the fit on residuals from original index `start` onwards.
    ///
    /// Candidates compared by AIC must share one scoring window.
    pub fn with_scoring_start(mut self, start: usize) -> Self {
        self.scoring_start = Some(start);
        self
    }

    /// Original index of the first scored residual.
    pub fn scoring_start(&self) -> usize {
        let warmup = self.order.warmup();
        self.scoring_start.map_or(warmup, |start| start.max(warmup))
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Get AR coefficients.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    /// Get MA coefficients.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ar
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ma
    }

    /// Mean of the differenced series (0 when not estimated).
    pub fn intercept(&self) -> f64 {
        self.coefficients.intercept
    }

    /// Length of the series the model was fitted on.
    pub fn nobs(&self) -> usize {
        self.n
    }

    /// Innovation variance estimate.
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// Minimum series length for this order.
    pub fn min_observations(&self) -> usize {
        self.scoring_start() + self.order.num_coefficients() + 2
    }

    /// Sum of squared residuals from `score_from`, with the recursion started at `start`.
    fn css(&self, w: &[f64], params: &[f64], start: usize, score_from: usize) -> f64 {
        let coefs = Coefficients::from_params(&self.order, params);
        let mu = if self.order.has_intercept() {
            coefs.intercept
        } else {
            0.0
        };
        let residuals = arma_residuals(
            w,
            mu,
            &coefs.ar_weights(self.order.s),
            &coefs.ma_weights(self.order.s),
            start,
        );
        residuals[score_from..].iter().map(|e| e * e).sum()
    }

    fn estimate(&mut self, w: &[f64], score_from: usize) -> Result<()> {
        let order = self.order;
        let start = order.ar_span().max(order.ma_span());
        let mean = w.iter().sum::<f64>() / w.len() as f64;

        let mut initial = Vec::with_capacity(order.num_coefficients());
        let mut bounds = Vec::with_capacity(order.num_coefficients());
        if order.has_intercept() {
            initial.push(mean);
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        for len in [order.p, order.q, order.cap_p, order.cap_q] {
            for i in 0..len {
                initial.push(0.1 / (i + 1) as f64);
                bounds.push((-0.99, 0.99));
            }
        }

        let params = if initial.is_empty() {
            initial
        } else {
            let config = NelderMeadConfig {
                max_iter: 500 * initial.len().max(2),
                tolerance: 1e-8,
                ..Default::default()
            };
            let result = nelder_mead(
                |p| self.css(w, p, start, score_from),
                &initial,
                Some(&bounds),
                config,
            );
            if !result.is_finite() {
                return Err(ForecastError::NonConvergence(format!(
                    "{}: conditional sum of squares is not finite",
                    order
                )));
            }
            result.optimal_point
        };
        self.coefficients = Coefficients::from_params(&order, &params);

        let mu = self.coefficients.intercept;
        let residuals = arma_residuals(
            w,
            mu,
            &self.coefficients.ar_weights(order.s),
            &self.coefficients.ma_weights(order.s),
            start,
        );
        let effective = &residuals[start..];
        let scored = &residuals[score_from..];
        let n_eff = scored.len() as f64;
        let sigma2 = scored.iter().map(|e| e * e).sum::<f64>() / n_eff;
        if !(sigma2.is_finite() && sigma2 > 0.0) {
            return Err(ForecastError::NonConvergence(format!(
                "{}: degenerate residual variance {}",
                order, sigma2
            )));
        }

        let k = order.num_coefficients() as f64 + 1.0;
        let ll = -0.5 * n_eff * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0);
        self.sigma2 = sigma2;
        self.aic = Some(-2.0 * ll + 2.0 * k);
        self.bic = Some(-2.0 * ll + k * n_eff.ln());

        // in-sample fit on the differenced scale, aligned with the residuals
        let fitted = w[start..]
            .iter()
            .zip(effective.iter())
            .map(|(x, e)| x - e)
            .collect();
        self.fitted = Some(fitted);
        self.residuals = Some(effective.to_vec());
        Ok(())
    }

    /// Psi weights of the integrated process, used for interval widths.
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        let s = self.order.s;
        // AR operator as polynomial 1 - Σ a_k B^k, times the differencing operators
        let ar = self.coefficients.ar_weights(s);
        let mut poly: Vec<f64> = ar
            .iter()
            .enumerate()
            .map(|(k, a)| if k == 0 { 1.0 } else { -a })
            .collect();
        for _ in 0..self.order.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        for _ in 0..self.order.cap_d {
            let mut seasonal = vec![0.0; s + 1];
            seasonal[0] = 1.0;
            seasonal[s] = -1.0;
            poly = poly_mul(&poly, &seasonal);
        }
        let ma = self.coefficients.ma_weights(s);

        let mut psi = vec![0.0; horizon];
        for j in 0..horizon {
            let mut value = if j == 0 {
                1.0
            } else {
                ma.get(j).copied().unwrap_or(0.0)
            };
            for k in 1..=j.min(poly.len() - 1) {
                value -= poly[k] * psi[j - k];
            }
            psi[j] = value;
        }
        psi
    }
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if series.has_missing_values() {
            return Err(ForecastError::MissingValues);
        }
        let order = self.order;
        if order.cap_p + order.cap_d + order.cap_q > 0 && order.s < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "{}: seasonal terms need a period of at least 2",
                order
            )));
        }

        let min_len = self.min_observations();
        if values.len() < min_len {
            return Err(ForecastError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }

        let consumed = consumed_observations(order.s, order.d, order.cap_d);
        let w = difference_values(values, order.s, order.d, order.cap_d);
        self.estimate(&w, self.scoring_start() - consumed)?;
        self.head = values[..consumed].to_vec();
        self.differenced = w;
        self.n = values.len();
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let s = self.order.s;
        let ar = self.coefficients.ar_weights(s);
        let ma = self.coefficients.ma_weights(s);
        let mu = self.coefficients.intercept;

        let mut w = self.differenced.clone();
        let mut e = vec![0.0; w.len() - residuals.len()];
        e.extend_from_slice(residuals);

        for _ in 0..horizon {
            let t = w.len();
            let mut pred = mu;
            for (k, a) in ar.iter().enumerate().skip(1) {
                if t >= k {
                    pred += a * (w[t - k] - mu);
                }
            }
            for (k, b) in ma.iter().enumerate().skip(1) {
                if t >= k {
                    pred += b * e[t - k];
                }
            }
            w.push(pred);
            e.push(0.0);
        }

        let restored = undifference(&w, &self.head, s, self.order.d, self.order.cap_d)?;
        Ok(Forecast::from_values(restored[restored.len() - horizon..].to_vec()))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        if horizon == 0 {
            return Ok(forecast);
        }

        let z = quantile_normal((1.0 + level) / 2.0);
        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, point) in forecast.values().iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let se = (self.sigma2 * cumulative).sqrt();
            lower.push(point - z * se);
            upper.push(point + z * se);
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
        if self.order.is_seasonal() {
            "SARIMA"
        } else {
            "ARIMA"
        }
    }
}
