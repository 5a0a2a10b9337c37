//! Classical seasonal decomposition by moving averages.
//!
//! The trend is a centred moving average over one period, the seasonal
//! component is the per-phase mean of the detrended series (centred to sum
//! to zero) repeated across the series, and the residual is what remains.

use crate::error::{ForecastError, Result};
use crate::utils::stats::variance;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Combination of the components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecompositionModel {
    /// `y = trend + seasonal + resid`
    #[default]
    Additive,
    /// `y = trend * seasonal * resid`; recognised but not supported.
    Multiplicative,
}

impl FromStr for DecompositionModel {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(DecompositionModel::Additive),
            "multiplicative" | "mul" => Ok(DecompositionModel::Multiplicative),
            other => Err(ForecastError::InvalidConfiguration(format!(
                "unknown decomposition model '{}'",
                other
            ))),
        }
    }
}

/// Result of a classical decomposition.
///
/// `trend` and `resid` are `NaN` at the first and last `period / 2` positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub observed: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub resid: Vec<f64>,
    pub period: usize,
}

impl Decomposition {
    /// Positions where all three components are defined.
    pub fn defined_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.observed.len()).filter(move |&i| {
            self.trend[i].is_finite() && self.seasonal[i].is_finite() && self.resid[i].is_finite()
        })
    }

    /// Residuals with the undefined boundary positions removed.
    pub fn defined_resid(&self) -> Vec<f64> {
        self.defined_indices().map(|i| self.resid[i]).collect()
    }

    /// Get the trend strength (0 to 1).
    /// Values close to 1 indicate strong trend.
    pub fn trend_strength(&self) -> f64 {
        self.strength(&self.trend)
    }

    /// Get the seasonal strength (0 to 1).
    /// Values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        self.strength(&self.seasonal)
    }

    /// `max(0, 1 - var(resid) / var(component + resid))` over defined positions.
    fn strength(&self, component: &[f64]) -> f64 {
        let (resid, combined): (Vec<f64>, Vec<f64>) = self
            .defined_indices()
            .map(|i| (self.resid[i], component[i] + self.resid[i]))
            .unzip();
        let var_combined = variance(&combined);
        if !(var_combined > 1e-10) {
            return 0.0;
        }
        (1.0 - variance(&resid) / var_combined).clamp(0.0, 1.0)
    }
}

/// Centred moving-average filter weights for `period`.
///
/// Even periods use `[0.5, 1, ..., 1, 0.5] / period` so the window stays
/// centred; odd periods use a plain mean.
fn trend_filter(period: usize) -> Vec<f64> {
    let p = period as f64;
    if period % 2 == 0 {
        let mut weights = vec![1.0 / p; period + 1];
        weights[0] = 0.5 / p;
        weights[period] = 0.5 / p;
        weights
    } else {
        vec![1.0 / p; period]
    }
}

/// Two-sided convolution; positions without a full window are `NaN`.
fn centred_moving_average(values: &[f64], weights: &[f64]) -> Vec<f64> {
    let half = weights.len() / 2;
    let n = values.len();
    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                f64::NAN
            } else {
                weights
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * values[i + k - half])
                    .sum()
            }
        })
        .collect()
}

/// Decompose `values` into trend, seasonal and residual components.
///
/// # Errors
/// - `InvalidConfiguration` for the multiplicative model or a period below 2
/// - `MissingValues` if `values` contains `NaN` or infinite entries
/// - `InsufficientData` with fewer than two full cycles
///
/// # Example
/// ```
/// use anofox_tsa::seasonality::{seasonal_decompose, DecompositionModel};
///
/// let values: Vec<f64> = (0..24).map(|i| i as f64 + [3.0, -1.0, -2.0][i % 3]).collect();
/// let parts = seasonal_decompose(&values, 3, DecompositionModel::Additive).unwrap();
/// assert!((parts.seasonal[0] - 3.0).abs() < 1e-9);
/// assert!(parts.trend[0].is_nan());
/// ```
pub fn seasonal_decompose(
    values: &[f64],
    period: usize,
    model: DecompositionModel,
) -> Result<Decomposition> {
    if model == DecompositionModel::Multiplicative {
        return Err(ForecastError::InvalidConfiguration(
            "multiplicative decomposition is not supported".to_string(),
        ));
    }
    if period < 2 {
        return Err(ForecastError::InvalidConfiguration(format!(
            "decomposition period must be at least 2, got {}",
            period
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::MissingValues);
    }
    if values.len() < 2 * period {
        return Err(ForecastError::InsufficientData {
            needed: 2 * period,
            got: values.len(),
        });
    }

    let trend = centred_moving_average(values, &trend_filter(period));
    let detrended: Vec<f64> = values.iter().zip(&trend).map(|(y, t)| y - t).collect();

    // per-phase mean of the defined detrended values
    let mut profile: Vec<f64> = (0..period)
        .map(|phase| {
            let defined: Vec<f64> = detrended
                .iter()
                .skip(phase)
                .step_by(period)
                .copied()
                .filter(|v| v.is_finite())
                .collect();
            defined.iter().sum::<f64>() / defined.len() as f64
        })
        .collect();
    let centre = profile.iter().sum::<f64>() / period as f64;
    profile.iter_mut().for_each(|s| *s -= centre);

    let seasonal: Vec<f64> = (0..values.len()).map(|i| profile[i % period]).collect();
    let resid: Vec<f64> = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d - s)
        .collect();

    Ok(Decomposition {
        observed: values.to_vec(),
        trend,
        seasonal,
        resid,
        period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn generate_seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 10.0 + 0.05 * i as f64 + 4.0 * (2.0 * PI * i as f64 / period as f64).sin())
            .collect()
    }

    #[test]
    fn even_filter_is_centred() {
        let w = trend_filter(4);
        assert_eq!(w.len(), 5);
        assert_relative_eq!(w[0], 0.125);
        assert_relative_eq!(w[2], 0.25);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0);
        assert_eq!(trend_filter(3).len(), 3);
    }

    #[test]
    fn boundaries_are_undefined() {
        let series = generate_seasonal_series(48, 12);
        let result = seasonal_decompose(&series, 12, DecompositionModel::Additive).unwrap();
        for i in 0..6 {
            assert!(result.trend[i].is_nan());
            assert!(result.resid[47 - i].is_nan());
        }
        assert!(result.trend[6].is_finite());
        assert!(result.trend[41].is_finite());
        assert_eq!(result.defined_indices().count(), 36);
        assert!(result.seasonal.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn components_add_back_to_observed() {
        let series = generate_seasonal_series(60, 12);
        let result = seasonal_decompose(&series, 12, DecompositionModel::Additive).unwrap();
        for i in result.defined_indices() {
            let reconstructed = result.trend[i] + result.seasonal[i] + result.resid[i];
            assert_relative_eq!(series[i], reconstructed, epsilon = 1e-10);
        }
    }

    #[test]
    fn seasonal_profile_sums_to_zero() {
        let series = generate_seasonal_series(36, 6);
        let result = seasonal_decompose(&series, 6, DecompositionModel::Additive).unwrap();
        let total: f64 = result.seasonal[..6].iter().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn detects_strong_seasonality_and_trend() {
        let series = generate_seasonal_series(120, 12);
        let result = seasonal_decompose(&series, 12, DecompositionModel::Additive).unwrap();
        assert!(result.seasonal_strength() > 0.9);
        assert!(result.trend_strength() > 0.9);
    }

    #[test]
    fn noise_has_weak_strengths_within_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let series: Vec<f64> = (0..96).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let result = seasonal_decompose(&series, 12, DecompositionModel::Additive).unwrap();
        for strength in [result.seasonal_strength(), result.trend_strength()] {
            assert!((0.0..=1.0).contains(&strength));
        }
        assert!(result.seasonal_strength() < 0.6);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let series = generate_seasonal_series(20, 12);
        assert_eq!(
            seasonal_decompose(&series, 12, DecompositionModel::Additive).unwrap_err(),
            ForecastError::InsufficientData { needed: 24, got: 20 }
        );
        assert!(matches!(
            seasonal_decompose(&series, 1, DecompositionModel::Additive),
            Err(ForecastError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            seasonal_decompose(&series, 4, DecompositionModel::Multiplicative),
            Err(ForecastError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            seasonal_decompose(&[1.0, f64::NAN, 2.0, 3.0], 2, DecompositionModel::Additive),
            Err(ForecastError::MissingValues)
        ));
    }

    #[test]
    fn parses_model_names() {
        assert_eq!(
            "additive".parse::<DecompositionModel>().unwrap(),
            DecompositionModel::Additive
        );
        assert_eq!(
            "multiplicative".parse::<DecompositionModel>().unwrap(),
            DecompositionModel::Multiplicative
        );
        assert!("log".parse::<DecompositionModel>().is_err());
    }
}
