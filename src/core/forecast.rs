//! Forecast result structure for holding predictions.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A univariate forecast: point predictions with optional intervals and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
    timestamps: Option<Vec<DateTime<Utc>>>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            ..Self::default()
        }
    }

    /// Create a forecast with prediction intervals.
    pub fn from_values_with_intervals(values: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
            timestamps: None,
        }
    }

    /// Attach one timestamp per forecast step.
    pub fn with_timestamps(mut self, timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        if timestamps.len() != self.point.len() {
            return Err(ForecastError::LengthMismatch {
                expected: self.point.len(),
                got: timestamps.len(),
            });
        }
        self.timestamps = Some(timestamps);
        Ok(self)
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Point predictions.
    pub fn values(&self) -> &[f64] {
        &self.point
    }

    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    /// Re-index the forecast onto a held-out test window.
    ///
    /// The horizon must equal the test window length.
    pub fn aligned_to(self, test: &TimeSeries) -> Result<Self> {
        if self.horizon() != test.len() {
            return Err(ForecastError::LengthMismatch {
                expected: test.len(),
                got: self.horizon(),
            });
        }
        self.with_timestamps(test.timestamps().to_vec())
    }

    /// Shift every value (and interval bound) by `offset`.
    pub fn shifted(mut self, offset: f64) -> Self {
        self.point.iter_mut().for_each(|v| *v += offset);
        if let Some(lower) = self.lower.as_mut() {
            lower.iter_mut().for_each(|v| *v += offset);
        }
        if let Some(upper) = self.upper.as_mut() {
            upper.iter_mut().for_each(|v| *v += offset);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Frequency;
    use chrono::TimeZone;

    fn test_window(len: usize) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        TimeSeries::regular(start, Frequency::MonthEnd, vec![0.0; len]).unwrap()
    }

    #[test]
    fn forecast_from_values_creates_point_predictions() {
        let forecast = Forecast::from_values(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(!forecast.is_empty());
        assert_eq!(forecast.horizon(), 4);
        assert_eq!(forecast.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(forecast.lower().is_none());
        assert!(forecast.timestamps().is_none());
    }

    #[test]
    fn forecast_from_values_with_intervals() {
        let forecast =
            Forecast::from_values_with_intervals(vec![2.0, 3.0], vec![1.0, 2.0], vec![3.0, 4.0]);
        assert_eq!(forecast.values(), &[2.0, 3.0]);
        assert_eq!(forecast.lower().unwrap(), &[1.0, 2.0]);
        assert_eq!(forecast.upper().unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn aligned_to_copies_test_timestamps() {
        let test = test_window(3);
        let forecast = Forecast::from_values(vec![1.0, 2.0, 3.0])
            .aligned_to(&test)
            .unwrap();
        assert_eq!(forecast.timestamps().unwrap(), test.timestamps());
    }

    #[test]
    fn aligned_to_rejects_wrong_horizon() {
        let test = test_window(3);
        let result = Forecast::from_values(vec![1.0, 2.0]).aligned_to(&test);
        assert!(matches!(
            result,
            Err(ForecastError::LengthMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn shifted_moves_intervals_too() {
        let forecast =
            Forecast::from_values_with_intervals(vec![1.0], vec![0.0], vec![2.0]).shifted(0.5);
        assert_eq!(forecast.values(), &[1.5]);
        assert_eq!(forecast.lower().unwrap(), &[0.5]);
        assert_eq!(forecast.upper().unwrap(), &[2.5]);
    }
}
