//! Differencing utilities for ARIMA models.
//!
//! Seasonal differences are always applied before regular ones. Each regular
//! difference consumes one leading observation and each seasonal difference
//! consumes `period`, so the result has `n - d - D * period` values.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};

/// Apply `d` first differences.
///
/// # Example
/// ```
/// use anofox_tsa::models::arima::difference;
///
/// assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 1), vec![3.0, 5.0, 7.0]);
/// assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 2), vec![2.0, 2.0]);
/// ```
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.is_empty() {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `cap_d` seasonal differences at lag `period`.
///
/// A series no longer than `period` differences to an empty vector.
pub fn seasonal_difference(series: &[f64], cap_d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..cap_d {
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// Seasonal then regular differencing of raw values.
pub fn difference_values(series: &[f64], period: usize, d: usize, cap_d: usize) -> Vec<f64> {
    difference(&seasonal_difference(series, cap_d, period), d)
}

/// Number of leading observations consumed by `d` regular and `cap_d` seasonal differences.
pub fn consumed_observations(period: usize, d: usize, cap_d: usize) -> usize {
    d + cap_d * period
}

/// Difference a series and keep the timestamps of the retained observations.
pub fn difference_series(
    series: &TimeSeries,
    period: usize,
    d: usize,
    cap_d: usize,
) -> Result<TimeSeries> {
    if cap_d > 0 && period < 2 {
        return Err(ForecastError::InvalidConfiguration(format!(
            "seasonal differencing needs a period of at least 2, got {}",
            period
        )));
    }
    let consumed = consumed_observations(period, d, cap_d);
    if series.len() <= consumed {
        return Err(ForecastError::InsufficientData {
            needed: consumed + 1,
            got: series.len(),
        });
    }

    let values = difference_values(series.values(), period, d, cap_d);
    let timestamps = series.timestamps()[consumed..].to_vec();
    let mut out = TimeSeries::univariate(timestamps, values)?;
    if let Some(freq) = series.frequency() {
        out = out.with_frequency(freq);
    }
    if let Some(name) = series.name() {
        out = out.with_name(name);
    }
    Ok(out)
}

/// Invert [`difference_values`].
///
/// `head` holds the leading observations of the original series (at least
/// the `d + cap_d * period` values the differencing consumed). Extending
/// `differenced` past its original end integrates forecasts.
pub fn undifference(
    differenced: &[f64],
    head: &[f64],
    period: usize,
    d: usize,
    cap_d: usize,
) -> Result<Vec<f64>> {
    let consumed = consumed_observations(period, d, cap_d);
    if head.len() < consumed {
        return Err(ForecastError::InsufficientData {
            needed: consumed,
            got: head.len(),
        });
    }

    // lag of every stage in application order
    let lags: Vec<usize> = std::iter::repeat(period)
        .take(cap_d)
        .chain(std::iter::repeat(1).take(d))
        .collect();

    // stage inputs restricted to the head
    let mut stage_heads = Vec::with_capacity(lags.len());
    let mut current = head[..consumed].to_vec();
    for &lag in &lags {
        let next = current
            .iter()
            .skip(lag)
            .zip(current.iter())
            .map(|(c, p)| c - p)
            .collect();
        stage_heads.push(current);
        current = next;
    }

    let mut result = differenced.to_vec();
    for (lag, stage_head) in lags.iter().zip(stage_heads.iter()).rev() {
        let mut restored = stage_head[..*lag].to_vec();
        restored.reserve(result.len());
        for (t, diff) in result.iter().enumerate() {
            let prev = restored[t];
            restored.push(prev + diff);
        }
        result = restored;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Frequency;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    #[test]
    fn difference_orders() {
        let series = vec![1.0, 2.0, 4.0, 7.0, 11.0];
        assert_eq!(difference(&series, 0), series);
        assert_eq!(difference(&series, 1), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(difference(&series, 2), vec![1.0, 1.0, 1.0]);
        assert!(difference(&[1.0], 1).is_empty());
    }

    #[test]
    fn seasonal_difference_removes_repeating_pattern() {
        let series = vec![1.0, 5.0, 3.0, 2.0, 6.0, 4.0, 3.0, 7.0, 5.0];
        assert_eq!(
            seasonal_difference(&series, 1, 3),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(seasonal_difference(&series, 2, 3), vec![0.0, 0.0, 0.0]);
        assert!(seasonal_difference(&[1.0, 2.0], 1, 3).is_empty());
    }

    #[test]
    fn difference_series_trims_leading_timestamps() {
        let start = Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap();
        let values: Vec<f64> = (0..30).map(|i| (i * i) as f64).collect();
        let series = TimeSeries::regular(start, Frequency::MonthEnd, values).unwrap();

        let out = difference_series(&series, 12, 1, 1).unwrap();
        assert_eq!(out.len(), 30 - 13);
        assert_eq!(out.timestamps()[0], series.timestamps()[13]);
        assert_eq!(out.frequency(), Some(Frequency::MonthEnd));

        assert!(matches!(
            difference_series(&series, 12, 0, 3),
            Err(ForecastError::InsufficientData { needed: 37, got: 30 })
        ));
    }

    #[test]
    fn undifference_round_trips() {
        let original: Vec<f64> = (0..40)
            .map(|i| (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3 + ((i % 4) as f64))
            .collect();
        for &(d, cap_d) in &[(0, 0), (1, 0), (0, 1), (2, 1), (1, 2)] {
            let diffed = difference_values(&original, 4, d, cap_d);
            let consumed = consumed_observations(4, d, cap_d);
            let restored = undifference(&diffed, &original[..consumed], 4, d, cap_d).unwrap();
            assert_eq!(restored.len(), original.len());
            for (a, b) in restored.iter().zip(original.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn undifference_extends_forecasts() {
        // Linear series: constant first difference continues the line.
        let original = vec![2.0, 4.0, 6.0, 8.0];
        let mut diffed = difference(&original, 1);
        diffed.extend([2.0, 2.0]);
        let restored = undifference(&diffed, &original[..1], 1, 1, 0).unwrap();
        assert_eq!(restored, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn undifference_needs_enough_head() {
        assert!(matches!(
            undifference(&[1.0], &[1.0], 12, 0, 1),
            Err(ForecastError::InsufficientData { needed: 12, got: 1 })
        ));
    }
}
