//! TimeSeries data structure for representing a univariate, regularly spaced series.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling frequency of a series, identified by its usual label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// `h`
    Hourly,
    /// `D`
    Daily,
    /// `W`
    Weekly,
    /// `ME`: last day of each month.
    MonthEnd,
    /// `QE`: last day of each quarter.
    QuarterEnd,
    /// `YE`: last day of each year.
    YearEnd,
}

impl Frequency {
    /// Seasonal period conventionally paired with this frequency.
    pub fn default_seasonal_period(&self) -> usize {
        match self {
            Frequency::Hourly => 24,
            Frequency::Daily => 7,
            Frequency::Weekly => 52,
            Frequency::MonthEnd => 12,
            Frequency::QuarterEnd => 4,
            Frequency::YearEnd => 1,
        }
    }

    /// Label used by [`FromStr`].
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Hourly => "h",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::MonthEnd => "ME",
            Frequency::QuarterEnd => "QE",
            Frequency::YearEnd => "YE",
        }
    }

    /// Move `steps` periods forward from `from`.
    ///
    /// Calendar frequencies land on the last day of the target month,
    /// keeping the time of day.
    pub fn advance(&self, from: DateTime<Utc>, steps: usize) -> Result<DateTime<Utc>> {
        let steps_i = steps as i64;
        match self {
            Frequency::Hourly => Ok(from + Duration::hours(steps_i)),
            Frequency::Daily => Ok(from + Duration::days(steps_i)),
            Frequency::Weekly => Ok(from + Duration::weeks(steps_i)),
            Frequency::MonthEnd => add_month_ends(from, steps),
            Frequency::QuarterEnd => add_month_ends(from, steps * 3),
            Frequency::YearEnd => add_month_ends(from, steps * 12),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "h" | "H" => Ok(Frequency::Hourly),
            "D" => Ok(Frequency::Daily),
            "W" => Ok(Frequency::Weekly),
            "ME" | "M" => Ok(Frequency::MonthEnd),
            "QE" | "Q" => Ok(Frequency::QuarterEnd),
            "YE" | "Y" | "A" => Ok(Frequency::YearEnd),
            other => Err(ForecastError::InvalidConfiguration(format!(
                "unsupported frequency label '{}'",
                other
            ))),
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn add_month_ends(from: DateTime<Utc>, months: usize) -> Result<DateTime<Utc>> {
    let total = from.year() as i64 * 12 + (from.month0() as i64) + months as i64;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    let date = last_day_of_month(year, month).ok_or_else(|| {
        ForecastError::TimestampError(format!("cannot build month end {}-{}", year, month))
    })?;
    Ok(Utc.from_utc_datetime(&date.and_time(from.time())))
}

/// Strategy for filling missing (NaN/Inf) observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillMethod {
    /// Carry the previous valid value forward.
    #[default]
    ForwardFill,
    /// Carry the next valid value backward.
    BackwardFill,
    /// Linear interpolation between valid neighbours.
    Interpolate,
    /// Drop observations with missing values.
    Drop,
}

impl FromStr for FillMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ffill" => Ok(FillMethod::ForwardFill),
            "bfill" => Ok(FillMethod::BackwardFill),
            "interpolate" => Ok(FillMethod::Interpolate),
            "drop" => Ok(FillMethod::Drop),
            other => Err(ForecastError::InvalidConfiguration(format!(
                "unknown fill method '{}'",
                other
            ))),
        }
    }
}

/// A univariate time series with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    frequency: Option<Frequency>,
    name: Option<String>,
}

impl TimeSeries {
    /// Create a univariate series, validating timestamp order and lengths.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::LengthMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                return Err(ForecastError::TimestampError(
                    "timestamps must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            timestamps,
            values,
            frequency: None,
            name: None,
        })
    }

    /// Build a regular series starting at `start` with the given frequency.
    pub fn regular(start: DateTime<Utc>, frequency: Frequency, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len())
            .map(|i| frequency.advance(start, i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::univariate(timestamps, values)?.with_frequency(frequency))
    }

    /// Tag the series with its sampling frequency.
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Attach a column name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Extract observations `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::InsufficientData {
                needed: end,
                got: self.len(),
            });
        }

        Ok(TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            frequency: self.frequency,
            name: self.name.clone(),
        })
    }

    /// Split into contiguous train/test parts at `floor(n * train_fraction)`.
    pub fn split(&self, train_fraction: f64) -> Result<(TimeSeries, TimeSeries)> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "train fraction must lie in (0, 1), got {}",
                train_fraction
            )));
        }
        let train_len = (self.len() as f64 * train_fraction).floor() as usize;
        if train_len == 0 || train_len >= self.len() {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }
        log::debug!(
            "splitting {} observations into {} train / {} test",
            self.len(),
            train_len,
            self.len() - train_len
        );
        Ok((self.slice(0, train_len)?, self.slice(train_len, self.len())?))
    }

    /// Keep the trailing `floor(n * fraction)` observations.
    pub fn tail_fraction(&self, fraction: f64) -> Result<TimeSeries> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "dataset fraction must lie in (0, 1], got {}",
                fraction
            )));
        }
        let keep = (self.len() as f64 * fraction).floor() as usize;
        self.slice(self.len() - keep, self.len())
    }

    /// Timestamps of the `horizon` periods following the last observation.
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        let frequency = self.frequency.ok_or_else(|| {
            ForecastError::TimestampError("series has no frequency tag".to_string())
        })?;
        let last = *self.timestamps.last().ok_or(ForecastError::EmptyData)?;
        (1..=horizon).map(|h| frequency.advance(last, h)).collect()
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Return a copy with missing values handled by `method`.
    ///
    /// Edge gaps that the method cannot reach (a leading gap under forward
    /// fill, a trailing gap under backward fill) stay missing, so callers
    /// should check [`has_missing_values`](Self::has_missing_values) afterwards.
    pub fn filled(&self, method: FillMethod) -> TimeSeries {
        match method {
            FillMethod::Drop => {
                let (timestamps, values): (Vec<_>, Vec<_>) = self
                    .timestamps
                    .iter()
                    .zip(self.values.iter())
                    .filter(|(_, v)| v.is_finite())
                    .map(|(t, v)| (*t, *v))
                    .unzip();
                TimeSeries {
                    timestamps,
                    values,
                    frequency: self.frequency,
                    name: self.name.clone(),
                }
            }
            FillMethod::ForwardFill => self.with_values(carry_forward(&self.values)),
            FillMethod::BackwardFill => {
                let mut reversed: Vec<f64> = self.values.iter().rev().copied().collect();
                reversed = carry_forward(&reversed);
                reversed.reverse();
                self.with_values(reversed)
            }
            FillMethod::Interpolate => self.with_values(interpolate_series(&self.values)),
        }
    }

    fn with_values(&self, values: Vec<f64>) -> TimeSeries {
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
            frequency: self.frequency,
            name: self.name.clone(),
        }
    }
}

fn carry_forward(values: &[f64]) -> Vec<f64> {
    let mut last_valid = None;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last_valid = Some(v);
                v
            } else {
                last_valid.unwrap_or(v)
            }
        })
        .collect()
}

/// Linear interpolation of interior gaps; edges are left untouched.
fn interpolate_series(values: &[f64]) -> Vec<f64> {
    let mut result = values.to_vec();
    let valid: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();

    for pair in valid.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo <= 1 {
            continue;
        }
        let span = (hi - lo) as f64;
        for i in lo + 1..hi {
            let w = (i - lo) as f64 / span;
            result[i] = values[lo] * (1.0 - w) + values[hi] * w;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month_end(year: i32, month: u32) -> DateTime<Utc> {
        let date = last_day_of_month(year, month).unwrap();
        Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn univariate_validates_lengths_and_order() {
        let ts = vec![month_end(2020, 1), month_end(2020, 2)];
        assert!(matches!(
            TimeSeries::univariate(ts.clone(), vec![1.0]),
            Err(ForecastError::LengthMismatch { .. })
        ));

        let reversed = vec![month_end(2020, 2), month_end(2020, 1)];
        assert!(matches!(
            TimeSeries::univariate(reversed, vec![1.0, 2.0]),
            Err(ForecastError::TimestampError(_))
        ));

        let series = TimeSeries::univariate(ts, vec![1.0, 2.0]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), &[1.0, 2.0]);
    }

    #[test]
    fn month_end_frequency_lands_on_last_day() {
        let jan = month_end(2024, 1);
        let feb = Frequency::MonthEnd.advance(jan, 1).unwrap();
        assert_eq!(feb, month_end(2024, 2));
        assert_eq!(feb.day(), 29);

        let next_year = Frequency::MonthEnd.advance(month_end(2023, 11), 3).unwrap();
        assert_eq!(next_year, month_end(2024, 2));

        let quarter = Frequency::QuarterEnd.advance(month_end(2023, 3), 1).unwrap();
        assert_eq!(quarter, month_end(2023, 6));
    }

    #[test]
    fn frequency_labels_parse() {
        assert_eq!("ME".parse::<Frequency>().unwrap(), Frequency::MonthEnd);
        assert_eq!("D".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!(Frequency::Weekly.default_seasonal_period(), 52);
        assert!(matches!(
            "fortnight".parse::<Frequency>(),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn regular_series_builds_timestamps() {
        let series =
            TimeSeries::regular(month_end(2020, 1), Frequency::MonthEnd, vec![1.0; 14]).unwrap();
        assert_eq!(series.timestamps()[13], month_end(2021, 2));
        assert_eq!(series.frequency(), Some(Frequency::MonthEnd));

        let future = series.future_timestamps(2).unwrap();
        assert_eq!(future, vec![month_end(2021, 3), month_end(2021, 4)]);
    }

    #[test]
    fn split_uses_leading_fraction() {
        let values: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let series = TimeSeries::regular(month_end(2020, 1), Frequency::MonthEnd, values).unwrap();

        let (train, test) = series.split(0.95).unwrap();
        assert_eq!(train.len(), 38);
        assert_eq!(test.len(), 2);
        assert_eq!(test.values(), &[38.0, 39.0]);
        assert_eq!(train.timestamps().last(), series.timestamps().get(37));

        assert!(matches!(
            series.split(1.0),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn tail_fraction_keeps_latest_observations() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let series = TimeSeries::regular(month_end(2020, 1), Frequency::MonthEnd, values).unwrap();
        let tail = series.tail_fraction(0.5).unwrap();
        assert_eq!(tail.values(), &[5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn fill_methods_handle_gaps() {
        let values = vec![1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        let series = TimeSeries::regular(month_end(2020, 1), Frequency::MonthEnd, values).unwrap();
        assert!(series.has_missing_values());

        let ffill = series.filled(FillMethod::ForwardFill);
        assert_eq!(ffill.values(), &[1.0, 1.0, 1.0, 4.0, 4.0]);

        let bfill = series.filled(FillMethod::BackwardFill);
        assert_eq!(&bfill.values()[..4], &[1.0, 4.0, 4.0, 4.0]);
        assert!(bfill.values()[4].is_nan());

        let interp = series.filled(FillMethod::Interpolate);
        assert_eq!(&interp.values()[..4], &[1.0, 2.0, 3.0, 4.0]);

        let dropped = series.filled(FillMethod::Drop);
        assert_eq!(dropped.values(), &[1.0, 4.0]);
        assert_eq!(dropped.timestamps()[1], month_end(2020, 4));
    }

    #[test]
    fn fill_method_parses_known_labels_only() {
        assert_eq!("ffill".parse::<FillMethod>().unwrap(), FillMethod::ForwardFill);
        assert_eq!("drop".parse::<FillMethod>().unwrap(), FillMethod::Drop);
        assert!(matches!(
            "zero".parse::<FillMethod>(),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }
}
