//! Accuracy metrics for forecast evaluation.
//!
//! MAPE divides by the actual values: any zero actual yields an infinite or
//! NaN MAPE (and percentage error in the comparison table). The value is
//! reported as computed rather than suppressed, so callers comparing models
//! on series that touch zero should rely on RMSE instead.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Error metrics for one model, all computed over the same aligned pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Coefficient of determination
    pub r_squared: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
}

impl MetricsRecord {
    /// Names accepted by [`get`](Self::get), in export order.
    pub const NAMES: [&'static str; 3] = ["RMSE", "MAPE", "R2"];

    /// Look a metric up by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<f64> {
        match name.to_ascii_uppercase().as_str() {
            "RMSE" => Some(self.rmse),
            "MAPE" => Some(self.mape),
            "R2" | "R²" | "R_SQUARED" => Some(self.r_squared),
            "MAE" => Some(self.mae),
            "MSE" => Some(self.mse),
            _ => None,
        }
    }
}

/// Compute metrics between aligned actual and predicted values.
///
/// Fails with `LengthMismatch` when the sequences differ in length; no partial
/// result is returned.
pub fn calculate_metrics(actual: &[f64], predicted: &[f64]) -> Result<MetricsRecord> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::LengthMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let n = actual.len() as f64;
    let pairs = || actual.iter().zip(predicted.iter());

    let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let ss_res: f64 = pairs().map(|(a, p)| (a - p).powi(2)).sum();
    let mse = ss_res / n;
    let rmse = mse.sqrt();
    let mape = 100.0 * pairs().map(|(a, p)| ((a - p) / a).abs()).sum::<f64>() / n;

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let r_squared = if ss_res == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(MetricsRecord {
        rmse,
        mape,
        r_squared,
        mae,
        mse,
    })
}

/// One line of the actual-versus-predicted comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub timestamp: DateTime<Utc>,
    pub actual: f64,
    pub predicted: f64,
    /// `actual - predicted`
    pub difference: f64,
    /// `difference / actual * 100`, rounded to 2 decimals.
    pub percentage_error: f64,
}

/// Per-period comparison of a held-out window with its forecast.
pub fn comparison_table(test: &TimeSeries, predicted: &[f64]) -> Result<Vec<ComparisonRow>> {
    if test.len() != predicted.len() {
        return Err(ForecastError::LengthMismatch {
            expected: test.len(),
            got: predicted.len(),
        });
    }

    Ok(test
        .timestamps()
        .iter()
        .zip(test.values().iter())
        .zip(predicted.iter())
        .map(|((&timestamp, &actual), &predicted)| {
            let difference = actual - predicted;
            ComparisonRow {
                timestamp,
                actual,
                predicted,
                difference,
                percentage_error: round2(difference / actual * 100.0),
            }
        })
        .collect())
}

/// Metrics keyed by model name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    rows: Vec<(String, MetricsRecord)>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `model`.
    pub fn insert(&mut self, model: impl Into<String>, record: MetricsRecord) {
        let model = model.into();
        match self.rows.iter_mut().find(|(name, _)| *name == model) {
            Some(row) => row.1 = record,
            None => self.rows.push((model, record)),
        }
    }

    pub fn get(&self, model: &str) -> Option<&MetricsRecord> {
        self.rows
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricsRecord)> {
        self.rows.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Model with the lowest RMSE; NaN scores never win.
    pub fn best_by_rmse(&self) -> Option<&str> {
        self.rows
            .iter()
            .filter(|(_, r)| !r.rmse.is_nan())
            .fold(None::<&(String, MetricsRecord)>, |best, row| match best {
                Some(b) if b.1.rmse <= row.1.rmse => Some(b),
                _ => Some(row),
            })
            .map(|(name, _)| name.as_str())
    }

    /// Render as delimited text with a header line and values rounded to 2 decimals.
    ///
    /// Model names containing the separator, a double quote or a line break
    /// are wrapped in double quotes with inner quotes doubled.
    pub fn to_delimited(&self, separator: char) -> String {
        let mut out = String::from("model");
        for name in MetricsRecord::NAMES {
            out.push(separator);
            out.push_str(name);
        }
        out.push('\n');

        for (model, record) in &self.rows {
            out.push_str(&quote_field(model, separator));
            for value in [record.rmse, record.mape, record.r_squared] {
                out.push(separator);
                out.push_str(&format!("{:.2}", value));
            }
            out.push('\n');
        }
        out
    }
}

fn quote_field(field: &str, separator: char) -> Cow<'_, str> {
    if field.contains(|c: char| c == separator || c == '"' || c == '\n' || c == '\r') {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
