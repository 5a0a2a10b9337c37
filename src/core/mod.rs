//! Core data structures for univariate time series analysis.

mod forecast;
mod time_series;

pub use forecast::Forecast;
pub use time_series::{FillMethod, Frequency, TimeSeries};
