//! # anofox-tsa
//!
//! Stationarity analysis, order selection and model comparison for a single
//! univariate time series.
//!
//! The crate determines how many regular and seasonal differences a series
//! needs (ADF and Kruskal-Wallis tests), decomposes it into trend, seasonal
//! and residual parts, searches ARIMA orders by AIC (exhaustive grid or
//! stepwise/random heuristic), fits Holt-Winters and additive-regression
//! forecasters, and scores every family on a held-out window.
//!
//! ```no_run
//! use anofox_tsa::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2015, 1, 31, 0, 0, 0).unwrap();
//! let values: Vec<f64> = (0..96).map(|i| 50.0 + i as f64 + (i % 12) as f64).collect();
//! let series = TimeSeries::regular(start, Frequency::MonthEnd, values).unwrap();
//! let config = AnalysisConfig::default();
//!
//! let report = explore(&series, &config).unwrap();
//! println!("d={} D={}", report.order.d, report.order.cap_d);
//!
//! let comparison = compare_models(&series, &default_families(), &config).unwrap();
//! print!("{}", comparison.metrics.to_delimited(','));
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod seasonality;
pub mod utils;
pub mod validation;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::analysis::{compare_models, explore, ExploratoryReport, ModelComparison};
    pub use crate::config::{AnalysisConfig, OrderSearchRanges};
    pub use crate::core::{FillMethod, Forecast, Frequency, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::arima::{ArimaGridSearch, AutoArimaSearch, OrderSearch, SearchStrategy};
    pub use crate::models::{default_families, FittedModel, Forecaster, ModelFamily};
    pub use crate::utils::{calculate_metrics, MetricsRecord, MetricsTable};
    pub use crate::validation::{differencing_order, DifferencingOrder};
}
