//! ARIMA and SARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - Seasonal differencing and its inverse
//! - ARIMA(p, d, q)(P, D, Q)\[s\] fitted by conditional sum of squares
//! - Exhaustive grid and heuristic (stepwise or random) order searches

mod auto_arima;
pub mod diff;
mod grid;
mod model;
mod search;

pub use auto_arima::{AutoArimaSearch, SearchStrategy};
pub use diff::{
    consumed_observations, difference, difference_series, difference_values,
    seasonal_difference, undifference,
};
pub use grid::ArimaGridSearch;
pub use model::{ModelOrder, ARIMA};
pub use search::{CandidateFailure, CandidateScore, OrderSearch, SearchOutcome};
