//! Numerical and evaluation utilities.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, comparison_table, ComparisonRow, MetricsRecord, MetricsTable};
pub use ols::{least_squares, ridge_least_squares, LeastSquaresFit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{normal_cdf, quantile_normal};
