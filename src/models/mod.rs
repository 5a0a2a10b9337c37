//! Forecasting models.

mod traits;

pub mod arima;
pub mod exponential;
pub mod family;
pub mod regression;

pub use family::{
    default_families, AdditiveRegressionFamily, ArimaFamily, AutoArimaFamily,
    ExponentialSmoothing, FittedModel, ModelCacheKey, ModelFamily,
};
pub use traits::Forecaster;
