//! Exponential smoothing models.
//!
//! Holt-Winters with additive trend (optionally damped) and additive or
//! multiplicative seasonality, with smoothing constants fitted by
//! Nelder-Mead on the in-sample squared one-step errors.

mod holt_winters;

pub use holt_winters::{HoltWinters, SeasonalType, Smoothing, TrendType};
