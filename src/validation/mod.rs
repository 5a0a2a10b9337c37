//! Statistical tests that drive differencing decisions and describe residuals.
//!
//! # Example
//!
//! ```
//! use anofox_tsa::validation::{adf_test, jarque_bera, ljung_box, AdfRegression};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let lb = ljung_box(&residuals, Some(3), 0);
//! assert!(lb.statistic >= 0.0);
//!
//! let jb = jarque_bera(&residuals).unwrap();
//! assert!((0.0..=1.0).contains(&jb.p_value));
//!
//! let walk: Vec<f64> = (0..60).map(|i| (i as f64 * 0.7).sin() + i as f64 * 0.1).collect();
//! let adf = adf_test(&walk, None, AdfRegression::Constant).unwrap();
//! assert!((0.0..=1.0).contains(&adf.p_value));
//! ```

pub mod normality;
pub mod stationarity;

pub use normality::{
    jarque_bera, residual_diagnostics, shapiro_wilk, JarqueBeraResult, NormalityConclusion,
    NormalityTest, ResidualDiagnostics, ShapiroWilkResult,
};
pub use residual_tests::{ljung_box, LjungBoxResult};
pub use stationarity::{
    adf_test, adf_test_fixed_lag, default_adf_lags, differencing_order, kruskal_wallis,
    mackinnon_p_value, ndiffs, nsdiffs, phase_cohorts, stationarity_trace, AdfRegression,
    AdfResult, CriticalValues, DifferencingOrder, KruskalWallisResult, StationarityTrace,
    TestRound,
};
