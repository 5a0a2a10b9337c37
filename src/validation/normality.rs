//! Normality tests for residuals.
//!
//! Two independent tests are provided: the moment-based Jarque-Bera test and
//! the order-statistic-based Shapiro-Wilk test (Royston's approximation).
//! Neither test proves normality; a large p-value only means the test found
//! no evidence against it.

use crate::error::{ForecastError, Result};
use crate::utils::stats::{chi_squared_sf, moments, normal_cdf, quantile_normal};
use crate::validation::residual_tests::{ljung_box, LjungBoxResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of a normality test at a significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalityConclusion {
    /// p > alpha: no evidence against normality.
    FailToRejectNormality,
    /// p <= alpha: the residuals are unlikely to be normal.
    RejectNormality,
}

impl NormalityConclusion {
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value > alpha {
            NormalityConclusion::FailToRejectNormality
        } else {
            NormalityConclusion::RejectNormality
        }
    }
}

/// Jarque-Bera test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JarqueBeraResult {
    pub statistic: f64,
    pub p_value: f64,
    pub skewness: f64,
    /// Kurtosis (3 for a normal distribution).
    pub kurtosis: f64,
}

/// Shapiro-Wilk test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapiroWilkResult {
    /// W statistic in (0, 1\].
    pub statistic: f64,
    pub p_value: f64,
}

/// Jarque-Bera test: `JB = n/6 * (S^2 + (K - 3)^2 / 4)`, χ²(2) under normality.
pub fn jarque_bera(values: &[f64]) -> Result<JarqueBeraResult> {
    if values.len() < 3 {
        return Err(ForecastError::InsufficientData {
            needed: 3,
            got: values.len(),
        });
    }
    let (skewness, kurtosis) = moments(values);
    if !skewness.is_finite() {
        return Err(ForecastError::ComputationError(
            "Jarque-Bera: data has zero variance".to_string(),
        ));
    }
    let n = values.len() as f64;
    let statistic = n / 6.0 * (skewness.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);
    Ok(JarqueBeraResult {
        statistic,
        p_value: chi_squared_sf(statistic, 2),
        skewness,
        kurtosis,
    })
}

/// Evaluate `c[0] + c[1] x + c[2] x^2 + ...`.
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk coefficients for the upper half of the order statistics.
fn shapiro_wilk_coefficients(n: usize) -> Vec<f64> {
    const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
    const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];

    let half = n / 2;
    if n == 3 {
        return vec![std::f64::consts::FRAC_1_SQRT_2];
    }

    let an25 = n as f64 + 0.25;
    let m: Vec<f64> = (1..=half)
        .map(|i| quantile_normal((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let mut a = vec![0.0; half];
    let a1 = poly(&C1, rsn) - m[0] / ssumm2;
    a[0] = a1;
    let (first, fac) = if n > 5 {
        let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
        a[1] = a2;
        let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
            / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
        .sqrt();
        (2, fac)
    } else {
        let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
        (1, fac)
    };
    for i in first..half {
        a[i] = -m[i] / fac;
    }
    a
}

/// Shapiro-Wilk test using Royston's (1992, 1995) approximation.
///
/// Valid for 3 ≤ n ≤ 5000; larger samples are accepted with a warning.
pub fn shapiro_wilk(values: &[f64]) -> Result<ShapiroWilkResult> {
    let n = values.len();
    if n < 3 {
        return Err(ForecastError::InsufficientData { needed: 3, got: n });
    }
    if n > 5000 {
        log::warn!("Shapiro-Wilk p-value may be inaccurate for n={} > 5000", n);
    }

    let mut x = values.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let range = x[n - 1] - x[0];
    if range < 1e-19 {
        return Err(ForecastError::ComputationError(
            "Shapiro-Wilk: all values are identical".to_string(),
        ));
    }

    let a = shapiro_wilk_coefficients(n);
    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ssq).min(1.0);

    Ok(ShapiroWilkResult {
        statistic: w,
        p_value: shapiro_wilk_p_value(w, n),
    })
}

fn shapiro_wilk_p_value(w: f64, n: usize) -> f64 {
    const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
    const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
    const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
    const G: [f64; 2] = [-2.273, 0.459];

    if n == 3 {
        // exact distribution
        let pi6 = 6.0 / std::f64::consts::PI;
        let stqr = std::f64::consts::FRAC_PI_3;
        return (pi6 * (w.sqrt().asin() - stqr)).clamp(0.0, 1.0);
    }

    let an = n as f64;
    let w1 = (1.0 - w).ln();
    let (y, m, s) = if n <= 11 {
        let gamma = poly(&G, an);
        if w1 >= gamma {
            return 1e-99;
        }
        (-(gamma - w1).ln(), poly(&C3, an), poly(&C4, an).exp())
    } else {
        let xx = an.ln();
        (w1, poly(&C5, xx), poly(&C6, xx).exp())
    };
    1.0 - normal_cdf((y - m) / s)
}

/// Statistic, p-value and conclusion of one normality test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
    pub conclusion: NormalityConclusion,
}

/// Normality and white-noise diagnostics of a residual sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    /// Residuals used after dropping missing values.
    pub observations: usize,
    pub alpha: f64,
    pub jarque_bera: NormalityTest,
    pub skewness: f64,
    pub kurtosis: f64,
    pub shapiro_wilk: NormalityTest,
    pub ljung_box: LjungBoxResult,
}

/// Run both normality tests (and Ljung-Box) on `residuals`, ignoring `NaN`s.
///
/// Purely informational: nothing is corrected based on the outcome.
pub fn residual_diagnostics(residuals: &[f64], alpha: f64) -> Result<ResidualDiagnostics> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "alpha must be in (0, 1), got {}",
            alpha
        )));
    }
    let clean: Vec<f64> = residuals.iter().copied().filter(|v| !v.is_nan()).collect();
    let jb = jarque_bera(&clean)?;
    let sw = shapiro_wilk(&clean)?;
    let lb = ljung_box(&clean, None, 0);

    let test = |statistic: f64, p_value: f64| NormalityTest {
        statistic,
        p_value,
        conclusion: NormalityConclusion::from_p_value(p_value, alpha),
    };
    let diagnostics = ResidualDiagnostics {
        observations: clean.len(),
        alpha,
        jarque_bera: test(jb.statistic, jb.p_value),
        skewness: jb.skewness,
        kurtosis: jb.kurtosis,
        shapiro_wilk: test(sw.statistic, sw.p_value),
        ljung_box: lb,
    };
    log::debug!(
        "residual diagnostics: JB={:.3} (p={:.4}), SW={:.4} (p={:.4}), n={}",
        jb.statistic,
        jb.p_value,
        sw.statistic,
        sw.p_value,
        clean.len()
    );
    Ok(diagnostics)
}
