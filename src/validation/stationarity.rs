//! Stationarity tests and differencing-order selection.
//!
//! The regular order `d` comes from repeated Augmented Dickey-Fuller tests,
//! the seasonal order `D` from repeated Kruskal-Wallis tests across the
//! phase cohorts of the seasonal cycle.

use crate::config::AnalysisConfig;
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, seasonal_difference};
use crate::utils::ols::{least_squares, LeastSquaresFit};
use crate::utils::stats::{average_ranks, chi_squared_sf, normal_cdf};
use serde::{Deserialize, Serialize};

/// Deterministic terms included in the ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdfRegression {
    /// Constant only.
    #[default]
    Constant,
    /// Constant and linear time trend.
    ConstantTrend,
}

impl AdfRegression {
    fn deterministic_terms(&self) -> usize {
        match self {
            AdfRegression::Constant => 1,
            AdfRegression::ConstantTrend => 2,
        }
    }
}

/// Critical values for stationarity tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    /// Critical value at 1% significance
    pub cv_1pct: f64,
    /// Critical value at 5% significance
    pub cv_5pct: f64,
    /// Critical value at 10% significance
    pub cv_10pct: f64,
}

/// Result of an Augmented Dickey-Fuller test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-statistic of the lagged level coefficient
    pub statistic: f64,
    /// MacKinnon approximate p-value
    pub p_value: f64,
    /// Number of lagged differences selected
    pub lags: usize,
    /// Observations used in the final regression
    pub nobs: usize,
    pub regression: AdfRegression,
    pub critical_values: CriticalValues,
    /// The differenced series had no variation, so no regression was run.
    pub degenerate: bool,
}

impl AdfResult {
    /// `(p_value, needs_differencing)`: the unit root is not rejected when `p > alpha`.
    ///
    /// A degenerate series never asks for more differencing.
    pub fn should_diff(&self, alpha: f64) -> (f64, bool) {
        (self.p_value, !self.degenerate && self.p_value > alpha)
    }
}

/// Default lag order `trunc((n-1)^(1/3))` for a series of length `n`.
pub fn default_adf_lags(n: usize) -> usize {
    (n.saturating_sub(1) as f64).powf(1.0 / 3.0).trunc() as usize
}

/// Augmented Dickey-Fuller test for a unit root.
///
/// Fits `Δy_t = α [+ δt] + β y_{t-1} + Σ γ_i Δy_{t-i}` with the number of
/// lagged differences chosen by AIC over `0..=max_lags` on a common sample,
/// then refits with the chosen lag on every available observation.
/// `max_lags` defaults to [`default_adf_lags`].
pub fn adf_test(
    series: &[f64],
    max_lags: Option<usize>,
    regression: AdfRegression,
) -> Result<AdfResult> {
    let (dx, max_lag) = adf_inputs(series, max_lags, regression)?;
    if let Some(result) = degenerate_adf(&dx, regression) {
        return Ok(result);
    }

    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let (columns, y) = adf_design(series, &dx, lag, max_lag, regression);
        match least_squares(&columns, &y) {
            Ok(fit) => {
                let aic = fit.aic();
                if best.map_or(true, |(_, b)| aic < b) {
                    best = Some((lag, aic));
                }
            }
            Err(e) => log::debug!("ADF: lag {} skipped: {}", lag, e),
        }
    }
    let lags = best.map(|(lag, _)| lag).unwrap_or(0);
    adf_with_lags(series, &dx, lags, regression)
}

/// Augmented Dickey-Fuller test with a fixed number of lagged differences.
///
/// `lags` defaults to [`default_adf_lags`] and is only reduced when the
/// series is too short to estimate that many. This is the form used by the
/// differencing-order rounds.
pub fn adf_test_fixed_lag(
    series: &[f64],
    lags: Option<usize>,
    regression: AdfRegression,
) -> Result<AdfResult> {
    let (dx, lags) = adf_inputs(series, lags, regression)?;
    if let Some(result) = degenerate_adf(&dx, regression) {
        return Ok(result);
    }
    adf_with_lags(series, &dx, lags, regression)
}

/// Validate `series` and return its first difference with the usable lag bound.
fn adf_inputs(
    series: &[f64],
    max_lags: Option<usize>,
    regression: AdfRegression,
) -> Result<(Vec<f64>, usize)> {
    const MIN_OBS: usize = 6;
    let n = series.len();
    if n < MIN_OBS {
        return Err(ForecastError::InsufficientData {
            needed: MIN_OBS,
            got: n,
        });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::MissingValues);
    }

    let dx = difference(series, 1);
    let params = |lag: usize| regression.deterministic_terms() + 1 + lag;

    let mut max_lag = max_lags.unwrap_or_else(|| default_adf_lags(n));
    while max_lag > 0 && dx.len() - max_lag.min(dx.len()) <= params(max_lag) + 1 {
        max_lag -= 1;
    }
    if dx.len() <= params(0) + 1 {
        return Err(ForecastError::InsufficientData {
            needed: params(0) + 3,
            got: n,
        });
    }
    Ok((dx, max_lag))
}

/// A constant first difference leaves nothing to regress.
fn degenerate_adf(dx: &[f64], regression: AdfRegression) -> Option<AdfResult> {
    let first = *dx.first()?;
    if !dx.iter().all(|&v| v == first) {
        return None;
    }
    log::debug!("ADF: differenced series is constant, skipping regression");
    Some(AdfResult {
        statistic: f64::NAN,
        p_value: f64::NAN,
        lags: 0,
        nobs: dx.len(),
        regression,
        critical_values: mackinnon_critical_values(regression, dx.len()),
        degenerate: true,
    })
}

fn adf_with_lags(
    series: &[f64],
    dx: &[f64],
    lags: usize,
    regression: AdfRegression,
) -> Result<AdfResult> {
    let (columns, y) = adf_design(series, dx, lags, lags, regression);
    let fit: LeastSquaresFit = least_squares(&columns, &y)?;
    // level coefficient sits right after the deterministic columns
    let statistic = fit.t_stat(regression.deterministic_terms());
    if !statistic.is_finite() {
        return Err(ForecastError::ComputationError(
            "ADF statistic is not finite".to_string(),
        ));
    }

    let p_value = mackinnon_p_value(statistic, regression);
    log::debug!(
        "ADF: statistic={:.4} p={:.4} lags={} nobs={}",
        statistic,
        p_value,
        lags,
        fit.nobs
    );

    Ok(AdfResult {
        statistic,
        p_value,
        lags,
        nobs: fit.nobs,
        regression,
        critical_values: mackinnon_critical_values(regression, fit.nobs),
        degenerate: false,
    })
}

/// Design matrix for the ADF regression using observations `start..` of `dx`.
fn adf_design(
    series: &[f64],
    dx: &[f64],
    lag: usize,
    start: usize,
    regression: AdfRegression,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows = start..dx.len();
    let y: Vec<f64> = rows.clone().map(|t| dx[t]).collect();

    let mut columns = vec![vec![1.0; y.len()]];
    if regression == AdfRegression::ConstantTrend {
        columns.push(rows.clone().map(|t| (t + 1) as f64).collect());
    }
    columns.push(rows.clone().map(|t| series[t]).collect());
    for i in 1..=lag {
        columns.push(rows.clone().map(|t| dx[t - i]).collect());
    }
    (columns, y)
}

/// MacKinnon (1994) approximate asymptotic p-value for a single-series DF statistic.
pub fn mackinnon_p_value(statistic: f64, regression: AdfRegression) -> f64 {
    let (tau_max, tau_min, tau_star, small, large): (f64, f64, f64, [f64; 3], [f64; 4]) =
        match regression {
            AdfRegression::Constant => (
                2.74,
                -18.83,
                -1.61,
                [2.1659, 1.4412, 0.038269],
                [1.7339, 0.93202, -0.12745, -0.010368],
            ),
            AdfRegression::ConstantTrend => (
                0.7,
                -16.18,
                -2.89,
                [3.2512, 1.6047, 0.049588],
                [2.5261, 0.61654, -0.37956, -0.060285],
            ),
        };

    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic > tau_max {
        return 1.0;
    }
    if statistic < tau_min {
        return 0.0;
    }

    let poly = |coefs: &[f64]| {
        coefs
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * statistic + c)
    };
    let z = if statistic <= tau_star {
        poly(&small)
    } else {
        poly(&large)
    };
    normal_cdf(z)
}

/// MacKinnon (2010) finite-sample critical values.
fn mackinnon_critical_values(regression: AdfRegression, nobs: usize) -> CriticalValues {
    let table: [[f64; 4]; 3] = match regression {
        AdfRegression::Constant => [
            [-3.43035, -6.5393, -16.786, -79.433],
            [-2.86154, -2.8903, -4.234, -40.040],
            [-2.56677, -1.5384, -2.809, 0.0],
        ],
        AdfRegression::ConstantTrend => [
            [-3.95877, -9.0531, -28.428, -134.155],
            [-3.41049, -4.3904, -9.036, -45.374],
            [-3.12705, -2.5856, -3.925, -22.380],
        ],
    };
    let inv = 1.0 / nobs.max(1) as f64;
    let crit = |c: &[f64; 4]| c[0] + c[1] * inv + c[2] * inv * inv + c[3] * inv * inv * inv;

    CriticalValues {
        cv_1pct: crit(&table[0]),
        cv_5pct: crit(&table[1]),
        cv_10pct: crit(&table[2]),
    }
}

/// Result of a Kruskal-Wallis H test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KruskalWallisResult {
    /// Tie-corrected H statistic
    pub statistic: f64,
    /// Chi-squared(k - 1) p-value
    pub p_value: f64,
    /// Number of groups
    pub groups: usize,
}

/// Kruskal-Wallis rank test for equal location across `groups`.
///
/// When every observation is identical the statistic is NaN and the
/// p-value 1: the data carries no evidence of a location difference.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Result<KruskalWallisResult> {
    if groups.len() < 2 {
        return Err(ForecastError::InvalidParameter(
            "Kruskal-Wallis needs at least two groups".to_string(),
        ));
    }
    if let Some(empty) = groups.iter().position(|g| g.is_empty()) {
        return Err(ForecastError::InvalidParameter(format!(
            "group {} is empty",
            empty
        )));
    }

    let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
    let total = pooled.len() as f64;
    let ranks = average_ranks(&pooled);

    let mut offset = 0;
    let mut h = 0.0;
    for group in groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        h += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }
    h = 12.0 / (total * (total + 1.0)) * h - 3.0 * (total + 1.0);

    let correction = 1.0 - tie_term(&pooled) / (total.powi(3) - total);
    if correction <= 0.0 {
        return Ok(KruskalWallisResult {
            statistic: f64::NAN,
            p_value: 1.0,
            groups: groups.len(),
        });
    }
    let statistic = h / correction;

    Ok(KruskalWallisResult {
        statistic,
        p_value: chi_squared_sf(statistic, groups.len() - 1),
        groups: groups.len(),
    })
}

/// `Σ (t³ - t)` over blocks of tied values.
fn tie_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .chunk_by(|a, b| a == b)
        .map(|block| {
            let t = block.len() as f64;
            t * t * t - t
        })
        .sum()
}

/// Split a series into `period` cohorts by phase within the cycle.
pub fn phase_cohorts(series: &[f64], period: usize) -> Vec<Vec<f64>> {
    (0..period)
        .map(|phase| series.iter().skip(phase).step_by(period).copied().collect())
        .collect()
}

/// Regular and seasonal differencing orders with the period that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferencingOrder {
    pub d: usize,
    pub cap_d: usize,
    pub period: usize,
}

/// One test evaluated at a given differencing order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestRound {
    /// Differences applied before this test.
    pub order: usize,
    pub statistic: f64,
    pub p_value: f64,
    /// Whether this round asked for another difference.
    pub needs_differencing: bool,
}

/// Every round evaluated while choosing `d` and `D`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationarityTrace {
    pub regular: Vec<TestRound>,
    pub seasonal: Vec<TestRound>,
    /// The seasonal loop stopped because a cohort fell below the minimum size.
    pub cohort_guard_hit: bool,
    /// The regular loop stopped at the configured cap.
    pub regular_cap_hit: bool,
}

/// Smallest `d ≤ max_d` after which the ADF test stops asking for differencing.
///
/// Each round runs the constant-and-trend test with a fixed lag of
/// `trunc((n-1)^(1/3))`, where `n` is the length of the series at that round.
pub fn ndiffs(series: &[f64], alpha: f64, max_d: usize) -> Result<usize> {
    regular_order(series, alpha, max_d).map(|(d, _, _)| d)
}

/// ADF form used for every differencing round: constant and trend with the
/// default fixed lag of the series being tested.
fn regular_round(data: &[f64]) -> Result<AdfResult> {
    adf_test_fixed_lag(data, None, AdfRegression::ConstantTrend)
}

fn regular_order(series: &[f64], alpha: f64, max_d: usize) -> Result<(usize, Vec<TestRound>, bool)> {
    let mut data = series.to_vec();
    let mut d = 0;
    let mut rounds = Vec::new();

    let result = regular_round(&data)?;
    let (p_value, mut needs) = result.should_diff(alpha);
    log::debug!("d={}: ADF p-value {:.4}, needs differencing: {}", d, p_value, needs);
    rounds.push(TestRound {
        order: d,
        statistic: result.statistic,
        p_value,
        needs_differencing: needs,
    });

    while needs {
        if d >= max_d {
            log::warn!("regular differencing capped at d={}", max_d);
            return Ok((d, rounds, true));
        }
        d += 1;
        data = difference(&data, 1);
        let result = match regular_round(&data) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("stopping regular differencing at d={}: {}", d, e);
                return Ok((d, rounds, false));
            }
        };
        let (p_value, next) = result.should_diff(alpha);
        log::debug!("d={}: ADF p-value {:.4}, needs differencing: {}", d, p_value, next);
        rounds.push(TestRound {
            order: d,
            statistic: result.statistic,
            p_value,
            needs_differencing: next,
        });
        needs = next;
    }

    Ok((d, rounds, false))
}

/// Smallest `D ≤ max_cap_d` after which the phase cohorts no longer differ in location.
///
/// If a seasonal difference leaves any cohort with fewer than
/// `min_cohort_size` observations the loop halts and returns the current
/// `D` without testing further.
pub fn nsdiffs(
    series: &[f64],
    period: usize,
    alpha: f64,
    min_cohort_size: usize,
    max_cap_d: usize,
) -> Result<usize> {
    seasonal_order(series, period, alpha, min_cohort_size, max_cap_d).map(|(d, _, _)| d)
}

fn seasonal_order(
    series: &[f64],
    period: usize,
    alpha: f64,
    min_cohort_size: usize,
    max_cap_d: usize,
) -> Result<(usize, Vec<TestRound>, bool)> {
    if period < 2 {
        return Err(ForecastError::InvalidConfiguration(format!(
            "seasonal period must be at least 2 for the cohort test, got {}",
            period
        )));
    }
    if series.len() < period {
        return Err(ForecastError::InsufficientData {
            needed: period,
            got: series.len(),
        });
    }

    let mut data = series.to_vec();
    let mut cap_d = 0;
    let mut rounds = Vec::new();

    let result = kruskal_wallis(&phase_cohorts(&data, period))?;
    log::debug!(
        "D={}: Kruskal-Wallis H={:.4}, p-value {:.4}",
        cap_d,
        result.statistic,
        result.p_value
    );
    rounds.push(TestRound {
        order: cap_d,
        statistic: result.statistic,
        p_value: result.p_value,
        needs_differencing: result.p_value < alpha,
    });
    let mut p_value = result.p_value;

    while p_value < alpha {
        if cap_d >= max_cap_d {
            log::warn!("seasonal differencing capped at D={}", max_cap_d);
            break;
        }
        cap_d += 1;
        data = seasonal_difference(&data, 1, period);
        let cohorts = phase_cohorts(&data, period);
        if cohorts.iter().any(|c| c.len() < min_cohort_size) {
            log::warn!(
                "cohorts below {} observations after D={}, halting seasonal test",
                min_cohort_size,
                cap_d
            );
            return Ok((cap_d, rounds, true));
        }

        let result = kruskal_wallis(&cohorts)?;
        log::debug!(
            "D={}: Kruskal-Wallis H={:.4}, p-value {:.4}",
            cap_d,
            result.statistic,
            result.p_value
        );
        rounds.push(TestRound {
            order: cap_d,
            statistic: result.statistic,
            p_value: result.p_value,
            needs_differencing: result.p_value < alpha,
        });
        p_value = result.p_value;
    }

    Ok((cap_d, rounds, false))
}

/// Choose `(d, D)` for `series` under `config`.
pub fn differencing_order(series: &[f64], config: &AnalysisConfig) -> Result<DifferencingOrder> {
    stationarity_trace(series, config).map(|(order, _)| order)
}

/// Choose `(d, D)` and keep every test round for reporting.
///
/// Both orders are derived from the undifferenced series. With a seasonal
/// period of 1 there are no cohorts to compare and `D` is 0.
pub fn stationarity_trace(
    series: &[f64],
    config: &AnalysisConfig,
) -> Result<(DifferencingOrder, StationarityTrace)> {
    config.validate()?;
    let period = config.seasonal_period;
    if series.len() < period {
        return Err(ForecastError::InsufficientData {
            needed: period,
            got: series.len(),
        });
    }

    let (d, regular, regular_cap_hit) =
        regular_order(series, config.alpha, config.max_regular_diffs)?;
    let (cap_d, seasonal, cohort_guard_hit) = if period > 1 {
        seasonal_order(
            series,
            period,
            config.alpha,
            config.min_cohort_size,
            config.max_seasonal_diffs,
        )?
    } else {
        (0, Vec::new(), false)
    };

    log::info!("differencing order: d={}, D={}, m={}", d, cap_d, period);
    Ok((
        DifferencingOrder { d, cap_d, period },
        StationarityTrace {
            regular,
            seasonal,
            cohort_guard_hit,
            regular_cap_hit,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn gaussian_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                // Box-Muller
                let u1: f64 = rng.gen_range(1e-12..1.0);
                let u2: f64 = rng.gen();
                (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
            })
            .collect()
    }

    fn cumsum(values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .scan(0.0, |acc, v| {
                *acc += v;
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn mackinnon_p_values_match_critical_points() {
        assert_relative_eq!(mackinnon_p_value(-2.86, AdfRegression::Constant), 0.05, epsilon = 2e-3);
        assert_relative_eq!(
            mackinnon_p_value(-3.41, AdfRegression::ConstantTrend),
            0.05,
            epsilon = 2e-3
        );
        assert_eq!(mackinnon_p_value(-25.0, AdfRegression::Constant), 0.0);
        assert_eq!(mackinnon_p_value(3.0, AdfRegression::Constant), 1.0);
        // continuous across the switch point
        let below = mackinnon_p_value(-1.6101, AdfRegression::Constant);
        let above = mackinnon_p_value(-1.6099, AdfRegression::Constant);
        assert!((below - above).abs() < 1e-3);
    }

    #[test]
    fn adf_rejects_unit_root_for_white_noise() {
        let noise = gaussian_noise(200, 1);
        let result = adf_test(&noise, None, AdfRegression::Constant).unwrap();
        assert!(result.statistic < result.critical_values.cv_1pct);
        assert!(result.p_value < 0.01);
        assert!(!result.should_diff(0.05).1);
    }

    #[test]
    fn adf_keeps_unit_root_for_drifting_random_walk() {
        let steps: Vec<f64> = gaussian_noise(200, 2).iter().map(|e| 1.0 + 0.5 * e).collect();
        let walk = cumsum(&steps);
        let result = adf_test(&walk, None, AdfRegression::Constant).unwrap();
        assert!(result.p_value > 0.05);
        assert!(result.should_diff(0.05).1);
    }

    #[test]
    fn adf_constant_series_is_degenerate() {
        let result = adf_test(&[5.0; 30], None, AdfRegression::Constant).unwrap();
        assert!(result.degenerate);
        assert!(!result.should_diff(0.05).1);
    }

    #[test]
    fn adf_requires_minimum_length() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0], None, AdfRegression::Constant),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn fixed_lag_test_keeps_the_default_lag() {
        let noise = gaussian_noise(120, 6);
        assert_eq!(default_adf_lags(120), 4);
        let result = adf_test_fixed_lag(&noise, None, AdfRegression::ConstantTrend).unwrap();
        assert_eq!(result.lags, 4);
        assert_eq!(result.nobs, 119 - 4);
        assert_eq!(result.regression, AdfRegression::ConstantTrend);

        // too short for the requested lag: reduced until estimable
        let short = adf_test_fixed_lag(&noise[..10], Some(8), AdfRegression::ConstantTrend).unwrap();
        assert!(short.lags < 8);
    }

    #[test]
    fn trend_stationary_series_needs_no_differencing() {
        let stationary = (0..10)
            .filter(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let series: Vec<f64> = (0..120)
                    .map(|t| 0.5 * t as f64 + rng.gen_range(-2.0..2.0))
                    .collect();
                ndiffs(&series, 0.05, 2).unwrap() == 0
            })
            .count();
        assert!(stationary >= 9, "only {} of 10 trend-stationary series", stationary);
    }

    #[test]
    fn kruskal_wallis_matches_reference_value() {
        // scipy.stats.kruskal([1, 2, 3], [4, 5, 6]) -> H = 3.857142857, p = 0.049534613
        let result = kruskal_wallis(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_relative_eq!(result.statistic, 27.0 / 7.0, epsilon = 1e-10);
        assert_relative_eq!(result.p_value, 0.049534613, epsilon = 1e-6);
    }

    #[test]
    fn kruskal_wallis_applies_tie_correction() {
        // ranks: [1.5, 1.5, 3] and [4, 5.5, 5.5]
        let result = kruskal_wallis(&[vec![1.0, 1.0, 2.0], vec![3.0, 4.0, 4.0]]).unwrap();
        let raw = 12.0 / 42.0 * (36.0 / 3.0 + 225.0 / 3.0) - 21.0;
        let correction = 1.0 - 12.0 / 210.0;
        assert_relative_eq!(result.statistic, raw / correction, epsilon = 1e-10);
    }

    #[test]
    fn kruskal_wallis_identical_values() {
        let result = kruskal_wallis(&[vec![2.0; 4], vec![2.0; 4]]).unwrap();
        assert!(result.statistic.is_nan());
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn phase_cohorts_group_by_position() {
        let cohorts = phase_cohorts(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        assert_eq!(cohorts, vec![vec![0.0, 3.0, 6.0], vec![1.0, 4.0], vec![2.0, 5.0]]);
    }

    #[test]
    fn ndiffs_detects_single_and_double_integration() {
        let steps: Vec<f64> = gaussian_noise(240, 3).iter().map(|e| 1.0 + 0.5 * e).collect();
        let once = cumsum(&steps);
        assert_eq!(ndiffs(&once, 0.05, 2).unwrap(), 1);

        let twice = cumsum(&once);
        assert_eq!(ndiffs(&twice, 0.05, 2).unwrap(), 2);
    }

    #[test]
    fn ndiffs_respects_cap() {
        let steps: Vec<f64> = gaussian_noise(240, 4).iter().map(|e| 1.0 + 0.5 * e).collect();
        let twice = cumsum(&cumsum(&steps));
        assert_eq!(ndiffs(&twice, 0.05, 1).unwrap(), 1);
    }

    #[test]
    fn nsdiffs_halts_when_cohorts_get_too_small() {
        // Strong deterministic seasonality over 5 cycles: one seasonal difference
        // leaves 4 observations per cohort, below the minimum of 5.
        let series: Vec<f64> = (0..60).map(|i| ((i % 12) as f64) * 10.0).collect();
        let (cap_d, rounds, guard) = seasonal_order(&series, 12, 0.05, 5, 2).unwrap();
        assert_eq!(cap_d, 1);
        assert!(guard);
        assert_eq!(rounds.len(), 1);
        assert!(rounds[0].p_value < 0.05);
    }

    #[test]
    fn nsdiffs_zero_for_noise_in_most_seeds() {
        let zero_count = (0..10)
            .filter(|&seed| nsdiffs(&gaussian_noise(36, 100 + seed), 12, 0.05, 5, 2).unwrap() == 0)
            .count();
        assert!(zero_count >= 7);
    }

    #[test]
    fn nsdiffs_rejects_short_series() {
        assert!(matches!(
            nsdiffs(&[1.0; 8], 12, 0.05, 5, 2),
            Err(ForecastError::InsufficientData { needed: 12, got: 8 })
        ));
    }

    #[test]
    fn stationarity_trace_records_rounds() {
        let steps: Vec<f64> = gaussian_noise(120, 5).iter().map(|e| 1.0 + 0.5 * e).collect();
        let walk = cumsum(&steps);
        let config = AnalysisConfig::default();
        let (order, trace) = stationarity_trace(&walk, &config).unwrap();

        assert_eq!(order.period, 12);
        assert_eq!(order.d, 1);
        assert_eq!(trace.regular.len(), 2);
        assert!(trace.regular[0].needs_differencing);
        assert!(!trace.regular[1].needs_differencing);
        assert!(!trace.seasonal.is_empty());
    }
}
