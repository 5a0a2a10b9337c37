//! End-to-end checks of the stationarity, search and evaluation pipeline.

use anofox_tsa::analysis::{compare_models, explore};
use anofox_tsa::config::{AnalysisConfig, OrderSearchRanges};
use anofox_tsa::core::{Frequency, TimeSeries};
use anofox_tsa::error::ForecastError;
use anofox_tsa::models::arima::{ArimaGridSearch, AutoArimaSearch, OrderSearch, SearchStrategy};
use anofox_tsa::models::{
    AutoArimaFamily, ExponentialSmoothing, FittedModel, ModelCacheKey, ModelFamily,
};
use anofox_tsa::utils::{calculate_metrics, MetricsTable};
use anofox_tsa::validation::{differencing_order, ndiffs};
use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

fn month_end(values: Vec<f64>) -> TimeSeries {
    let start = Utc.with_ymd_and_hms(2010, 1, 31, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Frequency::MonthEnd, values).unwrap()
}

fn quarter_end(values: Vec<f64>) -> TimeSeries {
    let start = Utc.with_ymd_and_hms(2005, 3, 31, 0, 0, 0).unwrap();
    TimeSeries::regular(start, Frequency::QuarterEnd, values).unwrap()
}

fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn cumulative(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

#[test]
fn metrics_for_three_point_scenario() {
    let record = calculate_metrics(&[100.0, 110.0, 120.0], &[105.0, 108.0, 115.0]).unwrap();
    assert_relative_eq!(record.rmse, 18.0_f64.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(record.rmse, 4.243, epsilon = 1e-3);
    assert_relative_eq!(record.mape, 3.662, epsilon = 1e-3);
}

#[test]
fn metrics_reject_mismatched_lengths() {
    let actual = vec![1.0; 10];
    let predicted = vec![1.0; 9];
    assert_eq!(
        calculate_metrics(&actual, &predicted).unwrap_err(),
        ForecastError::LengthMismatch {
            expected: 10,
            got: 9
        }
    );
}

#[test]
fn r_squared_goes_negative_below_mean_baseline() {
    let actual = [1.0, 2.0, 3.0, 4.0];
    let record = calculate_metrics(&actual, &[4.0, 3.0, 2.0, 1.0]).unwrap();
    assert!(record.r_squared < 0.0);
    let exact = calculate_metrics(&actual, &actual).unwrap();
    assert_eq!(exact.r_squared, 1.0);
    assert_eq!(exact.rmse, 0.0);
}

#[test]
fn zero_actuals_leave_mape_non_finite() {
    let record = calculate_metrics(&[0.0, 1.0], &[0.5, 1.0]).unwrap();
    assert!(!record.mape.is_finite());
    assert!(record.rmse.is_finite());
}

#[test]
fn pure_noise_needs_no_differencing() {
    let config = AnalysisConfig::default();
    let no_seasonal = (0..10)
        .filter(|&seed| differencing_order(&noise(36, seed), &config).unwrap().cap_d == 0)
        .count();
    assert!(no_seasonal >= 8, "only {} of 10 short noise series", no_seasonal);

    // the trend-augmented ADF needs a longer sample to reject reliably
    let stationary = (0..10)
        .filter(|&seed| {
            let order = differencing_order(&noise(120, seed), &config).unwrap();
            order.d == 0 && order.cap_d == 0
        })
        .count();
    assert!(stationary >= 8, "only {} of 10 noise series", stationary);
}

#[test]
fn injected_unit_roots_are_differenced_away() {
    let once = cumulative(&noise(200, 42));
    let twice = cumulative(&once);
    assert_eq!(ndiffs(&once, 0.05, 2).unwrap(), 1);
    assert_eq!(ndiffs(&twice, 0.05, 2).unwrap(), 2);
}

#[test]
fn series_shorter_than_period_is_rejected() {
    let config = AnalysisConfig::default().with_seasonal_period(12);
    assert_eq!(
        differencing_order(&noise(11, 1), &config).unwrap_err(),
        ForecastError::InsufficientData {
            needed: 12,
            got: 11
        }
    );
}

#[test]
fn explore_then_compare_on_quarterly_data() {
    let mut rng = StdRng::seed_from_u64(17);
    let values: Vec<f64> = (0..64)
        .map(|i| {
            200.0
                + 1.5 * i as f64
                + 12.0 * (2.0 * PI * i as f64 / 4.0).cos()
                + rng.gen_range(-2.0..2.0)
        })
        .collect();
    let series = quarter_end(values).with_name("sales");
    let config = AnalysisConfig::default()
        .with_seasonal_period(4)
        .with_train_fraction(0.875);

    let report = explore(&series, &config).unwrap();
    assert_eq!(report.phases.len(), 4);
    assert!(report.seasonal_strength.unwrap() > 0.8);

    let families: Vec<Box<dyn ModelFamily>> = vec![
        Box::new(AutoArimaFamily {
            strategy: SearchStrategy::Stepwise,
        }),
        Box::new(ExponentialSmoothing::default()),
    ];
    let comparison = compare_models(&series, &families, &config).unwrap();
    assert_eq!(comparison.test.len(), 8);
    let names: Vec<&str> = comparison.metrics.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["AUTO-ARIMA", "Holt-Winters"]);

    let export = comparison.metrics.to_delimited(',');
    assert!(export.starts_with("model,RMSE,MAPE,R2\n"));
    assert_eq!(export.lines().count(), 3);
}

#[test]
fn search_strategies_share_one_interface() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut values = vec![0.0; 80];
    for t in 1..80 {
        values[t] = 0.6 * values[t - 1] + rng.gen_range(-1.0..1.0);
    }
    let train = month_end(values);

    let strategies: Vec<Box<dyn OrderSearch>> = vec![
        Box::new(ArimaGridSearch::new(
            OrderSearchRanges::default().with_nonseasonal(0..=2, 0..=0, 0..=2),
            1,
        )),
        Box::new(
            AutoArimaSearch::new(1)
                .with_max_differences(0, 0)
                .with_strategy(SearchStrategy::Stepwise),
        ),
    ];
    let aics: Vec<f64> = strategies
        .iter()
        .map(|s| s.search(&train).unwrap().aic)
        .collect();
    // stepwise explores a subset of the grid, so it can only tie or lose
    assert!(aics[1] >= aics[0] - 1e-9);
    assert!(aics[1] - aics[0] < 10.0, "{:?}", aics);
}

#[test]
fn fitted_models_survive_serialization_under_their_cache_key() {
    let values: Vec<f64> = (0..48)
        .map(|i| 30.0 + 0.3 * i as f64 + 4.0 * (2.0 * PI * i as f64 / 12.0).sin())
        .collect();
    let train = month_end(values);
    let config = AnalysisConfig::default();
    let family = ExponentialSmoothing::default();

    let key = ModelCacheKey::for_fit("airline", &family, &train, &config);
    assert_eq!(key.to_string(), "airline_Holt-Winters_12_48");

    let model = family.fit(&train, &config).unwrap();
    let json = serde_json::to_string(&model).unwrap();
    let restored: FittedModel = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, model);
    assert_eq!(restored.forecast(6).unwrap(), model.forecast(6).unwrap());
}

#[test]
fn metrics_table_replaces_and_ranks() {
    let mut table = MetricsTable::new();
    table.insert("A", calculate_metrics(&[1.0, 2.0], &[1.5, 2.5]).unwrap());
    table.insert("B", calculate_metrics(&[1.0, 2.0], &[1.1, 2.1]).unwrap());
    table.insert("A", calculate_metrics(&[1.0, 2.0], &[3.0, 4.0]).unwrap());
    assert_eq!(table.len(), 2);
    assert_eq!(table.best_by_rmse(), Some("B"));
    assert_relative_eq!(table.get("A").unwrap().rmse, 2.0);
}
