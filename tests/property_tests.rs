//! Property-based tests for the algebraic laws of differencing,
//! decomposition and the accuracy metrics.

use anofox_tsa::error::ForecastError;
use anofox_tsa::models::arima::{consumed_observations, difference_values, undifference};
use anofox_tsa::seasonality::{seasonal_decompose, DecompositionModel};
use anofox_tsa::utils::calculate_metrics;
use anofox_tsa::validation::kruskal_wallis;
use proptest::prelude::*;

/// Strategy for generating series values away from extreme magnitudes.
fn values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-500.0..500.0_f64, min_len..max_len)
}

/// Strategy for generating seasonal series with a random trend, amplitude and noise.
fn seasonal_strategy(period: usize) -> impl Strategy<Value = Vec<f64>> {
    (3usize..8, 0.0..2.0_f64, 1.0..20.0_f64).prop_flat_map(move |(cycles, slope, amplitude)| {
        prop::collection::vec(-1.0..1.0_f64, cycles * period).prop_map(move |noise| {
            noise
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    slope * i as f64
                        + amplitude
                            * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
                        + e
                })
                .collect()
        })
    })
}

// =============================================================================
// Property: differencing is undone by re-integration
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undifference_reconstructs_original(
        values in values_strategy(30, 80),
        period in 2usize..6,
        d in 0usize..3,
        cap_d in 0usize..2
    ) {
        prop_assume!(values.len() > consumed_observations(period, d, cap_d));
        let differenced = difference_values(&values, period, d, cap_d);
        prop_assert_eq!(
            differenced.len(),
            values.len() - consumed_observations(period, d, cap_d)
        );

        let restored = undifference(&differenced, &values, period, d, cap_d).unwrap();
        prop_assert_eq!(restored.len(), values.len());
        for (original, back) in values.iter().zip(&restored) {
            prop_assert!((original - back).abs() < 1e-6, "{} vs {}", original, back);
        }
    }
}

// =============================================================================
// Property: decomposition components add up and strengths stay in [0, 1]
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn decomposition_is_additive(values in seasonal_strategy(12)) {
        let parts = seasonal_decompose(&values, 12, DecompositionModel::Additive).unwrap();
        prop_assert!(parts.defined_indices().count() > 0);
        for i in parts.defined_indices() {
            let rebuilt = parts.trend[i] + parts.seasonal[i] + parts.resid[i];
            prop_assert!((values[i] - rebuilt).abs() < 1e-8);
        }
    }

    #[test]
    fn strengths_are_bounded(values in values_strategy(24, 90), period in 2usize..12) {
        prop_assume!(values.len() >= 2 * period);
        let parts = seasonal_decompose(&values, period, DecompositionModel::Additive).unwrap();
        for strength in [parts.trend_strength(), parts.seasonal_strength()] {
            prop_assert!((0.0..=1.0).contains(&strength), "strength {}", strength);
        }
    }
}

// =============================================================================
// Property: metric bounds and contract violations
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn rmse_is_never_negative(
        pairs in prop::collection::vec((1.0..1000.0_f64, -1000.0..1000.0_f64), 1..50)
    ) {
        let (actual, predicted): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let record = calculate_metrics(&actual, &predicted).unwrap();
        prop_assert!(record.rmse >= 0.0);
        prop_assert!((record.rmse * record.rmse - record.mse).abs() < 1e-6 * (1.0 + record.mse));
    }

    #[test]
    fn perfect_predictions_score_one(actual in values_strategy(2, 40)) {
        let record = calculate_metrics(&actual, &actual).unwrap();
        prop_assert_eq!(record.r_squared, 1.0);
        prop_assert_eq!(record.rmse, 0.0);
    }

    #[test]
    fn mismatched_lengths_never_score(
        actual in values_strategy(1, 30),
        extra in 1usize..5
    ) {
        let predicted = vec![0.0; actual.len() + extra];
        prop_assert_eq!(
            calculate_metrics(&actual, &predicted).unwrap_err(),
            ForecastError::LengthMismatch { expected: actual.len(), got: actual.len() + extra }
        );
    }

    #[test]
    fn kruskal_wallis_p_value_is_a_probability(
        groups in prop::collection::vec(prop::collection::vec(-10.0..10.0_f64, 2..10), 2..6)
    ) {
        let result = kruskal_wallis(&groups).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.p_value));
        prop_assert_eq!(result.groups, groups.len());
    }
}
