//! End-to-end exploratory and comparative analysis of one series.
//!
//! [`explore`] chains the stationarity tests, differencing, decomposition and
//! residual diagnostics. [`compare_models`] splits the undifferenced series,
//! fits every family on the training part and scores its forecast of the
//! held-out part.

use crate::config::AnalysisConfig;
use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::difference_series;
use crate::models::{FittedModel, ModelFamily};
use crate::seasonality::{seasonal_decompose, Decomposition, DecompositionModel};
use crate::utils::metrics::{calculate_metrics, comparison_table, ComparisonRow, MetricsTable};
use crate::utils::stats::{mean, std_dev};
use crate::validation::{
    phase_cohorts, residual_diagnostics, stationarity_trace, DifferencingOrder,
    ResidualDiagnostics, StationarityTrace,
};
use serde::{Deserialize, Serialize};

/// Descriptive statistics of one phase of the seasonal cycle.
///
/// Phase `k` holds observations `k, k + m, k + 2m, ...` counted from the
/// first observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: usize,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `NaN` for a single observation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Everything [`explore`] derives from a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploratoryReport {
    pub order: DifferencingOrder,
    pub trace: StationarityTrace,
    /// The series after `d` regular and `D` seasonal differences.
    pub differenced: TimeSeries,
    /// `None` when the seasonal period is 1.
    pub decomposition: Option<Decomposition>,
    pub trend_strength: Option<f64>,
    pub seasonal_strength: Option<f64>,
    /// `None` without a decomposition or when the residuals are degenerate.
    pub diagnostics: Option<ResidualDiagnostics>,
    pub phases: Vec<PhaseSummary>,
}

/// Gap-fill `series` with the configured method and reject what remains missing.
fn prepared(series: &TimeSeries, config: &AnalysisConfig) -> Result<TimeSeries> {
    if series.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    let series = if series.has_missing_values() {
        log::debug!("filling missing values with {:?}", config.fill_method);
        series.filled(config.fill_method)
    } else {
        series.clone()
    };
    if series.has_missing_values() {
        return Err(ForecastError::MissingValues);
    }
    Ok(series)
}

/// Per-phase count, mean, standard deviation and range.
pub fn phase_summary(values: &[f64], period: usize) -> Vec<PhaseSummary> {
    phase_cohorts(values, period.max(1))
        .into_iter()
        .enumerate()
        .map(|(phase, cohort)| PhaseSummary {
            phase,
            count: cohort.len(),
            mean: mean(&cohort),
            std: std_dev(&cohort),
            min: cohort.iter().copied().fold(f64::INFINITY, f64::min),
            max: cohort.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
        .collect()
}

/// Stationarity orders, differenced series, decomposition and residual diagnostics.
///
/// # Errors
/// Data-contract violations from any stage are returned unchanged, for
/// example `InsufficientData` when the series is shorter than the seasonal
/// period (or than two cycles for the decomposition).
pub fn explore(series: &TimeSeries, config: &AnalysisConfig) -> Result<ExploratoryReport> {
    config.validate()?;
    let series = prepared(series, config)?;
    let period = config.seasonal_period;

    let (order, trace) = stationarity_trace(series.values(), config)?;
    let differenced = difference_series(&series, period, order.d, order.cap_d)?;

    let decomposition = if period >= 2 {
        Some(seasonal_decompose(
            series.values(),
            period,
            DecompositionModel::Additive,
        )?)
    } else {
        None
    };

    let diagnostics = match &decomposition {
        Some(parts) => match residual_diagnostics(&parts.defined_resid(), config.alpha) {
            Ok(diagnostics) => Some(diagnostics),
            Err(e) => {
                log::warn!("skipping residual diagnostics: {}", e);
                None
            }
        },
        None => None,
    };

    let trend_strength = decomposition.as_ref().map(Decomposition::trend_strength);
    let seasonal_strength = decomposition.as_ref().map(Decomposition::seasonal_strength);
    if let (Some(trend), Some(seasonal)) = (trend_strength, seasonal_strength) {
        log::info!("trend strength {:.3}, seasonal strength {:.3}", trend, seasonal);
    }

    Ok(ExploratoryReport {
        order,
        trace,
        differenced,
        decomposition,
        trend_strength,
        seasonal_strength,
        diagnostics,
        phases: phase_summary(series.values(), period),
    })
}

/// One family's fitted model scored on the held-out window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub family: String,
    pub model: FittedModel,
    /// Forecast indexed by the test timestamps.
    pub forecast: Forecast,
    pub comparison: Vec<ComparisonRow>,
}

/// Result of [`compare_models`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub train: TimeSeries,
    pub test: TimeSeries,
    /// In the order the families were given.
    pub evaluations: Vec<ModelEvaluation>,
    pub metrics: MetricsTable,
}

impl ModelComparison {
    pub fn evaluation(&self, family: &str) -> Option<&ModelEvaluation> {
        self.evaluations.iter().find(|e| e.family == family)
    }

    /// Family with the lowest test RMSE.
    pub fn best(&self) -> Option<&ModelEvaluation> {
        self.metrics
            .best_by_rmse()
            .and_then(|family| self.evaluation(family))
    }
}

/// Fit every family on the training split and evaluate it on the test split.
///
/// The series is split at `floor(n * config.train_fraction)`. The first
/// family that fails aborts the comparison with its error; no fallback model
/// is substituted.
pub fn compare_models(
    series: &TimeSeries,
    families: &[Box<dyn ModelFamily>],
    config: &AnalysisConfig,
) -> Result<ModelComparison> {
    config.validate()?;
    let series = prepared(series, config)?;
    let (train, test) = series.split(config.train_fraction)?;

    let mut evaluations = Vec::with_capacity(families.len());
    let mut metrics = MetricsTable::new();
    for family in families {
        log::debug!("fitting {} on {} observations", family.name(), train.len());
        let model = family.fit(&train, config)?;
        let forecast = model.forecast(test.len())?.aligned_to(&test)?;
        let record = calculate_metrics(test.values(), forecast.values())?;
        log::info!(
            "{}: RMSE={:.2} MAPE={:.2} R2={:.2}",
            family.name(),
            record.rmse,
            record.mape,
            record.r_squared
        );
        let comparison = comparison_table(&test, forecast.values())?;
        metrics.insert(family.name(), record);
        evaluations.push(ModelEvaluation {
            family: family.name().to_string(),
            model,
            forecast,
            comparison,
        });
    }

    Ok(ModelComparison {
        train,
        test,
        evaluations,
        metrics,
    })
}
