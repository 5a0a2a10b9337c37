//! Shared plumbing for ARIMA order searches.
//!
//! Both search strategies fit candidate orders independently and keep the one
//! with the lowest AIC. Failed candidates are recorded and skipped; only a
//! search in which every candidate fails is an error.
//!
//! AICs are only comparable over one likelihood sample, so every candidate
//! of a search is scored on residuals from the same original index: the
//! largest warmup among the candidates the series can support.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::model::{ModelOrder, ARIMA};
use crate::models::Forecaster;
use std::time::{Duration, Instant};

/// AIC of a successfully fitted candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub order: ModelOrder,
    pub aic: f64,
    pub elapsed: Duration,
}

/// A candidate that could not be fitted, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub order: ModelOrder,
    pub reason: String,
}

/// Result of an order search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best model, fitted on the full training series.
    pub model: ARIMA,
    pub order: ModelOrder,
    pub aic: f64,
    /// Every successful candidate in evaluation order.
    pub evaluated: Vec<CandidateScore>,
    pub failures: Vec<CandidateFailure>,
}

impl SearchOutcome {
    /// Number of candidates the search attempted.
    pub fn attempted(&self) -> usize {
        self.evaluated.len() + self.failures.len()
    }
}

/// A strategy that picks the "best" ARIMA model for a training series.
pub trait OrderSearch {
    fn name(&self) -> &str;

    fn search(&self, train: &TimeSeries) -> Result<SearchOutcome>;
}

/// First original index scored by every candidate in `orders`.
///
/// Orders whose own warmup leaves too few observations in a series of
/// length `n` are ignored, so one infeasible candidate cannot shrink the
/// sample of all the others.
pub(crate) fn common_scoring_start<I>(orders: I, n: usize) -> usize
where
    I: IntoIterator<Item = ModelOrder>,
{
    orders
        .into_iter()
        .filter(|o| o.warmup() + o.num_coefficients() + 2 <= n)
        .map(|o| o.warmup())
        .max()
        .unwrap_or(0)
}

/// Fit one candidate scored from `scoring_start` and return the model with its finite AIC.
pub(crate) fn fit_candidate(
    train: &TimeSeries,
    order: ModelOrder,
    scoring_start: usize,
) -> Result<(ARIMA, f64)> {
    let mut model = ARIMA::new(order).with_scoring_start(scoring_start);
    model.fit(train)?;
    let aic = model
        .aic()
        .filter(|a| a.is_finite())
        .ok_or_else(|| ForecastError::NonConvergence(format!("{}: AIC is not finite", order)))?;
    Ok((model, aic))
}

/// Per-candidate fit result as produced by a (possibly parallel) evaluation pass.
pub(crate) type CandidateResult = (ModelOrder, Result<(ARIMA, f64)>, Duration);

pub(crate) fn timed_fit(
    train: &TimeSeries,
    order: ModelOrder,
    scoring_start: usize,
) -> CandidateResult {
    let start = Instant::now();
    let result = fit_candidate(train, order, scoring_start);
    (order, result, start.elapsed())
}

/// Running minimum over candidate results.
///
/// Candidates must be fed in enumeration order: a strictly lower AIC is
/// required to replace the incumbent, so the first minimum wins ties.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    best: Option<(ARIMA, f64)>,
    evaluated: Vec<CandidateScore>,
    failures: Vec<CandidateFailure>,
}

impl Selection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a result and report whether it became the new incumbent.
    pub(crate) fn record(&mut self, result: CandidateResult) -> bool {
        let (order, outcome, elapsed) = result;
        match outcome {
            Ok((model, aic)) => {
                log::debug!(
                    "{}: AIC={:.3}, elapsed={:.2}s",
                    order,
                    aic,
                    elapsed.as_secs_f64()
                );
                self.evaluated.push(CandidateScore {
                    order,
                    aic,
                    elapsed,
                });
                let improves = self.best.as_ref().map_or(true, |(_, best)| aic < *best);
                if improves {
                    self.best = Some((model, aic));
                }
                improves
            }
            Err(err) => {
                log::warn!("{}: skipped ({})", order, err);
                self.failures.push(CandidateFailure {
                    order,
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    pub(crate) fn best_aic(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, aic)| *aic)
    }

    pub(crate) fn attempted(&self) -> usize {
        self.evaluated.len() + self.failures.len()
    }

    /// Finish the search, failing with `NoViableModel` if nothing was fitted.
    pub(crate) fn finish(self, family: &str) -> Result<SearchOutcome> {
        let attempted = self.attempted();
        let (model, aic) = self.best.ok_or_else(|| ForecastError::NoViableModel {
            family: family.to_string(),
            attempted,
        })?;
        let order = model.order();
        log::info!(
            "{}: selected {} with AIC={:.3} ({} candidates, {} failed)",
            family,
            order,
            aic,
            attempted,
            self.failures.len()
        );
        Ok(SearchOutcome {
            model,
            order,
            aic,
            evaluated: self.evaluated,
            failures: self.failures,
        })
    }
}

/// Reject inputs no candidate could ever fit.
pub(crate) fn check_train(train: &TimeSeries) -> Result<()> {
    if train.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if train.has_missing_values() {
        return Err(ForecastError::MissingValues);
    }
    Ok(())
}
