//! Explicit analysis configuration.
//!
//! Every component receives the options it needs through an
//! [`AnalysisConfig`] value; nothing reads shared global settings.

use crate::core::FillMethod;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Inclusive search ranges for the (p, d, q)(P, D, Q) orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSearchRanges {
    pub p: RangeInclusive<usize>,
    pub d: RangeInclusive<usize>,
    pub q: RangeInclusive<usize>,
    pub cap_p: RangeInclusive<usize>,
    pub cap_d: RangeInclusive<usize>,
    pub cap_q: RangeInclusive<usize>,
}

impl Default for OrderSearchRanges {
    fn default() -> Self {
        Self {
            p: 0..=2,
            d: 0..=2,
            q: 0..=2,
            cap_p: 0..=1,
            cap_d: 0..=1,
            cap_q: 0..=1,
        }
    }
}

impl OrderSearchRanges {
    /// Set the non-seasonal ranges.
    pub fn with_nonseasonal(
        mut self,
        p: RangeInclusive<usize>,
        d: RangeInclusive<usize>,
        q: RangeInclusive<usize>,
    ) -> Self {
        self.p = p;
        self.d = d;
        self.q = q;
        self
    }

    /// Set the seasonal ranges.
    pub fn with_seasonal(
        mut self,
        cap_p: RangeInclusive<usize>,
        cap_d: RangeInclusive<usize>,
        cap_q: RangeInclusive<usize>,
    ) -> Self {
        self.cap_p = cap_p;
        self.cap_d = cap_d;
        self.cap_q = cap_q;
        self
    }

    /// Number of candidates in the full Cartesian product.
    pub fn candidate_count(&self) -> usize {
        [&self.p, &self.d, &self.q, &self.cap_p, &self.cap_d, &self.cap_q]
            .into_iter()
            .map(|r| r.clone().count())
            .product()
    }

    fn validate(&self) -> Result<()> {
        let named = [
            ("p", &self.p),
            ("d", &self.d),
            ("q", &self.q),
            ("P", &self.cap_p),
            ("D", &self.cap_d),
            ("Q", &self.cap_q),
        ];
        for (name, range) in named {
            if range.is_empty() {
                return Err(ForecastError::InvalidConfiguration(format!(
                    "empty search range for {}: {:?}",
                    name, range
                )));
            }
        }
        Ok(())
    }
}

/// Options shared by the stationarity, decomposition and model-search components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Seasonal period `m` (1 disables seasonal terms).
    pub seasonal_period: usize,
    /// Significance level for the stationarity tests.
    pub alpha: f64,
    /// How gaps in the raw series are filled before analysis.
    pub fill_method: FillMethod,
    /// Leading fraction of the series used for training.
    pub train_fraction: f64,
    /// Ranges explored by the exhaustive order search.
    pub order_search_ranges: OrderSearchRanges,
    /// Upper bound on regular differences tried by the unit-root loop.
    pub max_regular_diffs: usize,
    /// Upper bound on seasonal differences tried by the cohort test loop.
    pub max_seasonal_diffs: usize,
    /// Smallest cohort the seasonal test accepts before halting.
    pub min_cohort_size: usize,
    /// Seed for the pseudo-random source of the randomized search.
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seasonal_period: 12,
            alpha: 0.05,
            fill_method: FillMethod::ForwardFill,
            train_fraction: 0.95,
            order_search_ranges: OrderSearchRanges::default(),
            max_regular_diffs: 2,
            max_seasonal_diffs: 2,
            min_cohort_size: 5,
            seed: 20,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_fill_method(mut self, fill_method: FillMethod) -> Self {
        self.fill_method = fill_method;
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    pub fn with_order_search_ranges(mut self, ranges: OrderSearchRanges) -> Self {
        self.order_search_ranges = ranges;
        self
    }

    pub fn with_max_regular_diffs(mut self, max_d: usize) -> Self {
        self.max_regular_diffs = max_d;
        self
    }

    pub fn with_max_seasonal_diffs(mut self, max_cap_d: usize) -> Self {
        self.max_seasonal_diffs = max_cap_d;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every option is usable.
    pub fn validate(&self) -> Result<()> {
        if self.seasonal_period == 0 {
            return Err(ForecastError::InvalidConfiguration(
                "seasonal period must be at least 1".to_string(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ForecastError::InvalidConfiguration(format!(
                "train fraction must lie in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.min_cohort_size < 2 {
            return Err(ForecastError::InvalidConfiguration(
                "minimum cohort size must be at least 2".to_string(),
            ));
        }
        self.order_search_ranges.validate()
    }
}
