//! Exhaustive grid search over ARIMA orders.

use crate::config::{AnalysisConfig, OrderSearchRanges};
use crate::core::TimeSeries;
use crate::error::Result;
use crate::models::arima::model::ModelOrder;
use crate::models::arima::search::{
    check_train, common_scoring_start, timed_fit, OrderSearch, SearchOutcome, Selection,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Fits every order in the Cartesian product of the configured ranges and
/// keeps the one with the lowest AIC.
///
/// Enumeration runs over p, d, q, P, D, Q with p outermost. The result is
/// deterministic: with the `parallel` feature candidates are fitted on the
/// rayon pool but reduced in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaGridSearch {
    ranges: OrderSearchRanges,
    seasonal_period: usize,
}

impl ArimaGridSearch {
    pub fn new(ranges: OrderSearchRanges, seasonal_period: usize) -> Self {
        Self {
            ranges,
            seasonal_period,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.order_search_ranges.clone(), config.seasonal_period)
    }

    pub fn ranges(&self) -> &OrderSearchRanges {
        &self.ranges
    }

    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    /// All candidate orders in enumeration order.
    ///
    /// Without a seasonal period (m < 2) only candidates with P = D = Q = 0
    /// are generated.
    pub fn candidates(&self) -> Vec<ModelOrder> {
        let r = &self.ranges;
        let s = self.seasonal_period;
        let seasonal = |range: &std::ops::RangeInclusive<usize>| {
            if s < 2 {
                0..=0
            } else {
                range.clone()
            }
        };

        let mut orders = Vec::with_capacity(r.candidate_count());
        for p in r.p.clone() {
            for d in r.d.clone() {
                for q in r.q.clone() {
                    for cap_p in seasonal(&r.cap_p) {
                        for cap_d in seasonal(&r.cap_d) {
                            for cap_q in seasonal(&r.cap_q) {
                                orders.push(
                                    ModelOrder::new(p, d, q).with_seasonal(cap_p, cap_d, cap_q, s),
                                );
                            }
                        }
                    }
                }
            }
        }
        orders
    }
}

impl OrderSearch for ArimaGridSearch {
    fn name(&self) -> &str {
        "ARIMA"
    }

    fn search(&self, train: &TimeSeries) -> Result<SearchOutcome> {
        check_train(train)?;
        let candidates = self.candidates();
        let scoring_start = common_scoring_start(candidates.iter().copied(), train.len());
        log::info!(
            "{}: grid search over {} candidates (m={}, scored from t={})",
            self.name(),
            candidates.len(),
            self.seasonal_period,
            scoring_start
        );

        #[cfg(feature = "parallel")]
        let results: Vec<_> = candidates
            .par_iter()
            .map(|&order| timed_fit(train, order, scoring_start))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = candidates
            .iter()
            .map(|&order| timed_fit(train, order, scoring_start))
            .collect();

        let mut selection = Selection::new();
        for result in results {
            selection.record(result);
        }
        selection.finish(self.name())
    }
}
