//! Automatic ARIMA and SARIMA order selection.
//!
//! An outer loop tries every regular and seasonal differencing order up to
//! small maxima. For each `(d, D)` an inner heuristic explores the AR/MA
//! orders, either stepwise (Hyndman-Khandakar) or by fitting a random subset
//! of the bounded order space. The overall best AIC wins. Every candidate
//! across all `(d, D)` pairs is scored on the same likelihood sample.

use crate::config::AnalysisConfig;
use crate::core::TimeSeries;
use crate::error::Result;
use crate::models::arima::model::ModelOrder;
use crate::models::arima::search::{
    check_train, common_scoring_start, timed_fit, OrderSearch, SearchOutcome, Selection,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// (p, q, P, Q) for a fixed pair of differencing orders.
type ArmaOrders = (usize, usize, usize, usize);

/// Stepwise moves before the neighbourhood search gives up.
const MAX_STEPWISE_STEPS: usize = 100;

/// Inner order-search heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Hyndman-Khandakar neighbourhood search from four start models.
    Stepwise,
    /// Fit `n_fits` orders drawn without replacement from the bounded space.
    Random { n_fits: usize },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::Random { n_fits: 50 }
    }
}

/// Heuristic ARIMA order search over an explicit `(d, D)` outer loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoArimaSearch {
    seasonal_period: usize,
    max_d: usize,
    max_cap_d: usize,
    max_p: usize,
    max_q: usize,
    max_cap_p: usize,
    max_cap_q: usize,
    /// Bound on p + q + P + Q.
    max_order: usize,
    strategy: SearchStrategy,
    seed: u64,
}

impl AutoArimaSearch {
    /// Search with seasonal period `m` and the default bounds
    /// (d, D up to 2; p, q up to 2; P, Q up to 1).
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            max_d: 2,
            max_cap_d: 2,
            max_p: 2,
            max_q: 2,
            max_cap_p: 1,
            max_cap_q: 1,
            max_order: 5,
            strategy: SearchStrategy::default(),
            seed: 20,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.seasonal_period).with_seed(config.seed)
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the maximum differencing orders of the outer loop.
    pub fn with_max_differences(mut self, max_d: usize, max_cap_d: usize) -> Self {
        self.max_d = max_d;
        self.max_cap_d = max_cap_d;
        self
    }

    /// Set the maximum AR/MA orders of the inner search.
    pub fn with_max_orders(
        mut self,
        max_p: usize,
        max_q: usize,
        max_cap_p: usize,
        max_cap_q: usize,
    ) -> Self {
        self.max_p = max_p;
        self.max_q = max_q;
        self.max_cap_p = max_cap_p;
        self.max_cap_q = max_cap_q;
        self
    }

    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run the search drawing random orders from `rng`.
    ///
    /// [`OrderSearch::search`] calls this with `StdRng` seeded from the
    /// configured seed; the stepwise strategy never touches `rng`.
    pub fn search_with_rng<R: Rng + ?Sized>(
        &self,
        train: &TimeSeries,
        rng: &mut R,
    ) -> Result<SearchOutcome> {
        check_train(train)?;
        let max_cap_d = if self.is_seasonal() { self.max_cap_d } else { 0 };
        let space = self.order_space();
        let scoring_start = common_scoring_start(
            (0..=self.max_d)
                .flat_map(|d| (0..=max_cap_d).map(move |cap_d| (d, cap_d)))
                .flat_map(|(d, cap_d)| space.iter().map(move |&key| self.order(key, d, cap_d))),
            train.len(),
        );
        log::debug!("{}: scoring candidates from t={}", self.name(), scoring_start);

        let mut selection = Selection::new();
        for d in 0..=self.max_d {
            for cap_d in 0..=max_cap_d {
                let attempted = selection.attempted();
                let local_best = match self.strategy {
                    SearchStrategy::Stepwise => {
                        self.stepwise(train, d, cap_d, scoring_start, &mut selection)
                    }
                    SearchStrategy::Random { n_fits } => self.random(
                        train,
                        d,
                        cap_d,
                        scoring_start,
                        n_fits,
                        rng,
                        &mut selection,
                    ),
                };
                match local_best {
                    Some(aic) => log::debug!(
                        "{}: d={}, D={} best AIC={:.3} over {} candidates",
                        self.name(),
                        d,
                        cap_d,
                        aic,
                        selection.attempted() - attempted
                    ),
                    None => log::warn!(
                        "{}: no model could be fitted with d={}, D={}",
                        self.name(),
                        d,
                        cap_d
                    ),
                }
            }
        }
        selection.finish(self.name())
    }

    fn is_seasonal(&self) -> bool {
        self.seasonal_period > 1
    }

    fn admissible(&self, (p, q, cap_p, cap_q): ArmaOrders) -> bool {
        let seasonal_ok = self.is_seasonal() || (cap_p == 0 && cap_q == 0);
        seasonal_ok
            && p <= self.max_p
            && q <= self.max_q
            && cap_p <= self.max_cap_p
            && cap_q <= self.max_cap_q
            && p + q + cap_p + cap_q <= self.max_order
    }

    fn order(&self, (p, q, cap_p, cap_q): ArmaOrders, d: usize, cap_d: usize) -> ModelOrder {
        ModelOrder::new(p, d, q).with_seasonal(cap_p, cap_d, cap_q, self.seasonal_period)
    }

    /// Every admissible (p, q, P, Q) in lexicographic order.
    fn order_space(&self) -> Vec<ArmaOrders> {
        let mut space = Vec::new();
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                for cap_p in 0..=self.max_cap_p {
                    for cap_q in 0..=self.max_cap_q {
                        let key = (p, q, cap_p, cap_q);
                        if self.admissible(key) {
                            space.push(key);
                        }
                    }
                }
            }
        }
        space
    }

    fn random<R: Rng + ?Sized>(
        &self,
        train: &TimeSeries,
        d: usize,
        cap_d: usize,
        scoring_start: usize,
        n_fits: usize,
        rng: &mut R,
        selection: &mut Selection,
    ) -> Option<f64> {
        let mut space = self.order_space();
        space.shuffle(rng);
        space.truncate(n_fits);
        let orders: Vec<ModelOrder> = space.iter().map(|&k| self.order(k, d, cap_d)).collect();

        #[cfg(feature = "parallel")]
        let results: Vec<_> = orders
            .par_iter()
            .map(|&order| timed_fit(train, order, scoring_start))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = orders
            .iter()
            .map(|&order| timed_fit(train, order, scoring_start))
            .collect();

        let mut local_best: Option<f64> = None;
        for result in results {
            if let Ok((_, aic)) = &result.1 {
                if local_best.map_or(true, |best| *aic < best) {
                    local_best = Some(*aic);
                }
            }
            selection.record(result);
        }
        local_best
    }

    fn stepwise(
        &self,
        train: &TimeSeries,
        d: usize,
        cap_d: usize,
        scoring_start: usize,
        selection: &mut Selection,
    ) -> Option<f64> {
        let clamp = |(p, q, cap_p, cap_q): ArmaOrders| {
            let (cap_p, cap_q) = if self.is_seasonal() {
                (cap_p.min(self.max_cap_p), cap_q.min(self.max_cap_q))
            } else {
                (0, 0)
            };
            (p.min(self.max_p), q.min(self.max_q), cap_p, cap_q)
        };
        let starts = [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)];

        let mut neighbourhood = Neighbourhood {
            d,
            cap_d,
            scoring_start,
            ..Default::default()
        };
        for start in starts {
            self.visit(train, clamp(start), &mut neighbourhood, selection);
        }

        for _ in 0..MAX_STEPWISE_STEPS {
            let Some((current, _)) = neighbourhood.best else {
                break;
            };
            let moved = neighbours(current)
                .into_iter()
                .any(|key| self.visit(train, key, &mut neighbourhood, selection));
            if !moved {
                break;
            }
        }
        neighbourhood.best.map(|(_, aic)| aic)
    }

    /// Fit `key` unless already seen or out of bounds; true if it became the local best.
    fn visit(
        &self,
        train: &TimeSeries,
        key: ArmaOrders,
        neighbourhood: &mut Neighbourhood,
        selection: &mut Selection,
    ) -> bool {
        if !self.admissible(key) || !neighbourhood.seen.insert(key) {
            return false;
        }
        let order = self.order(key, neighbourhood.d, neighbourhood.cap_d);
        let result = timed_fit(train, order, neighbourhood.scoring_start);
        let aic = result.1.as_ref().ok().map(|(_, aic)| *aic);
        selection.record(result);

        match aic {
            Some(aic) if neighbourhood.best.map_or(true, |(_, best)| aic < best) => {
                neighbourhood.best = Some((key, aic));
                true
            }
            _ => false,
        }
    }
}

impl OrderSearch for AutoArimaSearch {
    fn name(&self) -> &str {
        "AUTO-ARIMA"
    }

    fn search(&self, train: &TimeSeries) -> Result<SearchOutcome> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.search_with_rng(train, &mut rng)
    }
}

/// Stepwise state for one `(d, D)` pair.
#[derive(Debug, Default)]
struct Neighbourhood {
    d: usize,
    cap_d: usize,
    scoring_start: usize,
    seen: HashSet<ArmaOrders>,
    best: Option<(ArmaOrders, f64)>,
}

/// Orders one step away: each of p, q, P, Q by ±1, and (p, q), (P, Q) jointly.
fn neighbours((p, q, cap_p, cap_q): ArmaOrders) -> Vec<ArmaOrders> {
    const MOVES: [(i64, i64, i64, i64); 12] = [
        (-1, 0, 0, 0),
        (1, 0, 0, 0),
        (0, -1, 0, 0),
        (0, 1, 0, 0),
        (-1, -1, 0, 0),
        (1, 1, 0, 0),
        (0, 0, -1, 0),
        (0, 0, 1, 0),
        (0, 0, 0, -1),
        (0, 0, 0, 1),
        (0, 0, -1, -1),
        (0, 0, 1, 1),
    ];
    let shift = |value: usize, delta: i64| usize::try_from(value as i64 + delta).ok();
    MOVES
        .iter()
        .filter_map(|&(dp, dq, dcp, dcq)| {
            Some((
                shift(p, dp)?,
                shift(q, dq)?,
                shift(cap_p, dcp)?,
                shift(cap_q, dcq)?,
            ))
        })
        .collect()
}
