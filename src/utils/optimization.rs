//! Derivative-free minimisation used to estimate model parameters.

use std::cmp::Ordering;

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance.
    pub converged: bool,
}

impl NelderMeadResult {
    /// True when both the point and the objective are finite.
    pub fn is_finite(&self) -> bool {
        self.optimal_value.is_finite() && self.optimal_point.iter().all(|v| v.is_finite())
    }
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Initial simplex step, relative to the starting value when it is non-zero.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Minimise `objective` from `initial` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`, so a penalty of
/// `f64::INFINITY` can be used to reject infeasible parameters.
///
/// # Example
/// ```
/// use anofox_tsa::utils::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: eval(&[]),
            iterations: 0,
            converged: true,
        };
    }

    let start = clamp_to(initial.to_vec(), bounds);
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.clone(), eval(&start)));
    for i in 0..n {
        let mut vertex = start.clone();
        vertex[i] += if start[i].abs() > 1e-10 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        let vertex = clamp_to(vertex, bounds);
        let value = eval(&vertex);
        simplex.push((vertex, value));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let best = simplex[0].1;
        let worst = simplex[n].1;
        let second_worst = simplex[n - 1].1;

        // equal values at distinct vertices (e.g. either side of a minimum) are not convergence
        if (worst - best).abs() < config.tolerance && spread(&simplex) < config.tolerance {
            converged = true;
            break;
        }

        let centroid = centroid_without_last(&simplex);
        let toward = |from: &[f64], coef: f64| -> Vec<f64> {
            let point = centroid
                .iter()
                .zip(from.iter())
                .map(|(c, p)| c + coef * (p - c))
                .collect();
            clamp_to(point, bounds)
        };

        let reflected = toward(&simplex[n].0, -config.alpha);
        let reflected_value = eval(&reflected);

        if reflected_value < best {
            let expanded = toward(&reflected, config.gamma);
            let expanded_value = eval(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < second_worst {
            simplex[n] = (reflected, reflected_value);
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < worst {
            let point = toward(&reflected, config.rho);
            let value = eval(&point);
            (point, value)
        } else {
            let point = toward(&simplex[n].0, config.rho);
            let value = eval(&point);
            (point, value)
        };
        if contracted_value < worst.min(reflected_value) {
            simplex[n] = (contracted, contracted_value);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for (vertex, value) in simplex.iter_mut().skip(1) {
            let shrunk = anchor
                .iter()
                .zip(vertex.iter())
                .map(|(a, v)| a + config.sigma * (v - a))
                .collect();
            *vertex = clamp_to(shrunk, bounds);
            *value = eval(vertex);
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    let (optimal_point, optimal_value) = simplex.swap_remove(0);

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

fn centroid_without_last(simplex: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let kept = &simplex[..simplex.len() - 1];
    let dim = kept[0].0.len();
    let mut centroid = vec![0.0; dim];
    for (vertex, _) in kept {
        for (c, v) in centroid.iter_mut().zip(vertex.iter()) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= kept.len() as f64);
    centroid
}

/// Largest distance from the best vertex to any other vertex.
fn spread(simplex: &[(Vec<f64>, f64)]) -> f64 {
    let best = &simplex[0].0;
    simplex
        .iter()
        .skip(1)
        .map(|(v, _)| {
            v.iter()
                .zip(best.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .fold(0.0, f64::max)
}

fn clamp_to(mut point: Vec<f64>, bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    if let Some(bounds) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(bounds.iter()) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}
