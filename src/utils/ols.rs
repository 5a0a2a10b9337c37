//! Ordinary and ridge least squares on column-major design matrices.
//!
//! Used by the unit-root regression (which needs coefficient standard errors)
//! and by the additive regression forecaster (which needs a ridge penalty).

use crate::error::{ForecastError, Result};

/// Least squares fit of `y = X β + e`.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// One coefficient per design column.
    pub coefficients: Vec<f64>,
    /// Standard error of each coefficient.
    pub std_errors: Vec<f64>,
    /// Observed minus fitted values.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl LeastSquaresFit {
    /// t-statistic of coefficient `idx`.
    pub fn t_stat(&self, idx: usize) -> f64 {
        self.coefficients[idx] / self.std_errors[idx]
    }

    /// Gaussian log-likelihood evaluated at the ML variance `ssr / n`.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion with one parameter per column.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Fit ordinary least squares.
///
/// `columns` holds the design matrix column by column; include a column of
/// ones for an intercept.
pub fn least_squares(columns: &[Vec<f64>], y: &[f64]) -> Result<LeastSquaresFit> {
    let n = y.len();
    let k = columns.len();
    validate_design(columns, n)?;
    if n <= k {
        return Err(ForecastError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let (xtx, xty) = normal_equations(columns, y);
    let l = cholesky(&xtx).ok_or_else(|| {
        ForecastError::ComputationError("design matrix is singular".to_string())
    })?;
    let coefficients = cholesky_solve(&l, &xty);

    let residuals: Vec<f64> = (0..n)
        .map(|obs| {
            let fitted: f64 = columns
                .iter()
                .zip(coefficients.iter())
                .map(|(col, b)| col[obs] * b)
                .sum();
            y[obs] - fitted
        })
        .collect();
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = ssr / (n - k) as f64;

    let std_errors = (0..k)
        .map(|i| {
            let mut unit = vec![0.0; k];
            unit[i] = 1.0;
            let inv_col = cholesky_solve(&l, &unit);
            (sigma2 * inv_col[i]).sqrt()
        })
        .collect();

    Ok(LeastSquaresFit {
        coefficients,
        std_errors,
        residuals,
        ssr,
        nobs: n,
    })
}

/// Fit least squares with a per-column L2 penalty added to the diagonal.
pub fn ridge_least_squares(columns: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    validate_design(columns, n)?;
    if penalties.len() != columns.len() {
        return Err(ForecastError::LengthMismatch {
            expected: columns.len(),
            got: penalties.len(),
        });
    }

    let (mut xtx, xty) = normal_equations(columns, y);
    for (i, &penalty) in penalties.iter().enumerate() {
        xtx[i][i] += penalty;
    }

    let l = cholesky(&xtx).ok_or_else(|| {
        ForecastError::ComputationError(
            "penalised normal equations are not positive definite".to_string(),
        )
    })?;
    Ok(cholesky_solve(&l, &xty))
}

fn validate_design(columns: &[Vec<f64>], n: usize) -> Result<()> {
    if n == 0 {
        return Err(ForecastError::EmptyData);
    }
    if columns.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "design matrix has no columns".to_string(),
        ));
    }
    for col in columns {
        if col.len() != n {
            return Err(ForecastError::LengthMismatch {
                expected: n,
                got: col.len(),
            });
        }
    }
    Ok(())
}

/// Build X'X and X'y.
fn normal_equations(columns: &[Vec<f64>], y: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let k = columns.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for i in 0..k {
        for j in 0..=i {
            let dot: f64 = columns[i]
                .iter()
                .zip(columns[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = columns[i].iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    }
    (xtx, xty)
}

/// Cholesky factor `A = L L'` of a symmetric positive definite matrix.
///
/// Pivots that vanish relative to the diagonal are treated as singular.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if !(sum > a[i][i].abs() * 1e-12) {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve `L L' x = b` by forward then backward substitution.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn least_squares_recovers_exact_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = least_squares(&[vec![1.0; 10], x], &y).unwrap();

        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-9);
        assert!(fit.ssr < 1e-18);
    }

    #[test]
    fn least_squares_standard_errors_match_textbook() {
        // y = [1, 3, 2, 5, 4] on x = [1..5]: slope 0.8, se(slope) = sqrt(0.1 * ...)
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = least_squares(&[vec![1.0; 5], x], &y).unwrap();

        assert_relative_eq!(fit.coefficients[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(fit.coefficients[0], 0.6, epsilon = 1e-12);
        // ssr = 3.6, sigma2 = 1.2, Sxx = 10
        assert_relative_eq!(fit.ssr, 3.6, epsilon = 1e-12);
        assert_relative_eq!(fit.std_errors[1], (1.2f64 / 10.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(fit.t_stat(1), 0.8 / (0.12f64).sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn least_squares_rejects_collinear_design() {
        let ones = vec![1.0; 6];
        let twos = vec![2.0; 6];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert!(matches!(
            least_squares(&[ones, twos], &y),
            Err(ForecastError::ComputationError(_))
        ));
    }

    #[test]
    fn least_squares_needs_more_rows_than_columns() {
        let result = least_squares(&[vec![1.0, 1.0], vec![0.0, 1.0]], &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn ridge_shrinks_penalised_coefficient() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 4.0 * v).collect();
        let design = vec![vec![1.0; 20], x];

        let free = ridge_least_squares(&design, &y, &[0.0, 0.0]).unwrap();
        let shrunk = ridge_least_squares(&design, &y, &[0.0, 100.0]).unwrap();

        assert_relative_eq!(free[1], 4.0, epsilon = 1e-8);
        assert!(shrunk[1].abs() < free[1].abs());
    }

    #[test]
    fn ridge_checks_penalty_length() {
        let result = ridge_least_squares(&[vec![1.0; 3]], &[1.0, 2.0, 3.0], &[0.0, 1.0]);
        assert!(matches!(result, Err(ForecastError::LengthMismatch { .. })));
    }
}
