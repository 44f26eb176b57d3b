//! Numeric helpers shared by the regression and diagnostic modules.
//!
//! Everything here operates on plain `f64` slices. The OLS routine is a
//! small normal-equations solver sized for the handful of regressors the
//! hedge estimation and unit-root testing code needs.

use crate::errors::{Result, StatArbError};

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation (ddof = 0) around a precomputed mean.
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Ordinary least squares fit of `y` on a set of regressor columns.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Estimated coefficients, one per regressor column.
    pub params: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Number of observations used in the fit.
    pub nobs: usize,
    /// Coefficient of determination against the centered total sum of squares.
    pub r_squared: f64,
}

impl OlsFit {
    /// t-statistic of the coefficient at `index`. Zero standard errors
    /// (degenerate exact fits) yield an infinite statistic with the sign of
    /// the coefficient.
    pub fn t_stat(&self, index: usize) -> f64 {
        let param = self.params[index];
        let se = self.std_errors[index];
        if se > 0.0 {
            param / se
        } else if param == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(param)
        }
    }

    /// Gaussian log-likelihood of the fitted model.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        let sigma2 = (self.ssr / n).max(f64::MIN_POSITIVE);
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0)
    }

    /// Akaike information criterion of the fitted model.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.params.len() as f64
    }
}

/// Fit `y` against the given regressor columns by ordinary least squares.
///
/// `regressors` holds one column per coefficient; every column must have the
/// same length as `y`. Fails when there are fewer observations than
/// coefficients or when the normal equations are singular (collinear
/// regressors).
pub fn ols(y: &[f64], regressors: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    let p = regressors.len();
    if p == 0 {
        return Err(StatArbError::config_error(
            "OLS requires at least one regressor column",
        ));
    }
    for column in regressors {
        if column.len() != n {
            return Err(StatArbError::config_error(format!(
                "OLS regressor column length {} does not match {} observations",
                column.len(),
                n
            )));
        }
    }
    if n <= p {
        return Err(StatArbError::insufficient_data(format!(
            "OLS needs more than {} observations for {} coefficients, got {}",
            p, p, n
        )));
    }

    // Normal equations: (X'X) beta = X'y.
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];
    for i in 0..p {
        for j in i..p {
            let dot = regressors[i]
                .iter()
                .zip(regressors[j].iter())
                .map(|(a, b)| a * b)
                .sum::<f64>();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = regressors[i]
            .iter()
            .zip(y.iter())
            .map(|(a, b)| a * b)
            .sum::<f64>();
    }

    let inverse = invert(&xtx)?;
    let params: Vec<f64> = (0..p)
        .map(|i| (0..p).map(|j| inverse[i][j] * xty[j]).sum())
        .collect();

    let mut ssr = 0.0;
    for (row, &target) in y.iter().enumerate() {
        let fitted: f64 = (0..p).map(|j| params[j] * regressors[j][row]).sum();
        let resid = target - fitted;
        ssr += resid * resid;
    }

    let sigma2 = ssr / (n - p) as f64;
    let std_errors: Vec<f64> = (0..p)
        .map(|i| (sigma2 * inverse[i][i]).max(0.0).sqrt())
        .collect();

    let y_mean = mean(y);
    let tss: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { 0.0 };

    Ok(OlsFit {
        params,
        std_errors,
        ssr,
        nobs: n,
        r_squared,
    })
}

/// Invert a small symmetric positive-definite matrix by Gauss-Jordan
/// elimination with partial pivoting.
fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let p = matrix.len();
    let mut work: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut extended = row.clone();
            extended.extend((0..p).map(|j| if i == j { 1.0 } else { 0.0 }));
            extended
        })
        .collect();

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&a, &b| {
                work[a][col]
                    .abs()
                    .partial_cmp(&work[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| StatArbError::config_error("empty matrix in OLS solve"))?;
        if work[pivot_row][col].abs() < 1e-12 {
            return Err(StatArbError::insufficient_data(
                "OLS design matrix is singular; regressors are collinear",
            ));
        }
        work.swap(col, pivot_row);

        let pivot = work[col][col];
        for value in work[col].iter_mut() {
            *value /= pivot;
        }
        for row in 0..p {
            if row == col {
                continue;
            }
            let factor = work[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..2 * p {
                work[row][k] -= factor * work[col][k];
            }
        }
    }

    Ok(work.into_iter().map(|row| row[p..].to_vec()).collect())
}

/// Cumulative distribution function of the standard normal distribution.
///
/// Uses the Abramowitz & Stegun 7.1.26 rational approximation of `erf`,
/// accurate to about 1.5e-7, which is plenty for reporting p-values.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
