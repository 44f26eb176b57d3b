//! Augmented Dickey-Fuller stationarity diagnostics for spread series.
//!
//! The regression includes a constant term and `k` lagged differences:
//!
//! ```text
//! Δy[t] = c + ρ·y[t-1] + Σ φ[i]·Δy[t-i] + ε[t]
//! ```
//!
//! `k` is selected automatically by minimizing the AIC up to the Schwert
//! bound `12·(n/100)^¼`. The reported statistic is the t-ratio of `ρ`;
//! p-values and critical values come from the MacKinnon response-surface
//! approximations for the constant-only case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Result, StatArbError};
use crate::math::{self, OlsFit};

// MacKinnon (1994) p-value surface, constant-only case, one series.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical-value surface, constant-only case, one series.
// Rows: (label, b0, b1, b2, b3) with crit = b0 + b1/n + b2/n² + b3/n³.
const CRIT_SURFACE: [(&str, f64, f64, f64, f64); 3] = [
    ("1%", -3.43035, -6.5393, -16.786, -79.433),
    ("5%", -2.86154, -2.8903, -4.234, -40.040),
    ("10%", -2.56677, -1.5384, -2.809, 0.0),
];

/// Summary of an augmented Dickey-Fuller test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-ratio of the lagged level coefficient.
    pub statistic: f64,
    /// Approximate MacKinnon p-value of the statistic.
    pub p_value: f64,
    /// Number of lagged differences included in the regression.
    pub lags: usize,
    /// Effective observations used by the final regression.
    pub nobs: usize,
    /// Critical values keyed by confidence level label ("1%", "5%", "10%").
    pub critical_values: BTreeMap<String, f64>,
    /// AIC of the selected regression when automatic lag selection ran.
    pub ic_best: Option<f64>,
}

impl AdfResult {
    /// Whether the unit-root null is rejected at the given significance
    /// level label (e.g. `"5%"`).
    pub fn rejects_unit_root_at(&self, level: &str) -> bool {
        self.critical_values
            .get(level)
            .is_some_and(|crit| self.statistic < *crit)
    }
}

/// Run an augmented Dickey-Fuller test with automatic AIC lag selection.
///
/// Non-finite values are dropped before testing. The test is purely
/// diagnostic; a high p-value means the series may not mean-revert, which is
/// for the caller to act on.
pub fn adf_test(series: &[f64]) -> Result<AdfResult> {
    let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    let n = clean.len();
    if n < 4 {
        return Err(StatArbError::insufficient_data(format!(
            "ADF test needs at least 4 finite observations, got {}",
            n
        )));
    }

    // Schwert rule, capped so the selection sample keeps more rows than
    // regressors at the largest candidate lag.
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = schwert.min(n.saturating_sub(4) / 2);

    let diffs: Vec<f64> = clean.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection over a fixed sample starting at max_lag, so every
    // candidate sees the same rows.
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let fit = adf_regression(&clean, &diffs, lag, max_lag)?;
        let aic = fit.aic();
        if best.map_or(true, |(_, best_aic)| aic < best_aic) {
            best = Some((lag, aic));
        }
    }
    let (used_lag, ic_best) =
        best.ok_or_else(|| StatArbError::insufficient_data("ADF lag selection had no candidates"))?;

    // Refit at the chosen lag over the longest available sample.
    let fit = adf_regression(&clean, &diffs, used_lag, used_lag)?;
    let statistic = fit.t_stat(0);
    let nobs = fit.nobs;

    let mut critical_values = BTreeMap::new();
    let nf = nobs as f64;
    for (label, b0, b1, b2, b3) in CRIT_SURFACE {
        let crit = b0 + b1 / nf + b2 / (nf * nf) + b3 / (nf * nf * nf);
        critical_values.insert(label.to_string(), crit);
    }

    let p_value = mackinnon_p_value(statistic);
    debug!(statistic, p_value, lags = used_lag, nobs, "ADF test complete");
    if p_value > 0.05 {
        warn!(
            p_value,
            "unit-root null not rejected at the 5% level; series may not mean-revert"
        );
    }

    Ok(AdfResult {
        statistic,
        p_value,
        lags: used_lag,
        nobs,
        critical_values,
        ic_best: Some(ic_best),
    })
}

/// Fit the ADF regression with `lag` lagged differences, using rows starting
/// at `start_lag` (>= `lag`) of the differenced series.
fn adf_regression(levels: &[f64], diffs: &[f64], lag: usize, start_lag: usize) -> Result<OlsFit> {
    let rows = diffs.len().saturating_sub(start_lag);
    if rows <= lag + 2 {
        return Err(StatArbError::insufficient_data(format!(
            "ADF regression with {} lags needs more than {} rows, got {}",
            lag,
            lag + 2,
            rows
        )));
    }

    let mut dependent = Vec::with_capacity(rows);
    let mut level = Vec::with_capacity(rows);
    let mut lagged: Vec<Vec<f64>> = vec![Vec::with_capacity(rows); lag];
    let mut constant = Vec::with_capacity(rows);

    for t in start_lag..diffs.len() {
        dependent.push(diffs[t]);
        level.push(levels[t]);
        for j in 1..=lag {
            lagged[j - 1].push(diffs[t - j]);
        }
        constant.push(1.0);
    }

    let mut regressors = Vec::with_capacity(lag + 2);
    regressors.push(level);
    regressors.extend(lagged);
    regressors.push(constant);
    math::ols(&dependent, &regressors)
}

/// MacKinnon approximate asymptotic p-value for the constant-only ADF
/// statistic.
fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    math::norm_cdf(z)
}

fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &coefficient| acc * x + coefficient)
}
