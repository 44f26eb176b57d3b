//! Hedge ratio estimation and spread construction.
//!
//! The hedge ratio is the OLS slope of leg A regressed on leg B, optionally
//! with an intercept. The spread `A − (ratio·B + intercept)` is the
//! mean-reverting quantity every downstream stage works on.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::AlignedPair;
use crate::errors::{Result, StatArbError};
use crate::math;

/// Result of an OLS hedge ratio fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeRatio {
    /// Slope weighting leg B against leg A.
    pub ratio: f64,
    /// Intercept term; 0.0 when the fit was run without one.
    pub intercept: f64,
    /// Human-readable diagnostic summary of the fit.
    pub summary: String,
}

/// The spread series produced from an aligned pair. Shares the pair's
/// timestamp index and is consumed read-only by the signal and backtest
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spread {
    /// Timestamp index, strictly increasing.
    pub timestamps: Vec<DateTime<FixedOffset>>,
    /// Spread values aligned with `timestamps`.
    pub values: Vec<f64>,
}

impl Spread {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the spread holds no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Estimate the hedge ratio of `a` relative to `b` by ordinary least squares.
///
/// Pairs containing a non-finite value on either side are dropped before the
/// fit. Fails with a data-insufficiency error when fewer than two clean
/// observations remain (three when an intercept is requested, since the fit
/// would otherwise be exactly determined).
pub fn estimate_hedge_ratio(a: &[f64], b: &[f64], add_intercept: bool) -> Result<HedgeRatio> {
    if a.len() != b.len() {
        return Err(StatArbError::config_error(format!(
            "hedge estimation requires equally long series, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let (y, x): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b.iter())
        .filter(|(ya, xb)| ya.is_finite() && xb.is_finite())
        .map(|(&ya, &xb)| (ya, xb))
        .unzip();
    if y.len() < 2 {
        return Err(StatArbError::insufficient_data(format!(
            "hedge estimation needs at least 2 aligned observations, got {}",
            y.len()
        )));
    }

    let fit = if add_intercept {
        let constant = vec![1.0; x.len()];
        math::ols(&y, &[constant, x])?
    } else {
        math::ols(&y, &[x])?
    };

    let (intercept, ratio, ratio_index) = if add_intercept {
        (fit.params[0], fit.params[1], 1)
    } else {
        (0.0, fit.params[0], 0)
    };

    let summary = format!(
        "OLS hedge fit: n={}, ratio={:.6} (t={:.3}), intercept={:.6}, r_squared={:.4}",
        fit.nobs,
        ratio,
        fit.t_stat(ratio_index),
        intercept,
        fit.r_squared
    );
    debug!(n = fit.nobs, ratio, intercept, "estimated hedge ratio");

    Ok(HedgeRatio {
        ratio,
        intercept,
        summary,
    })
}

/// Compute the spread of an aligned pair: `A − (ratio·B + intercept)`.
pub fn compute_spread(pair: &AlignedPair, ratio: f64, intercept: f64) -> Spread {
    Spread {
        timestamps: pair.timestamps.clone(),
        values: compute_spread_values(&pair.a, &pair.b, ratio, intercept),
    }
}

/// Pure element-wise spread computation over raw slices.
pub fn compute_spread_values(a: &[f64], b: &[f64], ratio: f64, intercept: f64) -> Vec<f64> {
    a.iter()
        .zip(b.iter())
        .map(|(&ya, &xb)| ya - (ratio * xb + intercept))
        .collect()
}
