//! Bollinger-style band generation over spread series.
//!
//! Bands are rolling statistics over trailing windows of exactly `window`
//! observations. Points inside the warm-up period carry `None` rather than a
//! sentinel value, so downstream code can never do arithmetic on an
//! undefined band by accident.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StatArbError};
use crate::hedge::Spread;
use crate::math;

/// Rolling statistics of a spread series for one window length.
///
/// All four series share the spread's index; the first `window - 1` entries
/// are `None` until enough history has accumulated. No partial windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerBands {
    /// Window length the bands were computed over.
    pub window: usize,
    /// Rolling mean.
    pub mean: Vec<Option<f64>>,
    /// Rolling population standard deviation.
    pub std: Vec<Option<f64>>,
    /// `mean + num_std * std`.
    pub upper: Vec<Option<f64>>,
    /// `mean - num_std * std`.
    pub lower: Vec<Option<f64>>,
}

/// Compute Bollinger bands for `spread` with the given window length and
/// standard-deviation multiplier.
pub fn compute_bollinger_bands(
    spread: &Spread,
    window: usize,
    num_std: f64,
) -> Result<BollingerBands> {
    if window == 0 {
        return Err(StatArbError::config_error(
            "Bollinger window must be at least 1",
        ));
    }

    let values = &spread.values;
    let mut mean = vec![None; values.len()];
    let mut std = vec![None; values.len()];
    let mut upper = vec![None; values.len()];
    let mut lower = vec![None; values.len()];

    for end in window..=values.len() {
        let slice = &values[end - window..end];
        let m = math::mean(slice);
        let s = math::population_std(slice, m);
        let index = end - 1;
        mean[index] = Some(m);
        std[index] = Some(s);
        upper[index] = Some(m + num_std * s);
        lower[index] = Some(m - num_std * s);
    }

    Ok(BollingerBands {
        window,
        mean,
        std,
        upper,
        lower,
    })
}

/// Compute bands independently for several window lengths, keyed by window.
pub fn compute_multi_bollinger(
    spread: &Spread,
    windows: &[usize],
    num_std: f64,
) -> Result<BTreeMap<usize, BollingerBands>> {
    let mut results = BTreeMap::new();
    for &window in windows {
        results.insert(window, compute_bollinger_bands(spread, window, num_std)?);
    }
    Ok(results)
}
