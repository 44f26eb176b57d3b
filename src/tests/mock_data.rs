//! Deterministic data generators and provider doubles for tests.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::data::{utc_offset, PriceSeries};
use crate::errors::{Result, StatArbError};
use crate::providers::PriceSource;

const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

/// Deterministic approximately-Gaussian noise (Irwin-Hall with 12 uniforms,
/// centred), driven by a 64-bit linear congruential generator so test data
/// is reproducible across platforms.
pub fn lcg_noise(count: usize, seed: u64) -> Vec<f64> {
    let mut state = seed
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
    let mut uniform = move || {
        state = state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count)
        .map(|_| (0..12).map(|_| uniform()).sum::<f64>() - 6.0)
        .collect()
}

/// Hourly timestamp grid starting at 2024-01-01 00:00:00 UTC.
pub fn hourly_timestamps(count: usize) -> Vec<DateTime<FixedOffset>> {
    let base = utc_offset()
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .unwrap();
    (0..count)
        .map(|i| base + chrono::Duration::hours(i as i64))
        .collect()
}

/// Price series on the hourly grid from explicit values.
pub fn series_from(ticker: &str, prices: Vec<f64>, currency: &str) -> PriceSeries {
    let timestamps = hourly_timestamps(prices.len());
    PriceSeries::new(ticker, timestamps, prices, currency).unwrap()
}

/// A pair of cointegrated series: `b` is a noisy trend and
/// `a = ratio * b + intercept + stationary noise`.
pub fn cointegrated_pair(
    count: usize,
    ratio: f64,
    intercept: f64,
    seed: u64,
) -> (Vec<f64>, Vec<f64>) {
    let drift = lcg_noise(count, seed);
    let noise = lcg_noise(count, seed.wrapping_add(1));
    let mut b = Vec::with_capacity(count);
    let mut level = 100.0;
    for e in &drift {
        level += 0.05 + 0.2 * e;
        b.push(level);
    }
    let a = b
        .iter()
        .zip(&noise)
        .map(|(&x, &e)| ratio * x + intercept + 0.5 * e)
        .collect();
    (a, b)
}

/// In-memory price source that records how often each ticker is fetched.
pub struct MockPriceSource {
    series: HashMap<String, PriceSeries>,
    fetch_counts: RefCell<HashMap<String, usize>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            fetch_counts: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.series.insert(series.ticker.clone(), series);
        self
    }

    /// How many times `ticker` has been fetched so far.
    pub fn fetch_count(&self, ticker: &str) -> usize {
        self.fetch_counts
            .borrow()
            .get(ticker)
            .copied()
            .unwrap_or(0)
    }
}

impl PriceSource for MockPriceSource {
    fn fetch(
        &self,
        ticker: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<PriceSeries> {
        let _ = interval;
        *self
            .fetch_counts
            .borrow_mut()
            .entry(ticker.to_string())
            .or_insert(0) += 1;
        let series = self
            .series
            .get(ticker)
            .ok_or_else(|| StatArbError::ticker_not_found(ticker))?;
        let (timestamps, prices) = series
            .timestamps
            .iter()
            .zip(&series.prices)
            .filter(|(ts, _)| **ts >= start && **ts <= end)
            .map(|(&ts, &p)| (ts, p))
            .unzip();
        PriceSeries::new(&series.ticker, timestamps, prices, &series.currency)
    }
}
