//! CSV-backed price source for offline experiments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::data::{utc_offset, PriceSeries};
use crate::errors::{Result, StatArbError};
use crate::providers::PriceSource;

/// Maps a ticker to a CSV file and its column schema.
#[derive(Debug, Clone)]
pub struct CsvSpec {
    /// File the history is read from.
    pub path: PathBuf,
    /// Column holding the price observations.
    pub price_column: String,
    /// Column holding the timestamps.
    pub timestamp_column: String,
    /// ISO currency code of the prices.
    pub currency: String,
}

impl CsvSpec {
    /// Spec with the default schema: `timestamp` / `close` columns, USD.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            price_column: "close".to_string(),
            timestamp_column: "timestamp".to_string(),
            currency: "USD".to_string(),
        }
    }

    /// Override the price column name.
    pub fn price_column(mut self, name: impl Into<String>) -> Self {
        self.price_column = name.into();
        self
    }

    /// Override the timestamp column name.
    pub fn timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = name.into();
        self
    }

    /// Set the currency the file's prices are denominated in.
    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = code.into();
        self
    }
}

/// Load price history from CSV files.
///
/// The provider expects files with a timestamp column and a price column;
/// additional columns are ignored. Naive timestamps are interpreted as UTC.
pub struct CsvPriceSource {
    mapping: HashMap<String, CsvSpec>,
}

impl CsvPriceSource {
    /// Create the provider from a mapping of ticker to file spec.
    pub fn new(mapping: HashMap<String, CsvSpec>) -> Self {
        Self { mapping }
    }

    /// Register a single ticker.
    pub fn with_ticker(mut self, ticker: impl Into<String>, spec: CsvSpec) -> Self {
        self.mapping.insert(ticker.into(), spec);
        self
    }
}

impl Default for CsvPriceSource {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

/// Parse a timestamp cell, accepting RFC 3339, `YYYY-MM-DD HH:MM:SS` and
/// bare `YYYY-MM-DD` dates. Naive values are interpreted as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let utc = utc_offset();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc().with_timezone(&utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| StatArbError::config_error(format!("invalid timestamp '{}'", raw)))?;
    Ok(naive.and_utc().with_timezone(&utc))
}

impl PriceSource for CsvPriceSource {
    fn fetch(
        &self,
        ticker: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<PriceSeries> {
        let _ = interval; // bar frequency is whatever the file contains
        if start >= end {
            return Err(StatArbError::invalid_time_range(start, end));
        }
        let spec = self
            .mapping
            .get(ticker)
            .ok_or_else(|| StatArbError::ticker_not_found(ticker))?;

        let mut reader = ::csv::Reader::from_path(&spec.path)?;
        let headers = reader.headers()?.clone();
        let column_index = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                StatArbError::config_error(format!(
                    "column '{}' not found in {}",
                    name,
                    spec.path.display()
                ))
            })
        };
        let ts_index = column_index(&spec.timestamp_column)?;
        let price_index = column_index(&spec.price_column)?;

        let mut timestamps = Vec::new();
        let mut prices = Vec::new();
        for record in reader.records() {
            let record = record?;
            let raw_ts = record.get(ts_index).unwrap_or_default();
            let raw_price = record.get(price_index).unwrap_or_default();
            let ts = parse_timestamp(raw_ts)?;
            if ts < start || ts > end {
                continue;
            }
            timestamps.push(ts);
            prices.push(raw_price.parse::<f64>()?);
        }

        debug!(ticker, rows = timestamps.len(), path = %spec.path.display(), "loaded CSV history");
        PriceSeries::new(ticker, timestamps, prices, spec.currency.clone())
    }
}
