//! OANDA v20 REST price source.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};
use serde::Deserialize;
use tracing::debug;

use crate::data::{utc_offset, PriceSeries};
use crate::errors::{Result, StatArbError};
use crate::providers::PriceSource;

const MAX_BATCH: usize = 5000;

/// Interval aliases accepted by [`OandaPriceSource`], mapped to v20
/// granularity codes.
const GRANULARITY_ALIASES: &[(&str, &str)] = &[
    ("1m", "M1"),
    ("5m", "M5"),
    ("15m", "M15"),
    ("30m", "M30"),
    ("1h", "H1"),
    ("4h", "H4"),
    ("1d", "D"),
    ("1w", "W"),
];

/// Bar length in seconds per granularity code.
const GRANULARITY_SECONDS: &[(&str, i64)] = &[
    ("M1", 60),
    ("M5", 300),
    ("M15", 900),
    ("M30", 1800),
    ("H1", 3600),
    ("H4", 14_400),
    ("D", 86_400),
    ("W", 604_800),
];

/// Which OANDA REST endpoint to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OandaEnvironment {
    /// `api-fxpractice.oanda.com` (demo accounts).
    Practice,
    /// `api-fxtrade.oanda.com` (live accounts).
    Live,
}

impl OandaEnvironment {
    fn base_url(self) -> &'static str {
        match self {
            OandaEnvironment::Practice => "https://api-fxpractice.oanda.com",
            OandaEnvironment::Live => "https://api-fxtrade.oanda.com",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
struct Candle {
    #[serde(default)]
    complete: bool,
    time: Option<String>,
    mid: Option<MidPrice>,
}

#[derive(Debug, Deserialize)]
struct MidPrice {
    c: Option<String>,
}

/// Load historical candle data from the OANDA v20 REST API.
///
/// Fetches mid close prices of completed candles, paginating in batches of
/// 5000. The price currency of an instrument is inferred from the quote side
/// of `EUR_USD`-style names unless overridden explicitly.
#[derive(Debug)]
pub struct OandaPriceSource {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    instrument_currencies: HashMap<String, String>,
}

impl OandaPriceSource {
    /// Create the provider with a personal access token.
    pub fn new(api_key: impl Into<String>, environment: OandaEnvironment) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(StatArbError::config_error(
                "api_key must be provided for OandaPriceSource",
            ));
        }
        Ok(Self {
            client: reqwest::blocking::Client::new(),
            base_url: environment.base_url().to_string(),
            api_key,
            instrument_currencies: HashMap::new(),
        })
    }

    /// Override the price currency of a specific instrument.
    pub fn with_instrument_currency(
        mut self,
        instrument: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        self.instrument_currencies
            .insert(instrument.into(), currency.into().to_uppercase());
        self
    }

    /// Map an interval alias (`"1h"`) or granularity code (`"H1"`) to the
    /// canonical v20 granularity.
    fn normalize_granularity(interval: &str) -> Result<&'static str> {
        let trimmed = interval.trim();
        if trimmed.is_empty() {
            return Err(StatArbError::unsupported_interval(interval));
        }
        let lower = trimmed.to_lowercase();
        if let Some((_, code)) = GRANULARITY_ALIASES.iter().find(|(alias, _)| *alias == lower) {
            return Ok(code);
        }
        let upper = trimmed.to_uppercase();
        GRANULARITY_SECONDS
            .iter()
            .find(|(code, _)| *code == upper)
            .map(|(code, _)| *code)
            .ok_or_else(|| StatArbError::unsupported_interval(interval))
    }

    fn granularity_seconds(granularity: &str) -> i64 {
        GRANULARITY_SECONDS
            .iter()
            .find(|(code, _)| *code == granularity)
            .map(|(_, seconds)| *seconds)
            .unwrap_or(86_400)
    }

    /// Price currency of an instrument: explicit override, else the quote
    /// side of an underscore-separated name, else USD.
    fn infer_currency(&self, instrument: &str) -> String {
        if let Some(currency) = self.instrument_currencies.get(instrument) {
            return currency.clone();
        }
        match instrument.rsplit_once('_') {
            Some((_, quote)) => quote.to_uppercase(),
            None => "USD".to_string(),
        }
    }

    fn format_datetime(dt: DateTime<FixedOffset>) -> String {
        dt.to_rfc3339().replace("+00:00", "Z")
    }

    fn collect_batch(
        payload: CandlesResponse,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        candles: &mut Vec<(DateTime<FixedOffset>, f64)>,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        let utc = utc_offset();
        let mut last_time = None;
        for candle in payload.candles {
            if !candle.complete {
                continue;
            }
            let (Some(time), Some(close)) = (candle.time, candle.mid.and_then(|mid| mid.c)) else {
                continue;
            };
            let ts = DateTime::parse_from_rfc3339(&time)?.with_timezone(&utc);
            if ts < start || ts > end {
                continue;
            }
            if candles.last().is_some_and(|(prev, _)| ts <= *prev) {
                continue;
            }
            candles.push((ts, close.parse::<f64>()?));
            last_time = Some(ts);
        }
        Ok(last_time)
    }
}

impl PriceSource for OandaPriceSource {
    fn fetch(
        &self,
        ticker: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<PriceSeries> {
        let granularity = Self::normalize_granularity(interval)?;
        let utc = utc_offset();
        let start = start.with_timezone(&utc);
        let end = end.with_timezone(&utc);
        if start >= end {
            return Err(StatArbError::invalid_time_range(start, end));
        }

        let url = format!("{}/v3/instruments/{}/candles", self.base_url, ticker);
        let delta = Duration::seconds(Self::granularity_seconds(granularity));
        let mut candles: Vec<(DateTime<FixedOffset>, f64)> = Vec::new();
        let mut next_from = start;

        while next_from < end {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .header("Accept", "application/json")
                .query(&[
                    ("granularity", granularity.to_string()),
                    ("from", Self::format_datetime(next_from)),
                    ("to", Self::format_datetime(end)),
                    ("price", "M".to_string()),
                    ("count", MAX_BATCH.to_string()),
                ])
                .send()?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StatArbError::ticker_not_found(ticker));
            }
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(StatArbError::http_error(format!(
                    "OANDA candles request for {} failed with status {}: {}",
                    ticker, status, body
                )));
            }

            let payload: CandlesResponse = response.json()?;
            let batch_len = payload.candles.len();
            let last_time = Self::collect_batch(payload, start, end, &mut candles)?;

            let Some(last_time) = last_time else {
                break;
            };
            next_from = last_time + delta;
            if batch_len < MAX_BATCH {
                break;
            }
        }

        if candles.is_empty() {
            return Err(StatArbError::insufficient_data(format!(
                "no candles returned for '{}' from OANDA between {} and {}",
                ticker, start, end
            )));
        }

        debug!(ticker, rows = candles.len(), granularity, "fetched OANDA candles");
        let (timestamps, prices) = candles.into_iter().unzip();
        PriceSeries::new(ticker, timestamps, prices, self.infer_currency(ticker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn granularity_aliases_normalize() {
        assert_eq!(OandaPriceSource::normalize_granularity("1h").unwrap(), "H1");
        assert_eq!(OandaPriceSource::normalize_granularity("1D").unwrap(), "D");
        assert_eq!(OandaPriceSource::normalize_granularity("m15").unwrap(), "M15");
        assert_eq!(OandaPriceSource::normalize_granularity(" 1w ").unwrap(), "W");
    }

    #[test]
    fn unsupported_interval_is_rejected() {
        let err = OandaPriceSource::normalize_granularity("3h").unwrap_err();
        assert!(matches!(err, StatArbError::UnsupportedInterval(_)));
        assert!(OandaPriceSource::normalize_granularity("").is_err());
    }

    #[test]
    fn currency_inference_uses_quote_side_and_overrides() {
        let source = OandaPriceSource::new("token", OandaEnvironment::Practice)
            .unwrap()
            .with_instrument_currency("XAU_USD", "eur");
        assert_eq!(source.infer_currency("EUR_USD"), "USD");
        assert_eq!(source.infer_currency("USD_JPY"), "JPY");
        assert_eq!(source.infer_currency("XAU_USD"), "EUR");
        assert_eq!(source.infer_currency("SPX500"), "USD");
    }

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        let err = OandaPriceSource::new("", OandaEnvironment::Live).unwrap_err();
        assert!(matches!(err, StatArbError::Configuration(_)));
    }

    #[test]
    fn batch_collection_skips_incomplete_and_duplicate_candles() {
        let payload: CandlesResponse = serde_json::from_str(
            r#"{
                "candles": [
                    {"complete": true, "time": "2024-01-01T00:00:00Z", "mid": {"c": "1.10"}},
                    {"complete": false, "time": "2024-01-01T01:00:00Z", "mid": {"c": "1.11"}},
                    {"complete": true, "time": "2024-01-01T00:00:00Z", "mid": {"c": "1.12"}},
                    {"complete": true, "time": "2024-01-01T02:00:00Z", "mid": {"c": "1.13"}}
                ]
            }"#,
        )
        .unwrap();
        let utc = utc_offset();
        let start = utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut candles = Vec::new();
        let last = OandaPriceSource::collect_batch(payload, start, end, &mut candles).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].1, 1.10);
        assert_eq!(candles[1].1, 1.13);
        assert_eq!(last, Some(utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap()));
    }

    #[test]
    fn datetime_formatting_uses_zulu_suffix() {
        let ts = utc_offset().with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            OandaPriceSource::format_datetime(ts),
            "2024-03-01T12:30:00Z"
        );
    }
}
