//! Price series containers and two-leg alignment with currency normalization.
//!
//! This module owns the first stage of the research pipeline: it takes raw
//! per-instrument price history from a [`PriceSource`](crate::providers::PriceSource),
//! normalizes every index to UTC, inner-joins the two legs (plus any FX
//! series needed for currency conversion) and produces an [`AlignedPair`]
//! ready for hedge-ratio estimation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, StatArbError};
use crate::providers::PriceSource;

/// Zero UTC offset used for every timestamp handled by the crate.
pub fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}

/// Time-indexed price history for one instrument.
///
/// Timestamps are normalized to UTC and sorted ascending on construction.
/// Duplicate timestamps are not deduplicated; callers are expected to supply
/// clean data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Instrument symbol the series was fetched for.
    pub ticker: String,
    /// UTC timestamps, sorted ascending.
    pub timestamps: Vec<DateTime<FixedOffset>>,
    /// Price observations aligned with `timestamps`.
    pub prices: Vec<f64>,
    /// ISO currency code the prices are denominated in (uppercase).
    pub currency: String,
}

impl PriceSeries {
    /// Build a series, sorting observations by timestamp and normalizing the
    /// index to UTC and the currency code to uppercase.
    pub fn new(
        ticker: impl Into<String>,
        timestamps: Vec<DateTime<FixedOffset>>,
        prices: Vec<f64>,
        currency: impl Into<String>,
    ) -> Result<Self> {
        let ticker = ticker.into();
        if timestamps.len() != prices.len() {
            return Err(StatArbError::config_error(format!(
                "price series '{}' has {} timestamps but {} prices",
                ticker,
                timestamps.len(),
                prices.len()
            )));
        }

        let utc = utc_offset();
        let mut observations: Vec<(DateTime<FixedOffset>, f64)> = timestamps
            .into_iter()
            .map(|ts| ts.with_timezone(&utc))
            .zip(prices)
            .collect();
        observations.sort_by_key(|(ts, _)| *ts);

        let (timestamps, prices) = observations.into_iter().unzip();
        Ok(Self {
            ticker,
            timestamps,
            prices,
            currency: currency.into().to_uppercase(),
        })
    }

    /// Number of observations in the series.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Two price legs joined onto a common UTC timestamp index, with both legs
/// converted to the requested base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedPair {
    /// Common timestamp index, strictly increasing.
    pub timestamps: Vec<DateTime<FixedOffset>>,
    /// First leg, converted to the base currency.
    pub a: Vec<f64>,
    /// Second leg, converted to the base currency.
    pub b: Vec<f64>,
    /// Original listing currency of leg A.
    pub currency_a: String,
    /// Original listing currency of leg B.
    pub currency_b: String,
}

impl AlignedPair {
    /// Number of aligned rows.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the join produced no rows.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Split an FX ticker into its base and quote currency codes.
///
/// The ticker must contain exactly six alphabetic characters
/// (e.g. `EURUSD`, `EUR_USD`, `EUR/USD`); anything else is rejected rather
/// than guessed at, so exchange-suffixed symbols like `EURUSD=X` fail loudly.
pub fn parse_fx_pair(ticker: &str) -> Result<(String, String)> {
    let letters: String = ticker.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() != 6 {
        return Err(StatArbError::config_error(format!(
            "unable to infer FX pair structure from ticker '{}'; provide a 6-letter pair",
            ticker
        )));
    }
    let upper = letters.to_uppercase();
    Ok((upper[..3].to_string(), upper[3..].to_string()))
}

/// FX ticker selection for legs whose currency differs from the base.
#[derive(Debug, Clone)]
pub enum FxTickers {
    /// One ticker used for every leg that needs conversion.
    Single(String),
    /// Ticker looked up per instrument symbol.
    PerSymbol(HashMap<String, String>),
}

impl FxTickers {
    fn resolve(&self, symbol: &str) -> Option<&str> {
        match self {
            FxTickers::Single(ticker) => Some(ticker),
            FxTickers::PerSymbol(map) => map.get(symbol).map(String::as_str),
        }
    }
}

fn to_map(series: &PriceSeries) -> BTreeMap<DateTime<FixedOffset>, f64> {
    series
        .timestamps
        .iter()
        .copied()
        .zip(series.prices.iter().copied())
        .collect()
}

/// Per-leg conversion plan resolved before the join.
enum Conversion {
    None,
    Multiply,
    Divide,
}

fn plan_conversion<'a>(
    leg: &PriceSeries,
    base_currency: &str,
    fx: Option<(&'a str, &'a PriceSeries)>,
) -> Result<(Conversion, Option<&'a PriceSeries>)> {
    let currency = leg.currency.to_uppercase();
    if currency == base_currency {
        return Ok((Conversion::None, None));
    }
    let (fx_ticker, fx_series) = fx.ok_or_else(|| {
        StatArbError::config_error(format!(
            "currency for {} is {}, but no FX ticker provided to convert to {}",
            leg.ticker, currency, base_currency
        ))
    })?;
    let (fx_base, fx_quote) = parse_fx_pair(fx_ticker)?;
    if currency == fx_base && base_currency == fx_quote {
        Ok((Conversion::Multiply, Some(fx_series)))
    } else if currency == fx_quote && base_currency == fx_base {
        Ok((Conversion::Divide, Some(fx_series)))
    } else {
        Err(StatArbError::currency_incompatibility(
            fx_ticker,
            currency,
            base_currency,
        ))
    }
}

/// Align two legs onto their common timestamp index and convert both to
/// `base_currency`.
///
/// `fx_a` / `fx_b` supply the FX ticker and series for a leg whose currency
/// differs from the base; they are ignored for legs already denominated in
/// the base currency. The join intersects the legs with every FX series that
/// takes part in a conversion and drops rows containing non-finite values.
pub fn align_pair(
    leg_a: &PriceSeries,
    leg_b: &PriceSeries,
    base_currency: &str,
    fx_a: Option<(&str, &PriceSeries)>,
    fx_b: Option<(&str, &PriceSeries)>,
) -> Result<AlignedPair> {
    let base_currency = base_currency.to_uppercase();

    let (conv_a, fx_series_a) = plan_conversion(leg_a, &base_currency, fx_a)?;
    let (conv_b, fx_series_b) = plan_conversion(leg_b, &base_currency, fx_b)?;

    let map_a = to_map(leg_a);
    let map_b = to_map(leg_b);
    let fx_map_a = fx_series_a.map(to_map);
    let fx_map_b = fx_series_b.map(to_map);

    let mut timestamps = Vec::new();
    let mut column_a = Vec::new();
    let mut column_b = Vec::new();

    for (&ts, &price_a) in &map_a {
        let Some(&price_b) = map_b.get(&ts) else {
            continue;
        };
        let rate_a = match &fx_map_a {
            Some(map) => match map.get(&ts) {
                Some(&rate) => Some(rate),
                None => continue,
            },
            None => None,
        };
        let rate_b = match &fx_map_b {
            Some(map) => match map.get(&ts) {
                Some(&rate) => Some(rate),
                None => continue,
            },
            None => None,
        };
        let converted_a = apply_conversion(price_a, &conv_a, rate_a);
        let converted_b = apply_conversion(price_b, &conv_b, rate_b);
        if !converted_a.is_finite() || !converted_b.is_finite() {
            continue;
        }
        timestamps.push(ts);
        column_a.push(converted_a);
        column_b.push(converted_b);
    }

    debug!(
        rows = timestamps.len(),
        leg_a = %leg_a.ticker,
        leg_b = %leg_b.ticker,
        base = %base_currency,
        "aligned pair"
    );

    Ok(AlignedPair {
        timestamps,
        a: column_a,
        b: column_b,
        currency_a: leg_a.currency.clone(),
        currency_b: leg_b.currency.clone(),
    })
}

fn apply_conversion(price: f64, conversion: &Conversion, rate: Option<f64>) -> f64 {
    match (conversion, rate) {
        (Conversion::None, _) => price,
        (Conversion::Multiply, Some(rate)) => price * rate,
        (Conversion::Divide, Some(rate)) => price / rate,
        // Conversion planned but no rate joined for this row; the caller
        // skips such rows before reaching here.
        _ => f64::NAN,
    }
}

/// Fetches both legs of a pair (and any FX series needed for conversion)
/// from a [`PriceSource`] and aligns them.
pub struct PairLoader<'a> {
    provider: &'a dyn PriceSource,
    fx_provider: Option<&'a dyn PriceSource>,
    base_currency: String,
    fx_tickers: Option<FxTickers>,
}

impl<'a> PairLoader<'a> {
    /// Create a loader operating in `base_currency`, fetching everything
    /// from `provider`.
    pub fn new(provider: &'a dyn PriceSource, base_currency: impl Into<String>) -> Self {
        Self {
            provider,
            fx_provider: None,
            base_currency: base_currency.into().to_uppercase(),
            fx_tickers: None,
        }
    }

    /// Use a dedicated source for FX series instead of the main provider.
    pub fn with_fx_provider(mut self, fx_provider: &'a dyn PriceSource) -> Self {
        self.fx_provider = Some(fx_provider);
        self
    }

    /// Supply FX tickers for legs whose currency differs from the base.
    pub fn with_fx_tickers(mut self, fx_tickers: FxTickers) -> Self {
        self.fx_tickers = Some(fx_tickers);
        self
    }

    /// Fetch and align the two legs over `[start, end]` (both ends
    /// inclusive) at `interval`.
    ///
    /// FX series are fetched at most once per distinct FX ticker, even when
    /// both legs convert through the same pair.
    pub fn load(
        &self,
        ticker_a: &str,
        ticker_b: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<AlignedPair> {
        let leg_a = self.provider.fetch(ticker_a, start, end, interval)?;
        let leg_b = self.provider.fetch(ticker_b, start, end, interval)?;

        let fx_ticker_a = self.fx_ticker_for(&leg_a)?;
        let fx_ticker_b = self.fx_ticker_for(&leg_b)?;

        let fx_source = self.fx_provider.unwrap_or(self.provider);
        let mut fx_cache: HashMap<String, PriceSeries> = HashMap::new();
        for ticker in [&fx_ticker_a, &fx_ticker_b].into_iter().flatten() {
            if fx_cache.contains_key(ticker) {
                debug!(fx_ticker = %ticker, "reusing cached FX series");
                continue;
            }
            let series = fx_source.fetch(ticker, start, end, interval)?;
            fx_cache.insert(ticker.clone(), series);
        }

        let fx_a = fx_ticker_a
            .as_deref()
            .map(|ticker| (ticker, &fx_cache[ticker]));
        let fx_b = fx_ticker_b
            .as_deref()
            .map(|ticker| (ticker, &fx_cache[ticker]));

        align_pair(&leg_a, &leg_b, &self.base_currency, fx_a, fx_b)
    }

    /// FX ticker a leg must convert through, or `None` when it is already in
    /// the base currency. Fails when a conversion is needed but no ticker
    /// was configured for the symbol.
    fn fx_ticker_for(&self, leg: &PriceSeries) -> Result<Option<String>> {
        if leg.currency.to_uppercase() == self.base_currency {
            return Ok(None);
        }
        let resolved = self
            .fx_tickers
            .as_ref()
            .and_then(|tickers| tickers.resolve(&leg.ticker));
        match resolved {
            Some(ticker) => Ok(Some(ticker.to_string())),
            None => Err(StatArbError::config_error(format!(
                "currency for {} is {}, but no FX ticker provided to convert to {}",
                leg.ticker, leg.currency, self.base_currency
            ))),
        }
    }
}
