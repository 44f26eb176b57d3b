//! End-to-end tests of pair loading through a provider.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::data::{utc_offset, FxTickers, PairLoader};
use crate::errors::StatArbError;
use crate::tests::mock_data::{series_from, MockPriceSource};

fn full_range() -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let utc = utc_offset();
    (
        utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap(),
        utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
    )
}

#[test]
fn loads_and_aligns_same_currency_pair() {
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![10.0, 11.0, 12.0, 13.0], "USD"))
        .with_series(series_from("BBB", vec![5.0, 5.5, 6.0, 6.5], "USD"));
    let loader = PairLoader::new(&source, "USD");
    let (start, end) = full_range();

    let pair = loader.load("AAA", "BBB", start, end, "1h").unwrap();
    assert_eq!(pair.len(), 4);
    assert_eq!(pair.a, vec![10.0, 11.0, 12.0, 13.0]);
    assert_eq!(pair.b, vec![5.0, 5.5, 6.0, 6.5]);
    assert_eq!(source.fetch_count("AAA"), 1);
    assert_eq!(source.fetch_count("BBB"), 1);
}

#[test]
fn converts_foreign_leg_through_fx_series() {
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![100.0, 102.0, 104.0], "USD"))
        .with_series(series_from("BBB", vec![50.0, 51.0, 52.0], "EUR"))
        .with_series(series_from("EURUSD", vec![1.1, 1.1, 1.1], "USD"));
    let loader = PairLoader::new(&source, "USD")
        .with_fx_tickers(FxTickers::Single("EURUSD".to_string()));
    let (start, end) = full_range();

    let pair = loader.load("AAA", "BBB", start, end, "1h").unwrap();
    assert_eq!(pair.len(), 3);
    assert!((pair.b[0] - 55.0).abs() < 1e-12);
    assert!((pair.b[2] - 57.2).abs() < 1e-12);
    assert_eq!(pair.currency_b, "EUR");
    assert_eq!(source.fetch_count("EURUSD"), 1);
}

#[test]
fn shared_fx_ticker_is_fetched_once() {
    // Both legs are in EUR with a USD base, so both convert through the same
    // pair; the FX series must still be fetched exactly once.
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![100.0, 102.0], "EUR"))
        .with_series(series_from("BBB", vec![50.0, 51.0], "EUR"))
        .with_series(series_from("EURUSD", vec![1.2, 1.2], "USD"));
    let loader = PairLoader::new(&source, "USD")
        .with_fx_tickers(FxTickers::Single("EURUSD".to_string()));
    let (start, end) = full_range();

    let pair = loader.load("AAA", "BBB", start, end, "1h").unwrap();
    assert_eq!(source.fetch_count("EURUSD"), 1);
    assert!((pair.a[0] - 120.0).abs() < 1e-12);
    assert!((pair.b[0] - 60.0).abs() < 1e-12);
}

#[test]
fn dedicated_fx_provider_is_used_for_fx_series() {
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![100.0, 102.0], "USD"))
        .with_series(series_from("BBB", vec![50.0, 51.0], "EUR"));
    let fx_source =
        MockPriceSource::new().with_series(series_from("EURUSD", vec![1.1, 1.1], "USD"));
    let loader = PairLoader::new(&source, "USD")
        .with_fx_provider(&fx_source)
        .with_fx_tickers(FxTickers::Single("EURUSD".to_string()));
    let (start, end) = full_range();

    loader.load("AAA", "BBB", start, end, "1h").unwrap();
    assert_eq!(source.fetch_count("EURUSD"), 0);
    assert_eq!(fx_source.fetch_count("EURUSD"), 1);
}

#[test]
fn per_symbol_fx_tickers_resolve_independently() {
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![100.0, 102.0], "EUR"))
        .with_series(series_from("BBB", vec![700.0, 710.0], "GBP"))
        .with_series(series_from("EURUSD", vec![1.1, 1.1], "USD"))
        .with_series(series_from("GBPUSD", vec![1.3, 1.3], "USD"));
    let mut map = HashMap::new();
    map.insert("AAA".to_string(), "EURUSD".to_string());
    map.insert("BBB".to_string(), "GBPUSD".to_string());
    let loader = PairLoader::new(&source, "USD").with_fx_tickers(FxTickers::PerSymbol(map));
    let (start, end) = full_range();

    let pair = loader.load("AAA", "BBB", start, end, "1h").unwrap();
    assert!((pair.a[0] - 110.0).abs() < 1e-12);
    assert!((pair.b[0] - 910.0).abs() < 1e-12);
    assert_eq!(source.fetch_count("EURUSD"), 1);
    assert_eq!(source.fetch_count("GBPUSD"), 1);
}

#[test]
fn missing_fx_ticker_for_foreign_leg_fails() {
    let source = MockPriceSource::new()
        .with_series(series_from("AAA", vec![100.0], "USD"))
        .with_series(series_from("BBB", vec![50.0], "EUR"));
    let loader = PairLoader::new(&source, "USD");
    let (start, end) = full_range();

    let err = loader.load("AAA", "BBB", start, end, "1h").unwrap_err();
    assert!(matches!(err, StatArbError::Configuration(_)));
    assert!(err.to_string().contains("BBB"));
}

#[test]
fn unknown_ticker_propagates_not_found() {
    let source = MockPriceSource::new().with_series(series_from("AAA", vec![1.0], "USD"));
    let loader = PairLoader::new(&source, "USD");
    let (start, end) = full_range();

    let err = loader.load("AAA", "MISSING", start, end, "1h").unwrap_err();
    assert!(matches!(err, StatArbError::TickerNotFound(_)));
}
