use std::fs;
use std::io::Write;

use chrono::{Duration, NaiveDate};
use statarb_backtest::prelude::*;
use tracing_subscriber::EnvFilter;

/// # Basic Pair Backtest Example
///
/// This example demonstrates the full research pipeline on synthetic data:
/// - Writing daily price history to CSV files and loading it back through
///   `CsvPriceSource`
/// - Aligning a USD leg with a EUR leg through an `EURUSD` conversion series
/// - Estimating the OLS hedge ratio and building the spread
/// - Checking the spread for stationarity with an ADF test
/// - Backtesting the Bollinger band strategy across several window lengths
///
/// ## Usage
///
/// Run this example with:
/// ```bash
/// cargo run --example basic_pair_backtest
/// ```
///
/// For debug logging:
/// ```bash
/// RUST_LOG=debug cargo run --example basic_pair_backtest
/// ```

const DAYS: usize = 360;

fn write_csv(path: &std::path::Path, rows: &[(NaiveDate, f64)]) -> anyhow::Result<()> {
    let mut file = fs::File::create(path)?;
    writeln!(file, "timestamp,close")?;
    for (date, price) in rows {
        writeln!(file, "{},{:.6}", date.format("%Y-%m-%d"), price)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("Statistical Arbitrage Pair Backtest Example");
    println!("===========================================\n");

    // Build a synthetic cointegrated pair: leg B trends slowly, leg A is
    // 1.4 * B + 8 plus a bounded oscillation, and leg B is quoted in EUR at
    // a rate near 1.10.
    let first_day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut leg_a = Vec::with_capacity(DAYS);
    let mut leg_b_eur = Vec::with_capacity(DAYS);
    let mut fx = Vec::with_capacity(DAYS);
    for i in 0..DAYS {
        let date = first_day + Duration::days(i as i64);
        let t = i as f64;
        let b = 100.0 + 0.05 * t + 5.0 * (t * 0.1).sin();
        let a = 1.4 * b + 8.0 + 2.0 * (t * 0.37 + 1.0).sin();
        let rate = 1.10 + 0.002 * (t * 0.05).sin();
        leg_a.push((date, a));
        leg_b_eur.push((date, b / rate));
        fx.push((date, rate));
    }

    let dir = tempfile::tempdir()?;
    let path_a = dir.path().join("leg_a.csv");
    let path_b = dir.path().join("leg_b.csv");
    let path_fx = dir.path().join("eurusd.csv");
    write_csv(&path_a, &leg_a)?;
    write_csv(&path_b, &leg_b_eur)?;
    write_csv(&path_fx, &fx)?;

    let source = CsvPriceSource::default()
        .with_ticker("AAA", CsvSpec::new(&path_a).currency("USD"))
        .with_ticker("BBB", CsvSpec::new(&path_b).currency("EUR"))
        .with_ticker("EURUSD", CsvSpec::new(&path_fx).currency("USD"));
    let loader = PairLoader::new(&source, "USD")
        .with_fx_tickers(FxTickers::Single("EURUSD".to_string()));

    let start = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")?;
    let end = chrono::DateTime::parse_from_rfc3339("2025-06-01T00:00:00Z")?;
    let pair = loader.load("AAA", "BBB", start, end, "1d")?;
    println!(
        "Loaded {} aligned observations ({} leg in {}, {} leg in {})\n",
        pair.len(),
        "AAA",
        pair.currency_a,
        "BBB",
        pair.currency_b
    );

    let hedge = estimate_hedge_ratio(&pair.a, &pair.b, true)?;
    println!("{}\n", hedge.summary);

    let spread = compute_spread(&pair, hedge.ratio, hedge.intercept);
    let adf = adf_test(&spread.values)?;
    println!(
        "ADF statistic {:.4}, p-value {:.6} ({} lags, {} observations)",
        adf.statistic, adf.p_value, adf.lags, adf.nobs
    );
    if adf.p_value > 0.05 {
        println!("WARNING: spread may not be stationary; results below are suspect");
    }
    println!();

    let windows = [10, 20, 40];
    let results = run_multi_window_backtest(&spread, &windows, 1.5, 0.1)?;

    println!("window  trades  win_rate  total_pnl   sharpe  max_drawdown");
    for (window, result) in &results {
        let s = &result.stats;
        println!(
            "{:>6}  {:>6}  {:>8.2}  {:>9.4}  {:>7.4}  {:>12.4}",
            window, s.num_trades, s.win_rate, s.total_pnl, s.sharpe, s.max_drawdown
        );
    }

    let best = results
        .iter()
        .max_by(|x, y| {
            x.1.stats
                .total_pnl
                .partial_cmp(&y.1.stats.total_pnl)
                .unwrap()
        })
        .map(|(window, _)| *window);
    if let Some(window) = best {
        println!("\nBest window by total pnl: {}", window);
    }

    Ok(())
}
