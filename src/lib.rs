//! Statistical arbitrage research toolkit for pairs trading.
//!
//! The crate covers the full research pipeline: loading price history
//! through pluggable [`providers`], aligning two legs onto a shared
//! timestamp index with currency normalization, estimating an OLS hedge
//! ratio, testing the resulting spread for stationarity, generating
//! Bollinger-band signals and backtesting a single-position mean-reversion
//! strategy across several window lengths at once.
//!
//! ```no_run
//! use statarb_backtest::prelude::*;
//!
//! fn main() -> statarb_backtest::errors::Result<()> {
//!     let source = CsvPriceSource::default()
//!         .with_ticker("AAA", CsvSpec::new("aaa.csv"))
//!         .with_ticker("BBB", CsvSpec::new("bbb.csv"));
//!     let loader = PairLoader::new(&source, "USD");
//!     let start = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")?;
//!     let end = chrono::DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")?;
//!     let pair = loader.load("AAA", "BBB", start, end, "1d")?;
//!
//!     let hedge = estimate_hedge_ratio(&pair.a, &pair.b, true)?;
//!     let spread = compute_spread(&pair, hedge.ratio, hedge.intercept);
//!     let adf = adf_test(&spread.values)?;
//!     println!("ADF statistic {:.3} (p = {:.4})", adf.statistic, adf.p_value);
//!
//!     let results = run_multi_window_backtest(&spread, &[10, 20, 40], 1.5, 0.0)?;
//!     for (window, result) in &results {
//!         println!("window {:>3}: pnl {:+.4}", window, result.stats.total_pnl);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod data;
pub mod errors;
pub mod hedge;
pub mod math;
pub mod providers;
pub mod signals;
pub mod stationarity;

#[cfg(test)]
mod tests {
    pub mod mock_data;

    mod backtest_tests;
    mod data_tests;
    mod integration_tests;
}

/// Convenient re-export of the most common items used when writing examples or tests.
pub mod prelude {
    pub use crate::backtest::{
        compute_stats, run_bollinger_backtest, run_multi_window_backtest,
        run_multi_window_backtest_parallel, BacktestResult, BacktestStats, Trade, TradeSide,
    };
    pub use crate::data::{AlignedPair, FxTickers, PairLoader, PriceSeries};
    pub use crate::errors::{Result, StatArbError};
    pub use crate::hedge::{
        compute_spread, compute_spread_values, estimate_hedge_ratio, HedgeRatio, Spread,
    };
    pub use crate::providers::{
        CsvPriceSource, CsvSpec, OandaEnvironment, OandaPriceSource, PriceSource,
    };
    pub use crate::signals::{compute_bollinger_bands, compute_multi_bollinger, BollingerBands};
    pub use crate::stationarity::{adf_test, AdfResult};
}
