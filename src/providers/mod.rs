//! Price sources the research pipeline can pull history from.
//!
//! The core depends on exactly one capability: [`PriceSource::fetch`].
//! Implementations cover offline CSV files ([`CsvPriceSource`]) and the
//! OANDA v20 REST API ([`OandaPriceSource`]); anything able to produce a
//! [`PriceSeries`](crate::data::PriceSeries) for a ticker and time range can
//! plug in. Fetching is synchronous and blocking; retry policy belongs to
//! the implementation, never to the pipeline.

mod csv;
mod oanda;

pub use self::csv::{CsvPriceSource, CsvSpec};
pub use self::oanda::{OandaEnvironment, OandaPriceSource};

use chrono::{DateTime, FixedOffset};

use crate::data::PriceSeries;
use crate::errors::Result;

/// Capability interface for historical price retrieval.
pub trait PriceSource {
    /// Fetch history for `ticker` over `[start, end]` at the given bar
    /// interval (e.g. `"1d"`, `"1h"`).
    ///
    /// Fails with [`StatArbError::TickerNotFound`](crate::errors::StatArbError::TickerNotFound)
    /// for unknown tickers, [`StatArbError::InvalidTimeRange`](crate::errors::StatArbError::InvalidTimeRange)
    /// when `start >= end`, or an opaque I/O error on transport failure.
    fn fetch(
        &self,
        ticker: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<PriceSeries>;
}
