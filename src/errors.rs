//! Error types for statistical arbitrage research operations

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Result type alias for consistent error handling throughout the crate
pub type Result<T> = std::result::Result<T, StatArbError>;

/// Main error type for statistical arbitrage research operations
#[derive(Debug, Error)]
pub enum StatArbError {
    /// Malformed FX ticker, missing FX mapping or other bad configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Too few observations for regression or testing
    #[error("Insufficient data: {0}")]
    DataInsufficiency(String),

    /// FX pair cannot reconcile the requested currency conversion
    #[error("FX ticker '{fx_ticker}' is incompatible with conversion from {from} to {to}")]
    CurrencyIncompatibility {
        fx_ticker: String,
        from: String,
        to: String,
    },

    /// Ticker unknown to the price source
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// Invalid time range specified
    #[error("Invalid time range: start {start} >= end {end}")]
    InvalidTimeRange {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    /// Unsupported bar interval
    #[error("Unsupported interval: {0}")]
    UnsupportedInterval(String),

    /// HTTP client errors from a network-backed price source
    #[error("HTTP error: {0}")]
    Http(String),

    /// CSV processing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    /// Date/time parsing errors
    #[error("DateTime parsing error: {0}")]
    DateTimeParsing(#[from] chrono::ParseError),
}

impl From<reqwest::Error> for StatArbError {
    fn from(err: reqwest::Error) -> Self {
        StatArbError::Http(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for StatArbError {
    fn from(err: std::num::ParseFloatError) -> Self {
        StatArbError::Configuration(format!("Number parsing error: {}", err))
    }
}

// Helper methods for error creation and classification
impl StatArbError {
    /// Create a new Configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new DataInsufficiency error
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::DataInsufficiency(message.into())
    }

    /// Create a new CurrencyIncompatibility error
    pub fn currency_incompatibility(
        fx_ticker: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::CurrencyIncompatibility {
            fx_ticker: fx_ticker.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Create a new TickerNotFound error
    pub fn ticker_not_found(ticker: impl Into<String>) -> Self {
        Self::TickerNotFound(ticker.into())
    }

    /// Create a new InvalidTimeRange error
    pub fn invalid_time_range(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self::InvalidTimeRange { start, end }
    }

    /// Create a new UnsupportedInterval error
    pub fn unsupported_interval(interval: impl Into<String>) -> Self {
        Self::UnsupportedInterval(interval.into())
    }

    /// Create a new Http error
    pub fn http_error(message: impl Into<String>) -> Self {
        Self::Http(message.into())
    }

    /// Check if this error is due to user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::UnsupportedInterval(_)
                | Self::InvalidTimeRange { .. }
                | Self::CurrencyIncompatibility { .. }
        )
    }

    /// Check if this error is recoverable (caller can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config",
            Self::DataInsufficiency(_) => "data",
            Self::CurrencyIncompatibility { .. } => "currency",
            Self::TickerNotFound(_) => "data",
            Self::InvalidTimeRange { .. } => "validation",
            Self::UnsupportedInterval(_) => "validation",
            Self::Http(_) => "network",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
            Self::JsonParsing(_) => "parsing",
            Self::DateTimeParsing(_) => "parsing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn error_messages_carry_context() {
        let err = StatArbError::currency_incompatibility("EURUSD", "GBP", "USD");
        let msg = err.to_string();
        assert!(msg.contains("EURUSD"));
        assert!(msg.contains("GBP"));
        assert!(msg.contains("USD"));
    }

    #[test]
    fn time_range_error_displays_both_ends() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let start = tz.timestamp_opt(2_000, 0).unwrap();
        let end = tz.timestamp_opt(1_000, 0).unwrap();
        let err = StatArbError::invalid_time_range(start, end);
        assert_eq!(err.category(), "validation");
        assert!(err.is_user_error());
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(StatArbError::config_error("x").category(), "config");
        assert_eq!(StatArbError::insufficient_data("x").category(), "data");
        assert_eq!(StatArbError::http_error("x").category(), "network");
        assert!(StatArbError::http_error("x").is_recoverable());
        assert!(!StatArbError::ticker_not_found("x").is_user_error());
    }
}
