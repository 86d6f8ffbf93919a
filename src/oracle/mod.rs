//! Market data source trait definitions
//!
//! This trait abstracts the external quote provider behind a unified
//! interface. Every call can fail or time out; callers are expected to
//! degrade rather than crash: valuation treats a missing price as a zero
//! contribution, trade execution rejects the trade.

pub mod memory;
pub mod yahoo;

pub use memory::StaticOracle;
pub use yahoo::YahooOracle;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a market data source
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No data available for symbol {symbol}")]
    NoData { symbol: String },
}

/// One OHLCV bar of a historical series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Instrument metadata for display surfaces
///
/// Fields the provider cannot supply stay at their defaults; an empty
/// record is a valid degraded answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub price: Decimal,
    pub change_percent: Decimal,
    pub volume: u64,
}

/// Trait for market data sources
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Get the name of the source
    fn name(&self) -> &str;

    /// Fetch the latest traded price for a symbol
    ///
    /// A non-positive price is treated by callers the same as an error:
    /// no usable quote.
    async fn current_price(&self, symbol: &str) -> Result<Decimal, OracleError>;

    /// Fetch a historical OHLCV series for a symbol
    ///
    /// `period` uses provider range notation ("1d", "1mo", "1y", ...).
    async fn historical_bars(&self, symbol: &str, period: &str) -> Result<Vec<Bar>, OracleError>;

    /// Fetch instrument metadata for a symbol
    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo, OracleError>;
}
