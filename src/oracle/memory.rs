//! Deterministic in-memory market data source
//!
//! Used by the test suite and offline runs. Prices are set explicitly and
//! never change unless the caller changes them, which makes valuation and
//! sweep behavior reproducible.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Bar, InstrumentInfo, MarketDataSource, OracleError};

/// In-memory price table implementing [`MarketDataSource`]
#[derive(Default)]
pub struct StaticOracle {
    prices: RwLock<HashMap<String, Decimal>>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source pre-loaded with (symbol, price) pairs
    pub fn with_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        Self {
            prices: RwLock::new(prices.into_iter().collect()),
        }
    }

    /// Set or update the price for a symbol
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .write()
            .expect("price table lock poisoned")
            .insert(symbol.to_string(), price);
    }

    /// Remove a symbol, simulating a feed outage for it
    pub fn clear_price(&self, symbol: &str) {
        self.prices
            .write()
            .expect("price table lock poisoned")
            .remove(symbol);
    }

    fn lookup(&self, symbol: &str) -> Result<Decimal, OracleError> {
        self.prices
            .read()
            .expect("price table lock poisoned")
            .get(symbol)
            .copied()
            .ok_or_else(|| OracleError::NoData {
                symbol: symbol.to_string(),
            })
    }
}

#[async_trait]
impl MarketDataSource for StaticOracle {
    fn name(&self) -> &str {
        "static"
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal, OracleError> {
        self.lookup(symbol)
    }

    async fn historical_bars(&self, symbol: &str, _period: &str) -> Result<Vec<Bar>, OracleError> {
        // Single synthetic bar at the current price; enough for display paths
        let price = self.lookup(symbol)?;
        Ok(vec![Bar {
            timestamp: Utc::now(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0,
        }])
    }

    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo, OracleError> {
        let price = self.lookup(symbol)?;
        Ok(InstrumentInfo {
            symbol: symbol.to_string(),
            price,
            ..Default::default()
        })
    }
}
