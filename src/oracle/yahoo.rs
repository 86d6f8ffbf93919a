//! Yahoo Finance chart API client
//!
//! Fetches quotes and historical bars from the public chart endpoint.
//! Every request carries a bounded timeout from [`OracleSettings`]; a
//! timeout surfaces as an HTTP error and callers degrade accordingly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::OracleSettings;

use super::{Bar, InstrumentInfo, MarketDataSource, OracleError};

/// Market data source backed by the Yahoo Finance chart API
pub struct YahooOracle {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    regular_market_price: Option<Decimal>,
    chart_previous_close: Option<Decimal>,
    regular_market_volume: Option<u64>,
    short_name: Option<String>,
    long_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteBlock>,
}

// Yahoo pads gaps with nulls; bars with any missing component are skipped
#[derive(Debug, Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<Decimal>>>,
    high: Option<Vec<Option<Decimal>>>,
    low: Option<Vec<Option<Decimal>>>,
    close: Option<Vec<Option<Decimal>>>,
    volume: Option<Vec<Option<u64>>>,
}

impl YahooOracle {
    /// Create a new client from oracle settings
    pub fn new(settings: &OracleSettings) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .user_agent("papertrade/0.1")
            .build()?;
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| OracleError::Malformed(format!("invalid base URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    async fn fetch_chart(&self, symbol: &str, period: &str) -> Result<ChartResult, OracleError> {
        let mut url = self
            .base_url
            .join(&format!("/v8/finance/chart/{}", symbol))
            .map_err(|e| OracleError::Malformed(format!("invalid symbol URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("range", period)
            .append_pair("interval", if period == "1d" { "5m" } else { "1d" });

        debug!(symbol = %symbol, period = %period, "Fetching chart data");

        let response: ChartResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.chart.error {
            return Err(OracleError::Malformed(error.to_string()));
        }

        response
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| OracleError::NoData {
                symbol: symbol.to_string(),
            })
    }
}

#[async_trait]
impl MarketDataSource for YahooOracle {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal, OracleError> {
        let result = self.fetch_chart(symbol, "1d").await?;
        result
            .meta
            .regular_market_price
            .ok_or_else(|| OracleError::NoData {
                symbol: symbol.to_string(),
            })
    }

    async fn historical_bars(&self, symbol: &str, period: &str) -> Result<Vec<Bar>, OracleError> {
        let result = self.fetch_chart(symbol, period).await?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::NoData {
                symbol: symbol.to_string(),
            })?;

        let opens = quote.open.unwrap_or_default();
        let highs = quote.high.unwrap_or_default();
        let lows = quote.low.unwrap_or_default();
        let closes = quote.close.unwrap_or_default();
        let volumes = quote.volume.unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let timestamp = match DateTime::<Utc>::from_timestamp(*ts, 0) {
                Some(t) => t,
                None => continue,
            };
            let (open, high, low, close) = match (
                opens.get(i).copied().flatten(),
                highs.get(i).copied().flatten(),
                lows.get(i).copied().flatten(),
                closes.get(i).copied().flatten(),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: volumes.get(i).copied().flatten().unwrap_or(0),
            });
        }

        Ok(bars)
    }

    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo, OracleError> {
        let result = self.fetch_chart(symbol, "1d").await?;
        let meta = result.meta;

        let price = meta.regular_market_price.unwrap_or_default();
        let change_percent = match meta.chart_previous_close {
            Some(prev) if !prev.is_zero() => (price - prev) / prev * Decimal::from(100),
            _ => Decimal::ZERO,
        };

        Ok(InstrumentInfo {
            symbol: meta.symbol,
            name: meta.long_name.or(meta.short_name).unwrap_or_default(),
            // The chart endpoint carries no sector classification
            sector: String::new(),
            price,
            change_percent,
            volume: meta.regular_market_volume.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart_body(price: f64, prev_close: f64) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "AAPL",
                        "regularMarketPrice": price,
                        "chartPreviousClose": prev_close,
                        "regularMarketVolume": 1_234_567u64,
                        "shortName": "Apple Inc."
                    },
                    "timestamp": [1700000000i64, 1700086400i64],
                    "indicators": {
                        "quote": [{
                            "open":   [150.0, 151.0],
                            "high":   [152.0, 153.0],
                            "low":    [149.0, 150.5],
                            "close":  [151.5, null],
                            "volume": [1000u64, 2000u64]
                        }]
                    }
                }],
                "error": null
            }
        })
    }

    async fn oracle_for(server: &MockServer) -> YahooOracle {
        let settings = OracleSettings {
            base_url: server.uri(),
            timeout_secs: 2,
        };
        YahooOracle::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_current_price_from_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(229.5, 228.0)))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let price = oracle.current_price("AAPL").await.unwrap();
        assert_eq!(price, dec!(229.5));
    }

    #[tokio::test]
    async fn test_bars_skip_null_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(229.5, 228.0)))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let bars = oracle.historical_bars("AAPL", "1mo").await.unwrap();
        // Second bar has a null close and is dropped
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, dec!(151.5));
        assert_eq!(bars[0].volume, 1000);
    }

    #[tokio::test]
    async fn test_instrument_info_change_percent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(230.0, 200.0)))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let info = oracle.instrument_info("AAPL").await.unwrap();
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.change_percent, dec!(15));
        assert_eq!(info.volume, 1_234_567);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/DOWN"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let err = oracle.current_price("DOWN").await.unwrap_err();
        assert!(matches!(err, OracleError::Http(_)));
    }

    #[tokio::test]
    async fn test_chart_error_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BAD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": null, "error": { "code": "Not Found" } }
            })))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server).await;
        let err = oracle.current_price("BAD").await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }
}
