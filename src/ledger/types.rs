//! Ledger type definitions with strong typing
//!
//! Every record that reaches storage or a caller is an explicit struct or
//! enum; nothing is passed around as loosely-shaped JSON.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Trade side (buy/sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order kind
///
/// Market orders settle immediately against the live price; the other
/// kinds queue as pending orders until a sweep fills or expires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    StopLoss,
    StopLimit,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::StopLoss => write!(f, "stop-loss"),
            OrderKind::StopLimit => write!(f, "stop-limit"),
        }
    }
}

impl FromStr for OrderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderKind::Market),
            "limit" => Ok(OrderKind::Limit),
            "stop-loss" | "stoploss" | "stop" => Ok(OrderKind::StopLoss),
            "stop-limit" | "stoplimit" => Ok(OrderKind::StopLimit),
            other => Err(format!(
                "'{}' is not a valid order kind (market, limit, stop-loss, stop-limit)",
                other
            )),
        }
    }
}

/// Lifetime policy for a conditional order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validity {
    /// Expires at the end of the creation day (UTC)
    Day,
    /// Good till cancelled
    Gtc,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Day => write!(f, "Day"),
            Validity::Gtc => write!(f, "GTC"),
        }
    }
}

impl FromStr for Validity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Validity::Day),
            "gtc" => Ok(Validity::Gtc),
            other => Err(format!("'{}' is not a valid validity (day, gtc)", other)),
        }
    }
}

/// Immutable record of a settled fill
///
/// Appended to the ledger on every fill and never mutated. For sells,
/// `entry_price` carries the blended average price of all prior buys of
/// the symbol at the time of sale; for buys it equals the fill price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
    pub entry_price: Decimal,
}

impl Transaction {
    /// Cash moved by this fill (always non-negative)
    pub fn gross_value(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Conditional order awaiting trigger or expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: u64,
    pub side: Side,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub validity: Validity,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PendingOrder {
    /// Whether the order has passed its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    /// Whether the live price satisfies this order's fill condition
    ///
    /// Limit buys fill at or below the limit, limit sells at or above.
    /// Stops trigger when the price crosses the trigger against the
    /// position (sell stop: at or below; buy stop: at or above).
    /// Stop-limits require both the trigger crossing and the limit bound.
    pub fn condition_met(&self, price: Decimal) -> bool {
        let limit = self.limit_price.unwrap_or(Decimal::ZERO);
        let trigger = self.trigger_price.unwrap_or(Decimal::ZERO);

        match (self.kind, self.side) {
            (OrderKind::Market, _) => true,
            (OrderKind::Limit, Side::Buy) => price <= limit,
            (OrderKind::Limit, Side::Sell) => price >= limit,
            (OrderKind::StopLoss, Side::Sell) => price <= trigger,
            (OrderKind::StopLoss, Side::Buy) => price >= trigger,
            (OrderKind::StopLimit, Side::Buy) => price >= trigger && price <= limit,
            (OrderKind::StopLimit, Side::Sell) => price <= trigger && price >= limit,
        }
    }
}

/// End of the calendar day containing `ts`, in UTC
///
/// Day-validity orders expire here rather than 24h after creation.
pub fn end_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let next_midnight = (ts.date_naive() + chrono::Days::new(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    next_midnight.and_utc()
}

/// A trade request as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: u64,
    pub side: Side,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub validity: Validity,
}

impl TradeRequest {
    /// Build a plain market order request
    pub fn market(symbol: impl Into<String>, quantity: u64, side: Side) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            side,
            kind: OrderKind::Market,
            limit_price: None,
            trigger_price: None,
            validity: Validity::Day,
        }
    }

    /// Validate shape before any ledger work happens
    pub fn validate(&self) -> Result<(), TradeError> {
        if self.symbol.trim().is_empty() {
            return Err(TradeError::InvalidSymbol);
        }
        if self.quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        match self.kind {
            OrderKind::Market => {}
            OrderKind::Limit => {
                if self.limit_price.is_none() {
                    return Err(TradeError::MissingLimitPrice);
                }
            }
            OrderKind::StopLoss => {
                if self.trigger_price.is_none() {
                    return Err(TradeError::MissingTriggerPrice);
                }
            }
            OrderKind::StopLimit => {
                if self.limit_price.is_none() {
                    return Err(TradeError::MissingLimitPrice);
                }
                if self.trigger_price.is_none() {
                    return Err(TradeError::MissingTriggerPrice);
                }
            }
        }
        Ok(())
    }
}

/// Result of a successful trade submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// Market order settled immediately
    Filled(Transaction),
    /// Conditional order passed admission and is queued
    Queued { order_id: Uuid },
}

/// Why a trade or cancellation was rejected
///
/// Every rejection is local and recoverable; callers render the message
/// and the ledger is guaranteed untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("symbol must not be empty")]
    InvalidSymbol,
    #[error("quantity must be greater than zero")]
    InvalidQuantity,
    #[error("this order kind requires a limit price")]
    MissingLimitPrice,
    #[error("this order kind requires a trigger price")]
    MissingTriggerPrice,
    #[error("insufficient cash: need {needed}, have {available}")]
    InsufficientCash { needed: Decimal, available: Decimal },
    #[error("insufficient shares of {symbol}: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },
    #[error("no live price available for {symbol}")]
    PriceUnavailable { symbol: String },
    #[error("unknown order id {0}")]
    UnknownOrder(Uuid),
}

/// Portfolio metrics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_value: Decimal,
    pub cash: Decimal,
    pub invested_value: Decimal,
    pub total_return_pct: Decimal,
    pub daily_return_pct: Decimal,
    pub position_count: usize,
    pub pending_order_count: usize,
}
