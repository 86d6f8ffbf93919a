//! Shared argument parsers for CLI commands

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::ledger::types::{OrderKind, Validity};

/// Parse an order kind (market, limit, stop-loss, stop-limit)
pub fn parse_order_kind(s: &str) -> Result<OrderKind, String> {
    s.parse()
}

/// Parse an order validity (day, gtc)
pub fn parse_validity(s: &str) -> Result<Validity, String> {
    s.parse()
}

/// Parse a strictly positive price
pub fn parse_price(s: &str) -> Result<Decimal, String> {
    let value: Decimal = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid price", s))?;
    if value <= Decimal::ZERO {
        return Err(format!("Price must be positive, got {}", value));
    }
    Ok(value)
}

/// Parse an order id
pub fn parse_order_id(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s).map_err(|_| format!("'{}' is not a valid order id", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_price_bounds() {
        assert_eq!(parse_price("150.25").unwrap(), dec!(150.25));
        assert!(parse_price("0").is_err());
        assert!(parse_price("-5").is_err());
        assert!(parse_price("abc").is_err());
    }

    #[test]
    fn test_parse_order_kind_passthrough() {
        assert_eq!(parse_order_kind("limit").unwrap(), OrderKind::Limit);
        assert!(parse_order_kind("iceberg").is_err());
    }
}
