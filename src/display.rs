//! Table rendering for portfolio data
//!
//! Formatting only; all values arrive already computed by the engine.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::collections::HashMap;

use crate::engine::SweepReport;
use crate::ledger::types::{PendingOrder, PortfolioMetrics, Transaction};
use crate::oracle::InstrumentInfo;

/// Render portfolio metrics as a two-column table
pub fn metrics_table(metrics: &PortfolioMetrics) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);

    table.add_row(vec![
        "Total Value".to_string(),
        format!("${:.2}", metrics.total_value),
    ]);
    table.add_row(vec!["Cash".to_string(), format!("${:.2}", metrics.cash)]);
    table.add_row(vec![
        "Invested Value".to_string(),
        format!("${:.2}", metrics.invested_value),
    ]);
    table.add_row(vec![
        "Total Return".to_string(),
        format!("{:.2}%", metrics.total_return_pct),
    ]);
    table.add_row(vec![
        "Daily Return".to_string(),
        format!("{:.4}%", metrics.daily_return_pct),
    ]);
    table.add_row(vec![
        "Positions".to_string(),
        metrics.position_count.to_string(),
    ]);
    table.add_row(vec![
        "Pending Orders".to_string(),
        metrics.pending_order_count.to_string(),
    ]);

    table
}

/// Render positions sorted by symbol
pub fn positions_table(positions: &HashMap<String, u64>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Symbol", "Quantity"]);

    let mut rows: Vec<_> = positions.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, quantity) in rows {
        table.add_row(vec![symbol.clone(), quantity.to_string()]);
    }

    table
}

/// Render transaction history (already newest-first)
pub fn history_table(transactions: &[Transaction]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Time", "Side", "Symbol", "Qty", "Price", "Total", "Entry Price",
        ]);

    for tx in transactions {
        table.add_row(vec![
            tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.side.to_string(),
            tx.symbol.clone(),
            tx.quantity.to_string(),
            format!("${:.2}", tx.price),
            format!("${:.2}", tx.gross_value()),
            format!("${:.2}", tx.entry_price),
        ]);
    }

    table
}

/// Render pending orders
pub fn orders_table(orders: &[PendingOrder]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Order ID", "Symbol", "Side", "Qty", "Kind", "Limit", "Trigger", "Validity", "Expires",
        ]);

    for order in orders {
        table.add_row(vec![
            order.id.to_string(),
            order.symbol.clone(),
            order.side.to_string(),
            order.quantity.to_string(),
            order.kind.to_string(),
            order
                .limit_price
                .map(|p| format!("${:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            order
                .trigger_price
                .map(|p| format!("${:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            order.validity.to_string(),
            order
                .expires_at
                .map(|e| e.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    table
}

/// Render instrument metadata
pub fn instrument_table(info: &InstrumentInfo) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Symbol".to_string(), info.symbol.clone()]);
    table.add_row(vec!["Name".to_string(), info.name.clone()]);
    if !info.sector.is_empty() {
        table.add_row(vec!["Sector".to_string(), info.sector.clone()]);
    }
    table.add_row(vec!["Price".to_string(), format!("${:.2}", info.price)]);
    table.add_row(vec![
        "Change".to_string(),
        format!("{:.2}%", info.change_percent),
    ]);
    table.add_row(vec!["Volume".to_string(), info.volume.to_string()]);

    table
}

/// Render a historical OHLCV series
pub fn bars_table(bars: &[crate::oracle::Bar]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Date", "Open", "High", "Low", "Close", "Volume"]);

    for bar in bars {
        table.add_row(vec![
            bar.timestamp.format("%Y-%m-%d").to_string(),
            format!("{:.2}", bar.open),
            format!("{:.2}", bar.high),
            format!("{:.2}", bar.low),
            format!("{:.2}", bar.close),
            bar.volume.to_string(),
        ]);
    }

    table
}

/// One-line summary of a sweep pass
pub fn sweep_summary(report: &SweepReport) -> String {
    format!(
        "swept: {} filled, {} expired, {} dropped",
        report.filled, report.purged, report.dropped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_history_table_renders_rows() {
        let transactions = vec![Transaction {
            timestamp: Utc::now(),
            symbol: "AAPL".to_string(),
            side: crate::ledger::types::Side::Buy,
            quantity: 10,
            price: dec!(150),
            entry_price: dec!(150),
        }];
        let rendered = history_table(&transactions).to_string();
        assert!(rendered.contains("AAPL"));
        assert!(rendered.contains("$150.00"));
    }

    #[test]
    fn test_positions_table_sorted_by_symbol() {
        let mut positions = HashMap::new();
        positions.insert("MSFT".to_string(), 5u64);
        positions.insert("AAPL".to_string(), 10u64);

        let rendered = positions_table(&positions).to_string();
        let aapl = rendered.find("AAPL").unwrap();
        let msft = rendered.find("MSFT").unwrap();
        assert!(aapl < msft);
    }
}
