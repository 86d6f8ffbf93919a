use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use rust_decimal::Decimal;

use crate::cli::args::{parse_order_kind, parse_price, parse_validity};
use crate::engine::AccountRegistry;
use crate::ledger::types::{OrderKind, Side, TradeOutcome, TradeRequest, Validity};

#[derive(Args, Clone)]
pub struct BuyArgs {
    /// Stock symbol (e.g. AAPL)
    pub symbol: String,

    /// Number of shares
    pub quantity: u64,

    /// Order kind: market, limit, stop-loss, stop-limit
    #[arg(long, default_value = "market", value_parser = parse_order_kind)]
    pub kind: OrderKind,

    /// Limit price (required for limit and stop-limit orders)
    #[arg(long, value_parser = parse_price)]
    pub limit_price: Option<Decimal>,

    /// Trigger price (required for stop-loss and stop-limit orders)
    #[arg(long, value_parser = parse_price)]
    pub trigger_price: Option<Decimal>,

    /// Order validity: day, gtc
    #[arg(long, default_value = "day", value_parser = parse_validity)]
    pub validity: Validity,
}

pub struct BuyCommand {
    args: BuyArgs,
}

impl BuyCommand {
    pub fn new(args: BuyArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        let handle = registry.handle_for(account).await?;

        let request = TradeRequest {
            symbol: self.args.symbol.to_uppercase(),
            quantity: self.args.quantity,
            side: Side::Buy,
            kind: self.args.kind,
            limit_price: self.args.limit_price,
            trigger_price: self.args.trigger_price,
            validity: self.args.validity,
        };

        match handle.execute_trade(request).await? {
            Ok(TradeOutcome::Filled(tx)) => {
                println!(
                    "{} Bought {} shares of {} at ${:.2}",
                    "✅".bright_green(),
                    tx.quantity,
                    tx.symbol.bright_yellow(),
                    tx.price
                );
            }
            Ok(TradeOutcome::Queued { order_id }) => {
                println!(
                    "{} Queued {} buy order for {} ({})",
                    "📋".bright_blue(),
                    self.args.kind,
                    self.args.symbol.to_uppercase().bright_yellow(),
                    order_id
                );
            }
            Err(e) => {
                println!("{} Trade rejected: {}", "❌".bright_red(), e);
            }
        }

        Ok(())
    }
}
