use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::args::parse_order_id;
use crate::engine::AccountRegistry;

#[derive(Args, Clone)]
pub struct CancelArgs {
    /// Pending order id
    #[arg(value_parser = parse_order_id)]
    pub order_id: Uuid,
}

pub struct CancelCommand {
    args: CancelArgs,
}

impl CancelCommand {
    pub fn new(args: CancelArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        let handle = registry.handle_for(account).await?;

        match handle.cancel_order(self.args.order_id).await? {
            Ok(order) => {
                println!(
                    "{} Cancelled {} {} order for {}",
                    "✅".bright_green(),
                    order.kind,
                    order.side,
                    order.symbol.bright_yellow()
                );
            }
            Err(e) => {
                println!("{} Cancel failed: {}", "❌".bright_red(), e);
            }
        }

        Ok(())
    }
}
