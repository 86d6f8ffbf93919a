use anyhow::Result;
use clap::Args;

use crate::display;
use crate::engine::AccountRegistry;

#[derive(Args, Clone)]
pub struct OrdersArgs {
    /// Run a sweep pass before listing
    #[arg(long)]
    pub sweep: bool,
}

pub struct OrdersCommand {
    args: OrdersArgs,
}

impl OrdersCommand {
    pub fn new(args: OrdersArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        let handle = registry.handle_for(account).await?;

        if self.args.sweep {
            let report = handle.sweep_now().await?;
            println!("{}", display::sweep_summary(&report));
        }

        let orders = handle.pending_orders().await?;
        if orders.is_empty() {
            println!("No pending orders.");
        } else {
            println!("{}", display::orders_table(&orders));
        }

        Ok(())
    }
}
