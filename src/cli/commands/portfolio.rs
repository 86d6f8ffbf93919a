use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::display;
use crate::engine::AccountRegistry;

#[derive(Args, Clone)]
pub struct PortfolioArgs {
    /// Show positions only, without metrics
    #[arg(long)]
    pub positions_only: bool,
}

pub struct PortfolioCommand {
    args: PortfolioArgs,
}

impl PortfolioCommand {
    pub fn new(args: PortfolioArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        let handle = registry.handle_for(account).await?;

        let positions = handle.positions().await?;

        if self.args.positions_only {
            let value = handle.portfolio_value().await?;
            println!("Portfolio value: ${:.2}", value);
        } else {
            let metrics = handle.metrics().await?;
            println!("\n{}", format!("Portfolio for {}", account).bright_white());
            println!("{}", display::metrics_table(&metrics));
        }

        if positions.is_empty() {
            println!("No open positions.");
        } else {
            println!("{}", display::positions_table(&positions));
        }

        Ok(())
    }
}
