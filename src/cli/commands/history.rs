use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::display;
use crate::engine::AccountRegistry;

#[derive(Args, Clone)]
pub struct HistoryArgs {
    /// Show only the most recent N transactions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Export the full history to a CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

pub struct HistoryCommand {
    args: HistoryArgs,
}

impl HistoryCommand {
    pub fn new(args: HistoryArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        let handle = registry.handle_for(account).await?;
        let transactions = handle.transaction_history().await?;

        if let Some(path) = &self.args.export {
            let mut writer = csv::Writer::from_path(path)
                .context(format!("Failed to create CSV file: {:?}", path))?;
            writer.write_record(["timestamp", "side", "symbol", "quantity", "price", "entry_price"])?;
            for tx in &transactions {
                writer.write_record([
                    tx.timestamp.to_rfc3339(),
                    tx.side.to_string(),
                    tx.symbol.clone(),
                    tx.quantity.to_string(),
                    tx.price.to_string(),
                    tx.entry_price.to_string(),
                ])?;
            }
            writer.flush()?;
            println!("Exported {} transactions to {:?}", transactions.len(), path);
            return Ok(());
        }

        if transactions.is_empty() {
            println!("No transactions yet.");
            return Ok(());
        }

        let shown = match self.args.limit {
            Some(limit) => &transactions[..transactions.len().min(limit)],
            None => &transactions[..],
        };
        println!("{}", display::history_table(shown));

        Ok(())
    }
}
