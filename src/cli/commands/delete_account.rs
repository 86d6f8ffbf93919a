use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::warn;

use crate::engine::AccountRegistry;

#[derive(Args, Clone)]
pub struct DeleteAccountArgs {
    /// Confirm deletion (required)
    #[arg(long)]
    pub yes: bool,
}

pub struct DeleteAccountCommand {
    args: DeleteAccountArgs,
}

impl DeleteAccountCommand {
    pub fn new(args: DeleteAccountArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, registry: &AccountRegistry, account: &str) -> Result<()> {
        if !self.args.yes {
            warn!("⚠️  Account deletion erases the ledger permanently. Use --yes to confirm.");
            return Ok(());
        }

        if registry.delete_account(account).await? {
            println!("{} Deleted account {}", "✅".bright_green(), account.bright_yellow());
        } else {
            println!("No stored ledger for account {}", account);
        }

        Ok(())
    }
}
