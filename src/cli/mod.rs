//! CLI module for papertrade
//!
//! Command-line interface over the portfolio engine. Uses clap for
//! argument parsing and a structured command pattern: one module per
//! subcommand, each with an Args struct and a Command struct.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod args;
pub mod commands;

use crate::config::Settings;
use crate::data_paths::{DataPaths, DEFAULT_DATA_DIR};
use crate::engine::AccountRegistry;
use crate::notify::TracingSink;
use crate::oracle::{MarketDataSource, StaticOracle, YahooOracle};

use commands::buy::{BuyArgs, BuyCommand};
use commands::cancel::{CancelArgs, CancelCommand};
use commands::delete_account::{DeleteAccountArgs, DeleteAccountCommand};
use commands::history::{HistoryArgs, HistoryCommand};
use commands::orders::{OrdersArgs, OrdersCommand};
use commands::portfolio::{PortfolioArgs, PortfolioCommand};
use commands::quote::{QuoteArgs, QuoteCommand};
use commands::sell::{SellArgs, SellCommand};

#[derive(Parser)]
#[command(name = "papertrade")]
#[command(version)]
#[command(about = "Paper-trading portfolio ledger and order-execution engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Account username (resolved by the identity layer; required for
    /// portfolio commands)
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Data directory path (default: ./data)
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Settings file path (default: ./papertrade.yaml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Place a buy order
    Buy(BuyArgs),

    /// Place a sell order
    Sell(SellArgs),

    /// Show portfolio metrics and positions
    Portfolio(PortfolioArgs),

    /// Show transaction history
    History(HistoryArgs),

    /// List pending orders
    Orders(OrdersArgs),

    /// Cancel a pending order
    Cancel(CancelArgs),

    /// Look up a quote and instrument info
    Quote(QuoteArgs),

    /// Delete an account and erase its ledger
    DeleteAccount(DeleteAccountArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let data_paths = DataPaths::new(&self.data_dir);
        data_paths.ensure_directories()?;

        let settings = Settings::load(self.settings.as_deref())?;
        let oracle: Arc<dyn MarketDataSource> = if settings.oracle.base_url == "static" {
            Arc::new(StaticOracle::new())
        } else {
            Arc::new(YahooOracle::new(&settings.oracle)?)
        };
        let registry = AccountRegistry::new(
            data_paths.clone(),
            settings.clone(),
            Arc::clone(&oracle),
            Arc::new(TracingSink),
        );

        match self.command {
            Commands::Buy(args) => {
                BuyCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::Sell(args) => {
                SellCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::Portfolio(args) => {
                PortfolioCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::History(args) => {
                HistoryCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::Orders(args) => {
                OrdersCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::Cancel(args) => {
                CancelCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
            Commands::Quote(args) => QuoteCommand::new(args).execute(oracle.as_ref()).await,
            Commands::DeleteAccount(args) => {
                DeleteAccountCommand::new(args)
                    .execute(&registry, require_account(&self.account)?)
                    .await
            }
        }
    }
}

fn require_account(account: &Option<String>) -> Result<&str> {
    account
        .as_deref()
        .ok_or_else(|| anyhow!("--account is required for this command"))
}
