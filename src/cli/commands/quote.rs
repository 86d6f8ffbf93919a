use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::display;
use crate::oracle::MarketDataSource;

#[derive(Args, Clone)]
pub struct QuoteArgs {
    /// Stock symbol (e.g. AAPL)
    pub symbol: String,

    /// Also show a historical series for this period (e.g. 1mo, 1y)
    #[arg(long)]
    pub period: Option<String>,
}

pub struct QuoteCommand {
    args: QuoteArgs,
}

impl QuoteCommand {
    pub fn new(args: QuoteArgs) -> Self {
        Self { args }
    }

    pub async fn execute(&self, oracle: &dyn MarketDataSource) -> Result<()> {
        let symbol = self.args.symbol.to_uppercase();

        match oracle.instrument_info(&symbol).await {
            Ok(info) => println!("{}", display::instrument_table(&info)),
            Err(e) => println!("{} No quote for {}: {}", "❌".bright_red(), symbol, e),
        }

        if let Some(period) = &self.args.period {
            // Feed errors degrade to an empty series here, matching the
            // engine's read-only surfaces
            let bars = oracle
                .historical_bars(&symbol, period)
                .await
                .unwrap_or_default();
            if bars.is_empty() {
                println!("No historical data for period {}", period);
            } else {
                println!("{}", display::bars_table(&bars));
            }
        }

        Ok(())
    }
}
