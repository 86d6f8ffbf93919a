use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod data_paths;
mod display;
mod engine;
mod ledger;
mod logging;
mod notify;
mod oracle;

use data_paths::DataPaths;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();

    // Verbose flag widens the default filter; RUST_LOG still wins
    if cli.verbose > 0 && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "debug");
    }
    logging::init_logging(logging::LoggingConfig::new(
        logging::LogMode::ConsoleAndFile,
        DataPaths::new(&cli.data_dir),
    ))?;

    // Execute with error handling
    match cli.execute().await {
        Ok(()) => {
            logging::log_session_end();
            Ok(())
        }
        Err(e) => {
            tracing::error!("Application error: {}", e);

            // Log error chain if available
            let mut source = e.source();
            while let Some(err) = source {
                tracing::error!("   Caused by: {}", err);
                source = err.source();
            }

            logging::log_session_end();
            Err(e)
        }
    }
}
