//! Portfolio service actor with channel-based communication
//!
//! One actor task runs per account. Every operation, mutations and reads
//! alike, arrives as a command over an mpsc channel and is answered over
//! a oneshot channel, so at most one operation touches the ledger at a
//! time and every caller sees a fully-applied state. The pending-order
//! sweep ticks inside the same loop and therefore can never race a
//! user-initiated trade.

use anyhow::Result;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration};
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;
use crate::data_paths::DataPaths;
use crate::ledger::types::*;
use crate::notify::NotificationSink;
use crate::oracle::MarketDataSource;

use super::{PortfolioEngine, SweepReport};

/// Portfolio service commands
#[derive(Debug)]
pub enum PortfolioCommand {
    // Trading operations
    Trade {
        request: TradeRequest,
        response: oneshot::Sender<Result<TradeOutcome, TradeError>>,
    },
    Cancel {
        order_id: Uuid,
        response: oneshot::Sender<Result<PendingOrder, TradeError>>,
    },

    // Query operations
    GetPositions {
        response: oneshot::Sender<HashMap<String, u64>>,
    },
    GetCash {
        response: oneshot::Sender<Decimal>,
    },
    GetValue {
        response: oneshot::Sender<Decimal>,
    },
    GetMetrics {
        response: oneshot::Sender<PortfolioMetrics>,
    },
    GetHistory {
        response: oneshot::Sender<Vec<Transaction>>,
    },
    GetPendingOrders {
        response: oneshot::Sender<Vec<PendingOrder>>,
    },

    // Maintenance operations
    Sweep {
        response: oneshot::Sender<SweepReport>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// Portfolio service actor
pub struct PortfolioService {
    engine: PortfolioEngine,
    command_rx: mpsc::Receiver<PortfolioCommand>,
    sweep_interval_secs: u64,
}

impl PortfolioService {
    /// Run the service loop until the channel closes or Shutdown arrives
    pub async fn run(mut self) {
        info!(username = %self.engine.username(), "Starting portfolio service");

        let mut sweep_timer = interval(Duration::from_secs(self.sweep_interval_secs.max(1)));
        // The first tick fires immediately; skip it so startup isn't a sweep
        sweep_timer.tick().await;

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(PortfolioCommand::Shutdown { response }) => {
                            self.engine.snapshot().await;
                            let _ = response.send(());
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }

                _ = sweep_timer.tick() => {
                    self.engine.sweep().await;
                }
            }
        }

        info!(username = %self.engine.username(), "Portfolio service stopped");
    }

    async fn handle_command(&mut self, command: PortfolioCommand) {
        match command {
            PortfolioCommand::Trade { request, response } => {
                let result = self.engine.execute_trade(request).await;
                let _ = response.send(result);
            }
            PortfolioCommand::Cancel { order_id, response } => {
                let result = self.engine.cancel_order(order_id).await;
                let _ = response.send(result);
            }
            PortfolioCommand::GetPositions { response } => {
                let _ = response.send(self.engine.positions());
            }
            PortfolioCommand::GetCash { response } => {
                let _ = response.send(self.engine.cash());
            }
            PortfolioCommand::GetValue { response } => {
                let _ = response.send(self.engine.total_value().await);
            }
            PortfolioCommand::GetMetrics { response } => {
                let _ = response.send(self.engine.metrics().await);
            }
            PortfolioCommand::GetHistory { response } => {
                let _ = response.send(self.engine.transaction_history());
            }
            PortfolioCommand::GetPendingOrders { response } => {
                let _ = response.send(self.engine.pending_orders());
            }
            PortfolioCommand::Sweep { response } => {
                let _ = response.send(self.engine.sweep().await);
            }
            PortfolioCommand::Shutdown { .. } => unreachable!("handled in run loop"),
        }
    }
}

/// Cloneable handle for sending commands to a portfolio service
#[derive(Clone)]
pub struct PortfolioHandle {
    command_tx: mpsc::Sender<PortfolioCommand>,
}

impl PortfolioHandle {
    /// Submit a trade request
    pub async fn execute_trade(
        &self,
        request: TradeRequest,
    ) -> Result<Result<TradeOutcome, TradeError>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::Trade {
                request,
                response: tx,
            })
            .await?;
        Ok(rx.await?)
    }

    /// Cancel a pending order
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Result<PendingOrder, TradeError>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::Cancel {
                order_id,
                response: tx,
            })
            .await?;
        Ok(rx.await?)
    }

    /// Get current positions
    pub async fn positions(&self) -> Result<HashMap<String, u64>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetPositions { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Get available cash
    pub async fn cash(&self) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetCash { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Get total portfolio value
    pub async fn portfolio_value(&self) -> Result<Decimal> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetValue { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Get portfolio metrics
    pub async fn metrics(&self) -> Result<PortfolioMetrics> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetMetrics { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Get transaction history, newest first
    pub async fn transaction_history(&self) -> Result<Vec<Transaction>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetHistory { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Get unexpired pending orders
    pub async fn pending_orders(&self) -> Result<Vec<PendingOrder>> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::GetPendingOrders { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Run a sweep pass now instead of waiting for the timer
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::Sweep { response: tx })
            .await?;
        Ok(rx.await?)
    }

    /// Stop the service loop, waiting for in-flight work to finish
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(PortfolioCommand::Shutdown { response: tx })
            .await?;
        Ok(rx.await?)
    }
}

/// Open an account's engine and spawn its service, returning the handle
pub async fn spawn_portfolio_service(
    username: &str,
    data_paths: &DataPaths,
    settings: &Settings,
    oracle: Arc<dyn MarketDataSource>,
    sink: Arc<dyn NotificationSink>,
) -> Result<PortfolioHandle> {
    let engine = PortfolioEngine::open(username, data_paths, settings, oracle, sink).await?;

    let (command_tx, command_rx) = mpsc::channel(100);
    let service = PortfolioService {
        engine,
        command_rx,
        sweep_interval_secs: settings.sweep_interval_secs,
    };

    tokio::spawn(service.run());

    Ok(PortfolioHandle { command_tx })
}
