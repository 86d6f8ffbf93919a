//! Portfolio engine: trade execution, valuation, and metrics over one
//! account's ledger
//!
//! The engine owns its ledger exclusively. All callers go through the
//! per-account service actor in [`service`], which serializes every
//! operation, so the debit/position/transaction triple in a fill is
//! applied atomically with respect to any other caller.

pub mod registry;
pub mod service;

pub use registry::AccountRegistry;
pub use service::{spawn_portfolio_service, PortfolioHandle};

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::data_paths::DataPaths;
use crate::ledger::types::*;
use crate::ledger::{Ledger, LedgerStorage};
use crate::notify::{Category, FillEvent, NotificationSink, Priority};
use crate::oracle::MarketDataSource;

/// Outcome counts of one pending-order sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired orders purged from storage
    pub purged: usize,
    /// Orders filled against the live price
    pub filled: usize,
    /// Condition-met orders dropped because admission no longer passes
    pub dropped: usize,
}

/// Portfolio engine scoped to a single account
pub struct PortfolioEngine {
    username: String,
    ledger: Ledger,
    storage: LedgerStorage,
    oracle: Arc<dyn MarketDataSource>,
    sink: Arc<dyn NotificationSink>,
}

impl PortfolioEngine {
    /// Open an account's engine, loading its ledger or creating one with
    /// the starting cash deposit on first trade
    pub async fn open(
        username: &str,
        data_paths: &DataPaths,
        settings: &Settings,
        oracle: Arc<dyn MarketDataSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<Self> {
        let storage = LedgerStorage::new(data_paths, username);
        let ledger = match storage.load().await? {
            Some(ledger) => ledger,
            None => {
                let ledger = Ledger::new(settings.starting_cash, Utc::now());
                storage.save_state(&ledger).await?;
                info!(
                    username = %username,
                    starting_cash = %settings.starting_cash,
                    "Created new ledger"
                );
                ledger
            }
        };

        Ok(Self {
            username: username.to_string(),
            ledger,
            storage,
            oracle,
            sink,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn cash(&self) -> Decimal {
        self.ledger.cash()
    }

    pub fn positions(&self) -> HashMap<String, u64> {
        self.ledger.positions().clone()
    }

    /// All transactions, newest first
    pub fn transaction_history(&self) -> Vec<Transaction> {
        let mut transactions = self.ledger.transactions().to_vec();
        transactions.sort_by_key(|t| std::cmp::Reverse(t.timestamp));
        transactions
    }

    /// Unexpired pending orders
    pub fn pending_orders(&self) -> Vec<PendingOrder> {
        self.ledger.active_orders(Utc::now())
    }

    /// Total portfolio value: cash plus marked positions
    ///
    /// A symbol the oracle cannot price contributes zero, so valuation can
    /// transiently understate worth while the feed is degraded.
    pub async fn total_value(&self) -> Decimal {
        let mut total = self.ledger.cash();
        for (symbol, quantity) in self.ledger.positions() {
            match self.oracle.current_price(symbol).await {
                Ok(price) if price > Decimal::ZERO => {
                    total += price * Decimal::from(*quantity);
                }
                Ok(_) => {
                    warn!(symbol = %symbol, "Oracle returned non-positive price; valuing at zero");
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Price fetch failed; valuing at zero");
                }
            }
        }
        total
    }

    /// Portfolio metrics for display
    pub async fn metrics(&self) -> PortfolioMetrics {
        let total_value = self.total_value().await;
        let cash = self.ledger.cash();
        let initial = self.ledger.initial_deposit();

        let total_return_pct = if initial.is_zero() {
            Decimal::ZERO
        } else {
            (total_value - initial) / initial * Decimal::from(100)
        };

        let days_trading = self
            .ledger
            .first_transaction_at()
            .map(|first| (Utc::now() - first).num_days().max(1))
            .unwrap_or(1);

        PortfolioMetrics {
            total_value,
            cash,
            invested_value: total_value - cash,
            total_return_pct,
            daily_return_pct: total_return_pct / Decimal::from(days_trading),
            position_count: self.ledger.positions().len(),
            pending_order_count: self.pending_orders().len(),
        }
    }

    /// Submit a trade: market orders settle immediately, conditional
    /// orders queue after an admission check
    pub async fn execute_trade(
        &mut self,
        request: TradeRequest,
    ) -> Result<TradeOutcome, TradeError> {
        request.validate()?;

        if request.kind == OrderKind::Market {
            let price = self.live_price(&request.symbol).await?;
            let tx = self
                .fill(&request.symbol, request.quantity, request.side, price)
                .await?;
            return Ok(TradeOutcome::Filled(tx));
        }

        // Admission for buys without a limit needs the live quote; sells
        // and limit-priced buys are checked against ledger state alone.
        let reference = match (request.side, request.limit_price) {
            (Side::Buy, None) => self.live_price(&request.symbol).await?,
            _ => Decimal::ZERO,
        };
        self.ledger.admit(&request, reference)?;

        let order = self.ledger.queue_order(&request, Utc::now());
        self.persist_state().await;
        info!(
            username = %self.username,
            order_id = %order.id,
            symbol = %order.symbol,
            kind = %order.kind,
            validity = %order.validity,
            "Queued pending order"
        );

        Ok(TradeOutcome::Queued { order_id: order.id })
    }

    /// Cancel a pending order by id
    pub async fn cancel_order(&mut self, id: Uuid) -> Result<PendingOrder, TradeError> {
        let order = self
            .ledger
            .remove_order(id)
            .ok_or(TradeError::UnknownOrder(id))?;
        self.persist_state().await;
        info!(username = %self.username, order_id = %id, "Cancelled pending order");
        Ok(order)
    }

    /// One pending-order sweep pass: purge expired orders, then fill any
    /// order whose condition the latest oracle price satisfies
    ///
    /// Fills re-run the admission check through the normal buy/sell path;
    /// an order that no longer passes is dropped silently. A symbol the
    /// oracle cannot price is left untouched for the next pass.
    pub async fn sweep(&mut self) -> SweepReport {
        let now = Utc::now();
        let mut report = SweepReport {
            purged: self.ledger.purge_expired(now),
            ..Default::default()
        };

        let candidates = self.ledger.active_orders(now);
        let mut price_cache: HashMap<String, Option<Decimal>> = HashMap::new();

        for candidate in candidates {
            if !price_cache.contains_key(&candidate.symbol) {
                let quote = match self.oracle.current_price(&candidate.symbol).await {
                    Ok(price) if price > Decimal::ZERO => Some(price),
                    Ok(_) => None,
                    Err(e) => {
                        debug!(symbol = %candidate.symbol, error = %e, "Sweep price fetch failed");
                        None
                    }
                };
                price_cache.insert(candidate.symbol.clone(), quote);
            }
            let Some(price) = price_cache[&candidate.symbol] else {
                continue;
            };

            if !candidate.condition_met(price) {
                continue;
            }
            let Some(order) = self.ledger.remove_order(candidate.id) else {
                continue;
            };

            match self.fill(&order.symbol, order.quantity, order.side, price).await {
                Ok(_) => report.filled += 1,
                Err(e) => {
                    report.dropped += 1;
                    debug!(
                        order_id = %order.id,
                        error = %e,
                        "Dropped pending order that no longer passes admission"
                    );
                }
            }
        }

        if report.purged > 0 || report.dropped > 0 {
            self.persist_state().await;
        }
        if report != SweepReport::default() {
            info!(
                username = %self.username,
                purged = report.purged,
                filled = report.filled,
                dropped = report.dropped,
                "Pending-order sweep completed"
            );
        }
        report
    }

    /// Fetch a usable live price, mapping any degradation to a rejection
    async fn live_price(&self, symbol: &str) -> Result<Decimal, TradeError> {
        match self.oracle.current_price(symbol).await {
            Ok(price) if price > Decimal::ZERO => Ok(price),
            Ok(_) => Err(TradeError::PriceUnavailable {
                symbol: symbol.to_string(),
            }),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Live price fetch failed");
                Err(TradeError::PriceUnavailable {
                    symbol: symbol.to_string(),
                })
            }
        }
    }

    /// Apply a fill to the ledger, persist it, and emit the notification
    async fn fill(
        &mut self,
        symbol: &str,
        quantity: u64,
        side: Side,
        price: Decimal,
    ) -> Result<Transaction, TradeError> {
        let now = Utc::now();
        let tx = match side {
            Side::Buy => self.ledger.execute_buy(symbol, quantity, price, now)?,
            Side::Sell => self.ledger.execute_sell(symbol, quantity, price, now)?,
        };

        self.persist_state().await;
        if let Err(e) = self.storage.append_transaction(&tx).await {
            error!(username = %self.username, error = %e, "Failed to record transaction");
        }
        self.notify_fill(&tx);

        Ok(tx)
    }

    async fn persist_state(&self) {
        if let Err(e) = self.storage.save_state(&self.ledger).await {
            error!(username = %self.username, error = %e, "Failed to persist ledger state");
        }
    }

    /// Checkpoint the ledger into the hash-chained snapshot history
    pub async fn snapshot(&self) {
        if let Err(e) = self.storage.save_snapshot(&self.ledger).await {
            error!(username = %self.username, error = %e, "Failed to save ledger snapshot");
        }
    }

    /// Emit a fill event without waiting on delivery
    fn notify_fill(&self, tx: &Transaction) {
        let action = match tx.side {
            Side::Buy => "Bought",
            Side::Sell => "Sold",
        };
        let event = FillEvent {
            username: self.username.clone(),
            message: format!(
                "{} {} shares of {} at ${:.2}",
                action, tx.quantity, tx.symbol, tx.price
            ),
            category: Category::Trade,
            priority: Priority::Normal,
        };
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(event).await {
                warn!(error = %e, "Notification delivery failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingSink;
    use crate::oracle::StaticOracle;
    use rust_decimal_macros::dec;

    async fn engine_with(
        dir: &tempfile::TempDir,
        oracle: Arc<StaticOracle>,
    ) -> PortfolioEngine {
        let paths = DataPaths::new(dir.path());
        let settings = Settings::default();
        PortfolioEngine::open("alice", &paths, &settings, oracle, Arc::new(TracingSink))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_market_buy_and_sell_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        let outcome = engine
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::Filled(_)));
        assert_eq!(engine.cash(), dec!(98500));
        assert_eq!(engine.positions().get("X"), Some(&10));

        oracle.set_price("X", dec!(160));
        let outcome = engine
            .execute_trade(TradeRequest::market("X", 10, Side::Sell))
            .await
            .unwrap();
        let TradeOutcome::Filled(tx) = outcome else {
            panic!("expected fill");
        };
        assert_eq!(engine.cash(), dec!(100100));
        assert!(engine.positions().is_empty());
        assert_eq!(tx.entry_price, dec!(150));
    }

    #[tokio::test]
    async fn test_market_order_rejected_without_quote() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        let mut engine = engine_with(&dir, oracle).await;

        let err = engine
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::PriceUnavailable { .. }));
        assert_eq!(engine.cash(), dec!(100000));
    }

    #[tokio::test]
    async fn test_valuation_degrades_to_zero_on_feed_outage() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        engine
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap();
        assert_eq!(engine.total_value().await, dec!(100000));

        // Feed down for X: position contributes zero, cash remains
        oracle.clear_price("X");
        assert_eq!(engine.total_value().await, dec!(99000));
    }

    #[tokio::test]
    async fn test_valuation_is_idempotent_under_stable_prices() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(123.45));
        let mut engine = engine_with(&dir, oracle).await;

        engine
            .execute_trade(TradeRequest::market("X", 8, Side::Buy))
            .await
            .unwrap();
        let first = engine.total_value().await;
        let second = engine.total_value().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_conditional_order_queues_without_ledger_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle).await;

        let request = TradeRequest {
            kind: OrderKind::Limit,
            limit_price: Some(dec!(140)),
            validity: Validity::Gtc,
            ..TradeRequest::market("X", 10, Side::Buy)
        };
        let outcome = engine.execute_trade(request).await.unwrap();
        assert!(matches!(outcome, TradeOutcome::Queued { .. }));

        assert_eq!(engine.cash(), dec!(100000));
        assert!(engine.positions().is_empty());
        assert_eq!(engine.pending_orders().len(), 1);
        assert_eq!(engine.transaction_history().len(), 0);
    }

    #[tokio::test]
    async fn test_conditional_buy_admission_rejects_oversized_orders() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle).await;

        let request = TradeRequest {
            kind: OrderKind::Limit,
            limit_price: Some(dec!(150)),
            ..TradeRequest::market("X", 1000, Side::Buy)
        };
        let err = engine.execute_trade(request).await.unwrap_err();
        assert!(matches!(err, TradeError::InsufficientCash { .. }));
        assert!(engine.pending_orders().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_fills_limit_buy_when_price_crosses() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        let request = TradeRequest {
            kind: OrderKind::Limit,
            limit_price: Some(dec!(140)),
            validity: Validity::Gtc,
            ..TradeRequest::market("X", 10, Side::Buy)
        };
        engine.execute_trade(request).await.unwrap();

        // Price still above the limit: nothing happens
        let report = engine.sweep().await;
        assert_eq!(report, SweepReport::default());
        assert_eq!(engine.pending_orders().len(), 1);

        // Price crosses: the order fills at the live price
        oracle.set_price("X", dec!(138));
        let report = engine.sweep().await;
        assert_eq!(report.filled, 1);
        assert_eq!(engine.positions().get("X"), Some(&10));
        assert_eq!(engine.cash(), dec!(100000) - dec!(1380));
        assert!(engine.pending_orders().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_fills_stop_loss_sell() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        engine
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap();

        let request = TradeRequest {
            kind: OrderKind::StopLoss,
            trigger_price: Some(dec!(90)),
            validity: Validity::Gtc,
            ..TradeRequest::market("X", 10, Side::Sell)
        };
        engine.execute_trade(request).await.unwrap();

        oracle.set_price("X", dec!(85));
        let report = engine.sweep().await;
        assert_eq!(report.filled, 1);
        assert!(engine.positions().is_empty());
        // 100,000 - 10*100 + 10*85
        assert_eq!(engine.cash(), dec!(99850));
    }

    #[tokio::test]
    async fn test_sweep_drops_orders_failing_readmission() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        engine
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap();

        // Queue a stop-loss for the full position, then sell it away
        let request = TradeRequest {
            kind: OrderKind::StopLoss,
            trigger_price: Some(dec!(90)),
            validity: Validity::Gtc,
            ..TradeRequest::market("X", 10, Side::Sell)
        };
        engine.execute_trade(request).await.unwrap();
        engine
            .execute_trade(TradeRequest::market("X", 10, Side::Sell))
            .await
            .unwrap();

        oracle.set_price("X", dec!(85));
        let report = engine.sweep().await;
        assert_eq!(report.filled, 0);
        assert_eq!(report.dropped, 1);
        assert!(engine.pending_orders().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_purges_expired_day_orders() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle.clone()).await;

        let request = TradeRequest {
            kind: OrderKind::Limit,
            limit_price: Some(dec!(140)),
            validity: Validity::Day,
            ..TradeRequest::market("X", 10, Side::Buy)
        };
        // Queue with a creation time two days back so the Day expiry has passed
        engine
            .ledger
            .queue_order(&request, Utc::now() - chrono::Duration::days(2));

        assert!(engine.pending_orders().is_empty());
        assert_eq!(engine.ledger.pending_orders().len(), 1);

        let report = engine.sweep().await;
        assert_eq!(report.purged, 1);
        assert!(engine.ledger.pending_orders().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_shape() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(110));
        let mut engine = engine_with(&dir, oracle).await;

        engine
            .execute_trade(TradeRequest::market("X", 100, Side::Buy))
            .await
            .unwrap();

        let metrics = engine.metrics().await;
        // 89,000 cash + 100 * 110
        assert_eq!(metrics.total_value, dec!(100000));
        assert_eq!(metrics.cash, dec!(89000));
        assert_eq!(metrics.invested_value, dec!(11000));
        assert_eq!(metrics.total_return_pct, Decimal::ZERO);
        assert_eq!(metrics.daily_return_pct, Decimal::ZERO);
        assert_eq!(metrics.position_count, 1);
        assert_eq!(metrics.pending_order_count, 0);
    }

    #[tokio::test]
    async fn test_cancel_order() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));
        let mut engine = engine_with(&dir, oracle).await;

        let request = TradeRequest {
            kind: OrderKind::Limit,
            limit_price: Some(dec!(140)),
            validity: Validity::Gtc,
            ..TradeRequest::market("X", 10, Side::Buy)
        };
        let TradeOutcome::Queued { order_id } = engine.execute_trade(request).await.unwrap()
        else {
            panic!("expected queued order");
        };

        engine.cancel_order(order_id).await.unwrap();
        assert!(engine.pending_orders().is_empty());

        let err = engine.cancel_order(order_id).await.unwrap_err();
        assert_eq!(err, TradeError::UnknownOrder(order_id));
    }

    #[tokio::test]
    async fn test_ledger_survives_engine_restart() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(150));

        {
            let mut engine = engine_with(&dir, oracle.clone()).await;
            engine
                .execute_trade(TradeRequest::market("X", 10, Side::Buy))
                .await
                .unwrap();
        }

        let engine = engine_with(&dir, oracle).await;
        assert_eq!(engine.cash(), dec!(98500));
        assert_eq!(engine.positions().get("X"), Some(&10));
        assert_eq!(engine.transaction_history().len(), 1);
    }
}
