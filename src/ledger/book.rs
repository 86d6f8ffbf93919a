//! The per-account ledger: cash, positions, transaction log, pending orders
//!
//! All mutation goes through the execute/queue/cancel methods here, which
//! enforce the ledger invariants before touching state: cash never goes
//! negative, positions never go negative, and a zero position is removed
//! from the map entirely. The surrounding engine guarantees exclusive
//! access, so these methods can treat each call as atomic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::types::*;

/// Aggregate ledger state for one account
#[derive(Debug, Clone)]
pub struct Ledger {
    cash: Decimal,
    initial_deposit: Decimal,
    created_at: DateTime<Utc>,
    positions: HashMap<String, u64>,
    transactions: Vec<Transaction>,
    pending_orders: Vec<PendingOrder>,
}

impl Ledger {
    /// Create a fresh ledger with the starting cash deposit
    pub fn new(starting_cash: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            cash: starting_cash,
            initial_deposit: starting_cash,
            created_at: now,
            positions: HashMap::new(),
            transactions: Vec::new(),
            pending_orders: Vec::new(),
        }
    }

    /// Rebuild a ledger from stored parts
    pub fn from_parts(
        cash: Decimal,
        initial_deposit: Decimal,
        created_at: DateTime<Utc>,
        positions: HashMap<String, u64>,
        transactions: Vec<Transaction>,
        pending_orders: Vec<PendingOrder>,
    ) -> Self {
        Self {
            cash,
            initial_deposit,
            created_at,
            positions,
            transactions,
            pending_orders,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_deposit(&self) -> Decimal {
        self.initial_deposit
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn positions(&self) -> &HashMap<String, u64> {
        &self.positions
    }

    /// Shares held for a symbol; an absent symbol counts as zero
    pub fn held(&self, symbol: &str) -> u64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    /// Transaction log in insertion order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// All pending orders, including any past expiry that a sweep has not
    /// yet purged
    pub fn pending_orders(&self) -> &[PendingOrder] {
        &self.pending_orders
    }

    /// Timestamp of the earliest transaction, if any
    pub fn first_transaction_at(&self) -> Option<DateTime<Utc>> {
        self.transactions.iter().map(|t| t.timestamp).min()
    }

    /// Blended average entry price: the volume-weighted average of all
    /// prior buy transactions for the symbol
    ///
    /// This is a single running cost basis, not FIFO/LIFO lot tracking,
    /// and it spans periods where the position went flat.
    pub fn entry_price(&self, symbol: &str) -> Decimal {
        let mut total_cost = Decimal::ZERO;
        let mut total_quantity: u64 = 0;
        for tx in self.transactions.iter().filter(|t| t.symbol == symbol && t.side == Side::Buy) {
            total_cost += tx.price * Decimal::from(tx.quantity);
            total_quantity += tx.quantity;
        }
        if total_quantity == 0 {
            Decimal::ZERO
        } else {
            total_cost / Decimal::from(total_quantity)
        }
    }

    /// Settle a buy at the given fill price
    ///
    /// Debits cash, increments the position, and appends the transaction
    /// as one step. On rejection nothing changes.
    pub fn execute_buy(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Transaction, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        let cost = price * Decimal::from(quantity);
        if cost > self.cash {
            return Err(TradeError::InsufficientCash {
                needed: cost,
                available: self.cash,
            });
        }

        self.cash -= cost;
        *self.positions.entry(symbol.to_string()).or_insert(0) += quantity;

        let tx = Transaction {
            timestamp: now,
            symbol: symbol.to_string(),
            side: Side::Buy,
            quantity,
            price,
            entry_price: price,
        };
        self.transactions.push(tx.clone());

        debug_assert!(self.cash >= Decimal::ZERO);
        Ok(tx)
    }

    /// Settle a sell at the given fill price
    ///
    /// Credits cash, decrements the position (removing it at zero), and
    /// appends the transaction with the blended entry price at time of
    /// sale. On rejection nothing changes.
    pub fn execute_sell(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Transaction, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        let held = self.held(symbol);
        if held < quantity {
            return Err(TradeError::InsufficientShares {
                symbol: symbol.to_string(),
                requested: quantity,
                held,
            });
        }

        let entry_price = self.entry_price(symbol);

        self.cash += price * Decimal::from(quantity);
        let remaining = held - quantity;
        if remaining == 0 {
            self.positions.remove(symbol);
        } else {
            self.positions.insert(symbol.to_string(), remaining);
        }

        let tx = Transaction {
            timestamp: now,
            symbol: symbol.to_string(),
            side: Side::Sell,
            quantity,
            price,
            entry_price,
        };
        self.transactions.push(tx.clone());

        Ok(tx)
    }

    /// Admission check for a conditional order
    ///
    /// Point-in-time only: buys must be coverable at the limit price (or
    /// the live price when no limit is set), sells must be covered by the
    /// current position. Fill-time re-validation still happens in
    /// execute_buy/execute_sell.
    pub fn admit(&self, request: &TradeRequest, live_price: Decimal) -> Result<(), TradeError> {
        match request.side {
            Side::Buy => {
                let reference = request.limit_price.unwrap_or(live_price);
                let needed = reference * Decimal::from(request.quantity);
                if needed > self.cash {
                    return Err(TradeError::InsufficientCash {
                        needed,
                        available: self.cash,
                    });
                }
            }
            Side::Sell => {
                let held = self.held(&request.symbol);
                if held < request.quantity {
                    return Err(TradeError::InsufficientShares {
                        symbol: request.symbol.clone(),
                        requested: request.quantity,
                        held,
                    });
                }
            }
        }
        Ok(())
    }

    /// Queue a conditional order that already passed admission
    pub fn queue_order(&mut self, request: &TradeRequest, now: DateTime<Utc>) -> PendingOrder {
        let expires_at = match request.validity {
            Validity::Day => Some(end_of_day(now)),
            Validity::Gtc => None,
        };
        let order = PendingOrder {
            id: Uuid::new_v4(),
            symbol: request.symbol.clone(),
            quantity: request.quantity,
            side: request.side,
            kind: request.kind,
            limit_price: request.limit_price,
            trigger_price: request.trigger_price,
            validity: request.validity,
            created_at: now,
            expires_at,
        };
        self.pending_orders.push(order.clone());
        order
    }

    /// Pending orders still in force: expiry is unset or in the future
    ///
    /// Expired orders are filtered, not deleted; purging is the sweep's job.
    pub fn active_orders(&self, now: DateTime<Utc>) -> Vec<PendingOrder> {
        self.pending_orders
            .iter()
            .filter(|o| !o.is_expired(now))
            .cloned()
            .collect()
    }

    /// Remove and return a pending order by id
    pub fn remove_order(&mut self, id: Uuid) -> Option<PendingOrder> {
        let idx = self.pending_orders.iter().position(|o| o.id == id)?;
        Some(self.pending_orders.remove(idx))
    }

    /// Drop all expired orders, returning how many were purged
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending_orders.len();
        self.pending_orders.retain(|o| !o.is_expired(now));
        let purged = before - self.pending_orders.len();
        if purged > 0 {
            debug!(purged, "Purged expired pending orders");
        }
        purged
    }
}
