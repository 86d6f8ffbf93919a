//! Account registry: one portfolio service per account
//!
//! The registry owns the mapping from username to running service handle
//! and is the only place services are spawned, which keeps the
//! one-actor-per-account discipline intact. It is also the account
//! deletion entry point: deletion stops the actor before erasing storage
//! so no write can land after the erase.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Settings;
use crate::data_paths::DataPaths;
use crate::ledger::LedgerStorage;
use crate::notify::NotificationSink;
use crate::oracle::MarketDataSource;

use super::service::{spawn_portfolio_service, PortfolioHandle};

/// Registry of running portfolio services
pub struct AccountRegistry {
    data_paths: DataPaths,
    settings: Settings,
    oracle: Arc<dyn MarketDataSource>,
    sink: Arc<dyn NotificationSink>,
    handles: DashMap<String, PortfolioHandle>,
    /// Serializes spawns so two callers can't race one account into
    /// two actors
    spawn_lock: Mutex<()>,
}

impl AccountRegistry {
    pub fn new(
        data_paths: DataPaths,
        settings: Settings,
        oracle: Arc<dyn MarketDataSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            data_paths,
            settings,
            oracle,
            sink,
            handles: DashMap::new(),
            spawn_lock: Mutex::new(()),
        }
    }

    /// Get the handle for an account, spawning its service on first use
    ///
    /// A first use with no stored ledger creates one with the starting
    /// cash deposit.
    pub async fn handle_for(&self, username: &str) -> Result<PortfolioHandle> {
        if let Some(handle) = self.handles.get(username) {
            return Ok(handle.clone());
        }

        let _guard = self.spawn_lock.lock().await;
        // Re-check under the lock; another caller may have won the spawn
        if let Some(handle) = self.handles.get(username) {
            return Ok(handle.clone());
        }

        let handle = spawn_portfolio_service(
            username,
            &self.data_paths,
            &self.settings,
            Arc::clone(&self.oracle),
            Arc::clone(&self.sink),
        )
        .await?;
        self.handles.insert(username.to_string(), handle.clone());
        Ok(handle)
    }

    /// Delete an account: stop its service and erase its ledger storage
    ///
    /// Returns whether any stored ledger existed. The ledger itself is
    /// never destroyed by trading operations; this is the external
    /// collaborator's deletion path.
    pub async fn delete_account(&self, username: &str) -> Result<bool> {
        if let Some((_, handle)) = self.handles.remove(username) {
            // A failed shutdown send just means the actor is already gone
            let _ = handle.shutdown().await;
        }

        let storage = LedgerStorage::new(&self.data_paths, username);
        let erased = storage.erase().await?;
        if erased {
            info!(username = %username, "Deleted account");
        }
        Ok(erased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{Side, TradeRequest};
    use crate::notify::TracingSink;
    use crate::oracle::StaticOracle;
    use rust_decimal_macros::dec;

    fn registry_in(dir: &tempfile::TempDir, oracle: Arc<StaticOracle>) -> AccountRegistry {
        AccountRegistry::new(
            DataPaths::new(dir.path()),
            Settings::default(),
            oracle,
            Arc::new(TracingSink),
        )
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let registry = registry_in(&dir, oracle);

        let alice = registry.handle_for("alice").await.unwrap();
        let bob = registry.handle_for("bob").await.unwrap();

        alice
            .execute_trade(TradeRequest::market("X", 10, Side::Buy))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(alice.cash().await.unwrap(), dec!(99000));
        assert_eq!(bob.cash().await.unwrap(), dec!(100000));
        assert!(bob.positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_for_reuses_running_service() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let registry = registry_in(&dir, oracle);

        let first = registry.handle_for("alice").await.unwrap();
        first
            .execute_trade(TradeRequest::market("X", 1, Side::Buy))
            .await
            .unwrap()
            .unwrap();

        // Second lookup talks to the same actor and sees its state
        let second = registry.handle_for("alice").await.unwrap();
        assert_eq!(second.cash().await.unwrap(), dec!(99900));
    }

    #[tokio::test]
    async fn test_delete_account_erases_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(StaticOracle::new());
        oracle.set_price("X", dec!(100));
        let registry = registry_in(&dir, oracle);

        let handle = registry.handle_for("alice").await.unwrap();
        handle
            .execute_trade(TradeRequest::market("X", 1, Side::Buy))
            .await
            .unwrap()
            .unwrap();

        assert!(registry.delete_account("alice").await.unwrap());

        // A fresh handle starts over with the initial deposit
        let handle = registry.handle_for("alice").await.unwrap();
        assert_eq!(handle.cash().await.unwrap(), dec!(100000));
        assert!(handle.positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_account_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir, Arc::new(StaticOracle::new()));
        assert!(!registry.delete_account("nobody").await.unwrap());
    }
}
