//! Ledger storage and persistence layer
//!
//! Stores ledger state in: data/accounts/<username>/
//! - ledger.json - Cash, positions, and account metadata
//! - orders/pending.json - Pending conditional orders
//! - transactions/YYYY-MM-DD.json - Daily transaction history
//! - snapshots/YYYY-MM-DD-HH-MM-SS.json - Full hash-chained snapshots
//!
//! The owning engine serializes all writes, so files are written whole
//! without any in-file locking.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::data_paths::DataPaths;

use super::book::Ledger;
use super::types::{PendingOrder, Transaction};

/// Ledger storage manager for one account
#[derive(Clone)]
pub struct LedgerStorage {
    /// Base directory for account data
    account_dir: PathBuf,
    /// Account username
    username: String,
}

/// Persisted cash/position state plus account metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub initial_deposit: Decimal,
    pub cash: Decimal,
    pub positions: HashMap<String, u64>,
    pub last_updated: DateTime<Utc>,
}

/// Full ledger snapshot at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub cash: Decimal,
    pub positions: HashMap<String, u64>,
    pub pending_orders: Vec<PendingOrder>,
    pub transaction_count: usize,
    pub metadata: SnapshotMetadata,
}

/// Snapshot metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Snapshot format version
    pub version: String,
    /// Previous snapshot filename if one exists
    pub previous_snapshot: Option<String>,
    /// Hash of the previous snapshot for integrity
    pub previous_hash: Option<String>,
}

impl LedgerStorage {
    /// Create a new ledger storage manager
    pub fn new(data_paths: &DataPaths, username: &str) -> Self {
        Self {
            account_dir: data_paths.account(username),
            username: username.to_string(),
        }
    }

    /// Whether this account has any stored ledger
    pub fn exists(&self) -> bool {
        self.account_dir.join("ledger.json").exists()
    }

    /// Initialize storage directories
    pub async fn init_directories(&self) -> Result<()> {
        let dirs = [
            self.account_dir.join("transactions"),
            self.account_dir.join("orders"),
            self.account_dir.join("snapshots"),
        ];

        for dir in &dirs {
            fs::create_dir_all(dir)
                .await
                .context(format!("Failed to create directory: {:?}", dir))?;
        }

        Ok(())
    }

    /// Persist cash, positions, and pending orders
    pub async fn save_state(&self, ledger: &Ledger) -> Result<()> {
        self.init_directories().await?;

        let state = LedgerFile {
            username: self.username.clone(),
            created_at: ledger.created_at(),
            initial_deposit: ledger.initial_deposit(),
            cash: ledger.cash(),
            positions: ledger.positions().clone(),
            last_updated: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&state)?;
        fs::write(self.account_dir.join("ledger.json"), json)
            .await
            .context("Failed to write ledger state")?;

        let orders_json = serde_json::to_string_pretty(ledger.pending_orders())?;
        fs::write(self.account_dir.join("orders").join("pending.json"), orders_json)
            .await
            .context("Failed to write pending orders")?;

        Ok(())
    }

    /// Append a transaction to its day's history file
    pub async fn append_transaction(&self, tx: &Transaction) -> Result<()> {
        self.init_directories().await?;

        let date = tx.timestamp.format("%Y-%m-%d").to_string();
        let filepath = self
            .account_dir
            .join("transactions")
            .join(format!("{}.json", date));

        let mut transactions: Vec<Transaction> = if filepath.exists() {
            let content = fs::read_to_string(&filepath).await?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Vec::new()
        };

        transactions.push(tx.clone());

        let json = serde_json::to_string_pretty(&transactions)?;
        fs::write(&filepath, json).await?;

        Ok(())
    }

    /// Load the full ledger from storage
    ///
    /// Returns None when the account has never traded.
    pub async fn load(&self) -> Result<Option<Ledger>> {
        let state_path = self.account_dir.join("ledger.json");
        if !state_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&state_path)
            .await
            .context("Failed to read ledger state")?;
        let state: LedgerFile =
            serde_json::from_str(&content).context("Failed to parse ledger state")?;

        let transactions = self.load_transactions().await?;

        let orders_path = self.account_dir.join("orders").join("pending.json");
        let pending_orders: Vec<PendingOrder> = if orders_path.exists() {
            let content = fs::read_to_string(&orders_path).await?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Vec::new()
        };

        info!(
            username = %self.username,
            transactions = transactions.len(),
            pending_orders = pending_orders.len(),
            "Loaded ledger from storage"
        );

        Ok(Some(Ledger::from_parts(
            state.cash,
            state.initial_deposit,
            state.created_at,
            state.positions,
            transactions,
            pending_orders,
        )))
    }

    /// Load all transactions across daily files, oldest first
    pub async fn load_transactions(&self) -> Result<Vec<Transaction>> {
        let tx_dir = self.account_dir.join("transactions");
        let mut all_transactions = Vec::new();

        if !tx_dir.exists() {
            return Ok(all_transactions);
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&tx_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }
        // Daily files are named YYYY-MM-DD.json, so name order is date order
        files.sort();

        for path in files {
            match fs::read_to_string(&path).await {
                Ok(content) => {
                    if let Ok(transactions) = serde_json::from_str::<Vec<Transaction>>(&content) {
                        all_transactions.extend(transactions);
                    } else {
                        warn!("Failed to parse transaction file: {:?}", path);
                    }
                }
                Err(e) => warn!("Failed to load transactions from {:?}: {}", path, e),
            }
        }

        Ok(all_transactions)
    }

    /// Save a full snapshot, chained to the previous one by hash
    pub async fn save_snapshot(&self, ledger: &Ledger) -> Result<String> {
        self.init_directories().await?;

        let previous = self.load_latest_snapshot().await?;
        let (prev_filename, prev_hash) = match previous {
            Some(prev) => {
                let filename = format!("{}.json", prev.timestamp.format("%Y-%m-%d-%H-%M-%S"));
                let hash = snapshot_hash(&prev)?;
                (Some(filename), Some(hash))
            }
            None => (None, None),
        };

        let snapshot = LedgerSnapshot {
            timestamp: Utc::now(),
            username: self.username.clone(),
            cash: ledger.cash(),
            positions: ledger.positions().clone(),
            pending_orders: ledger.pending_orders().to_vec(),
            transaction_count: ledger.transactions().len(),
            metadata: SnapshotMetadata {
                version: "1.0".to_string(),
                previous_snapshot: prev_filename,
                previous_hash: prev_hash,
            },
        };

        let filename = format!("{}.json", snapshot.timestamp.format("%Y-%m-%d-%H-%M-%S"));
        let filepath = self.account_dir.join("snapshots").join(&filename);
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&filepath, json)
            .await
            .context("Failed to write snapshot")?;

        info!("Saved ledger snapshot: {}", filename);
        Ok(filename)
    }

    /// Load the most recent snapshot, if any
    pub async fn load_latest_snapshot(&self) -> Result<Option<LedgerSnapshot>> {
        let snapshots_dir = self.account_dir.join("snapshots");
        if !snapshots_dir.exists() {
            return Ok(None);
        }

        let mut latest: Option<PathBuf> = None;
        let mut entries = fs::read_dir(&snapshots_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                // Filenames are timestamped, so lexicographic max is newest
                if latest.as_ref().map(|l| path > *l).unwrap_or(true) {
                    latest = Some(path);
                }
            }
        }

        match latest {
            Some(filepath) => {
                let content = fs::read_to_string(&filepath).await?;
                let snapshot: LedgerSnapshot = serde_json::from_str(&content)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Erase all stored data for this account
    ///
    /// Only the account-deletion path calls this; trades never delete.
    pub async fn erase(&self) -> Result<bool> {
        if !self.account_dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.account_dir)
            .await
            .context(format!("Failed to erase account dir: {:?}", self.account_dir))?;
        info!(username = %self.username, "Erased account ledger storage");
        Ok(true)
    }
}

/// Hash a snapshot's canonical JSON for chain integrity
fn snapshot_hash(snapshot: &LedgerSnapshot) -> Result<String> {
    let json = serde_json::to_string(snapshot)?;
    let hash = blake3::hash(json.as_bytes());
    Ok(hash.to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{Side, TradeRequest};
    use rust_decimal_macros::dec;

    fn storage_in(dir: &tempfile::TempDir) -> LedgerStorage {
        let paths = DataPaths::new(dir.path());
        LedgerStorage::new(&paths, "alice")
    }

    #[tokio::test]
    async fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let mut ledger = Ledger::new(dec!(100000), Utc::now());
        let tx = ledger.execute_buy("AAPL", 10, dec!(150), Utc::now()).unwrap();

        storage.save_state(&ledger).await.unwrap();
        storage.append_transaction(&tx).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.cash(), dec!(98500));
        assert_eq!(loaded.held("AAPL"), 10);
        assert_eq!(loaded.transactions().len(), 1);
        assert_eq!(loaded.initial_deposit(), dec!(100000));
    }

    #[tokio::test]
    async fn test_missing_account_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        assert!(storage.load().await.unwrap().is_none());
        assert!(!storage.exists());
    }

    #[tokio::test]
    async fn test_pending_orders_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let mut ledger = Ledger::new(dec!(100000), Utc::now());
        let mut req = TradeRequest::market("AAPL", 5, Side::Buy);
        req.kind = crate::ledger::types::OrderKind::Limit;
        req.limit_price = Some(dec!(140));
        let order = ledger.queue_order(&req, Utc::now());

        storage.save_state(&ledger).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.pending_orders().len(), 1);
        assert_eq!(loaded.pending_orders()[0].id, order.id);
    }

    #[tokio::test]
    async fn test_snapshot_chain_carries_previous_hash() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let ledger = Ledger::new(dec!(100000), Utc::now());
        storage.save_snapshot(&ledger).await.unwrap();

        // Timestamped filenames have second resolution
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        storage.save_snapshot(&ledger).await.unwrap();

        let latest = storage.load_latest_snapshot().await.unwrap().unwrap();
        assert!(latest.metadata.previous_snapshot.is_some());
        assert!(latest.metadata.previous_hash.is_some());
    }

    #[tokio::test]
    async fn test_erase_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let ledger = Ledger::new(dec!(100000), Utc::now());
        storage.save_state(&ledger).await.unwrap();
        assert!(storage.exists());

        assert!(storage.erase().await.unwrap());
        assert!(!storage.exists());
        assert!(!storage.erase().await.unwrap());
    }
}
