//! Notification sink for ledger fill events
//!
//! Delivery is fire-and-forget: the engine spawns the send and a failed
//! delivery never rolls back or delays a trade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Event category for downstream routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Trade,
    System,
}

/// Display priority hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Normal,
    High,
}

/// A user-facing ledger event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEvent {
    pub username: String,
    pub message: String,
    pub category: Category,
    pub priority: Priority,
}

/// Trait for notification sinks
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: FillEvent) -> anyhow::Result<()>;
}

/// Default sink that logs events through tracing
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, event: FillEvent) -> anyhow::Result<()> {
        info!(
            username = %event.username,
            category = ?event.category,
            priority = ?event.priority,
            "{}",
            event.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_sink_always_delivers() {
        let sink = TracingSink;
        let event = FillEvent {
            username: "alice".to_string(),
            message: "Bought 10 shares of AAPL at $150.00".to_string(),
            category: Category::Trade,
            priority: Priority::Normal,
        };
        assert!(sink.deliver(event).await.is_ok());
    }
}
