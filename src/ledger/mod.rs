//! Per-account ledger: typed records, the ledger aggregate, and its
//! durable storage

pub mod book;
pub mod storage;
pub mod types;

pub use book::Ledger;
pub use storage::{LedgerSnapshot, LedgerStorage};
pub use types::{
    OrderKind, PendingOrder, PortfolioMetrics, Side, TradeError, TradeOutcome, TradeRequest,
    Transaction, Validity,
};
