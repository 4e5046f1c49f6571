//! Core traits - seams towards the persistence collaborator

use async_trait::async_trait;
use crate::core::{Result, types::TradeRecord};

/// Hand-off point for executed trades.
///
/// Called after the ledger mutation has committed and outside every lock.
/// Implementations must not block the caller on durability; failures are
/// theirs to log.
pub trait TradeSink: Send + Sync {
    fn submit(&self, record: TradeRecord);
}

/// Durable storage for trade records, driven by the journal task
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Append one record
    async fn append(&self, record: &TradeRecord) -> Result<()>;

    /// Store name for logging
    fn name(&self) -> &str;
}
