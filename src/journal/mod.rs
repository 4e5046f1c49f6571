//! Trade journal - hands executed trades to durable storage.
//!
//! The execution path only pushes onto an unbounded channel; a separate task
//! drains it into a `TradeStore`. Persistence is best-effort: a failed write
//! is logged and skipped, the trade itself stands.

pub mod store;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::core::{TradeRecord, TradeSink, TradeStore};
use crate::shutdown::ShutdownSignal;

pub use store::{JsonLinesStore, MemoryTradeStore};

/// Non-blocking sink feeding the journal task
#[derive(Clone)]
pub struct ChannelSink {
    tx: flume::Sender<TradeRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, flume::Receiver<TradeRecord>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl TradeSink for ChannelSink {
    fn submit(&self, record: TradeRecord) {
        if let Err(flume::SendError(record)) = self.tx.send(record) {
            tracing::warn!(trade = %record.id, "trade journal closed, record dropped");
        }
    }
}

/// Spawn the journal task.
///
/// Runs until every `ChannelSink` clone is dropped or `shutdown` fires; on
/// shutdown whatever is already queued is still stored. Resolves to the
/// number of records stored.
pub fn spawn(rx: flume::Receiver<TradeRecord>, store: Arc<dyn TradeStore>, mut shutdown: ShutdownSignal) -> JoinHandle<u64> {
    tokio::spawn(async move {
        tracing::info!(store = store.name(), "trade journal started");

        let mut stored = 0u64;
        loop {
            tokio::select! {
                biased;
                received = rx.recv_async() => match received {
                    Ok(record) => stored += persist(store.as_ref(), &record).await,
                    Err(_) => break,
                },
                _ = shutdown.recv() => {
                    for record in rx.drain() {
                        stored += persist(store.as_ref(), &record).await;
                    }
                    break;
                }
            }
        }

        tracing::info!(stored, "trade journal stopped");
        stored
    })
}

async fn persist(store: &dyn TradeStore, record: &TradeRecord) -> u64 {
    match store.append(record).await {
        Ok(()) => 1,
        Err(e) => {
            tracing::error!(
                trade = %record.id,
                user = %record.user_id,
                symbol = %record.symbol,
                "failed to persist trade: {}",
                e
            );
            0
        }
    }
}
