//! Market feed - publishes a snapshot to every subscriber on a fixed cadence.
//!
//! Transport lives elsewhere; whatever pushes prices to observers subscribes
//! here and forwards what it receives. Slow subscribers lag and skip ahead
//! instead of holding back the publisher.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::core::MarketSnapshot;
use crate::engine::MarketState;
use crate::shutdown::ShutdownSignal;

pub struct MarketFeed {
    tx: broadcast::Sender<Arc<MarketSnapshot>>,
}

impl MarketFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MarketSnapshot>> {
        self.tx.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish the current snapshot once. Returns how many subscribers got it.
    pub fn publish(&self, market: &MarketState) -> usize {
        // No subscribers is not an error, the snapshot is just dropped
        self.tx.send(Arc::new(market.snapshot())).unwrap_or(0)
    }

    /// Spawn the publishing loop; resolves to the number of snapshots taken.
    pub fn spawn(self: Arc<Self>, market: Arc<MarketState>, interval: Duration, mut shutdown: ShutdownSignal) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(interval_ms = interval.as_millis() as u64, "market feed started");

            let mut published = 0u64;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let delivered = self.publish(&market);
                        published += 1;
                        tracing::trace!(delivered, "snapshot published");
                    }
                }
            }

            tracing::info!(published, "market feed stopped");
            published
        })
    }
}
