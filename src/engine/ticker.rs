//! Tick loop - the single writer driving the market forward

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::market::MarketState;
use crate::shutdown::ShutdownSignal;

/// Spawn the background tick loop.
///
/// Ticks run once per `period` until `shutdown` fires; a late tick is
/// skipped rather than bursted. The task resolves to the number of ticks it
/// applied.
pub fn spawn(market: Arc<MarketState>, period: Duration, mut shutdown: ShutdownSignal) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(period_ms = period.as_millis() as u64, instruments = market.len(), "tick loop started");

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = interval.tick() => {
                    market.tick();
                    ticks += 1;
                }
            }
        }

        tracing::info!(ticks, seq = market.seq(), "tick loop stopped");
        ticks
    })
}
