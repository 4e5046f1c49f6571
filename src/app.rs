//! Application wiring - builds every component from a `Config` and owns
//! the background tasks.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::core::{Config, Result, TradeStore};
use crate::engine::{GbmProcess, MarketState, ticker};
use crate::execution::TradeCoordinator;
use crate::feed::MarketFeed;
use crate::journal::{self, ChannelSink, JsonLinesStore, MemoryTradeStore};
use crate::ledger::LedgerRegistry;
use crate::shutdown::{Shutdown, ShutdownSignal};

/// Counters reported by the background tasks when they stop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub snapshots: u64,
    pub trades_stored: u64,
}

pub struct App {
    config: Config,
    market: Arc<MarketState>,
    ledger: Arc<LedgerRegistry>,
    coordinator: Arc<TradeCoordinator>,
    feed: Arc<MarketFeed>,
    store: Arc<dyn TradeStore>,
    shutdown: Shutdown,
    signal: ShutdownSignal,
    ticker: Option<JoinHandle<u64>>,
    publisher: Option<JoinHandle<u64>>,
    journal: JoinHandle<u64>,
}

impl App {
    /// Seed the market and accounts, open the trade store and start the
    /// journal. Prices do not move until `start`.
    pub async fn build(config: Config) -> Result<Self> {
        let store: Arc<dyn TradeStore> = match &config.journal.path {
            Some(path) => Arc::new(JsonLinesStore::open(path).await?),
            None => Arc::new(MemoryTradeStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Same as `build`, journaling into the given store instead of the
    /// configured one. Must be called inside a tokio runtime.
    pub fn with_store(config: Config, store: Arc<dyn TradeStore>) -> Result<Self> {
        config.validate()?;

        let process = GbmProcess::new(config.market.dt)?;
        let market = Arc::new(match config.market.seed {
            Some(seed) => MarketState::with_seed(process, seed),
            None => MarketState::new(process),
        });
        for params in config.instrument_params() {
            market.add_instrument(params)?;
        }

        let ledger = Arc::new(LedgerRegistry::new());
        for (user_id, cash) in config.accounts() {
            ledger.open_account(user_id, cash)?;
        }

        let (shutdown, signal) = Shutdown::new();
        let (sink, rx) = ChannelSink::new();
        let journal = journal::spawn(rx, Arc::clone(&store), signal.clone());

        let coordinator = Arc::new(TradeCoordinator::new(
            Arc::clone(&market),
            Arc::clone(&ledger),
            Arc::new(sink),
            config.market.price_decimals,
        ));

        let feed = Arc::new(MarketFeed::new(config.feed.capacity));

        tracing::info!(
            instruments = market.len(),
            accounts = ledger.len(),
            store = store.name(),
            "simulation ready"
        );

        Ok(Self {
            config,
            market,
            ledger,
            coordinator,
            feed,
            store,
            shutdown,
            signal,
            ticker: None,
            publisher: None,
            journal,
        })
    }

    /// Start the tick loop and the snapshot feed. Idempotent.
    pub fn start(&mut self) {
        if self.ticker.is_none() {
            self.ticker = Some(ticker::spawn(
                Arc::clone(&self.market),
                self.config.tick_period(),
                self.signal.clone(),
            ));
        }
        if self.publisher.is_none() {
            self.publisher = Some(Arc::clone(&self.feed).spawn(
                Arc::clone(&self.market),
                self.config.feed_interval(),
                self.signal.clone(),
            ));
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn market(&self) -> &Arc<MarketState> {
        &self.market
    }

    pub fn ledger(&self) -> &Arc<LedgerRegistry> {
        &self.ledger
    }

    pub fn coordinator(&self) -> &Arc<TradeCoordinator> {
        &self.coordinator
    }

    pub fn feed(&self) -> &Arc<MarketFeed> {
        &self.feed
    }

    pub fn store(&self) -> &Arc<dyn TradeStore> {
        &self.store
    }

    /// Signal every task to stop and wait for them.
    pub async fn stop(self) -> RunSummary {
        self.shutdown.trigger();

        let mut summary = RunSummary::default();
        if let Some(handle) = self.ticker {
            summary.ticks = join(handle, "tick loop").await;
        }
        if let Some(handle) = self.publisher {
            summary.snapshots = join(handle, "market feed").await;
        }
        summary.trades_stored = join(self.journal, "trade journal").await;

        tracing::info!(?summary, "simulation stopped");
        summary
    }
}

async fn join(handle: JoinHandle<u64>, task: &str) -> u64 {
    handle.await.unwrap_or_else(|e| {
        tracing::error!("{} task failed: {}", task, e);
        0
    })
}
