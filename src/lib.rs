//! Snow Market - Core Library
//! Simulated stock market: stochastic prices, live snapshots, atomic trades

// Public modules
pub mod app;
pub mod core;
pub mod engine;
pub mod ledger;
pub mod execution;
pub mod journal;
pub mod feed;
pub mod quant;
pub mod shutdown;

// Re-exports
pub use app::{App, RunSummary};
pub use core::{Config, Error, Result};
pub use engine::MarketState;
pub use execution::TradeCoordinator;
pub use ledger::LedgerRegistry;
