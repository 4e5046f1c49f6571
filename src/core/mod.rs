//! Core module - Common types, traits, configuration and error handling

pub mod error;
pub mod types;
pub mod traits;
pub mod config;

pub use error::{Error, LedgerError, MarketError, Result, TradeError};
pub use types::*;
pub use traits::*;
pub use config::Config;
