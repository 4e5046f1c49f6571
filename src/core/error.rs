//! Error handling - closed, per-concern error kinds

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::types::{Side, Symbol, UserId};

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error: configuration, IO and the component errors below
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors (config file, trade journal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Market administration errors
    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    /// Account administration errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Order execution errors
    #[error("Trade error: {0}")]
    Trade(#[from] TradeError),
}

/// Administrative failures on the instrument book.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("ticker {0} is already listed")]
    DuplicateTicker(Symbol),

    #[error("invalid parameters for {symbol}: {reason}")]
    InvalidInstrument { symbol: Symbol, reason: String },

    #[error("invalid time step {0}: must be finite and positive")]
    InvalidTimeStep(f64),
}

/// Administrative failures on the ledger registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("account {0} already exists")]
    DuplicateUser(UserId),

    #[error("starting cash {1} for {0} is negative")]
    NegativeCash(UserId, Decimal),
}

/// Everything an order can fail with. Every variant leaves market and
/// ledger state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("unknown ticker {0}")]
    UnknownTicker(Symbol),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },

    #[error("insufficient shares of {symbol}: held {held}, requested {requested}")]
    InsufficientShares {
        symbol: Symbol,
        held: u64,
        requested: u64,
    },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    #[error("no executable price for {0}")]
    PriceUnavailable(Symbol),

    #[error("{side} {quantity} {symbol} overflows the account")]
    Overflow {
        symbol: Symbol,
        side: Side,
        quantity: u64,
    },
}
