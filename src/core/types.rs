//! Core types - Strong typing for safety

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

/// Ticker symbol (e.g., "AAPL")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Account identifier, trusted as already authenticated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Seed parameters for one listed instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentParams {
    pub symbol: Symbol,
    /// Initial price, strictly positive
    pub price: f64,
    /// Annualized volatility
    pub volatility: f64,
    /// Annualized expected return
    pub drift: f64,
}

impl InstrumentParams {
    pub fn new(symbol: impl Into<Symbol>, price: f64, volatility: f64, drift: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volatility,
            drift,
        }
    }
}

/// Point-in-time copy of every instrument price at one tick boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Ticks applied so far
    pub seq: u64,
    /// Wall time of the tick boundary this snapshot belongs to
    pub as_of: DateTime<Utc>,
    pub prices: BTreeMap<Symbol, f64>,
}

impl MarketSnapshot {
    pub fn price(&self, symbol: &Symbol) -> Option<f64> {
        self.prices.get(symbol).copied()
    }
}

/// Market order, consumed immediately by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub user_id: UserId,
    pub symbol: Symbol,
    /// Signed so the boundary can reject zero and negative sizes
    pub quantity: i64,
    pub side: Side,
}

impl Order {
    pub fn buy(user_id: impl Into<UserId>, symbol: impl Into<Symbol>, quantity: i64) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: symbol.into(),
            quantity,
            side: Side::Buy,
        }
    }

    pub fn sell(user_id: impl Into<UserId>, symbol: impl Into<Symbol>, quantity: i64) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: symbol.into(),
            quantity,
            side: Side::Sell,
        }
    }
}

/// Append-only fact about one executed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    /// Price the ledger was charged or credited at
    pub price: Decimal,
    /// Exactly `price * quantity`, the amount applied to cash
    pub notional: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Result of a filled order
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub record: TradeRecord,
    /// Cash after the fill
    pub cash: Decimal,
    /// Holdings after the fill
    pub holdings: BTreeMap<Symbol, u64>,
}

/// Consistent read copy of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioView {
    pub user_id: UserId,
    pub cash: Decimal,
    pub holdings: BTreeMap<Symbol, u64>,
}

impl PortfolioView {
    /// Cash plus holdings marked at the snapshot's prices.
    /// Holdings without a representable price contribute nothing.
    pub fn equity(&self, snapshot: &MarketSnapshot) -> Decimal {
        self.holdings
            .iter()
            .filter_map(|(symbol, qty)| {
                let price = Decimal::try_from(snapshot.price(symbol)?).ok()?;
                price.checked_mul(Decimal::from(*qty))
            })
            .fold(self.cash, |acc, value| acc + value)
    }
}
