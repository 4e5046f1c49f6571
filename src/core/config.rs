//! Configuration - simulation parameters loaded from TOML.
//!
//! Loads from `config.toml` in the working directory, or from the path in
//! `SNOW_MARKET_CONFIG`. Every section is optional; missing fields fall back
//! to the defaults below.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{Error, Result, types::{InstrumentParams, Symbol, UserId}};
use crate::engine::price::DEFAULT_DT;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SNOW_MARKET_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub journal: JournalConfig,

    /// Instruments listed at startup
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,

    /// Accounts opened at startup
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Wall-clock time between ticks
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Simulated time per tick, in years
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Decimal places of an execution quote
    #[serde(default = "default_price_decimals")]
    pub price_decimals: u32,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Snapshot publishing cadence
    #[serde(default = "default_feed_interval_ms")]
    pub interval_ms: u64,

    /// Snapshots buffered per subscriber before it starts lagging
    #[serde(default = "default_feed_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    /// JSON-lines trade journal; trades stay in memory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub price: f64,
    pub volatility: f64,
    pub drift: f64,
}

impl InstrumentConfig {
    pub fn params(&self) -> InstrumentParams {
        InstrumentParams::new(Symbol::new(self.symbol.as_str()), self.price, self.volatility, self.drift)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub user_id: String,
    pub cash: Decimal,
}

fn default_tick_period_ms() -> u64 {
    100
}
fn default_dt() -> f64 {
    DEFAULT_DT
}
fn default_price_decimals() -> u32 {
    4
}
fn default_feed_interval_ms() -> u64 {
    500
}
fn default_feed_capacity() -> usize {
    64
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            dt: default_dt(),
            price_decimals: default_price_decimals(),
            seed: None,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_feed_interval_ms(),
            capacity: default_feed_capacity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            feed: FeedConfig::default(),
            journal: JournalConfig::default(),
            instruments: vec![InstrumentConfig {
                symbol: "AAPL".to_string(),
                price: 150.0,
                volatility: 0.15,
                drift: 0.08,
            }],
            accounts: vec![AccountConfig {
                user_id: "trader1".to_string(),
                cash: Decimal::from(100_000),
            }],
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `SNOW_MARKET_CONFIG`, then `config.toml`, then defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let cfg = Self::load(Path::new(&path))?;
            tracing::info!("Loaded config from {}", path);
            return Ok(cfg);
        }

        let path = Path::new("config.toml");
        if path.exists() {
            let cfg = Self::load(path)?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(cfg);
        }

        tracing::warn!("No config.toml found, using defaults");
        Ok(Self::default())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.market.tick_period_ms == 0 {
            return Err(Error::Config("market.tick_period_ms must be positive".into()));
        }
        if !self.market.dt.is_finite() || self.market.dt <= 0.0 {
            return Err(Error::Config(format!("market.dt must be positive, got {}", self.market.dt)));
        }
        if self.feed.interval_ms == 0 {
            return Err(Error::Config("feed.interval_ms must be positive".into()));
        }
        if self.feed.capacity == 0 {
            return Err(Error::Config("feed.capacity must be positive".into()));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.user_id.as_str()) {
                return Err(Error::Config(format!("duplicate account {}", account.user_id)));
            }
        }

        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.market.tick_period_ms)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed.interval_ms)
    }

    pub fn instrument_params(&self) -> impl Iterator<Item = InstrumentParams> + '_ {
        self.instruments.iter().map(InstrumentConfig::params)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (UserId, Decimal)> + '_ {
        self.accounts.iter().map(|a| (UserId::new(a.user_id.as_str()), a.cash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.market.tick_period_ms, 100);
        assert_eq!(cfg.feed.interval_ms, 500);
        assert_eq!(cfg.market.price_decimals, 4);
        assert!((cfg.market.dt - 1.0 / (252.0 * 390.0)).abs() < 1e-15);
        assert!(cfg.instruments.is_empty());
        assert!(cfg.journal.path.is_none());
    }

    #[test]
    fn test_parse_instruments_and_accounts() {
        let cfg = Config::parse(
            r#"
            [market]
            tick_period_ms = 250
            seed = 7

            [[instruments]]
            symbol = "aapl"
            price = 150.0
            volatility = 0.15
            drift = 0.08

            [[accounts]]
            user_id = "trader1"
            cash = 1000.5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.tick_period(), Duration::from_millis(250));
        assert_eq!(cfg.market.seed, Some(7));

        let params: Vec<_> = cfg.instrument_params().collect();
        assert_eq!(params[0].symbol, Symbol::new("AAPL"));

        let accounts: Vec<_> = cfg.accounts().collect();
        assert_eq!(accounts[0].0, UserId::new("trader1"));
        assert_eq!(accounts[0].1, Decimal::new(10005, 1));
    }

    #[test]
    fn test_rejects_duplicate_accounts() {
        let result = Config::parse(
            r#"
            [[accounts]]
            user_id = "a"
            cash = 1.0

            [[accounts]]
            user_id = "a"
            cash = 2.0
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_tick_period() {
        let result = Config::parse("[market]\ntick_period_ms = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_default_seeds_aapl_and_trader() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.instruments[0].symbol, "AAPL");
        assert_eq!(cfg.accounts[0].cash, Decimal::from(100_000));
    }
}
