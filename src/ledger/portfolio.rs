//! One user's cash-and-holdings record.
//!
//! Each portfolio carries its own mutex, so trades by the same user
//! serialize while trades by different users never touch the same lock.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::core::{PortfolioView, Side, Symbol, TradeError, UserId};

#[derive(Debug)]
struct Account {
    cash: Decimal,
    holdings: BTreeMap<Symbol, u64>,
}

/// State left behind by a successful `apply_trade`, captured inside the
/// same critical section that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    /// Exactly `price * quantity`
    pub notional: Decimal,
    pub cash: Decimal,
    pub holdings: BTreeMap<Symbol, u64>,
}

#[derive(Debug)]
pub struct Portfolio {
    user_id: UserId,
    account: Mutex<Account>,
}

impl Portfolio {
    pub fn new(user_id: UserId, starting_cash: Decimal) -> Self {
        Self {
            user_id,
            account: Mutex::new(Account {
                cash: starting_cash,
                holdings: BTreeMap::new(),
            }),
        }
    }

    /// Check and apply one trade atomically.
    ///
    /// On any error nothing changes. `quantity` must already be positive.
    pub fn apply_trade(&self, symbol: &Symbol, quantity: u64, price: Decimal, side: Side) -> Result<Fill, TradeError> {
        let overflow = || TradeError::Overflow {
            symbol: symbol.clone(),
            side,
            quantity,
        };
        let notional = price.checked_mul(Decimal::from(quantity)).ok_or_else(overflow)?;

        let mut account = self.account.lock();
        let held = account.holdings.get(symbol).copied().unwrap_or(0);

        // Both new values are computed before either is written
        let (cash, remaining) = match side {
            Side::Buy => {
                if account.cash < notional {
                    return Err(TradeError::InsufficientFunds {
                        available: account.cash,
                        required: notional,
                    });
                }
                let remaining = held.checked_add(quantity).ok_or_else(overflow)?;
                (account.cash - notional, remaining)
            }
            Side::Sell => {
                if held < quantity {
                    return Err(TradeError::InsufficientShares {
                        symbol: symbol.clone(),
                        held,
                        requested: quantity,
                    });
                }
                let cash = account.cash.checked_add(notional).ok_or_else(overflow)?;
                (cash, held - quantity)
            }
        };

        account.cash = cash;
        if remaining == 0 {
            account.holdings.remove(symbol);
        } else {
            account.holdings.insert(symbol.clone(), remaining);
        }

        Ok(Fill {
            notional,
            cash: account.cash,
            holdings: account.holdings.clone(),
        })
    }

    pub fn balance(&self) -> Decimal {
        self.account.lock().cash
    }

    pub fn holdings(&self) -> BTreeMap<Symbol, u64> {
        self.account.lock().holdings.clone()
    }

    pub fn holding(&self, symbol: &Symbol) -> u64 {
        self.account.lock().holdings.get(symbol).copied().unwrap_or(0)
    }

    /// Cash and holdings read under one lock acquisition
    pub fn view(&self) -> PortfolioView {
        let account = self.account.lock();
        PortfolioView {
            user_id: self.user_id.clone(),
            cash: account.cash,
            holdings: account.holdings.clone(),
        }
    }
}
