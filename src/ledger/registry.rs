//! Ledger registry - owns one portfolio per account

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{LedgerError, UserId};
use crate::ledger::portfolio::Portfolio;

/// Account table. The map lock is held only long enough to find or insert
/// an entry; trading happens on the portfolio's own lock.
#[derive(Default)]
pub struct LedgerRegistry {
    accounts: RwLock<HashMap<UserId, Arc<Portfolio>>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a portfolio. Accounts are never removed afterwards.
    pub fn open_account(&self, user_id: UserId, starting_cash: Decimal) -> Result<Arc<Portfolio>, LedgerError> {
        if starting_cash < Decimal::ZERO {
            return Err(LedgerError::NegativeCash(user_id, starting_cash));
        }

        let mut accounts = self.accounts.write();
        if accounts.contains_key(&user_id) {
            return Err(LedgerError::DuplicateUser(user_id));
        }

        tracing::info!(user = %user_id, cash = %starting_cash, "opened account");
        let portfolio = Arc::new(Portfolio::new(user_id.clone(), starting_cash));
        accounts.insert(user_id, Arc::clone(&portfolio));
        Ok(portfolio)
    }

    pub fn get(&self, user_id: &UserId) -> Option<Arc<Portfolio>> {
        self.accounts.read().get(user_id).cloned()
    }

    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<_> = self.accounts.read().keys().cloned().collect();
        users.sort();
        users
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
