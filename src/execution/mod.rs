//! Execution layer - market-order coordination between market and ledger

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::{Execution, Order, PortfolioView, Symbol, TradeError, TradeRecord, TradeSink, UserId};
use crate::engine::MarketState;
use crate::ledger::LedgerRegistry;

/// Executes orders at the price current when the ledger is mutated.
///
/// Holds no lock of its own. The price read and the ledger mutation are two
/// back-to-back calls with nothing in between, so a concurrent tick can still
/// move the price after a client saw it: these are market orders, not limit
/// orders.
pub struct TradeCoordinator {
    market: Arc<MarketState>,
    ledger: Arc<LedgerRegistry>,
    sink: Arc<dyn TradeSink>,
    price_decimals: u32,
}

impl TradeCoordinator {
    pub fn new(
        market: Arc<MarketState>,
        ledger: Arc<LedgerRegistry>,
        sink: Arc<dyn TradeSink>,
        price_decimals: u32,
    ) -> Self {
        Self {
            market,
            ledger,
            sink,
            price_decimals,
        }
    }

    /// Execute one market order.
    ///
    /// Every error leaves market and ledger untouched. There is no internal
    /// timeout and no rollback: once this returns `Ok` the trade happened,
    /// even if the caller stopped waiting for the answer.
    pub fn place_order(&self, order: &Order) -> Result<Execution, TradeError> {
        let quantity = match u64::try_from(order.quantity) {
            Ok(q) if q > 0 => q,
            _ => return Err(TradeError::InvalidQuantity(order.quantity)),
        };

        let portfolio = self
            .ledger
            .get(&order.user_id)
            .ok_or_else(|| TradeError::UnknownUser(order.user_id.clone()))?;

        let price = self.quote(&order.symbol)?;

        let fill = portfolio
            .apply_trade(&order.symbol, quantity, price, order.side)
            .inspect_err(|e| debug!(user = %order.user_id, symbol = %order.symbol, "order rejected: {}", e))?;

        let record = TradeRecord {
            id: Uuid::new_v4(),
            user_id: order.user_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity,
            price,
            notional: fill.notional,
            executed_at: Utc::now(),
        };

        info!(
            trade = %record.id,
            user = %record.user_id,
            "{} {} {} @ {} (cash {})",
            record.side, record.quantity, record.symbol, record.price, fill.cash
        );

        self.sink.submit(record.clone());

        Ok(Execution {
            record,
            cash: fill.cash,
            holdings: fill.holdings,
        })
    }

    /// Executable price for a symbol: the live price rounded to the quote
    /// precision.
    pub fn quote(&self, symbol: &Symbol) -> Result<Decimal, TradeError> {
        let live = self
            .market
            .get_price(symbol)
            .ok_or_else(|| TradeError::UnknownTicker(symbol.clone()))?;

        Decimal::try_from(live)
            .ok()
            .map(|p| p.round_dp(self.price_decimals))
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| TradeError::PriceUnavailable(symbol.clone()))
    }

    pub fn portfolio(&self, user_id: &UserId) -> Result<PortfolioView, TradeError> {
        self.ledger
            .get(user_id)
            .map(|p| p.view())
            .ok_or_else(|| TradeError::UnknownUser(user_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InstrumentParams, Side};
    use crate::engine::GbmProcess;
    use crate::journal::ChannelSink;

    struct Harness {
        coordinator: TradeCoordinator,
        journal: flume::Receiver<TradeRecord>,
    }

    /// AAPL at 150.0 with zero volatility and drift, so ticks never move it
    fn harness(cash: i64) -> Harness {
        let market = Arc::new(MarketState::with_seed(GbmProcess::default(), 11));
        market
            .add_instrument(InstrumentParams::new("AAPL", 150.0, 0.0, 0.0))
            .unwrap();

        let ledger = Arc::new(LedgerRegistry::new());
        ledger.open_account(UserId::new("trader1"), Decimal::from(cash)).unwrap();

        let (sink, journal) = ChannelSink::new();
        Harness {
            coordinator: TradeCoordinator::new(market, ledger, Arc::new(sink), 4),
            journal,
        }
    }

    #[test]
    fn test_buy_then_oversell() {
        let h = harness(1000);

        let exec = h.coordinator.place_order(&Order::buy("trader1", "AAPL", 5)).unwrap();
        assert_eq!(exec.record.price, Decimal::from(150));
        assert_eq!(exec.cash, Decimal::from(250));
        assert_eq!(exec.holdings.get(&Symbol::new("AAPL")), Some(&5));

        let before = h.coordinator.portfolio(&UserId::new("trader1")).unwrap();
        let err = h.coordinator.place_order(&Order::sell("trader1", "AAPL", 10)).unwrap_err();
        assert!(matches!(err, TradeError::InsufficientShares { held: 5, requested: 10, .. }));
        assert_eq!(h.coordinator.portfolio(&UserId::new("trader1")).unwrap(), before);

        // Only the successful trade reached the journal
        assert_eq!(h.journal.try_iter().count(), 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_ledger() {
        let h = harness(100);
        let before = h.coordinator.portfolio(&UserId::new("trader1")).unwrap();

        let err = h.coordinator.place_order(&Order::buy("trader1", "AAPL", 1)).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientFunds {
                available: Decimal::from(100),
                required: Decimal::from(150),
            }
        );
        assert_eq!(h.coordinator.portfolio(&UserId::new("trader1")).unwrap(), before);
        assert!(h.journal.is_empty());
    }

    #[test]
    fn test_unknown_ticker_touches_nothing() {
        let h = harness(1000);
        let err = h.coordinator.place_order(&Order::buy("trader1", "ZZZZ", 1)).unwrap_err();
        assert_eq!(err, TradeError::UnknownTicker(Symbol::new("ZZZZ")));
        assert_eq!(h.coordinator.portfolio(&UserId::new("trader1")).unwrap().cash, Decimal::from(1000));
        assert!(h.journal.is_empty());
    }

    #[test]
    fn test_unrepresentable_price_touches_nothing() {
        let market = Arc::new(MarketState::with_seed(GbmProcess::default(), 11));
        market
            .add_instrument(InstrumentParams::new("HUGE", 1e30, 0.0, 0.0))
            .unwrap();
        let ledger = Arc::new(LedgerRegistry::new());
        ledger.open_account(UserId::new("trader1"), Decimal::from(1000)).unwrap();
        let (sink, journal) = ChannelSink::new();
        let coordinator = TradeCoordinator::new(market, ledger, Arc::new(sink), 4);
        let before = coordinator.portfolio(&UserId::new("trader1")).unwrap();

        for order in [Order::buy("trader1", "HUGE", 1), Order::sell("trader1", "HUGE", 1)] {
            let err = coordinator.place_order(&order).unwrap_err();
            assert_eq!(err, TradeError::PriceUnavailable(Symbol::new("HUGE")));
        }
        assert_eq!(coordinator.portfolio(&UserId::new("trader1")).unwrap(), before);
        assert!(journal.is_empty());
    }

    #[test]
    fn test_share_overflow_through_coordinator_is_noop() {
        let market = Arc::new(MarketState::with_seed(GbmProcess::default(), 11));
        market
            .add_instrument(InstrumentParams::new("PENNY", 0.0001, 0.0, 0.0))
            .unwrap();
        let ledger = Arc::new(LedgerRegistry::new());
        ledger.open_account(UserId::new("whale"), Decimal::MAX).unwrap();
        let (sink, journal) = ChannelSink::new();
        let coordinator = TradeCoordinator::new(market, ledger, Arc::new(sink), 4);

        coordinator.place_order(&Order::buy("whale", "PENNY", i64::MAX)).unwrap();
        coordinator.place_order(&Order::buy("whale", "PENNY", i64::MAX)).unwrap();
        let before = coordinator.portfolio(&UserId::new("whale")).unwrap();

        let err = coordinator.place_order(&Order::buy("whale", "PENNY", i64::MAX)).unwrap_err();
        assert!(matches!(err, TradeError::Overflow { side: Side::Buy, .. }));
        assert_eq!(coordinator.portfolio(&UserId::new("whale")).unwrap(), before);
        assert_eq!(journal.try_iter().count(), 2);
    }

    #[test]
    fn test_unknown_user() {
        let h = harness(1000);
        let err = h.coordinator.place_order(&Order::buy("mallory", "AAPL", 1)).unwrap_err();
        assert_eq!(err, TradeError::UnknownUser(UserId::new("mallory")));
        assert!(h.coordinator.portfolio(&UserId::new("mallory")).is_err());
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let h = harness(1000);
        for qty in [0, -3] {
            let err = h.coordinator.place_order(&Order::sell("trader1", "AAPL", qty)).unwrap_err();
            assert_eq!(err, TradeError::InvalidQuantity(qty));
        }
        assert!(h.journal.is_empty());
    }

    #[test]
    fn test_record_matches_ledger_delta() {
        // Price off round numbers, after one random step
        let market = Arc::new(MarketState::with_seed(GbmProcess::default(), 5));
        market
            .add_instrument(InstrumentParams::new("ODD", 123.456789, 0.3, 0.1))
            .unwrap();
        market.tick();
        let ledger = Arc::new(LedgerRegistry::new());
        ledger.open_account(UserId::new("u"), Decimal::from(10_000)).unwrap();
        let (sink, journal) = ChannelSink::new();
        let coordinator = TradeCoordinator::new(market, ledger, Arc::new(sink), 4);

        let exec = coordinator.place_order(&Order::buy("u", "ODD", 7)).unwrap();
        let record = journal.try_recv().unwrap();

        assert_eq!(record, exec.record);
        assert_eq!(record.notional, record.price * Decimal::from(7u64));
        assert_eq!(exec.cash, Decimal::from(10_000) - record.notional);
        assert!(record.price.scale() <= 4);

        let exec = coordinator.place_order(&Order::sell("u", "ODD", 7)).unwrap();
        assert_eq!(exec.cash, Decimal::from(10_000));
        assert!(exec.holdings.is_empty());
        assert_eq!(exec.record.side, Side::Sell);
    }

    #[test]
    fn test_concurrent_same_user_no_double_spend() {
        let h = harness(15_000);
        let coordinator = Arc::new(h.coordinator);

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || coordinator.place_order(&Order::buy("trader1", "AAPL", 1)))
            })
            .collect();

        let filled = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        let view = coordinator.portfolio(&UserId::new("trader1")).unwrap();
        assert_eq!(filled, 100);
        assert_eq!(view.cash, Decimal::ZERO);
        assert_eq!(view.holdings.get(&Symbol::new("AAPL")), Some(&100));
        assert_eq!(h.journal.try_iter().count(), 100);

        // One more has nothing left to spend
        assert!(matches!(
            coordinator.place_order(&Order::buy("trader1", "AAPL", 1)),
            Err(TradeError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_many_users_trading_through_ticks() {
        let market = Arc::new(MarketState::with_seed(GbmProcess::default(), 99));
        market
            .add_instrument(InstrumentParams::new("AAPL", 150.0, 0.4, 0.08))
            .unwrap();
        market
            .add_instrument(InstrumentParams::new("MSFT", 310.0, 0.3, 0.05))
            .unwrap();

        let ledger = Arc::new(LedgerRegistry::new());
        let users: Vec<_> = (0..8).map(|i| UserId::new(format!("user{i}"))).collect();
        for user in &users {
            ledger.open_account(user.clone(), Decimal::from(50_000)).unwrap();
        }

        let (sink, journal) = ChannelSink::new();
        let coordinator = Arc::new(TradeCoordinator::new(Arc::clone(&market), ledger, Arc::new(sink), 4));

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ticker = {
            let market = Arc::clone(&market);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    market.tick();
                }
            })
        };

        let traders: Vec<_> = users
            .iter()
            .cloned()
            .map(|user| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || {
                    for i in 0..300i64 {
                        let symbol = if i % 2 == 0 { "AAPL" } else { "MSFT" };
                        let order = if i % 3 == 2 {
                            Order::sell(user.clone(), symbol, 1 + i % 4)
                        } else {
                            Order::buy(user.clone(), symbol, 1 + i % 5)
                        };
                        // Rejections are expected once cash or shares run out
                        let _ = coordinator.place_order(&order);
                    }
                })
            })
            .collect();

        for trader in traders {
            trader.join().unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        ticker.join().unwrap();
        assert!(market.seq() > 0);

        let records: Vec<TradeRecord> = journal.try_iter().collect();
        for user in &users {
            let mut cash = Decimal::from(50_000);
            let mut held = std::collections::BTreeMap::<Symbol, i128>::new();
            for r in records.iter().filter(|r| &r.user_id == user) {
                let qty = r.quantity as i128;
                match r.side {
                    Side::Buy => {
                        cash -= r.notional;
                        *held.entry(r.symbol.clone()).or_default() += qty;
                    }
                    Side::Sell => {
                        cash += r.notional;
                        *held.entry(r.symbol.clone()).or_default() -= qty;
                    }
                }
            }

            let view = coordinator.portfolio(user).unwrap();
            assert_eq!(view.cash, cash);
            assert!(view.cash >= Decimal::ZERO);
            for (symbol, qty) in held {
                let actual = view.holdings.get(&symbol).copied().unwrap_or(0) as i128;
                assert_eq!(actual, qty);
            }
        }
    }
}
