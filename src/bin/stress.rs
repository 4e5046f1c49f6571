//! Concurrent load driver: many traders hammering the coordinator while the
//! tick loop runs, followed by a ledger-vs-journal reconciliation.
//!
//! Usage: stress [traders] [orders-per-trader]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use snow_market::core::config::{AccountConfig, InstrumentConfig};
use snow_market::core::{Order, Side, TradeError, UserId};
use snow_market::journal::MemoryTradeStore;
use snow_market::{App, Config};

const STARTING_CASH: i64 = 250_000;

#[derive(Debug, Default)]
struct Tally {
    filled: u64,
    no_funds: u64,
    no_shares: u64,
    other: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,stress=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let traders: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(32);
    let orders: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(2_000);

    let mut config = Config::default();
    config.market.tick_period_ms = 1;
    config.market.seed = Some(2024);
    config.instruments = vec![
        instrument("AAPL", 150.0, 0.15, 0.08),
        instrument("MSFT", 310.0, 0.22, 0.06),
        instrument("NVDA", 480.0, 0.45, 0.12),
    ];
    config.accounts = (0..traders)
        .map(|i| AccountConfig {
            user_id: format!("trader{i}"),
            cash: Decimal::from(STARTING_CASH),
        })
        .collect();

    let symbols: Vec<_> = config.instruments.iter().map(|i| i.symbol.clone()).collect();
    let store = Arc::new(MemoryTradeStore::new());
    let mut app = App::with_store(config, store.clone())?;
    app.start();

    println!("==================================================");
    println!("🏋️ Snow Market stress: {} traders x {} orders", traders, orders);
    println!("==================================================");

    let started = Instant::now();
    let workers: Vec<_> = (0..traders)
        .map(|i| {
            let coordinator = Arc::clone(app.coordinator());
            let symbols = symbols.clone();
            tokio::task::spawn_blocking(move || {
                let mut rng = StdRng::seed_from_u64(i as u64);
                let user = UserId::new(format!("trader{i}"));
                let mut tally = Tally::default();

                for _ in 0..orders {
                    let symbol = symbols[rng.gen_range(0..symbols.len())].as_str();
                    let qty = rng.gen_range(1..=20);
                    let order = if rng.gen_bool(0.55) {
                        Order::buy(user.clone(), symbol, qty)
                    } else {
                        Order::sell(user.clone(), symbol, qty)
                    };

                    match coordinator.place_order(&order) {
                        Ok(_) => tally.filled += 1,
                        Err(TradeError::InsufficientFunds { .. }) => tally.no_funds += 1,
                        Err(TradeError::InsufficientShares { .. }) => tally.no_shares += 1,
                        Err(_) => tally.other += 1,
                    }
                }
                tally
            })
        })
        .collect();

    let mut total = Tally::default();
    for worker in workers {
        let t = worker.await?;
        total.filled += t.filled;
        total.no_funds += t.no_funds;
        total.no_shares += t.no_shares;
        total.other += t.other;
    }
    let elapsed = started.elapsed();

    // Give the journal a moment before stopping; shutdown drains the rest anyway
    tokio::time::sleep(Duration::from_millis(50)).await;

    let coordinator = Arc::clone(app.coordinator());
    let summary = app.stop().await;

    println!("-- ⏱️  {:.2?} elapsed, {} ticks applied", elapsed, summary.ticks);
    println!(
        "-- 📈 filled {} | no funds {} | no shares {} | other {}",
        total.filled, total.no_funds, total.no_shares, total.other
    );
    println!("-- 🗄️  journal stored {}", summary.trades_stored);

    // Replay the journal against the starting balances
    let mut expected: HashMap<UserId, Decimal> = HashMap::new();
    for record in store.records() {
        let cash = expected
            .entry(record.user_id.clone())
            .or_insert_with(|| Decimal::from(STARTING_CASH));
        match record.side {
            Side::Buy => *cash -= record.notional,
            Side::Sell => *cash += record.notional,
        }
    }

    let mut mismatches = 0;
    for i in 0..traders {
        let user = UserId::new(format!("trader{i}"));
        let view = coordinator.portfolio(&user)?;
        let replayed = expected.get(&user).copied().unwrap_or(Decimal::from(STARTING_CASH));
        if view.cash != replayed || view.cash < Decimal::ZERO {
            mismatches += 1;
            println!("    ❌ {}: ledger {} journal {}", user, view.cash, replayed);
        }
    }

    if mismatches == 0 && summary.trades_stored == total.filled {
        println!("-- ✅ ledger and journal reconcile for all {} traders", traders);
        Ok(())
    } else {
        anyhow::bail!("{} traders failed reconciliation", mismatches)
    }
}

fn instrument(symbol: &str, price: f64, volatility: f64, drift: f64) -> InstrumentConfig {
    InstrumentConfig {
        symbol: symbol.to_string(),
        price,
        volatility,
        drift,
    }
}
