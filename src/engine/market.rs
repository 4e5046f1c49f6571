//! Market state - the authoritative instrument book.
//!
//! One reader/writer lock guards the whole book. `tick` takes it exclusively
//! and is the only writer of prices; `snapshot` and `get_price` share it and
//! never block each other.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::BTreeMap;

use crate::core::{InstrumentParams, MarketError, MarketSnapshot, Symbol};
use crate::engine::price::GbmProcess;

/// Draws attempted per instrument before a tick leaves its price alone
const MAX_RESAMPLES: usize = 8;

#[derive(Debug, Clone)]
struct Instrument {
    price: f64,
    volatility: f64,
    drift: f64,
}

struct Book {
    instruments: BTreeMap<Symbol, Instrument>,
    rng: StdRng,
    seq: u64,
    as_of: DateTime<Utc>,
}

pub struct MarketState {
    process: GbmProcess,
    book: RwLock<Book>,
}

impl MarketState {
    pub fn new(process: GbmProcess) -> Self {
        Self::with_rng(process, StdRng::from_entropy())
    }

    /// Reproducible market: same seed and same call sequence, same prices.
    pub fn with_seed(process: GbmProcess, seed: u64) -> Self {
        Self::with_rng(process, StdRng::seed_from_u64(seed))
    }

    fn with_rng(process: GbmProcess, rng: StdRng) -> Self {
        Self {
            process,
            book: RwLock::new(Book {
                instruments: BTreeMap::new(),
                rng,
                seq: 0,
                as_of: Utc::now(),
            }),
        }
    }

    /// List a new instrument. Administrative, not on the hot path.
    pub fn add_instrument(&self, params: InstrumentParams) -> Result<(), MarketError> {
        validate(&params)?;

        let mut book = self.book.write();
        if book.instruments.contains_key(&params.symbol) {
            return Err(MarketError::DuplicateTicker(params.symbol));
        }

        tracing::info!(
            symbol = %params.symbol,
            price = params.price,
            volatility = params.volatility,
            drift = params.drift,
            "listed instrument"
        );
        book.instruments.insert(
            params.symbol,
            Instrument {
                price: params.price,
                volatility: params.volatility,
                drift: params.drift,
            },
        );
        Ok(())
    }

    /// Advance every instrument by one step with independent standard-normal
    /// shocks. Returns the new tick sequence number.
    pub fn tick(&self) -> u64 {
        let mut guard = self.book.write();
        let book = &mut *guard;

        for (symbol, inst) in book.instruments.iter_mut() {
            let next = (0..MAX_RESAMPLES).find_map(|_| {
                let z: f64 = StandardNormal.sample(&mut book.rng);
                self.process.step(inst.price, inst.volatility, inst.drift, z)
            });

            match next {
                Some(price) => inst.price = price,
                None => tracing::warn!(
                    %symbol,
                    price = inst.price,
                    "degenerate shocks after {} draws, holding price",
                    MAX_RESAMPLES
                ),
            }
        }

        finish_tick(book)
    }

    /// Advance every instrument using caller-supplied shocks.
    ///
    /// A degenerate shock leaves that instrument's price unchanged for this
    /// tick; the remaining instruments still advance.
    pub fn tick_with<F>(&self, mut shock: F) -> u64
    where
        F: FnMut(&Symbol) -> f64,
    {
        let mut guard = self.book.write();
        let book = &mut *guard;

        for (symbol, inst) in book.instruments.iter_mut() {
            let z = shock(symbol);
            match self.process.step(inst.price, inst.volatility, inst.drift, z) {
                Some(price) => inst.price = price,
                None => tracing::warn!(%symbol, shock = z, "degenerate shock, holding price"),
            }
        }

        finish_tick(book)
    }

    /// Independent copy of every price at the last tick boundary
    pub fn snapshot(&self) -> MarketSnapshot {
        let book = self.book.read();
        MarketSnapshot {
            seq: book.seq,
            as_of: book.as_of,
            prices: book
                .instruments
                .iter()
                .map(|(symbol, inst)| (symbol.clone(), inst.price))
                .collect(),
        }
    }

    /// Current price of one instrument, `None` for an unknown ticker
    pub fn get_price(&self, symbol: &Symbol) -> Option<f64> {
        self.book.read().instruments.get(symbol).map(|inst| inst.price)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.book.read().instruments.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.book.read().instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks applied so far
    pub fn seq(&self) -> u64 {
        self.book.read().seq
    }
}

fn finish_tick(book: &mut Book) -> u64 {
    book.seq += 1;
    book.as_of = Utc::now();
    tracing::trace!(seq = book.seq, instruments = book.instruments.len(), "tick");
    book.seq
}

fn validate(params: &InstrumentParams) -> Result<(), MarketError> {
    let reason = if !params.price.is_finite() || params.price <= 0.0 {
        format!("price must be positive, got {}", params.price)
    } else if !params.volatility.is_finite() || params.volatility < 0.0 {
        format!("volatility must be non-negative, got {}", params.volatility)
    } else if !params.drift.is_finite() {
        format!("drift must be finite, got {}", params.drift)
    } else {
        return Ok(());
    };

    Err(MarketError::InvalidInstrument {
        symbol: params.symbol.clone(),
        reason,
    })
}
