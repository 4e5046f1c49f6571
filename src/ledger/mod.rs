//! Portfolio ledger - per-user cash and holdings

pub mod portfolio;
pub mod registry;

pub use portfolio::{Fill, Portfolio};
pub use registry::LedgerRegistry;
