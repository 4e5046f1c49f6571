//! Market simulation engine
//! Price process, shared instrument book and the tick loop driving it

pub mod price;
pub mod market;
pub mod ticker;

pub use price::{GbmProcess, DEFAULT_DT};
pub use market::MarketState;
