//! Geometric random walk - one multiplicative price step per tick.
//!
//! `P' = P * exp((mu - sigma^2 / 2) * dt + sigma * z * sqrt(dt))`
//!
//! Multiplicative steps keep a positive price positive as long as the
//! exponent stays finite, so positivity holds by construction rather than
//! by clamping.

use crate::core::MarketError;

/// One simulated trading minute: 252 trading days of 390 minutes each.
pub const DEFAULT_DT: f64 = 1.0 / (252.0 * 390.0);

/// Price process shared by every instrument in a market.
///
/// `dt` is fixed for the lifetime of the process so that a tick always
/// advances every instrument by the same amount of simulated time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbmProcess {
    dt: f64,
    sqrt_dt: f64,
}

impl GbmProcess {
    pub fn new(dt: f64) -> Result<Self, MarketError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(MarketError::InvalidTimeStep(dt));
        }
        Ok(Self { dt, sqrt_dt: dt.sqrt() })
    }

    /// Next price given a standard-normal shock `z`.
    ///
    /// Returns `None` for a degenerate step: a non-finite shock, or a
    /// result that overflowed or underflowed out of `(0, inf)`.
    #[inline]
    pub fn step(&self, price: f64, volatility: f64, drift: f64, z: f64) -> Option<f64> {
        if !z.is_finite() {
            return None;
        }

        let drift_term = (drift - 0.5 * volatility * volatility) * self.dt;
        let diffusion = volatility * z * self.sqrt_dt;
        let next = price * (drift_term + diffusion).exp();

        (next.is_finite() && next > 0.0).then_some(next)
    }
}

impl Default for GbmProcess {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            sqrt_dt: DEFAULT_DT.sqrt(),
        }
    }
}
