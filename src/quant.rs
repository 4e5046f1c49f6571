//! Option pricing helpers on top of the simulated underlyings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

/// Standard normal cumulative distribution function
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Black-Scholes price of a European option.
///
/// * `spot` - underlying price
/// * `strike` - strike price
/// * `t` - years to expiry
/// * `rate` - continuously compounded risk-free rate
/// * `sigma` - annualized volatility
///
/// Expired options are worth their intrinsic value; with zero volatility the
/// price is the discounted intrinsic value of the forward.
pub fn black_scholes(kind: OptionKind, spot: f64, strike: f64, t: f64, rate: f64, sigma: f64) -> f64 {
    if t <= 0.0 {
        return intrinsic(kind, spot, strike);
    }

    let discount = (-rate * t).exp();
    if sigma <= 0.0 {
        return intrinsic(kind, spot, strike * discount);
    }

    let sqrt_t = t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;

    match kind {
        OptionKind::Call => spot * norm_cdf(d1) - strike * discount * norm_cdf(d2),
        OptionKind::Put => strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

fn intrinsic(kind: OptionKind, spot: f64, strike: f64) -> f64 {
    match kind {
        OptionKind::Call => (spot - strike).max(0.0),
        OptionKind::Put => (strike - spot).max(0.0),
    }
}
