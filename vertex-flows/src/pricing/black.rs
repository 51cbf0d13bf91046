//! Black model pricing, Greeks and implied volatility.
//!
//! The underlying spot is used directly as the forward and there is no
//! carry (q = 0). Reporting conventions:
//! - Vega: per 1 vol point (raw vega * 0.01)
//! - Theta: per calendar day (annual theta / 365)
//! - Rho: -t * price * 0.01

use std::f64::consts::PI;

use serde::Serialize;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use thiserror::Error;

use crate::data::{Greeks, OptionType};

/// Numerical-domain failures of the pricing model.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingError {
    #[error("time to expiry is not positive ({0})")]
    NonPositiveTime(f64),

    #[error("time to expiry could not be resolved")]
    UnresolvedExpiry,

    #[error("option price is not positive ({0})")]
    NonPositivePrice(f64),

    #[error("invalid underlying {spot} or strike {strike}")]
    InvalidInput { spot: f64, strike: f64 },

    #[error("price {price} is at or below intrinsic value {intrinsic}")]
    BelowIntrinsic { price: f64, intrinsic: f64 },

    #[error("price {price} is at or above the no-arbitrage bound {bound}")]
    AboveUpperBound { price: f64, bound: f64 },

    #[error("implied volatility solver did not converge")]
    NoConvergence,

    #[error("non-finite {0}")]
    NonFinite(&'static str),
}

const IV_MAX_ITER: usize = 100;
const IV_PRICE_TOLERANCE: f64 = 1e-8;
const IV_LOWER: f64 = 1e-6;
const IV_UPPER: f64 = 10.0;

/// Standard normal CDF.
pub(crate) fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

/// Black model calculator.
#[derive(Debug, Clone, Copy)]
pub struct Black76 {
    /// Annualized risk-free rate
    pub rate: f64,
}

impl Default for Black76 {
    fn default() -> Self {
        Self { rate: 0.0548 }
    }
}

impl Black76 {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    fn d1(forward: f64, strike: f64, time: f64, vol: f64) -> f64 {
        ((forward / strike).ln() + 0.5 * vol * vol * time) / (vol * time.sqrt())
    }

    fn d2(forward: f64, strike: f64, time: f64, vol: f64) -> f64 {
        Self::d1(forward, strike, time, vol) - vol * time.sqrt()
    }

    fn discount(&self, time: f64) -> f64 {
        (-self.rate * time).exp()
    }

    /// Undiscounted-at-expiry value for non-positive time.
    fn intrinsic(forward: f64, strike: f64, opt_type: OptionType) -> f64 {
        match opt_type {
            OptionType::Call => (forward - strike).max(0.0),
            OptionType::Put => (strike - forward).max(0.0),
        }
    }

    /// Option price.
    pub fn price(&self, forward: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return self.discount(time.max(0.0)) * Self::intrinsic(forward, strike, opt_type);
        }

        let d1 = Self::d1(forward, strike, time, vol);
        let d2 = Self::d2(forward, strike, time, vol);
        let df = self.discount(time);

        match opt_type {
            OptionType::Call => df * (forward * norm_cdf(d1) - strike * norm_cdf(d2)),
            OptionType::Put => df * (strike * norm_cdf(-d2) - forward * norm_cdf(-d1)),
        }
    }

    pub fn delta(&self, forward: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        let d1 = Self::d1(forward, strike, time, vol);
        let df = self.discount(time);

        match opt_type {
            OptionType::Call => df * norm_cdf(d1),
            OptionType::Put => -df * norm_cdf(-d1),
        }
    }

    /// Gamma (same for calls and puts).
    pub fn gamma(&self, forward: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = Self::d1(forward, strike, time, vol);
        self.discount(time) * norm_pdf(d1) / (forward * vol * time.sqrt())
    }

    /// Vega per 1 vol point (same for calls and puts).
    pub fn vega(&self, forward: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.raw_vega(forward, strike, time, vol) * 0.01
    }

    fn raw_vega(&self, forward: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let d1 = Self::d1(forward, strike, time, vol);
        forward * self.discount(time) * norm_pdf(d1) * time.sqrt()
    }

    /// Daily theta.
    pub fn theta(&self, forward: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        let d1 = Self::d1(forward, strike, time, vol);
        let d2 = Self::d2(forward, strike, time, vol);
        let df = self.discount(time);

        let decay = -forward * df * norm_pdf(d1) * vol / (2.0 * time.sqrt());
        let annual = match opt_type {
            OptionType::Call => {
                decay + self.rate * forward * df * norm_cdf(d1)
                    - self.rate * strike * df * norm_cdf(d2)
            }
            OptionType::Put => {
                decay - self.rate * forward * df * norm_cdf(-d1)
                    + self.rate * strike * df * norm_cdf(-d2)
            }
        };
        annual / 365.0
    }

    /// Rho per 1% rate move.
    pub fn rho(&self, forward: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        -time * self.price(forward, strike, time, vol, opt_type) * 0.01
    }

    /// Delta, gamma, theta, vega and rho at once. Vanna is left at zero; it
    /// uses its own convention, see [`vanna`].
    pub fn greeks(
        &self,
        forward: f64,
        strike: f64,
        time: f64,
        vol: f64,
        opt_type: OptionType,
    ) -> Result<Greeks, PricingError> {
        if time <= 0.0 {
            return Err(PricingError::NonPositiveTime(time));
        }
        if forward <= 0.0 || strike <= 0.0 || vol <= 0.0 {
            return Err(PricingError::InvalidInput {
                spot: forward,
                strike,
            });
        }

        let greeks = Greeks {
            delta: self.delta(forward, strike, time, vol, opt_type),
            gamma: self.gamma(forward, strike, time, vol),
            theta: self.theta(forward, strike, time, vol, opt_type),
            vega: self.vega(forward, strike, time, vol),
            rho: self.rho(forward, strike, time, vol, opt_type),
            vanna: 0.0,
        };

        let all_finite = [greeks.delta, greeks.gamma, greeks.theta, greeks.vega, greeks.rho]
            .iter()
            .all(|g| g.is_finite());
        if !all_finite {
            return Err(PricingError::NonFinite("greeks"));
        }

        Ok(greeks)
    }

    /// Solve for the volatility that reproduces `price`.
    ///
    /// Newton-Raphson on vega, falling back to bisection whenever a Newton
    /// step leaves the current bracket.
    pub fn implied_vol(
        &self,
        forward: f64,
        strike: f64,
        time: f64,
        price: f64,
        opt_type: OptionType,
    ) -> Result<f64, PricingError> {
        if !(time > 0.0) {
            return Err(PricingError::NonPositiveTime(time));
        }
        if !(price > 0.0) {
            return Err(PricingError::NonPositivePrice(price));
        }
        if !(forward > 0.0) || !(strike > 0.0) {
            return Err(PricingError::InvalidInput {
                spot: forward,
                strike,
            });
        }

        let df = self.discount(time);
        let intrinsic = df * Self::intrinsic(forward, strike, opt_type);
        if price <= intrinsic {
            return Err(PricingError::BelowIntrinsic { price, intrinsic });
        }
        let bound = df * match opt_type {
            OptionType::Call => forward,
            OptionType::Put => strike,
        };
        if price >= bound {
            return Err(PricingError::AboveUpperBound { price, bound });
        }

        let mut lo = IV_LOWER;
        let mut hi = IV_UPPER;
        if self.price(forward, strike, time, hi, opt_type) < price {
            return Err(PricingError::NoConvergence);
        }

        // Brenner-Subrahmanyam starting point
        let mut vol = ((price / forward) * (2.0 * PI / time).sqrt()).clamp(0.01, 5.0);

        for _ in 0..IV_MAX_ITER {
            let diff = self.price(forward, strike, time, vol, opt_type) - price;
            if diff.abs() < IV_PRICE_TOLERANCE {
                return Ok(vol);
            }

            if diff > 0.0 {
                hi = vol;
            } else {
                lo = vol;
            }
            if hi - lo < 1e-12 {
                return Ok(vol);
            }

            let vega = self.raw_vega(forward, strike, time, vol);
            let newton = if vega > 1e-12 { vol - diff / vega } else { f64::NAN };
            vol = if newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
        }

        Err(PricingError::NoConvergence)
    }
}

/// Vanna: `exp(-q t) * pdf(d1) * d2 / sigma` with q = 0 and
/// `d1 = (ln(S/K) + (r + sigma^2 / 2) t) / (sigma sqrt(t))`.
///
/// Same formula for calls and puts. Returns 0 when `sigma <= 0`, `t <= 0` or
/// the result is not finite.
pub fn vanna(spot: f64, strike: f64, rate: f64, sigma: f64, time: f64) -> f64 {
    if sigma <= 0.0 || time <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return 0.0;
    }

    let q: f64 = 0.0;
    let sqrt_t = time.sqrt();
    let d1 = ((spot / strike).ln() + (rate - q + 0.5 * sigma * sigma) * time) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let value = (-q * time).exp() * norm_pdf(d1) * (d2 / sigma);

    if value.is_finite() {
        value
    } else {
        0.0
    }
}
