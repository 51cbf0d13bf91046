//! Option pricing module.
//!
//! Provides:
//! - Black model prices, Greeks and implied volatility
//! - Vanna
//! - Per-contract annotation with an explicit fallback outcome

pub mod black;
pub mod greeks;

pub use black::{vanna, Black76, PricingError};
pub use greeks::{GreeksCalculator, PricedChain, PricingConfig, PricingOutcome};
