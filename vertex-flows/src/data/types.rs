//! Core data types for the analytics engine.
//!
//! These types represent what the market-data client hands over: an option
//! chain for one expiration and time-ordered OHLCV bars for the underlying.
//! Pricing annotations are carried alongside the raw contract rather than
//! mutating it.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingOutcome;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Greeks for an option contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    pub vanna: f64,
}

/// A single option contract as parsed from the chain response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Strike price
    pub strike: Decimal,

    /// Expiration date
    pub expiration: NaiveDate,

    /// Call or put
    pub option_type: OptionType,

    /// Last traded price
    pub last: Decimal,

    /// Open interest
    pub open_interest: u64,

    /// Session volume
    #[serde(default)]
    pub volume: u64,
}

impl OptionContract {
    pub fn new(
        strike: Decimal,
        expiration: NaiveDate,
        option_type: OptionType,
        last: Decimal,
        open_interest: u64,
    ) -> Self {
        Self {
            strike,
            expiration,
            option_type,
            last,
            open_interest,
            volume: 0,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    pub fn strike_f64(&self) -> f64 {
        self.strike.to_f64().unwrap_or(0.0)
    }

    pub fn last_f64(&self) -> f64 {
        self.last.to_f64().unwrap_or(0.0)
    }
}

/// Contract plus the pricing results computed for it.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedContract {
    pub contract: OptionContract,

    /// Year fraction until the expiry close; `None` when it could not be resolved.
    pub time_to_expiry: Option<f64>,

    pub implied_volatility: f64,

    pub greeks: Greeks,

    pub outcome: PricingOutcome,
}

impl AnnotatedContract {
    pub fn strike(&self) -> Decimal {
        self.contract.strike
    }

    pub fn option_type(&self) -> OptionType {
        self.contract.option_type
    }

    pub fn open_interest(&self) -> f64 {
        self.contract.open_interest as f64
    }

    pub fn used_fallback(&self) -> bool {
        self.outcome.is_fallback()
    }
}

/// All contracts for one (symbol, expiration) pair.
#[derive(Debug, Clone, Default)]
pub struct OptionsChain {
    pub symbol: String,

    pub expiration: Option<NaiveDate>,

    pub contracts: Vec<OptionContract>,
}

impl OptionsChain {
    pub fn new(symbol: &str, expiration: Option<NaiveDate>) -> Self {
        Self {
            symbol: symbol.to_string(),
            expiration,
            contracts: Vec::new(),
        }
    }

    pub fn add_contract(&mut self, contract: OptionContract) {
        self.contracts.push(contract);
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Distinct strikes, ascending.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self.contracts.iter().map(|c| c.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.option_type == OptionType::Call)
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.option_type == OptionType::Put)
    }

    /// Keep only strikes within `width` of spot (inclusive on both sides).
    pub fn within_strike_window(&self, spot: f64, width: f64) -> OptionsChain {
        let lower = spot - width;
        let upper = spot + width;
        OptionsChain {
            symbol: self.symbol.clone(),
            expiration: self.expiration,
            contracts: self
                .contracts
                .iter()
                .filter(|c| {
                    let k = c.strike_f64();
                    k >= lower && k <= upper
                })
                .cloned()
                .collect(),
        }
    }
}

/// Series granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    OneMinute,
    FiveMinute,
    Daily,
}

impl Timeframe {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "one_minute" => Some(Self::OneMinute),
            "5m" | "5min" | "five_minute" => Some(Self::FiveMinute),
            "1d" | "daily" | "day" => Some(Self::Daily),
            _ => None,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Self::Daily)
    }
}

/// One OHLCV bar of the underlying.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 21).unwrap()
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("P"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("call"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("PUT"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_chain_strikes_sorted_and_deduped() {
        let mut chain = OptionsChain::new("SPY", Some(expiry()));
        chain.add_contract(OptionContract::new(dec!(405), expiry(), OptionType::Call, dec!(1.2), 10));
        chain.add_contract(OptionContract::new(dec!(400), expiry(), OptionType::Put, dec!(2.5), 10));
        chain.add_contract(OptionContract::new(dec!(400), expiry(), OptionType::Call, dec!(4.0), 10));

        assert_eq!(chain.strikes(), vec![dec!(400), dec!(405)]);
        assert_eq!(chain.calls().count(), 2);
        assert_eq!(chain.puts().count(), 1);
    }

    #[test]
    fn test_strike_window_filter() {
        let mut chain = OptionsChain::new("SPY", Some(expiry()));
        for k in [370, 380, 400, 420, 430] {
            chain.add_contract(OptionContract::new(
                Decimal::from(k),
                expiry(),
                OptionType::Call,
                dec!(1),
                1,
            ));
        }

        let filtered = chain.within_strike_window(400.0, 20.0);
        assert_eq!(filtered.strikes(), vec![dec!(380), dec!(400), dec!(420)]);
    }

    #[test]
    fn test_typical_price() {
        let bar = PriceBar::new(Utc::now(), 10.0, 12.0, 9.0, 11.0, 100.0);
        assert!((bar.typical_price() - 32.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!(Timeframe::from_str("5min"), Some(Timeframe::FiveMinute));
        assert_eq!(Timeframe::from_str("daily"), Some(Timeframe::Daily));
        assert!(Timeframe::OneMinute.is_intraday());
        assert!(!Timeframe::Daily.is_intraday());
    }
}
