//! Per-contract implied volatility and Greeks.
//!
//! Time to expiry runs from "now" in the exchange time zone to the
//! expiration date's close, counted in whole minutes over a 365.25-day year.
//! A contract whose IV cannot be solved is annotated with the fallback IV and
//! zero Greeks; the reason is kept on the record so fallback frequency can be
//! reported.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::data::{AnnotatedContract, Greeks, OptionContract};

use super::black::{vanna, Black76, PricingError};

const MINUTES_PER_YEAR: f64 = 365.25 * 24.0 * 60.0;

/// Pricing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    /// IANA name of the exchange time zone.
    pub exchange_timezone: String,
    /// Hour (local) at which an expiring contract stops trading.
    pub expiry_close_hour: u32,
    /// IV recorded when the solver fails.
    pub fallback_iv: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0548,
            exchange_timezone: "US/Eastern".to_string(),
            expiry_close_hour: 20,
            fallback_iv: 0.30,
        }
    }
}

/// Whether a contract was priced from its own IV or from the fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PricingOutcome {
    Solved,
    Fallback(PricingError),
}

impl PricingOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// A chain after pricing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PricedChain {
    pub contracts: Vec<AnnotatedContract>,
    pub fallback_count: usize,
}

impl PricedChain {
    pub fn solved_count(&self) -> usize {
        self.contracts.len() - self.fallback_count
    }

    /// Share of contracts that fell back, in [0, 1].
    pub fn fallback_rate(&self) -> f64 {
        if self.contracts.is_empty() {
            return 0.0;
        }
        self.fallback_count as f64 / self.contracts.len() as f64
    }
}

/// Computes IV, Greeks and vanna for option contracts.
#[derive(Debug, Clone)]
pub struct GreeksCalculator {
    model: Black76,
    timezone: Tz,
    close_time: NaiveTime,
    fallback_iv: f64,
}

impl GreeksCalculator {
    pub fn new(rate: f64, timezone: Tz, close_time: NaiveTime, fallback_iv: f64) -> Self {
        Self {
            model: Black76::new(rate),
            timezone,
            close_time,
            fallback_iv,
        }
    }

    /// Build from config. Fails on an unknown time zone or close hour.
    pub fn from_config(config: &PricingConfig) -> Result<Self, ConfigError> {
        let timezone: Tz = config
            .exchange_timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(config.exchange_timezone.clone()))?;
        let close_time = NaiveTime::from_hms_opt(config.expiry_close_hour, 0, 0)
            .ok_or(ConfigError::InvalidCloseHour(config.expiry_close_hour))?;

        Ok(Self::new(
            config.risk_free_rate,
            timezone,
            close_time,
            config.fallback_iv,
        ))
    }

    pub fn model(&self) -> &Black76 {
        &self.model
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Year fraction from `now` until the expiration close.
    ///
    /// Whole minutes, floored. Non-positive once the close has passed;
    /// `None` when the local close time does not exist on that date.
    pub fn time_to_expiry(&self, expiration: NaiveDate, now: DateTime<Utc>) -> Option<f64> {
        let close = self
            .timezone
            .from_local_datetime(&expiration.and_time(self.close_time))
            .earliest()?;
        let now_local = now.with_timezone(&self.timezone);

        let seconds = (close - now_local).num_seconds() as f64;
        let minutes = (seconds / 60.0).floor();
        Some(minutes / MINUTES_PER_YEAR)
    }

    fn solve(
        &self,
        contract: &OptionContract,
        spot: f64,
        time: Option<f64>,
    ) -> Result<(f64, Greeks), PricingError> {
        let time = time.ok_or(PricingError::UnresolvedExpiry)?;
        let strike = contract.strike_f64();

        let iv = self
            .model
            .implied_vol(spot, strike, time, contract.last_f64(), contract.option_type)?;
        let mut greeks = self
            .model
            .greeks(spot, strike, time, iv, contract.option_type)?;
        greeks.vanna = vanna(spot, strike, self.model.rate, iv, time);

        Ok((iv, greeks))
    }

    /// Price one contract against the current spot.
    pub fn annotate(
        &self,
        contract: &OptionContract,
        spot: f64,
        now: DateTime<Utc>,
    ) -> AnnotatedContract {
        let time_to_expiry = self.time_to_expiry(contract.expiration, now);

        match self.solve(contract, spot, time_to_expiry) {
            Ok((iv, greeks)) => AnnotatedContract {
                contract: contract.clone(),
                time_to_expiry,
                implied_volatility: iv,
                greeks,
                outcome: PricingOutcome::Solved,
            },
            Err(reason) => {
                debug!(
                    "{} {} {}: falling back to IV {:.2} ({})",
                    contract.expiration, contract.strike, contract.option_type, self.fallback_iv, reason
                );
                AnnotatedContract {
                    contract: contract.clone(),
                    time_to_expiry,
                    implied_volatility: self.fallback_iv,
                    greeks: Greeks::default(),
                    outcome: PricingOutcome::Fallback(reason),
                }
            }
        }
    }

    /// Price every contract of a chain. Contracts are independent, so this
    /// runs in parallel; output order matches input order.
    pub fn annotate_chain(
        &self,
        contracts: &[OptionContract],
        spot: f64,
        now: DateTime<Utc>,
    ) -> PricedChain {
        let annotated: Vec<AnnotatedContract> = contracts
            .par_iter()
            .map(|c| self.annotate(c, spot, now))
            .collect();

        let fallback_count = annotated.iter().filter(|c| c.used_fallback()).count();
        info!(
            "Priced {} contracts ({} fallbacks)",
            annotated.len(),
            fallback_count
        );

        PricedChain {
            contracts: annotated,
            fallback_count,
        }
    }
}

impl Default for GreeksCalculator {
    fn default() -> Self {
        Self::new(
            0.0548,
            chrono_tz::US::Eastern,
            NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
            0.30,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use approx::assert_relative_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        // 2024-06-14 14:00 US/Eastern (EDT, UTC-4)
        Utc.with_ymd_and_hms(2024, 6, 14, 18, 0, 0).unwrap()
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 21).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = PricingConfig::default();
        assert_eq!(config.risk_free_rate, 0.0548);
        assert_eq!(config.expiry_close_hour, 20);
        assert_eq!(config.fallback_iv, 0.30);
        assert!(GreeksCalculator::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_rejects_unknown_zone() {
        let config = PricingConfig {
            exchange_timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GreeksCalculator::from_config(&config),
            Err(ConfigError::UnknownTimezone(zone)) if zone == "Mars/Olympus"
        ));
    }

    #[test]
    fn test_from_config_rejects_close_hour() {
        let config = PricingConfig {
            expiry_close_hour: 24,
            ..Default::default()
        };
        assert!(matches!(
            GreeksCalculator::from_config(&config),
            Err(ConfigError::InvalidCloseHour(24))
        ));
    }

    #[test]
    fn test_time_to_expiry_counts_minutes() {
        let calc = GreeksCalculator::default();
        // 7 days and 6 hours until 20:00 local on expiry
        let expected = (7.0 * 24.0 * 60.0 + 6.0 * 60.0) / MINUTES_PER_YEAR;
        let t = calc.time_to_expiry(expiry(), now()).unwrap();
        assert_relative_eq!(t, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_time_to_expiry_floors_partial_minutes() {
        let calc = GreeksCalculator::default();
        let now = now() + chrono::Duration::seconds(30);
        let expected = (7.0 * 24.0 * 60.0 + 6.0 * 60.0 - 1.0) / MINUTES_PER_YEAR;
        assert_relative_eq!(
            calc.time_to_expiry(expiry(), now).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_time_to_expiry_negative_after_close() {
        let calc = GreeksCalculator::default();
        let past = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert!(calc.time_to_expiry(past, now()).unwrap() < 0.0);
    }

    #[test]
    fn test_annotate_solves_consistent_price() {
        let calc = GreeksCalculator::default();
        let t = calc.time_to_expiry(expiry(), now()).unwrap();
        let price = calc.model().price(400.0, 405.0, t, 0.18, OptionType::Call);
        let contract = OptionContract::new(
            dec!(405),
            expiry(),
            OptionType::Call,
            Decimal::try_from(price).unwrap(),
            1000,
        );

        let annotated = calc.annotate(&contract, 400.0, now());
        assert_eq!(annotated.outcome, PricingOutcome::Solved);
        assert_relative_eq!(annotated.implied_volatility, 0.18, epsilon = 1e-4);
        assert!(annotated.greeks.delta > 0.0 && annotated.greeks.delta < 0.5);
        assert!(annotated.greeks.gamma > 0.0);
        assert!(annotated.greeks.vanna != 0.0);
    }

    #[test]
    fn test_annotate_falls_back_on_expired_contract() {
        let calc = GreeksCalculator::default();
        let contract = OptionContract::new(
            dec!(400),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            OptionType::Put,
            dec!(2.0),
            500,
        );

        let annotated = calc.annotate(&contract, 400.0, now());
        assert!(annotated.used_fallback());
        assert_eq!(annotated.implied_volatility, 0.30);
        assert_eq!(annotated.greeks, Greeks::default());
        assert!(annotated.time_to_expiry.unwrap() < 0.0);
    }

    #[test]
    fn test_annotate_falls_back_below_intrinsic() {
        let calc = GreeksCalculator::default();
        // Deep ITM call trading far under intrinsic
        let contract = OptionContract::new(dec!(350), expiry(), OptionType::Call, dec!(10), 10);

        let annotated = calc.annotate(&contract, 400.0, now());
        assert!(matches!(
            annotated.outcome,
            PricingOutcome::Fallback(PricingError::BelowIntrinsic { .. })
        ));
        assert_eq!(annotated.greeks.delta, 0.0);
    }

    #[test]
    fn test_annotate_chain_counts_fallbacks_and_keeps_order() {
        let calc = GreeksCalculator::default();
        let contracts = vec![
            OptionContract::new(dec!(400), expiry(), OptionType::Call, dec!(5.0), 100),
            OptionContract::new(dec!(400), expiry(), OptionType::Put, dec!(0), 100),
            OptionContract::new(dec!(410), expiry(), OptionType::Call, dec!(1.5), 100),
        ];

        let priced = calc.annotate_chain(&contracts, 400.0, now());
        assert_eq!(priced.contracts.len(), 3);
        assert_eq!(priced.fallback_count, 1);
        assert_eq!(priced.solved_count(), 2);
        assert_eq!(priced.contracts[1].contract.option_type, OptionType::Put);
        assert!(priced.contracts[1].used_fallback());
        assert_relative_eq!(priced.fallback_rate(), 1.0 / 3.0, epsilon = 1e-12);
    }
}
