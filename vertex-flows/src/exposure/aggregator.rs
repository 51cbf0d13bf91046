//! Chain exposure aggregation.
//!
//! Reduces per-contract Greeks to dollarized exposures:
//! - GEX: gamma * OI * 100 * S^2 * 0.01 (negated for puts)
//! - VEX: vanna * OI * IV * S (same sign for calls and puts)
//! - DEX: delta * OI * 100
//! - Vega: vega * OI * 100 (negated for puts)
//!
//! Contracts are grouped by strike; totals are the grand sums.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{AnnotatedContract, OptionType};

const CONTRACT_MULTIPLIER: f64 = 100.0;
const ONE_PERCENT: f64 = 0.01;

/// Exposure of a single contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractExposure {
    pub strike: Decimal,
    pub option_type: OptionType,
    pub gex: f64,
    pub vex: f64,
    pub dex: f64,
    pub vega: f64,
}

impl ContractExposure {
    pub fn from_contract(contract: &AnnotatedContract, spot: f64) -> Self {
        let oi = contract.open_interest();
        let greeks = &contract.greeks;
        let sign = match contract.option_type() {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        };

        Self {
            strike: contract.strike(),
            option_type: contract.option_type(),
            gex: sign * greeks.gamma * oi * CONTRACT_MULTIPLIER * spot * spot * ONE_PERCENT,
            vex: greeks.vanna * oi * contract.implied_volatility * spot,
            dex: greeks.delta * oi * CONTRACT_MULTIPLIER,
            vega: sign * greeks.vega * oi * CONTRACT_MULTIPLIER,
        }
    }
}

/// Summed exposure at one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeExposure {
    pub strike: Decimal,
    pub gex: f64,
    pub vex: f64,
    pub dex: f64,
}

impl StrikeExposure {
    fn empty(strike: Decimal) -> Self {
        Self {
            strike,
            gex: 0.0,
            vex: 0.0,
            dex: 0.0,
        }
    }
}

/// Chain-wide exposure totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureTotals {
    pub total_gex: f64,
    pub total_vex: f64,
    pub total_dex: f64,
    pub total_vega: f64,
}

/// Call/put decomposition of one exposure metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureSplit {
    /// |sum over calls|
    pub calls: f64,
    /// |sum over puts|
    pub puts: f64,
    /// calls / (calls + puts) * 100, or 0 when both are zero.
    pub bullish_pct: f64,
}

impl ExposureSplit {
    fn from_sums(call_sum: f64, put_sum: f64) -> Self {
        let calls = call_sum.abs();
        let puts = put_sum.abs();
        let total = calls + puts;
        Self {
            calls,
            puts,
            bullish_pct: if total != 0.0 { calls / total * 100.0 } else { 0.0 },
        }
    }
}

/// Strike-level and chain-level exposures for one evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExposureProfile {
    /// One row per distinct strike, ascending.
    pub strikes: Vec<StrikeExposure>,
    pub totals: ExposureTotals,
    pub gex_split: ExposureSplit,
    pub vex_split: ExposureSplit,
    pub dex_split: ExposureSplit,
}

/// A strike singled out for its GEX magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GexLevel {
    pub strike: Decimal,
    pub gex: f64,
}

#[derive(Default)]
struct SideSums {
    call: f64,
    put: f64,
}

impl SideSums {
    fn add(&mut self, option_type: OptionType, value: f64) {
        match option_type {
            OptionType::Call => self.call += value,
            OptionType::Put => self.put += value,
        }
    }

    fn total(&self) -> f64 {
        self.call + self.put
    }
}

/// Aggregates annotated contracts into exposures.
pub struct ExposureAggregator;

impl ExposureAggregator {
    /// Aggregate a priced chain at the given spot. An empty chain yields
    /// all-zero totals and no strikes.
    pub fn aggregate(contracts: &[AnnotatedContract], spot: f64) -> ExposureProfile {
        let mut by_strike: BTreeMap<Decimal, StrikeExposure> = BTreeMap::new();
        let mut gex = SideSums::default();
        let mut vex = SideSums::default();
        let mut dex = SideSums::default();
        let mut vega = 0.0;

        for exposure in contracts
            .iter()
            .map(|c| ContractExposure::from_contract(c, spot))
        {
            let row = by_strike
                .entry(exposure.strike)
                .or_insert_with(|| StrikeExposure::empty(exposure.strike));
            row.gex += exposure.gex;
            row.vex += exposure.vex;
            row.dex += exposure.dex;

            gex.add(exposure.option_type, exposure.gex);
            vex.add(exposure.option_type, exposure.vex);
            dex.add(exposure.option_type, exposure.dex);
            vega += exposure.vega;
        }

        ExposureProfile {
            strikes: by_strike.into_values().collect(),
            totals: ExposureTotals {
                total_gex: gex.total(),
                total_vex: vex.total(),
                total_dex: dex.total(),
                total_vega: vega,
            },
            gex_split: ExposureSplit::from_sums(gex.call, gex.put),
            vex_split: ExposureSplit::from_sums(vex.call, vex.put),
            dex_split: ExposureSplit::from_sums(dex.call, dex.put),
        }
    }
}

/// The `n` largest positive GEX strikes followed by the `n` most negative.
pub fn key_gex_levels(strikes: &[StrikeExposure], n: usize) -> Vec<GexLevel> {
    let mut positive: Vec<GexLevel> = strikes
        .iter()
        .filter(|s| s.gex > 0.0)
        .map(|s| GexLevel {
            strike: s.strike,
            gex: s.gex,
        })
        .collect();
    positive.sort_by(|a, b| b.gex.total_cmp(&a.gex));
    positive.truncate(n);

    let mut negative: Vec<GexLevel> = strikes
        .iter()
        .filter(|s| s.gex < 0.0)
        .map(|s| GexLevel {
            strike: s.strike,
            gex: s.gex,
        })
        .collect();
    negative.sort_by(|a, b| a.gex.total_cmp(&b.gex));
    negative.truncate(n);

    positive.extend(negative);
    positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Greeks, OptionContract};
    use crate::pricing::PricingOutcome;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn annotated(
        strike: Decimal,
        option_type: OptionType,
        oi: u64,
        iv: f64,
        greeks: Greeks,
    ) -> AnnotatedContract {
        AnnotatedContract {
            contract: OptionContract::new(
                strike,
                NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
                option_type,
                dec!(1),
                oi,
            ),
            time_to_expiry: Some(0.02),
            implied_volatility: iv,
            greeks,
            outcome: PricingOutcome::Solved,
        }
    }

    fn gamma(g: f64) -> Greeks {
        Greeks {
            gamma: g,
            ..Default::default()
        }
    }

    #[test]
    fn test_call_gex_matches_hand_computation() {
        let call = annotated(dec!(400), OptionType::Call, 100, 0.2, gamma(0.05));
        let exposure = ContractExposure::from_contract(&call, 400.0);
        // 0.05 * 100 * 100 * 400^2 * 0.01
        assert_relative_eq!(exposure.gex, 800_000.0, epsilon = 1e-6);

        let put = annotated(dec!(400), OptionType::Put, 100, 0.2, gamma(0.05));
        let exposure = ContractExposure::from_contract(&put, 400.0);
        assert_relative_eq!(exposure.gex, -800_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vex_has_no_put_sign_flip() {
        let greeks = Greeks {
            vanna: 0.4,
            ..Default::default()
        };
        let call = annotated(dec!(400), OptionType::Call, 10, 0.25, greeks);
        let put = annotated(dec!(400), OptionType::Put, 10, 0.25, greeks);

        let call_vex = ContractExposure::from_contract(&call, 400.0).vex;
        let put_vex = ContractExposure::from_contract(&put, 400.0).vex;
        assert_relative_eq!(call_vex, 0.4 * 10.0 * 0.25 * 400.0, epsilon = 1e-9);
        assert_eq!(call_vex, put_vex);
    }

    #[test]
    fn test_dex_and_vega_signs() {
        let put_greeks = Greeks {
            delta: -0.4,
            vega: 0.2,
            ..Default::default()
        };
        let put = annotated(dec!(395), OptionType::Put, 50, 0.2, put_greeks);
        let exposure = ContractExposure::from_contract(&put, 400.0);
        assert_relative_eq!(exposure.dex, -0.4 * 50.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(exposure.vega, -0.2 * 50.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aggregate_groups_by_strike() {
        let contracts = vec![
            annotated(dec!(405), OptionType::Call, 100, 0.2, gamma(0.01)),
            annotated(dec!(400), OptionType::Call, 100, 0.2, gamma(0.05)),
            annotated(dec!(400), OptionType::Put, 40, 0.2, gamma(0.05)),
        ];

        let profile = ExposureAggregator::aggregate(&contracts, 400.0);
        assert_eq!(profile.strikes.len(), 2);
        assert_eq!(profile.strikes[0].strike, dec!(400));
        assert_eq!(profile.strikes[1].strike, dec!(405));

        // 800k from calls, -320k from puts
        assert_relative_eq!(profile.strikes[0].gex, 480_000.0, epsilon = 1e-6);
        assert_relative_eq!(profile.strikes[1].gex, 160_000.0, epsilon = 1e-6);
        assert_relative_eq!(profile.totals.total_gex, 640_000.0, epsilon = 1e-6);

        let strike_sum: f64 = profile.strikes.iter().map(|s| s.gex).sum();
        assert_relative_eq!(strike_sum, profile.totals.total_gex, epsilon = 1e-6);
    }

    #[test]
    fn test_aggregate_order_independent() {
        let mut contracts = vec![
            annotated(dec!(400), OptionType::Call, 120, 0.2, gamma(0.03)),
            annotated(dec!(395), OptionType::Put, 80, 0.3, gamma(0.02)),
            annotated(dec!(410), OptionType::Call, 60, 0.25, gamma(0.01)),
        ];
        let forward = ExposureAggregator::aggregate(&contracts, 400.0);
        contracts.reverse();
        let reversed = ExposureAggregator::aggregate(&contracts, 400.0);

        assert_eq!(forward.strikes, reversed.strikes);
        assert_relative_eq!(forward.totals.total_gex, reversed.totals.total_gex, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_and_zero_oi_chains() {
        let empty = ExposureAggregator::aggregate(&[], 400.0);
        assert!(empty.strikes.is_empty());
        assert_eq!(empty.totals, ExposureTotals::default());

        let zero_oi = vec![
            annotated(dec!(400), OptionType::Call, 0, 0.2, gamma(0.05)),
            annotated(dec!(400), OptionType::Put, 0, 0.2, gamma(0.05)),
        ];
        let profile = ExposureAggregator::aggregate(&zero_oi, 400.0);
        assert_eq!(profile.totals.total_gex, 0.0);
        assert_eq!(profile.totals.total_vex, 0.0);
        assert_eq!(profile.totals.total_dex, 0.0);
        assert_eq!(profile.totals.total_vega, 0.0);
        assert_eq!(profile.gex_split.bullish_pct, 0.0);
    }

    #[test]
    fn test_bullish_split() {
        let contracts = vec![
            annotated(dec!(400), OptionType::Call, 300, 0.2, gamma(0.01)),
            annotated(dec!(400), OptionType::Put, 100, 0.2, gamma(0.01)),
        ];
        let profile = ExposureAggregator::aggregate(&contracts, 100.0);
        assert_relative_eq!(profile.gex_split.bullish_pct, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_key_gex_levels() {
        let strikes = vec![
            StrikeExposure { strike: dec!(395), gex: -5.0, vex: 0.0, dex: 0.0 },
            StrikeExposure { strike: dec!(400), gex: 10.0, vex: 0.0, dex: 0.0 },
            StrikeExposure { strike: dec!(405), gex: 30.0, vex: 0.0, dex: 0.0 },
            StrikeExposure { strike: dec!(410), gex: 2.0, vex: 0.0, dex: 0.0 },
            StrikeExposure { strike: dec!(390), gex: -9.0, vex: 0.0, dex: 0.0 },
        ];

        let levels = key_gex_levels(&strikes, 2);
        let picked: Vec<Decimal> = levels.iter().map(|l| l.strike).collect();
        assert_eq!(picked, vec![dec!(405), dec!(400), dec!(390), dec!(395)]);
    }
}
