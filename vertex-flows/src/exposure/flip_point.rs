//! Flip point: the strike whose open-interest-weighted delta sits closest
//! to 0.5.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::data::AnnotatedContract;

const TARGET_DELTA: f64 = 0.5;

/// OI-weighted delta per strike, ascending by strike. Strikes whose open
/// interest sums to zero have no weighting and are left out.
pub fn weighted_deltas(contracts: &[AnnotatedContract]) -> Vec<(Decimal, f64)> {
    let mut sums: BTreeMap<Decimal, (f64, f64)> = BTreeMap::new();

    for contract in contracts {
        let oi = contract.open_interest();
        let entry = sums.entry(contract.strike()).or_insert((0.0, 0.0));
        entry.0 += contract.greeks.delta * oi;
        entry.1 += oi;
    }

    sums.into_iter()
        .filter(|(_, (_, oi))| *oi > 0.0)
        .map(|(strike, (delta_oi, oi))| (strike, delta_oi / oi))
        .filter(|(_, delta)| delta.is_finite())
        .collect()
}

/// Strike minimizing |weighted delta - 0.5|; ties go to the lower strike.
/// `None` when no strike carries open interest.
pub fn flip_point(contracts: &[AnnotatedContract]) -> Option<Decimal> {
    weighted_deltas(contracts)
        .into_iter()
        .map(|(strike, delta)| (strike, (delta - TARGET_DELTA).abs()))
        .fold(None, |best: Option<(Decimal, f64)>, (strike, diff)| match best {
            Some((_, best_diff)) if best_diff <= diff => best,
            _ => Some((strike, diff)),
        })
        .map(|(strike, _)| strike)
}
