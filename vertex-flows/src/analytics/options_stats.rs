//! Chain-level implied-volatility and volume statistics.

use serde::Serialize;

use crate::data::{AnnotatedContract, OptionContract, OptionType};

/// Mean IV of a priced chain and the mean percentile rank of each IV
/// within the chain.
///
/// Contracts priced with the fallback IV are left out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IvSummary {
    pub mean_iv: f64,
    /// Mean of the per-contract percentile ranks (0-100), ties averaged.
    pub mean_percentile: f64,
    pub sample_size: usize,
}

impl IvSummary {
    /// `None` when no contract has a solved IV.
    pub fn from_contracts(contracts: &[AnnotatedContract]) -> Option<Self> {
        let mut ivs: Vec<f64> = contracts
            .iter()
            .filter(|c| !c.used_fallback() && c.implied_volatility.is_finite())
            .map(|c| c.implied_volatility)
            .collect();
        if ivs.is_empty() {
            return None;
        }

        let n = ivs.len();
        let mean_iv = ivs.iter().sum::<f64>() / n as f64;

        ivs.sort_by(|a, b| a.total_cmp(b));
        let mut rank_sum = 0.0;
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j + 1 < n && ivs[j + 1] == ivs[i] {
                j += 1;
            }
            // 1-based ranks i+1..=j+1 share their average
            let avg_rank = (i + j + 2) as f64 / 2.0;
            rank_sum += avg_rank * (j - i + 1) as f64;
            i = j + 1;
        }
        let mean_percentile = rank_sum / n as f64 / n as f64 * 100.0;

        Some(Self {
            mean_iv,
            mean_percentile,
            sample_size: n,
        })
    }
}

/// Traded volume on each side of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeSplit {
    pub put_volume: u64,
    pub call_volume: u64,
}

impl VolumeSplit {
    pub fn from_contracts<'a>(contracts: impl IntoIterator<Item = &'a OptionContract>) -> Self {
        let mut split = Self {
            put_volume: 0,
            call_volume: 0,
        };
        for contract in contracts {
            match contract.option_type {
                OptionType::Put => split.put_volume += contract.volume,
                OptionType::Call => split.call_volume += contract.volume,
            }
        }
        split
    }

    /// Put volume over call volume; `None` without call volume.
    pub fn ratio(&self) -> Option<f64> {
        if self.call_volume == 0 {
            return None;
        }
        Some(self.put_volume as f64 / self.call_volume as f64)
    }
}

/// Put volume / call volume. `None` when no calls traded.
pub fn put_call_ratio(contracts: &[OptionContract]) -> Option<f64> {
    VolumeSplit::from_contracts(contracts).ratio()
}
