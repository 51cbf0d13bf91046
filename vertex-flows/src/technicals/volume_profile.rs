//! Volume-at-price histogram over a bar series.
//!
//! The [min low, max high] range is split into equal-width bins. A bar's
//! volume is spread evenly over every bin its [low, high] range touches, so
//! the histogram always sums to the series volume.

use serde::{Deserialize, Serialize};

use crate::data::PriceBar;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub bins: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self { bins: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeProfile {
    /// Lower edge of each bin, ascending.
    pub bin_edges: Vec<f64>,
    pub bin_volumes: Vec<f64>,
    pub bin_width: f64,
    /// Midpoint of the first bin holding the most volume.
    pub point_of_control: f64,
}

impl VolumeProfile {
    /// `None` for an empty series or zero bins.
    pub fn compute(bars: &[PriceBar], bins: usize) -> Option<Self> {
        if bars.is_empty() || bins == 0 {
            return None;
        }

        let min = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let max = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let bin_width = (max - min) / bins as f64;

        let index_of = |price: f64| -> usize {
            if bin_width <= 0.0 {
                return 0;
            }
            let idx = ((price - min) / bin_width).floor();
            // the top edge belongs to the last bin
            (idx.max(0.0) as usize).min(bins - 1)
        };

        let mut bin_volumes = vec![0.0; bins];
        for bar in bars {
            let low_idx = index_of(bar.low);
            let high_idx = index_of(bar.high).max(low_idx);
            let span = (high_idx - low_idx + 1) as f64;
            for volume in &mut bin_volumes[low_idx..=high_idx] {
                *volume += bar.volume / span;
            }
        }

        let bin_edges: Vec<f64> = (0..bins).map(|i| min + bin_width * i as f64).collect();

        let poc_idx = bin_volumes
            .iter()
            .enumerate()
            .fold(0, |best, (i, v)| if *v > bin_volumes[best] { i } else { best });
        let point_of_control = bin_edges[poc_idx] + bin_width / 2.0;

        Some(Self {
            bin_edges,
            bin_volumes,
            bin_width,
            point_of_control,
        })
    }

    pub fn total_volume(&self) -> f64 {
        self.bin_volumes.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: i64, high: f64, low: f64, volume: f64) -> PriceBar {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap();
        PriceBar::new(start + Duration::minutes(i), low, high, low, high, volume)
    }

    fn sample() -> Vec<PriceBar> {
        vec![
            bar(0, 101.0, 100.0, 500.0),
            bar(1, 104.0, 100.5, 1200.0),
            bar(2, 109.5, 103.0, 800.0),
            bar(3, 110.0, 108.0, 300.0),
            bar(4, 102.0, 101.5, 2000.0),
        ]
    }

    #[test]
    fn test_volume_conserved_for_any_bin_count() {
        let bars = sample();
        let total: f64 = bars.iter().map(|b| b.volume).sum();
        for bins in [1, 2, 7, 30, 50] {
            let profile = VolumeProfile::compute(&bars, bins).unwrap();
            assert_eq!(profile.bin_volumes.len(), bins);
            assert_eq!(profile.bin_edges.len(), bins);
            assert_relative_eq!(profile.total_volume(), total, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_edges_and_poc() {
        let profile = VolumeProfile::compute(&sample(), 10).unwrap();
        assert_relative_eq!(profile.bin_width, 1.0, epsilon = 1e-12);
        assert_relative_eq!(profile.bin_edges[0], 100.0, epsilon = 1e-12);
        assert_relative_eq!(profile.bin_edges[9], 109.0, epsilon = 1e-12);
        // the 101.5-102 bar splits over bins 1 and 2; bin 1 also takes shares
        // of the first two bars
        assert_relative_eq!(profile.point_of_control, 101.5, epsilon = 1e-12);
    }

    #[test]
    fn test_single_bin_bar_gets_full_volume() {
        let bars = vec![bar(0, 110.0, 100.0, 10.0), bar(1, 100.4, 100.1, 90.0)];
        let profile = VolumeProfile::compute(&bars, 10).unwrap();
        // first bar spreads 1.0 per bin, second lands whole in bin 0
        assert_relative_eq!(profile.bin_volumes[0], 91.0, epsilon = 1e-12);
        assert_relative_eq!(profile.bin_volumes[9], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_range() {
        let bars = vec![bar(0, 50.0, 50.0, 10.0), bar(1, 50.0, 50.0, 5.0)];
        let profile = VolumeProfile::compute(&bars, 5).unwrap();
        assert_eq!(profile.bin_volumes[0], 15.0);
        assert_eq!(profile.point_of_control, 50.0);
    }

    #[test]
    fn test_empty_or_zero_bins() {
        assert!(VolumeProfile::compute(&[], 30).is_none());
        assert!(VolumeProfile::compute(&sample(), 0).is_none());
    }
}
