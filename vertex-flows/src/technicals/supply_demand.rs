//! Supply and demand zones from the visible price range.
//!
//! Two scan levels start at the series' max high and min low and step
//! inward by `(max - min) / resolution`. Each step adds the volume of bars
//! whose high (supply) or low (demand) lies in the band just crossed. A side
//! stops once its accumulated volume exceeds `threshold_percent` of the
//! series volume; the zone runs from the extreme to the level where it
//! stopped. The scan ends when both sides stop or after `resolution` steps.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::PriceBar;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Share of series volume (percent) a zone must exceed.
    pub threshold_percent: f64,
    /// Number of scan steps.
    pub resolution: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 10.0,
            resolution: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub top: f64,
    pub bottom: f64,
    /// Midpoint of the zone.
    pub simple_average: f64,
    /// Scan levels weighted by the volume picked up at each.
    pub weighted_average: f64,
    /// Percent of series volume captured by the zone.
    pub volume_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyDemandZones {
    pub supply: Option<Zone>,
    pub demand: Option<Zone>,
    /// Midpoint of the max high and min low.
    pub equilibrium: f64,
    /// Mean of both weighted averages; set only when both zones exist.
    pub weighted_equilibrium: Option<f64>,
    /// Scan steps taken.
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Supply,
    Demand,
}

/// Running state of one side of the scan.
#[derive(Debug)]
struct Scan {
    side: Side,
    extreme: f64,
    prev: f64,
    volume: f64,
    weighted: f64,
    zone: Option<Zone>,
}

impl Scan {
    fn new(side: Side, extreme: f64) -> Self {
        Self {
            side,
            extreme,
            prev: extreme,
            volume: 0.0,
            weighted: 0.0,
            zone: None,
        }
    }

    fn in_band(&self, bar: &PriceBar, level: f64) -> bool {
        match self.side {
            Side::Supply => level < bar.high && bar.high <= self.prev,
            Side::Demand => self.prev <= bar.low && bar.low < level,
        }
    }

    fn step(&mut self, bars: &[PriceBar], level: f64, total_volume: f64, threshold: f64) {
        if self.zone.is_some() {
            return;
        }

        let crossed: f64 = bars
            .iter()
            .filter(|b| self.in_band(b, level))
            .map(|b| b.volume)
            .sum();
        self.volume += crossed;
        self.weighted += level * crossed;
        self.prev = level;

        let share = self.volume / total_volume * 100.0;
        if share > threshold {
            let simple_average = (self.extreme + level) / 2.0;
            let weighted_average = if self.volume > 0.0 {
                self.weighted / self.volume
            } else {
                simple_average
            };
            let (top, bottom) = match self.side {
                Side::Supply => (self.extreme, level),
                Side::Demand => (level, self.extreme),
            };
            self.zone = Some(Zone {
                top,
                bottom,
                simple_average,
                weighted_average,
                volume_share: share,
            });
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZoneDetector {
    config: ZoneConfig,
}

impl ZoneDetector {
    pub fn new(config: ZoneConfig) -> Self {
        Self { config }
    }

    /// `None` for an empty series or one with no volume. A series with no
    /// price range yields no zones.
    pub fn detect(&self, bars: &[PriceBar]) -> Option<SupplyDemandZones> {
        if bars.is_empty() {
            return None;
        }
        let total_volume: f64 = bars.iter().map(|b| b.volume).sum();
        if total_volume <= 0.0 {
            return None;
        }

        let max = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let equilibrium = (max + min) / 2.0;

        let resolution = self.config.resolution;
        let step = if resolution > 0 {
            (max - min) / resolution as f64
        } else {
            0.0
        };
        if step <= 0.0 {
            return Some(SupplyDemandZones {
                supply: None,
                demand: None,
                equilibrium,
                weighted_equilibrium: None,
                iterations: 0,
            });
        }

        let threshold = self.config.threshold_percent;
        let mut supply = Scan::new(Side::Supply, max);
        let mut demand = Scan::new(Side::Demand, min);
        let mut iterations = 0;

        for i in 0..resolution {
            iterations = i + 1;
            // computed from the extremes so rounding does not accumulate
            let offset = step * (i + 1) as f64;
            supply.step(bars, max - offset, total_volume, threshold);
            demand.step(bars, min + offset, total_volume, threshold);

            if supply.zone.is_some() && demand.zone.is_some() {
                break;
            }
        }

        let weighted_equilibrium = match (&supply.zone, &demand.zone) {
            (Some(s), Some(d)) => Some((s.weighted_average + d.weighted_average) / 2.0),
            _ => None,
        };

        debug!(
            "Zone scan finished after {} of {} steps (supply: {}, demand: {})",
            iterations,
            resolution,
            supply.zone.is_some(),
            demand.zone.is_some()
        );

        Some(SupplyDemandZones {
            supply: supply.zone,
            demand: demand.zone,
            equilibrium,
            weighted_equilibrium,
            iterations,
        })
    }
}
