//! Signals read off the most recent annotated bar, plus floor pivots and
//! swing levels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::PriceBar;

use super::indicators::{AnnotatedBar, IndicatorConfig};

/// RSI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    /// Classify with the default 70 / 30 bounds.
    pub fn classify(rsi: f64) -> Self {
        Self::classify_with(rsi, 70.0, 30.0)
    }

    pub fn classify_with(rsi: f64, overbought: f64, oversold: f64) -> Self {
        if rsi > overbought {
            Self::Overbought
        } else if rsi < oversold {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overbought => "Overbought",
            Self::Oversold => "Oversold",
            Self::Neutral => "Neutral",
        }
    }
}

/// Squeeze state at the end of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SqueezeStatus {
    /// The last bar is in a squeeze; `bars` counts the trailing run.
    InSqueeze { bars: usize },
    NoSqueeze,
    /// No squeeze value has been computed yet.
    NoData,
}

impl SqueezeStatus {
    pub fn from_flags(flags: &[Option<bool>]) -> Self {
        match flags.last().copied().flatten() {
            None => Self::NoData,
            Some(false) => Self::NoSqueeze,
            Some(true) => {
                let bars = flags
                    .iter()
                    .rev()
                    .take_while(|f| **f == Some(true))
                    .count();
                Self::InSqueeze { bars }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InSqueeze { .. })
    }
}

impl fmt::Display for SqueezeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSqueeze { bars } => write!(f, "IN SQUEEZE ({} bars)", bars),
            Self::NoSqueeze => write!(f, "NO SQUEEZE"),
            Self::NoData => write!(f, "No data available"),
        }
    }
}

/// Fast EMA relative to slow EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendBias {
    Bullish,
    Bearish,
}

/// Slow EMA relative to the long SMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossSignal {
    GoldenCross,
    DeathCross,
}

/// Last close relative to VWAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VwapPosition {
    Above,
    Below,
}

/// Summary of the latest bar's indicator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignals {
    pub ema_trend: TrendBias,
    pub ma_cross: CrossSignal,
    pub vwap: Option<f64>,
    pub vwap_position: Option<VwapPosition>,
    pub rsi: f64,
    pub rsi_zone: RsiZone,
    pub squeeze: SqueezeStatus,
}

impl TrendSignals {
    /// `None` for an empty series. Equal values fall on the bearish side.
    pub fn from_bars(bars: &[AnnotatedBar], config: &IndicatorConfig) -> Option<Self> {
        let last = bars.last()?;

        let ema_trend = if last.ema_fast > last.ema_slow {
            TrendBias::Bullish
        } else {
            TrendBias::Bearish
        };
        let ma_cross = if last.ema_slow > last.sma {
            CrossSignal::GoldenCross
        } else {
            CrossSignal::DeathCross
        };
        let vwap_position = last.vwap.map(|vwap| {
            if last.bar.close > vwap {
                VwapPosition::Above
            } else {
                VwapPosition::Below
            }
        });

        let flags: Vec<Option<bool>> = bars.iter().map(|b| b.squeeze).collect();

        Some(Self {
            ema_trend,
            ma_cross,
            vwap: last.vwap,
            vwap_position,
            rsi: last.rsi,
            rsi_zone: RsiZone::classify_with(last.rsi, config.rsi_overbought, config.rsi_oversold),
            squeeze: SqueezeStatus::from_flags(&flags),
        })
    }
}

/// Classic floor pivots from a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

impl PivotPoints {
    pub fn from_bar(bar: &PriceBar) -> Self {
        let pivot = (bar.high + bar.low + bar.close) / 3.0;
        let range = bar.high - bar.low;
        Self {
            pivot,
            r1: 2.0 * pivot - bar.low,
            r2: pivot + range,
            s1: 2.0 * pivot - bar.high,
            s2: pivot - range,
        }
    }
}

/// Swing support and resistance prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyLevels {
    /// Lowest lows, ascending.
    pub support: Vec<f64>,
    /// Highest highs, descending.
    pub resistance: Vec<f64>,
}

/// The `n` lowest lows and `n` highest highs of the series.
pub fn key_levels(bars: &[PriceBar], n: usize) -> KeyLevels {
    let mut lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let mut highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    lows.sort_by(|a, b| a.total_cmp(b));
    highs.sort_by(|a, b| b.total_cmp(a));
    lows.truncate(n);
    highs.truncate(n);

    KeyLevels {
        support: lows,
        resistance: highs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::technicals::TechnicalIndicators;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn bar(i: i64, high: f64, low: f64, close: f64) -> PriceBar {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        PriceBar::new(start + Duration::days(i), close, high, low, close, 1_000.0)
    }

    #[test]
    fn test_rsi_zone_bounds() {
        assert_eq!(RsiZone::classify(70.1), RsiZone::Overbought);
        assert_eq!(RsiZone::classify(70.0), RsiZone::Neutral);
        assert_eq!(RsiZone::classify(30.0), RsiZone::Neutral);
        assert_eq!(RsiZone::classify(29.9), RsiZone::Oversold);
    }

    #[test]
    fn test_squeeze_status_counts_trailing_run() {
        let flags = [None, Some(true), Some(false), Some(true), Some(true)];
        assert_eq!(SqueezeStatus::from_flags(&flags), SqueezeStatus::InSqueeze { bars: 2 });
        assert_eq!(
            SqueezeStatus::from_flags(&[Some(true), Some(false)]),
            SqueezeStatus::NoSqueeze
        );
        assert_eq!(SqueezeStatus::from_flags(&[None, None]), SqueezeStatus::NoData);
        assert_eq!(SqueezeStatus::from_flags(&[]), SqueezeStatus::NoData);
        assert_eq!(
            SqueezeStatus::InSqueeze { bars: 3 }.to_string(),
            "IN SQUEEZE (3 bars)"
        );
    }

    #[test]
    fn test_pivots() {
        let pivots = PivotPoints::from_bar(&bar(0, 110.0, 100.0, 105.0));
        assert_relative_eq!(pivots.pivot, 105.0, epsilon = 1e-12);
        assert_relative_eq!(pivots.r1, 110.0, epsilon = 1e-12);
        assert_relative_eq!(pivots.s1, 100.0, epsilon = 1e-12);
        assert_relative_eq!(pivots.r2, 115.0, epsilon = 1e-12);
        assert_relative_eq!(pivots.s2, 95.0, epsilon = 1e-12);
    }

    #[test]
    fn test_key_levels() {
        let bars = vec![
            bar(0, 12.0, 9.0, 10.0),
            bar(1, 15.0, 11.0, 14.0),
            bar(2, 13.0, 8.0, 9.0),
            bar(3, 14.0, 10.0, 13.0),
        ];
        let levels = key_levels(&bars, 3);
        assert_eq!(levels.support, vec![8.0, 9.0, 10.0]);
        assert_eq!(levels.resistance, vec![15.0, 14.0, 13.0]);

        let short = key_levels(&bars[..1], 3);
        assert_eq!(short.support.len(), 1);
    }

    #[test]
    fn test_trend_signals_on_rising_series() {
        let bars: Vec<PriceBar> = (0..60)
            .map(|i| {
                let c = 100.0 + i as f64;
                bar(i, c + 1.0, c - 1.0, c)
            })
            .collect();
        let config = IndicatorConfig::default();
        let annotated = TechnicalIndicators::new(config.clone()).annotate(&bars);

        let signals = TrendSignals::from_bars(&annotated, &config).unwrap();
        assert_eq!(signals.ema_trend, TrendBias::Bullish);
        assert_eq!(signals.ma_cross, CrossSignal::GoldenCross);
        assert_eq!(signals.vwap_position, Some(VwapPosition::Above));
        // no losses at all
        assert_eq!(signals.rsi, 100.0);
        assert_eq!(signals.rsi_zone, RsiZone::Overbought);
    }

    #[test]
    fn test_trend_signals_empty() {
        assert!(TrendSignals::from_bars(&[], &IndicatorConfig::default()).is_none());
    }
}
