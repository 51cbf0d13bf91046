//! Technical indicators over an ordered bar series.
//!
//! Closing-price based unless noted. Series functions return one value per
//! input bar; rolling windows that are not yet full yield `None`.
//!
//! - EMA: seeded with the first close, alpha = 2 / (span + 1)
//! - SMA: rolling mean with a minimum of one observation
//! - RSI: simple rolling means of gains and losses (not Wilder smoothing)
//! - Bollinger: rolling mean +/- k sample standard deviations
//! - Keltner: rolling mean of close +/- m * ATR (rolling mean of true range)
//! - Squeeze: Bollinger fully inside Keltner, forward-filled
//! - VWAP: cumulative from the first bar of the slice

use serde::{Deserialize, Serialize};

use crate::data::PriceBar;

/// Neutral RSI reading.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub sma_window: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub bb_length: usize,
    pub bb_std: f64,
    pub kc_length: usize,
    pub kc_multiplier: f64,
    /// Drop intraday bars outside the regular session before annotating.
    pub regular_session_only: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            sma_window: 200,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            bb_length: 20,
            bb_std: 2.0,
            kc_length: 20,
            kc_multiplier: 1.5,
            regular_session_only: true,
        }
    }
}

/// Upper / middle / lower band series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Exponential moving average seeded by the first observation.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        let next = match out.last() {
            Some(&prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        out.push(next);
    }
    out
}

/// Simple moving average that shrinks its window at the start of the
/// series instead of leaving it undefined.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }
    out
}

/// Rolling mean requiring a full window.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Rolling sample standard deviation (n - 1) requiring a full window.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window < 2 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            Some(var.sqrt())
        })
        .collect()
}

/// Relative Strength Index with simple rolling averages.
///
/// A window with no losses reads 100 when it has gains and 50 when it is
/// flat. Warm-up readings are 50, so a series shorter than `period + 1` is
/// neutral throughout.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n < period + 1 {
        return vec![RSI_NEUTRAL; n];
    }

    // changes[i] is close[i] - close[i - 1]; index 0 has no change.
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change >= 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    (0..n)
        .map(|i| {
            if i < period {
                return RSI_NEUTRAL;
            }
            let window = i + 1 - period..=i;
            let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
            let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
            if avg_loss == 0.0 {
                // Only gains saturate at 100; a flat window is undefined.
                return if avg_gain > 0.0 { 100.0 } else { RSI_NEUTRAL };
            }
            let rs = avg_gain / avg_loss;
            let value = 100.0 - 100.0 / (1.0 + rs);
            if value.is_finite() {
                value
            } else {
                RSI_NEUTRAL
            }
        })
        .collect()
}

/// Bollinger Bands: rolling mean +/- `num_std` standard deviations.
pub fn bollinger_bands(closes: &[f64], length: usize, num_std: f64) -> Bands {
    let middle = rolling_mean(closes, length);
    let std = rolling_std(closes, length);

    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some((*m)? + num_std * (*s)?))
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some((*m)? - num_std * (*s)?))
        .collect();

    Bands {
        upper,
        middle,
        lower,
    }
}

/// True range: max(high - low, |high - prev close|, |low - prev close|).
/// The first bar has no previous close and uses high - low.
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            match i.checked_sub(1).map(|p| bars[p].close) {
                Some(prev_close) => range
                    .max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs()),
                None => range,
            }
        })
        .collect()
}

/// Average true range as a rolling mean of true range.
pub fn atr(bars: &[PriceBar], length: usize) -> Vec<Option<f64>> {
    rolling_mean(&true_range(bars), length)
}

/// Keltner Channels: rolling mean of close +/- `multiplier` * ATR.
pub fn keltner_channels(bars: &[PriceBar], length: usize, multiplier: f64) -> Bands {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let middle = rolling_mean(&closes, length);
    let atr = atr(bars, length);

    let upper = middle
        .iter()
        .zip(&atr)
        .map(|(m, a)| Some((*m)? + multiplier * (*a)?))
        .collect();
    let lower = middle
        .iter()
        .zip(&atr)
        .map(|(m, a)| Some((*m)? - multiplier * (*a)?))
        .collect();

    Bands {
        upper,
        middle,
        lower,
    }
}

/// Squeeze flag: Bollinger upper <= Keltner upper and Bollinger lower >=
/// Keltner lower. Once a value exists, gaps carry the last value forward.
pub fn squeeze(bollinger: &Bands, keltner: &Bands) -> Vec<Option<bool>> {
    let mut last: Option<bool> = None;
    (0..bollinger.upper.len())
        .map(|i| {
            let current = match (
                bollinger.upper[i],
                bollinger.lower[i],
                keltner.upper.get(i).copied().flatten(),
                keltner.lower.get(i).copied().flatten(),
            ) {
                (Some(bb_up), Some(bb_lo), Some(kc_up), Some(kc_lo)) => {
                    Some(bb_up <= kc_up && bb_lo >= kc_lo)
                }
                _ => None,
            };
            if current.is_some() {
                last = current;
            }
            last
        })
        .collect()
}

/// Cumulative VWAP from the first bar of the slice. `None` while the
/// cumulative volume is zero.
pub fn vwap(bars: &[PriceBar]) -> Vec<Option<f64>> {
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    bars.iter()
        .map(|bar| {
            cum_pv += bar.typical_price() * bar.volume;
            cum_vol += bar.volume;
            (cum_vol > 0.0).then(|| cum_pv / cum_vol)
        })
        .collect()
}

/// A bar with its derived indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedBar {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub sma: f64,
    pub rsi: f64,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr: Option<f64>,
    pub kc_upper: Option<f64>,
    pub kc_middle: Option<f64>,
    pub kc_lower: Option<f64>,
    pub squeeze: Option<bool>,
    pub vwap: Option<f64>,
}

/// Computes all indicator columns for a series.
#[derive(Debug, Clone, Default)]
pub struct TechnicalIndicators {
    config: IndicatorConfig,
}

impl TechnicalIndicators {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Annotate every bar. Empty input gives empty output.
    pub fn annotate(&self, bars: &[PriceBar]) -> Vec<AnnotatedBar> {
        let cfg = &self.config;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let ema_fast = ema(&closes, cfg.ema_fast);
        let ema_slow = ema(&closes, cfg.ema_slow);
        let sma = sma(&closes, cfg.sma_window);
        let rsi = rsi(&closes, cfg.rsi_period);
        let bollinger = bollinger_bands(&closes, cfg.bb_length, cfg.bb_std);
        let keltner = keltner_channels(bars, cfg.kc_length, cfg.kc_multiplier);
        let atr = atr(bars, cfg.kc_length);
        let squeeze = squeeze(&bollinger, &keltner);
        let vwap = vwap(bars);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| AnnotatedBar {
                bar: *bar,
                ema_fast: ema_fast.get(i).copied().unwrap_or(bar.close),
                ema_slow: ema_slow.get(i).copied().unwrap_or(bar.close),
                sma: sma.get(i).copied().unwrap_or(bar.close),
                rsi: rsi[i],
                bb_upper: bollinger.upper[i],
                bb_middle: bollinger.middle[i],
                bb_lower: bollinger.lower[i],
                atr: atr[i],
                kc_upper: keltner.upper[i],
                kc_middle: keltner.middle[i],
                kc_lower: keltner.lower[i],
                squeeze: squeeze[i],
                vwap: vwap[i],
            })
            .collect()
    }
}
