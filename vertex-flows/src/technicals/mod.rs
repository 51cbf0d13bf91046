//! Price-bar analytics module.
//!
//! Provides:
//! - Moving averages, RSI, Bollinger / Keltner bands, squeeze and VWAP
//! - Trend signals, floor pivots and swing levels
//! - Trading-session classification
//! - Volume profile with point of control
//! - Supply / demand zones

pub mod indicators;
pub mod session;
pub mod signals;
pub mod supply_demand;
pub mod volume_profile;

pub use indicators::{
    atr, bollinger_bands, ema, keltner_channels, rolling_mean, rolling_std, rsi, sma, squeeze,
    true_range, vwap, AnnotatedBar, Bands, IndicatorConfig, TechnicalIndicators,
};
pub use session::{regular_session, MarketSession};
pub use signals::{
    key_levels, CrossSignal, KeyLevels, PivotPoints, RsiZone, SqueezeStatus, TrendBias,
    TrendSignals, VwapPosition,
};
pub use supply_demand::{SupplyDemandZones, Zone, ZoneConfig, ZoneDetector};
pub use volume_profile::{ProfileConfig, VolumeProfile};
