//! Analyzer configuration.
//!
//! Every section has defaults; a TOML file only needs the keys it changes.
//!
//! ```toml
//! [pricing]
//! risk_free_rate = 0.05
//!
//! [indicators]
//! rsi_period = 10
//! ```

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::TrailConfig;
use crate::pricing::PricingConfig;
use crate::technicals::{IndicatorConfig, ProfileConfig, ZoneConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown exchange time zone '{0}'")]
    UnknownTimezone(String),

    #[error("Invalid expiry close hour {0}")]
    InvalidCloseHour(u32),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Chain filtering and level counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Strikes further than this from spot are dropped before pricing.
    pub strike_window: f64,
    /// Number of positive and of negative GEX strikes reported.
    pub gex_levels: usize,
    /// Number of swing support and resistance prices reported.
    pub swing_levels: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            strike_window: 20.0,
            gex_levels: 2,
            swing_levels: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub pricing: PricingConfig,
    pub chain: ChainConfig,
    pub indicators: IndicatorConfig,
    pub profile: ProfileConfig,
    pub zones: ZoneConfig,
    pub trail: TrailConfig,
}

impl AnalyzerConfig {
    /// Load and validate a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        let pricing = &self.pricing;
        if !pricing.risk_free_rate.is_finite() {
            return invalid("risk_free_rate must be finite".to_string());
        }
        if pricing.exchange_timezone.parse::<Tz>().is_err() {
            return Err(ConfigError::UnknownTimezone(
                pricing.exchange_timezone.clone(),
            ));
        }
        if pricing.expiry_close_hour > 23 {
            return Err(ConfigError::InvalidCloseHour(pricing.expiry_close_hour));
        }
        if !positive(pricing.fallback_iv) {
            return invalid("fallback_iv must be positive".to_string());
        }

        if !positive(self.chain.strike_window) {
            return invalid("strike_window must be positive".to_string());
        }

        let ind = &self.indicators;
        for (name, value) in [
            ("ema_fast", ind.ema_fast),
            ("ema_slow", ind.ema_slow),
            ("sma_window", ind.sma_window),
            ("rsi_period", ind.rsi_period),
            ("bb_length", ind.bb_length),
            ("kc_length", ind.kc_length),
        ] {
            if value == 0 {
                return invalid(format!("{} must be at least 1", name));
            }
        }
        if ind.rsi_oversold >= ind.rsi_overbought {
            return invalid("rsi_oversold must be below rsi_overbought".to_string());
        }
        if !positive(ind.bb_std) || !positive(ind.kc_multiplier) {
            return invalid("band widths must be positive".to_string());
        }

        if self.profile.bins == 0 {
            return invalid("profile bins must be at least 1".to_string());
        }

        let zones = &self.zones;
        if zones.resolution == 0 {
            return invalid("zone resolution must be at least 1".to_string());
        }
        if !(zones.threshold_percent > 0.0 && zones.threshold_percent <= 100.0) {
            return invalid("zone threshold_percent must be in (0, 100]".to_string());
        }

        if self.trail.min_interval_secs < 0 {
            return invalid("trail min_interval_secs must not be negative".to_string());
        }

        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
