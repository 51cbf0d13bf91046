//! Market state classifier.
//!
//! Maps the signs of total GEX and total VEX to one of five states. The
//! state is recomputed from scratch every evaluation, so it may flicker
//! around zero crossings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exposure::ExposureTotals;

/// Market state classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketState {
    /// Either total is zero (or not a number).
    Undefined,
    /// +GEX / +VEX.
    Balanced,
    /// +GEX / -VEX.
    Trending,
    /// -GEX / +VEX.
    Reversing,
    /// -GEX / -VEX.
    Volatile,
}

impl MarketState {
    /// Classify from total GEX and total VEX.
    pub fn classify(total_gex: f64, total_vex: f64) -> Self {
        if total_gex > 0.0 && total_vex > 0.0 {
            Self::Balanced
        } else if total_gex > 0.0 && total_vex < 0.0 {
            Self::Trending
        } else if total_gex < 0.0 && total_vex > 0.0 {
            Self::Reversing
        } else if total_gex < 0.0 && total_vex < 0.0 {
            Self::Volatile
        } else {
            Self::Undefined
        }
    }

    pub fn from_totals(totals: &ExposureTotals) -> Self {
        Self::classify(totals.total_gex, totals.total_vex)
    }

    /// Numeric code, 0-4.
    pub fn number(&self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::Balanced => 1,
            Self::Trending => 2,
            Self::Reversing => 3,
            Self::Volatile => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Balanced => "Balanced",
            Self::Trending => "Trending",
            Self::Reversing => "Reversing",
            Self::Volatile => "Volatile",
        }
    }

    /// Description of the expected price behaviour.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Balanced => "+GEX/+VEX (Balanced - Price stabilizes between GEX levels)",
            Self::Trending => "+GEX/-VEX (Trending - Momentum follows breakouts)",
            Self::Reversing => "-GEX/+VEX (Reversing - Price gravitates to GEX strikes)",
            Self::Volatile => "-GEX/-VEX (Volatile - Accelerated directional moves)",
        }
    }
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State {}: {}", self.number(), self.label())
    }
}
