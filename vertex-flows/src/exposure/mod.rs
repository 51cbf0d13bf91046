//! Option exposure module.
//!
//! Provides:
//! - Per-strike and chain-level GEX / VEX / DEX / vega aggregation
//! - Call/put split of each metric and the dominant GEX strikes
//! - Flip point (OI-weighted delta nearest 0.5)

pub mod aggregator;
pub mod flip_point;

pub use aggregator::{
    key_gex_levels, ContractExposure, ExposureAggregator, ExposureProfile, ExposureSplit,
    ExposureTotals, GexLevel, StrikeExposure,
};
pub use flip_point::{flip_point, weighted_deltas};
