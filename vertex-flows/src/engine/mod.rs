//! Analysis engine module.
//!
//! Provides:
//! - `MarketAnalyzer` running the options and price pipelines
//! - Report types for both pipelines
//! - Caller-owned bounded price trail

pub mod analyzer;
pub mod price_trail;

pub use analyzer::{
    MarketAnalyzer, MarketSnapshot, MarketStructureReport, OptionsAnalysis, PriceAnalysis,
};
pub use price_trail::{PriceTrail, TrailConfig, TrailPoint};
