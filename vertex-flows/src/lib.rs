pub mod analytics;
pub mod config;
pub mod data;
pub mod engine;
pub mod exposure;
pub mod pricing;
pub mod regime;
pub mod technicals;

// Re-export commonly used types
pub use config::{AnalyzerConfig, ConfigError};
pub use data::{AnnotatedContract, Greeks, OptionContract, OptionType, OptionsChain, PriceBar, Timeframe};
pub use engine::{MarketAnalyzer, MarketSnapshot, MarketStructureReport, PriceTrail};
pub use exposure::{flip_point, ExposureAggregator, ExposureProfile, ExposureTotals, StrikeExposure};
pub use pricing::{Black76, GreeksCalculator, PricingOutcome};
pub use regime::MarketState;
pub use technicals::{SupplyDemandZones, TechnicalIndicators, VolumeProfile, ZoneDetector};
pub use analytics::IvSummary;
