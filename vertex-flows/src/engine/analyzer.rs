//! Market structure analysis.
//!
//! Two independent pipelines:
//! - options: strike window -> pricing -> exposure -> flip point -> state
//! - prices: indicators -> signals / pivots -> volume profile -> zones
//!
//! `MarketAnalyzer` holds configuration only. The price trail is passed in
//! by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::analytics::{put_call_ratio, IvSummary};
use crate::config::{AnalyzerConfig, ConfigError};
use crate::data::{AnnotatedContract, OptionsChain, PriceBar, Timeframe};
use crate::exposure::{flip_point, key_gex_levels, ExposureAggregator, ExposureProfile, GexLevel};
use crate::pricing::GreeksCalculator;
use crate::regime::MarketState;
use crate::technicals::{
    key_levels, regular_session, AnnotatedBar, KeyLevels, PivotPoints, SupplyDemandZones,
    TechnicalIndicators, TrendSignals, VolumeProfile, ZoneDetector,
};

use super::price_trail::PriceTrail;

/// Output of the options pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsAnalysis {
    pub symbol: String,
    pub expiration: Option<NaiveDate>,
    pub spot: f64,
    /// Contracts in the chain before the strike window.
    pub chain_size: usize,
    /// Contracts priced for exposure.
    pub contracts: Vec<AnnotatedContract>,
    pub fallback_count: usize,
    pub exposure: ExposureProfile,
    pub market_state: MarketState,
    pub state_description: String,
    pub flip_point: Option<Decimal>,
    pub key_gex_levels: Vec<GexLevel>,
    pub iv_summary: Option<IvSummary>,
    pub put_call_ratio: Option<f64>,
}

/// Output of the price pipeline for one timeframe.
#[derive(Debug, Clone, Serialize)]
pub struct PriceAnalysis {
    pub timeframe: Timeframe,
    pub bars: Vec<AnnotatedBar>,
    pub signals: Option<TrendSignals>,
    /// Floor pivots of the last bar.
    pub pivots: Option<PivotPoints>,
    pub key_levels: KeyLevels,
    pub volume_profile: Option<VolumeProfile>,
    pub zones: Option<SupplyDemandZones>,
}

/// Inputs for one evaluation, fetched by the caller.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub spot: f64,
    pub previous_close: Option<f64>,
    pub chain: OptionsChain,
    pub bars: Vec<PriceBar>,
    pub timeframe: Timeframe,
}

/// Both pipelines plus headline numbers.
#[derive(Debug, Clone, Serialize)]
pub struct MarketStructureReport {
    pub generated_at: DateTime<Utc>,
    pub symbol: String,
    pub spot: f64,
    pub previous_close: Option<f64>,
    /// Spot minus previous close; zero without a previous close.
    pub day_change: f64,
    pub day_change_pct: Option<f64>,
    pub options: OptionsAnalysis,
    pub prices: PriceAnalysis,
    /// Trail contents after this evaluation, oldest first.
    pub price_trail: Vec<f64>,
}

pub struct MarketAnalyzer {
    config: AnalyzerConfig,
    calculator: GreeksCalculator,
    indicators: TechnicalIndicators,
    zones: ZoneDetector,
}

impl MarketAnalyzer {
    /// Validates the configuration and builds the components.
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let calculator = GreeksCalculator::from_config(&config.pricing)?;

        Ok(Self {
            indicators: TechnicalIndicators::new(config.indicators.clone()),
            zones: ZoneDetector::new(config.zones.clone()),
            calculator,
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze_options(
        &self,
        chain: &OptionsChain,
        spot: f64,
        now: DateTime<Utc>,
    ) -> OptionsAnalysis {
        let window = chain.within_strike_window(spot, self.config.chain.strike_window);
        if window.is_empty() && !chain.is_empty() {
            warn!(
                "No strikes within {} of spot {:.2} ({} contracts in chain)",
                self.config.chain.strike_window,
                spot,
                chain.len()
            );
        }

        let priced = self.calculator.annotate_chain(&window.contracts, spot, now);
        let exposure = ExposureAggregator::aggregate(&priced.contracts, spot);
        let market_state = MarketState::from_totals(&exposure.totals);
        let flip = flip_point(&priced.contracts);
        let levels = key_gex_levels(&exposure.strikes, self.config.chain.gex_levels);

        info!(
            "{}: {} strikes, GEX {:.0}, VEX {:.0}, {}",
            chain.symbol,
            exposure.strikes.len(),
            exposure.totals.total_gex,
            exposure.totals.total_vex,
            market_state
        );

        OptionsAnalysis {
            symbol: chain.symbol.clone(),
            expiration: chain.expiration,
            spot,
            chain_size: chain.len(),
            iv_summary: IvSummary::from_contracts(&priced.contracts),
            put_call_ratio: put_call_ratio(&chain.contracts),
            fallback_count: priced.fallback_count,
            contracts: priced.contracts,
            exposure,
            state_description: market_state.description().to_string(),
            market_state,
            flip_point: flip,
            key_gex_levels: levels,
        }
    }

    pub fn analyze_prices(&self, bars: &[PriceBar], timeframe: Timeframe) -> PriceAnalysis {
        let session_bars;
        let bars = if timeframe.is_intraday() && self.config.indicators.regular_session_only {
            session_bars = regular_session(bars, self.calculator.timezone());
            &session_bars[..]
        } else {
            bars
        };

        let annotated = self.indicators.annotate(bars);
        let signals = TrendSignals::from_bars(&annotated, self.indicators.config());

        info!("Annotated {} {:?} bars", annotated.len(), timeframe);

        PriceAnalysis {
            timeframe,
            signals,
            pivots: bars.last().map(PivotPoints::from_bar),
            key_levels: key_levels(bars, self.config.chain.swing_levels),
            volume_profile: VolumeProfile::compute(bars, self.config.profile.bins),
            zones: self.zones.detect(bars),
            bars: annotated,
        }
    }

    /// Run both pipelines and record the spot on the trail.
    pub fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        trail: &mut PriceTrail,
        now: DateTime<Utc>,
    ) -> MarketStructureReport {
        let options = self.analyze_options(&snapshot.chain, snapshot.spot, now);
        let prices = self.analyze_prices(&snapshot.bars, snapshot.timeframe);

        let day_change = snapshot
            .previous_close
            .map(|prev| snapshot.spot - prev)
            .unwrap_or(0.0);
        let day_change_pct = snapshot
            .previous_close
            .filter(|prev| *prev != 0.0)
            .map(|prev| day_change / prev * 100.0);

        trail.record(now, snapshot.spot);

        MarketStructureReport {
            generated_at: now,
            symbol: snapshot.symbol.clone(),
            spot: snapshot.spot,
            previous_close: snapshot.previous_close,
            day_change,
            day_change_pct,
            options,
            prices,
            price_trail: trail.prices(),
        }
    }
}
