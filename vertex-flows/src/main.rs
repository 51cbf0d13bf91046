//! Vertex Flows CLI
//!
//! # Usage
//!
//! ```bash
//! # Full market structure report (options exposure + price levels)
//! vertex-flows analyze --chain data/spy_chain.json --bars data/spy_daily.json --spot 542.10
//!
//! # Price levels only, intraday bars, custom config
//! vertex-flows levels --bars data/spy_5min.json --timeframe 5min --config config/default.toml
//! ```
//!
//! Reports are written to stdout as JSON. Set `RUST_LOG` to change log
//! verbosity.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use vertex_flows::data::{load_bars, load_chain};
use vertex_flows::engine::{MarketAnalyzer, MarketSnapshot, PriceTrail};
use vertex_flows::{AnalyzerConfig, Timeframe};

#[derive(Parser)]
#[command(name = "vertex-flows")]
#[command(about = "Options exposure and market structure analytics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an option chain and a bar series
    Analyze {
        /// Chain JSON file
        #[arg(long)]
        chain: PathBuf,

        /// Bar JSON file
        #[arg(long)]
        bars: PathBuf,

        /// Current underlying price
        #[arg(long)]
        spot: f64,

        /// Previous session close
        #[arg(long)]
        prev_close: Option<f64>,

        /// Underlying symbol
        #[arg(long, default_value = "SPY")]
        symbol: String,

        /// Chain expiration (YYYY-MM-DD); inferred from the chain if omitted
        #[arg(long)]
        expiration: Option<String>,

        /// Bar timeframe (1min, 5min, daily)
        #[arg(long, default_value = "daily")]
        timeframe: String,

        /// Evaluation time (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compute indicators, volume profile and supply/demand zones
    Levels {
        /// Bar JSON file
        #[arg(long)]
        bars: PathBuf,

        /// Bar timeframe (1min, 5min, daily)
        #[arg(long, default_value = "daily")]
        timeframe: String,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => AnalyzerConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn parse_timeframe(s: &str) -> Result<Timeframe> {
    Timeframe::from_str(s).ok_or_else(|| anyhow!("Unknown timeframe '{}'", s))
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    chain: PathBuf,
    bars: PathBuf,
    spot: f64,
    prev_close: Option<f64>,
    symbol: String,
    expiration: Option<String>,
    timeframe: String,
    now: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(anyhow!("Spot must be a positive number, got {}", spot));
    }

    let analyzer = MarketAnalyzer::new(load_config(config)?)?;
    let timeframe = parse_timeframe(&timeframe)?;
    let expiration = expiration
        .map(|e| NaiveDate::parse_from_str(&e, "%Y-%m-%d"))
        .transpose()
        .context("Invalid expiration date format")?;
    let now = match now {
        Some(n) => DateTime::parse_from_rfc3339(&n)
            .context("Invalid evaluation time")?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let chain = load_chain(&chain, &symbol, expiration)
        .with_context(|| format!("Failed to load chain {}", chain.display()))?;
    let bars = load_bars(&bars).with_context(|| format!("Failed to load bars {}", bars.display()))?;
    info!(
        "Loaded {} contracts and {} bars for {}",
        chain.len(),
        bars.len(),
        symbol
    );

    let snapshot = MarketSnapshot {
        symbol,
        spot,
        previous_close: prev_close,
        chain,
        bars,
        timeframe,
    };
    let mut trail = PriceTrail::new(analyzer.config().trail.clone());
    let report = analyzer.analyze(&snapshot, &mut trail, now);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_levels(bars: PathBuf, timeframe: String, config: Option<PathBuf>) -> Result<()> {
    let analyzer = MarketAnalyzer::new(load_config(config)?)?;
    let timeframe = parse_timeframe(&timeframe)?;
    let bars = load_bars(&bars).with_context(|| format!("Failed to load bars {}", bars.display()))?;

    let analysis = analyzer.analyze_prices(&bars, timeframe);

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vertex_flows=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            chain,
            bars,
            spot,
            prev_close,
            symbol,
            expiration,
            timeframe,
            now,
            config,
        } => cmd_analyze(
            chain, bars, spot, prev_close, symbol, expiration, timeframe, now, config,
        )?,
        Commands::Levels {
            bars,
            timeframe,
            config,
        } => cmd_levels(bars, timeframe, config)?,
    }

    Ok(())
}
