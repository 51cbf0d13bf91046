//! JSON loaders for chain and bar files.
//!
//! The chain file uses the broker response shape:
//! `{"options": {"option": [{"strike", "option_type", "last",
//! "open_interest", "volume", "expiration_date"}, ...]}}`.
//! A `null` `options` field means the broker had nothing for the expiration.
//!
//! The bar file is a JSON array of `{"timestamp", "open", "high", "low",
//! "close", "volume"}` objects.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{OptionContract, OptionType, OptionsChain, PriceBar};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct ChainResponse {
    options: Option<OptionList>,
}

#[derive(Debug, Deserialize)]
struct OptionList {
    option: Vec<RawOptionRecord>,
}

/// One row of the broker chain response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOptionRecord {
    pub strike: f64,
    pub option_type: String,
    pub last: Option<f64>,
    #[serde(default)]
    pub open_interest: u64,
    #[serde(default)]
    pub volume: Option<u64>,
    pub expiration_date: String,
}

impl RawOptionRecord {
    /// Convert to a contract. `Ok(None)` means the row has no usable trade
    /// price and is skipped.
    pub fn to_contract(&self) -> Result<Option<OptionContract>, LoaderError> {
        let option_type = OptionType::from_str(&self.option_type).ok_or_else(|| {
            LoaderError::InvalidData(format!("unknown option type '{}'", self.option_type))
        })?;
        let expiration = NaiveDate::parse_from_str(&self.expiration_date, "%Y-%m-%d")
            .map_err(|e| {
                LoaderError::InvalidData(format!(
                    "bad expiration date '{}': {}",
                    self.expiration_date, e
                ))
            })?;
        let strike = Decimal::try_from(self.strike)
            .map_err(|e| LoaderError::InvalidData(format!("bad strike {}: {}", self.strike, e)))?;

        let last = match self.last.map(Decimal::try_from) {
            Some(Ok(last)) => last,
            _ => return Ok(None),
        };

        Ok(Some(
            OptionContract::new(strike, expiration, option_type, last, self.open_interest)
                .with_volume(self.volume.unwrap_or(0)),
        ))
    }
}

fn read_file(path: &Path) -> Result<String, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.display().to_string()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Parse a chain response body.
///
/// Without an explicit expiration the nearest one in the response is used.
pub fn parse_chain(
    body: &str,
    symbol: &str,
    expiration: Option<NaiveDate>,
) -> Result<OptionsChain, LoaderError> {
    let response: ChainResponse = serde_json::from_str(body)?;
    let mut chain = OptionsChain::new(symbol, expiration);

    let Some(list) = response.options else {
        warn!("No options data found for {}", symbol);
        return Ok(chain);
    };

    let mut skipped = 0usize;
    for record in &list.option {
        match record.to_contract()? {
            Some(contract) => {
                if let Some(exp) = expiration {
                    if contract.expiration != exp {
                        continue;
                    }
                }
                chain.add_contract(contract);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{}: skipped {} contracts without a last price", symbol, skipped);
    }
    if chain.expiration.is_none() {
        chain.expiration = chain.contracts.iter().map(|c| c.expiration).min();
        if let Some(nearest) = chain.expiration {
            chain.contracts.retain(|c| c.expiration == nearest);
        }
    }
    debug!("Parsed {} contracts for {}", chain.len(), symbol);

    Ok(chain)
}

/// Load an option chain from a JSON file.
pub fn load_chain(
    path: impl AsRef<Path>,
    symbol: &str,
    expiration: Option<NaiveDate>,
) -> Result<OptionsChain, LoaderError> {
    let body = read_file(path.as_ref())?;
    parse_chain(&body, symbol, expiration)
}

/// Parse a bar series, returning it sorted by timestamp.
pub fn parse_bars(body: &str) -> Result<Vec<PriceBar>, LoaderError> {
    let mut bars: Vec<PriceBar> = serde_json::from_str(body)?;

    if let Some(bad) = bars.iter().find(|b| !b.is_finite()) {
        return Err(LoaderError::InvalidData(format!(
            "non-finite values in bar at {}",
            bad.timestamp
        )));
    }

    bars.sort_by_key(|b| b.timestamp);
    if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(LoaderError::InvalidData(format!(
            "duplicate bar timestamp {}",
            pair[0].timestamp
        )));
    }

    Ok(bars)
}

/// Load a bar series from a JSON file.
pub fn load_bars(path: impl AsRef<Path>) -> Result<Vec<PriceBar>, LoaderError> {
    let body = read_file(path.as_ref())?;
    parse_bars(&body)
}
