//! Bounded trail of recently observed spot prices.
//!
//! The trail is the only state carried between evaluations. It is owned by
//! the caller and updated through `&mut`, so one writer at a time is
//! guaranteed by the borrow checker; sharing it across threads needs a lock
//! on the caller's side.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Maximum number of retained observations.
    pub capacity: usize,
    /// Minimum spacing between two appended observations.
    pub min_interval_secs: i64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: 80,
            min_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct PriceTrail {
    config: TrailConfig,
    points: VecDeque<TrailPoint>,
}

impl PriceTrail {
    pub fn new(config: TrailConfig) -> Self {
        Self {
            points: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Append `price` if the trail is empty or at least the minimum interval
    /// has passed since the last append. Evicts the oldest point beyond
    /// capacity. Returns whether the price was appended.
    pub fn record(&mut self, now: DateTime<Utc>, price: f64) -> bool {
        if self.config.capacity == 0 || !price.is_finite() {
            return false;
        }

        if let Some(last) = self.points.back() {
            if now - last.timestamp < Duration::seconds(self.config.min_interval_secs) {
                return false;
            }
        }

        self.points.push_back(TrailPoint {
            timestamp: now,
            price,
        });
        while self.points.len() > self.config.capacity {
            self.points.pop_front();
        }
        true
    }

    /// Prices, oldest first.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&TrailPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for PriceTrail {
    fn default() -> Self {
        Self::new(TrailConfig::default())
    }
}
