//! Options analytics module.
//!
//! Provides:
//! - Chain IV summary (mean IV, mean percentile rank)
//! - Put/call volume ratio

pub mod options_stats;

pub use options_stats::{put_call_ratio, IvSummary, VolumeSplit};
