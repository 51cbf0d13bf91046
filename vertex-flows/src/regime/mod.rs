//! Market state classification module.
//!
//! Categorizes dealer positioning from the signs of total GEX and VEX:
//! - Balanced: +GEX / +VEX
//! - Trending: +GEX / -VEX
//! - Reversing: -GEX / +VEX
//! - Volatile: -GEX / -VEX
//! - Undefined: either total is zero

pub mod classifier;

pub use classifier::MarketState;
