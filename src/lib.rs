//! Pickup Ratings - per-class skill ratings for pickup-game sites
//!
//! This crate ingests finished matches from tf2pickup-style sites,
//! maintains Weng-Lin (OpenSkill) skill beliefs per player and class,
//! and serves the resulting standings through a read-only JSON API.

pub mod collector;
pub mod config;
pub mod error;
pub mod ledger;
pub mod rating;
pub mod source;
pub mod types;
pub mod utils;
pub mod web;

// Re-export commonly used types and traits
pub use error::{CollectorError, Result};
pub use types::*;

// Re-export key components
pub use collector::MatchCollector;
pub use ledger::{LedgerReader, RatingLedger};
pub use source::MatchSource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
