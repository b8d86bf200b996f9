//! Rating system integration using the Weng-Lin (OpenSkill) algorithm
//!
//! This module provides the two-team Bayesian skill update behind a
//! calculator trait, implemented with the skillratings crate.

pub mod calculator;
pub mod weng_lin;

// Re-export commonly used types
pub use calculator::{RatingCalculator, TeamRatingUpdate};
pub use weng_lin::{RatingEngineConfig, WengLinRatingCalculator};
