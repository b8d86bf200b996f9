//! Match source adapter for the remote pickup platform
//!
//! This module defines the wire models for the site's games listing and
//! the paging client that fetches new matches incrementally.

pub mod client;
pub mod models;

// Re-export commonly used types
pub use client::{HttpMatchSource, MatchSource};
pub use models::{MatchPage, MatchPhase, PickupMatch, PickupPlayer, Score, Slot};
