//! Rating prior configuration
//!
//! The fixed list of supported classes lives here and is passed explicitly
//! to the match processor and rating engine; it is never read as ambient
//! global state.

use serde::{Deserialize, Serialize};

/// Prior belief and class roster for a pickup format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Skill mean assigned to a player the first time they are seen
    pub prior_rating: f64,
    /// Classes a rating row is bootstrapped for; a player entering the
    /// system is pre-registered across all of them at once
    pub classes: Vec<String>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            prior_rating: 16.0,
            classes: vec![
                "scout".to_string(),
                "soldier".to_string(),
                "demoman".to_string(),
                "medic".to_string(),
            ],
        }
    }
}

impl RatingConfig {
    /// Prior uncertainty: one third of the prior mean
    pub fn prior_uncertainty(&self) -> f64 {
        self.prior_rating / 3.0
    }
}
