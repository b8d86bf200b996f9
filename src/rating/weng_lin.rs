//! Weng-Lin (OpenSkill) rating system implementation
//!
//! Concrete calculator over the skillratings crate. The two teams are
//! treated as entrants in a scored contest; the scoreline picks the
//! outcome and the Weng-Lin update moves every member's belief.

use crate::config::RatingConfig;
use crate::error::CollectorError;
use crate::rating::calculator::{RatingCalculator, TeamRatingUpdate};
use crate::types::SkillBelief;
use serde::{Deserialize, Serialize};
use skillratings::weng_lin::{weng_lin_two_teams, WengLinConfig, WengLinRating};
use skillratings::Outcomes;

/// Configuration for the Weng-Lin rating engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingEngineConfig {
    /// Core Weng-Lin parameters
    pub weng_lin: WengLinConfig,
    /// Skill mean assigned to unseen players; the prior uncertainty is a
    /// third of this
    pub prior_rating: f64,
}

impl Default for RatingEngineConfig {
    fn default() -> Self {
        Self {
            weng_lin: WengLinConfig::default(),
            prior_rating: 16.0,
        }
    }
}

impl From<&RatingConfig> for RatingEngineConfig {
    fn from(config: &RatingConfig) -> Self {
        Self {
            weng_lin: WengLinConfig::default(),
            prior_rating: config.prior_rating,
        }
    }
}

impl RatingEngineConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.weng_lin.beta <= 0.0 {
            return Err(CollectorError::ConfigurationError {
                message: "Beta must be positive".to_string(),
            }
            .into());
        }

        if self.weng_lin.uncertainty_tolerance < 0.0 {
            return Err(CollectorError::ConfigurationError {
                message: "Uncertainty tolerance must be non-negative".to_string(),
            }
            .into());
        }

        if self.prior_rating <= 0.0 {
            return Err(CollectorError::ConfigurationError {
                message: "Prior rating must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Weng-Lin rating calculator implementation
#[derive(Debug)]
pub struct WengLinRatingCalculator {
    config: RatingEngineConfig,
}

impl WengLinRatingCalculator {
    /// Create a new Weng-Lin rating calculator
    pub fn new(config: RatingEngineConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }
}

impl RatingCalculator for WengLinRatingCalculator {
    fn rate_teams(
        &self,
        red: &[SkillBelief],
        blu: &[SkillBelief],
        red_score: i64,
        blu_score: i64,
    ) -> crate::error::Result<TeamRatingUpdate> {
        if red.is_empty() || blu.is_empty() {
            return Err(CollectorError::RatingCalculationFailed {
                reason: format!(
                    "both teams need at least one player (red: {}, blu: {})",
                    red.len(),
                    blu.len()
                ),
            }
            .into());
        }

        let red_ratings: Vec<WengLinRating> = red.iter().cloned().map(Into::into).collect();
        let blu_ratings: Vec<WengLinRating> = blu.iter().cloned().map(Into::into).collect();

        // Outcome is seen from the red team's perspective.
        let outcome = match red_score.cmp(&blu_score) {
            std::cmp::Ordering::Greater => Outcomes::WIN,
            std::cmp::Ordering::Less => Outcomes::LOSS,
            std::cmp::Ordering::Equal => Outcomes::DRAW,
        };

        let (new_red, new_blu) =
            weng_lin_two_teams(&red_ratings, &blu_ratings, &outcome, &self.config.weng_lin);

        Ok(TeamRatingUpdate {
            red: new_red.into_iter().map(Into::into).collect(),
            blu: new_blu.into_iter().map(Into::into).collect(),
        })
    }

    fn initial_rating(&self) -> SkillBelief {
        SkillBelief::new(self.config.prior_rating, self.config.prior_rating / 3.0)
    }
}
