//! Rating calculator trait
//!
//! This module defines the interface between the match processor and the
//! skill model: two rosters of beliefs and a scoreline in, one updated
//! belief per player out, in input order.

use crate::error::CollectorError;
use crate::types::SkillBelief;

/// Updated beliefs for both teams, each in the same order as the input
/// roster
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRatingUpdate {
    pub red: Vec<SkillBelief>,
    pub blu: Vec<SkillBelief>,
}

/// Trait for computing skill updates from a two-team, scored match
pub trait RatingCalculator: Send + Sync {
    /// Calculate new beliefs for every participant.
    ///
    /// The team with the strictly higher score is ranked above the other;
    /// equal scores are a tie.
    fn rate_teams(
        &self,
        red: &[SkillBelief],
        blu: &[SkillBelief],
        red_score: i64,
        blu_score: i64,
    ) -> crate::error::Result<TeamRatingUpdate>;

    /// Prior belief assigned to unseen players
    fn initial_rating(&self) -> SkillBelief;
}

/// Calculator that leaves every belief untouched; useful in tests that
/// exercise persistence plumbing without caring about the numbers
#[derive(Debug, Clone)]
pub struct NoOpRatingCalculator {
    initial_rating: SkillBelief,
}

impl NoOpRatingCalculator {
    pub fn new(initial_rating: SkillBelief) -> Self {
        Self { initial_rating }
    }
}

impl RatingCalculator for NoOpRatingCalculator {
    fn rate_teams(
        &self,
        red: &[SkillBelief],
        blu: &[SkillBelief],
        _red_score: i64,
        _blu_score: i64,
    ) -> crate::error::Result<TeamRatingUpdate> {
        if red.is_empty() || blu.is_empty() {
            return Err(CollectorError::RatingCalculationFailed {
                reason: "both teams need at least one player".to_string(),
            }
            .into());
        }

        Ok(TeamRatingUpdate {
            red: red.to_vec(),
            blu: blu.to_vec(),
        })
    }

    fn initial_rating(&self) -> SkillBelief {
        self.initial_rating.clone()
    }
}
