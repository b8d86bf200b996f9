//! Common types used throughout the rating collector

use serde::{Deserialize, Serialize};
use skillratings::weng_lin::WengLinRating;

/// Steam identifier of a player; unique per pickup site
pub type SteamId = i64;

/// In-match player specialization. Ratings are tracked independently per
/// class, so this stays a plain string: the set of supported classes is
/// configuration, not a closed enum baked into the type system.
pub type GameClass = String;

/// Side a player was assigned to in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blu,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Red => write!(f, "red"),
            Team::Blu => write!(f, "blu"),
        }
    }
}

/// Outcome of a match from one team's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Tie,
}

impl MatchResult {
    /// Derive a team's result from its own score and the opponent's.
    pub fn from_scores(own: i64, other: i64) -> Self {
        if own == other {
            MatchResult::Tie
        } else if own > other {
            MatchResult::Win
        } else {
            MatchResult::Loss
        }
    }

    /// Stored label for history rows ("win" / "loss" / "tie")
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "win",
            MatchResult::Loss => "loss",
            MatchResult::Tie => "tie",
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gaussian skill belief for one (player, class) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillBelief {
    pub rating: f64,
    pub uncertainty: f64,
}

impl SkillBelief {
    pub fn new(rating: f64, uncertainty: f64) -> Self {
        Self {
            rating,
            uncertainty,
        }
    }
}

impl From<WengLinRating> for SkillBelief {
    fn from(rating: WengLinRating) -> Self {
        Self {
            rating: rating.rating,
            uncertainty: rating.uncertainty,
        }
    }
}

impl From<SkillBelief> for WengLinRating {
    fn from(belief: SkillBelief) -> Self {
        Self {
            rating: belief.rating,
            uncertainty: belief.uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_scores() {
        assert_eq!(MatchResult::from_scores(5, 3), MatchResult::Win);
        assert_eq!(MatchResult::from_scores(3, 5), MatchResult::Loss);
        assert_eq!(MatchResult::from_scores(4, 4), MatchResult::Tie);
    }

    #[test]
    fn test_result_labels() {
        assert_eq!(MatchResult::Win.to_string(), "win");
        assert_eq!(MatchResult::Loss.to_string(), "loss");
        assert_eq!(MatchResult::Tie.to_string(), "tie");
    }

    #[test]
    fn test_team_wire_format() {
        let red: Team = serde_json::from_str("\"red\"").unwrap();
        let blu: Team = serde_json::from_str("\"blu\"").unwrap();
        assert_eq!(red, Team::Red);
        assert_eq!(blu, Team::Blu);
        assert_eq!(red.to_string(), "red");
    }

    #[test]
    fn test_skill_belief_weng_lin_round_trip() {
        let belief = SkillBelief::new(16.0, 16.0 / 3.0);
        let weng_lin: WengLinRating = belief.clone().into();
        let back: SkillBelief = weng_lin.into();
        assert_eq!(back, belief);
    }
}
