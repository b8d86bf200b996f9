//! Wire models for the pickup site's games listing
//!
//! Field names follow the remote JSON contract:
//! `{ id, number, slots, state, score: { red, blu } }` with steam ids
//! encoded as decimal strings.

use crate::types::{SteamId, Team};
use serde::{Deserialize, Deserializer};

/// Player avatar links; only the small variant is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Avatar {
    #[serde(default)]
    pub small: String,
}

/// Player identity as reported in a roster slot
#[derive(Debug, Clone, Deserialize)]
pub struct PickupPlayer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: Avatar,
    #[serde(rename = "steamId", deserialize_with = "steam_id_from_string")]
    pub steam_id: SteamId,
}

/// One roster slot: a player, their team, and the class they queued for
#[derive(Debug, Clone, Deserialize)]
pub struct Slot {
    pub player: PickupPlayer,
    pub team: Team,
    #[serde(rename = "gameClass")]
    pub game_class: String,
}

/// Final scoreline; absent for matches that have not ended
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Score {
    pub red: i64,
    pub blu: i64,
}

/// One match as returned by `GET /games`
#[derive(Debug, Clone, Deserialize)]
pub struct PickupMatch {
    /// Platform-internal document id
    pub id: String,
    /// Monotonically increasing match number per site; the cursor unit
    pub number: i64,
    #[serde(default)]
    pub slots: Vec<Slot>,
    pub state: String,
    #[serde(default)]
    pub score: Score,
}

/// Lifecycle classification used by the processor state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Still running; nothing is persisted
    InProgress,
    /// Terminal and valid; the full rating pipeline runs
    Ended,
    /// Interrupted or otherwise broken; recorded for cursor advancement
    /// but skipped for rating
    Broken,
}

impl PickupMatch {
    pub fn phase(&self) -> MatchPhase {
        match self.state.as_str() {
            "in progress" => MatchPhase::InProgress,
            "ended" => MatchPhase::Ended,
            _ => MatchPhase::Broken,
        }
    }
}

/// One page of the games listing with the site's total match count
#[derive(Debug, Clone, Deserialize)]
pub struct MatchPage {
    pub results: Vec<PickupMatch>,
    #[serde(rename = "itemCount")]
    pub item_count: i64,
}

fn steam_id_from_string<'de, D>(deserializer: D) -> Result<SteamId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid steam id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MATCH: &str = r#"{
        "id": "648a1c09b2b9f104d8b2e9c1",
        "number": 4872,
        "slots": [
            {
                "player": {
                    "name": "quux",
                    "avatar": { "small": "https://avatars.example/quux.jpg" },
                    "steamId": "76561198012345678"
                },
                "team": "red",
                "gameClass": "medic"
            }
        ],
        "state": "ended",
        "score": { "red": 3, "blu": 1 }
    }"#;

    #[test]
    fn test_deserialize_match() {
        let parsed: PickupMatch = serde_json::from_str(SAMPLE_MATCH).unwrap();
        assert_eq!(parsed.number, 4872);
        assert_eq!(parsed.state, "ended");
        assert_eq!(parsed.score.red, 3);
        assert_eq!(parsed.score.blu, 1);

        let slot = &parsed.slots[0];
        assert_eq!(slot.player.steam_id, 76561198012345678);
        assert_eq!(slot.player.avatar.small, "https://avatars.example/quux.jpg");
        assert_eq!(slot.team, Team::Red);
        assert_eq!(slot.game_class, "medic");
    }

    #[test]
    fn test_deserialize_rejects_bad_steam_id() {
        let raw = r#"{ "name": "x", "steamId": "not-a-number" }"#;
        assert!(serde_json::from_str::<PickupPlayer>(raw).is_err());
    }

    #[test]
    fn test_missing_score_defaults_to_zero() {
        let raw = r#"{ "id": "a", "number": 1, "state": "in progress" }"#;
        let parsed: PickupMatch = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.score.red, 0);
        assert_eq!(parsed.score.blu, 0);
        assert!(parsed.slots.is_empty());
    }

    #[test]
    fn test_phase_classification() {
        let mut parsed: PickupMatch = serde_json::from_str(SAMPLE_MATCH).unwrap();
        assert_eq!(parsed.phase(), MatchPhase::Ended);

        parsed.state = "in progress".to_string();
        assert_eq!(parsed.phase(), MatchPhase::InProgress);

        parsed.state = "interrupted".to_string();
        assert_eq!(parsed.phase(), MatchPhase::Broken);

        parsed.state = "some future state".to_string();
        assert_eq!(parsed.phase(), MatchPhase::Broken);
    }

    #[test]
    fn test_deserialize_page() {
        let raw = format!(r#"{{ "results": [{SAMPLE_MATCH}], "itemCount": 4872 }}"#);
        let page: MatchPage = serde_json::from_str(&raw).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.item_count, 4872);
    }
}
