//! Distinct player set of one match
//!
//! Built from the match's roster slots; keeps team and class tags so
//! fetched rating rows can be narrowed to the class each player actually
//! played.

use crate::ledger::{PlayerRecord, RatingRow};
use crate::source::models::Slot;
use crate::types::{GameClass, SteamId, Team};
use std::collections::HashMap;

/// One participant with their team and played class
#[derive(Debug, Clone)]
pub struct RosterPlayer {
    pub steam_id: SteamId,
    pub name: String,
    pub avatar_url: String,
    pub team: Team,
    pub class: GameClass,
}

/// A rating row tagged with the team its player was on
#[derive(Debug, Clone)]
pub struct RatedParticipant {
    pub row: RatingRow,
    pub team: Team,
}

/// Deduplicated set of the players in one match
#[derive(Debug, Default)]
pub struct Roster {
    players: HashMap<SteamId, RosterPlayer>,
    steam_ids: Vec<SteamId>,
}

impl Roster {
    /// Build the set from roster slots. A steam id appearing in more than
    /// one slot collapses to its last slot.
    pub fn from_slots(slots: &[Slot]) -> Self {
        let mut roster = Self::default();

        for slot in slots {
            let steam_id = slot.player.steam_id;
            let player = RosterPlayer {
                steam_id,
                name: slot.player.name.clone(),
                avatar_url: slot.player.avatar.small.clone(),
                team: slot.team,
                class: slot.game_class.clone(),
            };
            if roster.players.insert(steam_id, player).is_none() {
                roster.steam_ids.push(steam_id);
            }
        }

        roster
    }

    pub fn steam_ids(&self) -> &[SteamId] {
        &self.steam_ids
    }

    pub fn is_empty(&self) -> bool {
        self.steam_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steam_ids.len()
    }

    pub fn get(&self, steam_id: SteamId) -> Option<&RosterPlayer> {
        self.players.get(&steam_id)
    }

    /// Ledger record for one participant
    pub fn player_record(&self, steam_id: SteamId) -> Option<PlayerRecord> {
        self.get(steam_id).map(|player| PlayerRecord {
            steam_id: player.steam_id,
            name: player.name.clone(),
            avatar_url: player.avatar_url.clone(),
        })
    }

    /// Keep only the rows whose stored class matches the class the player
    /// played in this match, tagging each with the player's team. A
    /// player's other per-class rows are disjoint and unaffected.
    pub fn filter_ratings_by_class(&self, rows: Vec<RatingRow>) -> Vec<RatedParticipant> {
        rows.into_iter()
            .filter_map(|row| {
                let player = self.players.get(&row.steam_id)?;
                if player.class != row.class {
                    return None;
                }
                Some(RatedParticipant {
                    row,
                    team: player.team,
                })
            })
            .collect()
    }
}
