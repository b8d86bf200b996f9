//! Rating ledger boundary
//!
//! Narrow repository contracts between the pipeline and durable storage:
//! a write-side contract for the match processor and a read-side contract
//! for the leaderboard views. Each consumer sees only the operations it
//! needs, independent of storage technology.

pub mod memory;
pub mod postgres;

use crate::types::{GameClass, MatchResult, SkillBelief, SteamId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

// Re-export adapters
pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;

/// Players need more than this many games in a class before they are listed
pub const MIN_LEADERBOARD_GAMES: i64 = 15;

/// Identity and display enrichment for one player on one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub steam_id: SteamId,
    pub name: String,
    pub avatar_url: String,
}

/// One finished or broken match, immutable once stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: i64,
    pub site: String,
    pub red_score: i64,
    pub blu_score: i64,
}

/// Current skill state for one (player, class) pair on one site
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    /// Ledger-assigned row id; 0 until the row has been persisted
    pub id: i64,
    pub steam_id: SteamId,
    pub class: GameClass,
    pub rating: f64,
    pub uncertainty: f64,
    pub games_played: i64,
    pub games_won: i64,
    pub games_tied: i64,
}

impl RatingRow {
    /// Fresh row carrying the prior belief and zeroed counters
    pub fn prior(steam_id: SteamId, class: GameClass, belief: &SkillBelief) -> Self {
        Self {
            id: 0,
            steam_id,
            class,
            rating: belief.rating,
            uncertainty: belief.uncertainty,
            games_played: 0,
            games_won: 0,
            games_tied: 0,
        }
    }

    pub fn belief(&self) -> SkillBelief {
        SkillBelief::new(self.rating, self.uncertainty)
    }

    /// Fold one match outcome into the row and return the rating delta
    pub fn apply_result(&mut self, new_belief: &SkillBelief, result: MatchResult) -> f64 {
        let delta = new_belief.rating - self.rating;
        self.rating = new_belief.rating;
        self.uncertainty = new_belief.uncertainty;
        self.games_played += 1;
        match result {
            MatchResult::Win => self.games_won += 1,
            MatchResult::Tie => self.games_tied += 1,
            MatchResult::Loss => {}
        }
        delta
    }
}

/// One rating mutation produced by one match, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub row: RatingRow,
    pub result: MatchResult,
    pub delta: f64,
}

/// Write-side contract used by the match processor.
///
/// Bulk operations apply element by element and stop at the first failing
/// element; previously applied elements stay in the ledger. The processor
/// relies on cursor-based resume, not on rollback.
#[async_trait]
pub trait RatingLedger: Send + Sync {
    /// Highest match id already recorded for the site, if any
    async fn last_match_id(&self, site: &str) -> crate::error::Result<Option<i64>>;

    /// Subset of `steam_ids` with no player row for the site yet
    async fn filter_unknown_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<SteamId>>;

    async fn create_players(
        &self,
        players: &[PlayerRecord],
        site: &str,
    ) -> crate::error::Result<()>;

    async fn save_match(&self, record: &MatchRecord) -> crate::error::Result<()>;

    async fn create_ratings(&self, rows: &[RatingRow], site: &str) -> crate::error::Result<()>;

    async fn ratings_for_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<RatingRow>>;

    /// Append one immutable history row per update
    async fn append_history(
        &self,
        match_id: i64,
        site: &str,
        updates: &[RatingUpdate],
    ) -> crate::error::Result<()>;

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> crate::error::Result<()>;
}

/// Ranked leaderboard line for one player and class
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub steam_id: SteamId,
    pub name: String,
    pub avatar_url: String,
    pub rating: f64,
    pub games_played: i64,
    pub games_won: i64,
    pub games_tied: i64,
}

/// One point of a player's rating trajectory
#[derive(Debug, Clone, Serialize)]
pub struct RatingHistoryRecord {
    pub match_id: i64,
    pub rating: f64,
    pub result: String,
    pub red_score: i64,
    pub blu_score: i64,
    pub ts: DateTime<Utc>,
}

/// Read-side contract used by the leaderboard views; no business logic
/// beyond filtering and ordering
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn available_sites(&self) -> crate::error::Result<Vec<String>>;

    /// Ranked by rating, descending; players with no more than
    /// [`MIN_LEADERBOARD_GAMES`] games are omitted
    async fn leaderboard(
        &self,
        site: &str,
        class: &str,
        offset: i64,
        limit: i64,
    ) -> crate::error::Result<Vec<LeaderboardEntry>>;

    /// Chronological rating history for one player and class
    async fn player_history(
        &self,
        site: &str,
        steam_id: SteamId,
        class: &str,
    ) -> crate::error::Result<Vec<RatingHistoryRecord>>;

    async fn player_name(
        &self,
        site: &str,
        steam_id: SteamId,
    ) -> crate::error::Result<Option<String>>;
}
