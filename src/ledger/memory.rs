//! In-memory ledger adapter
//!
//! Backing store for tests and local development. Mirrors the batch
//! semantics of the Postgres adapter: bulk calls stop at the first failing
//! element and keep everything applied before it.

use crate::error::CollectorError;
use crate::ledger::{
    LeaderboardEntry, LedgerReader, MatchRecord, PlayerRecord, RatingHistoryRecord, RatingLedger,
    RatingRow, RatingUpdate, MIN_LEADERBOARD_GAMES,
};
use crate::types::{MatchResult, SteamId};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredRating {
    site: String,
    row: RatingRow,
}

#[derive(Debug, Clone)]
struct StoredHistory {
    match_id: i64,
    site: String,
    leaderboard_id: i64,
    rating: f64,
    result: MatchResult,
    ts: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    players: HashMap<(SteamId, String), PlayerRecord>,
    matches: HashMap<(i64, String), MatchRecord>,
    ratings: HashMap<i64, StoredRating>,
    next_rating_id: i64,
    history: Vec<StoredHistory>,
    /// Operation to fail plus the number of calls allowed to succeed first
    fail_on: Option<(String, usize)>,
}

impl Inner {
    fn check_fail(&mut self, operation: &str) -> crate::error::Result<()> {
        if let Some((op, remaining)) = &mut self.fail_on {
            if op == operation {
                if *remaining == 0 {
                    return Err(CollectorError::LedgerOperationFailed {
                        operation: operation.to_string(),
                        message: "injected failure".to_string(),
                    }
                    .into());
                }
                *remaining -= 1;
            }
        }
        Ok(())
    }
}

/// In-memory implementation of both ledger contracts
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: RwLock<Inner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> crate::error::Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| CollectorError::InternalError {
                message: "ledger lock poisoned".to_string(),
            }
            .into())
    }

    fn read(&self) -> crate::error::Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| CollectorError::InternalError {
                message: "ledger lock poisoned".to_string(),
            }
            .into())
    }

    /// Make `operation` fail after `successes` successful calls to it
    pub fn fail_after(&self, operation: &str, successes: usize) {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_on = Some((operation.to_string(), successes));
        }
    }

    pub fn player_count(&self) -> usize {
        self.read().map(|inner| inner.players.len()).unwrap_or(0)
    }

    pub fn match_count(&self) -> usize {
        self.read().map(|inner| inner.matches.len()).unwrap_or(0)
    }

    pub fn rating_row_count(&self) -> usize {
        self.read().map(|inner| inner.ratings.len()).unwrap_or(0)
    }

    pub fn history_count(&self) -> usize {
        self.read().map(|inner| inner.history.len()).unwrap_or(0)
    }

    /// Current rating row for one (player, class, site), if any
    pub fn rating_of(&self, steam_id: SteamId, class: &str, site: &str) -> Option<RatingRow> {
        self.read().ok().and_then(|inner| {
            inner
                .ratings
                .values()
                .find(|stored| {
                    stored.site == site
                        && stored.row.steam_id == steam_id
                        && stored.row.class == class
                })
                .map(|stored| stored.row.clone())
        })
    }
}

#[async_trait]
impl RatingLedger for InMemoryLedger {
    async fn last_match_id(&self, site: &str) -> crate::error::Result<Option<i64>> {
        let inner = self.read()?;
        Ok(inner
            .matches
            .keys()
            .filter(|(_, match_site)| match_site == site)
            .map(|(match_id, _)| *match_id)
            .max())
    }

    async fn filter_unknown_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<SteamId>> {
        let inner = self.read()?;
        Ok(steam_ids
            .iter()
            .copied()
            .filter(|steam_id| !inner.players.contains_key(&(*steam_id, site.to_string())))
            .collect())
    }

    async fn create_players(
        &self,
        players: &[PlayerRecord],
        site: &str,
    ) -> crate::error::Result<()> {
        let mut inner = self.write()?;
        inner.check_fail("create_players")?;

        for (i, player) in players.iter().enumerate() {
            let key = (player.steam_id, site.to_string());
            if inner.players.contains_key(&key) {
                return Err(CollectorError::LedgerOperationFailed {
                    operation: "create_players".to_string(),
                    message: format!("row {i}: player {} already exists", player.steam_id),
                }
                .into());
            }
            inner.players.insert(key, player.clone());
        }

        Ok(())
    }

    async fn save_match(&self, record: &MatchRecord) -> crate::error::Result<()> {
        let mut inner = self.write()?;
        inner.check_fail("save_match")?;

        let key = (record.match_id, record.site.clone());
        if inner.matches.contains_key(&key) {
            return Err(CollectorError::LedgerOperationFailed {
                operation: "save_match".to_string(),
                message: format!("match {} already recorded", record.match_id),
            }
            .into());
        }
        inner.matches.insert(key, record.clone());

        Ok(())
    }

    async fn create_ratings(&self, rows: &[RatingRow], site: &str) -> crate::error::Result<()> {
        let mut inner = self.write()?;
        inner.check_fail("create_ratings")?;

        for (i, row) in rows.iter().enumerate() {
            let duplicate = inner.ratings.values().any(|stored| {
                stored.site == site
                    && stored.row.steam_id == row.steam_id
                    && stored.row.class == row.class
            });
            if duplicate {
                return Err(CollectorError::LedgerOperationFailed {
                    operation: "create_ratings".to_string(),
                    message: format!(
                        "row {i}: rating for player {} class {} already exists",
                        row.steam_id, row.class
                    ),
                }
                .into());
            }

            inner.next_rating_id += 1;
            let id = inner.next_rating_id;
            let mut row = row.clone();
            row.id = id;
            inner.ratings.insert(
                id,
                StoredRating {
                    site: site.to_string(),
                    row,
                },
            );
        }

        Ok(())
    }

    async fn ratings_for_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<RatingRow>> {
        let inner = self.read()?;
        let mut rows: Vec<RatingRow> = inner
            .ratings
            .values()
            .filter(|stored| stored.site == site && steam_ids.contains(&stored.row.steam_id))
            .map(|stored| stored.row.clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn append_history(
        &self,
        match_id: i64,
        site: &str,
        updates: &[RatingUpdate],
    ) -> crate::error::Result<()> {
        let mut inner = self.write()?;
        inner.check_fail("append_history")?;

        let ts = current_timestamp();
        for update in updates {
            inner.history.push(StoredHistory {
                match_id,
                site: site.to_string(),
                leaderboard_id: update.row.id,
                rating: update.row.rating,
                result: update.result,
                ts,
            });
        }

        Ok(())
    }

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> crate::error::Result<()> {
        let mut inner = self.write()?;
        inner.check_fail("update_ratings")?;

        for (i, update) in updates.iter().enumerate() {
            match inner.ratings.get_mut(&update.row.id) {
                Some(stored) => stored.row = update.row.clone(),
                None => {
                    return Err(CollectorError::LedgerOperationFailed {
                        operation: "update_ratings".to_string(),
                        message: format!("row {i}: no rating with id {}", update.row.id),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn available_sites(&self) -> crate::error::Result<Vec<String>> {
        let inner = self.read()?;
        let mut sites: Vec<String> = inner
            .matches
            .keys()
            .map(|(_, site)| site.clone())
            .collect();
        sites.sort();
        sites.dedup();
        Ok(sites)
    }

    async fn leaderboard(
        &self,
        site: &str,
        class: &str,
        offset: i64,
        limit: i64,
    ) -> crate::error::Result<Vec<LeaderboardEntry>> {
        let inner = self.read()?;
        let mut entries: Vec<LeaderboardEntry> = inner
            .ratings
            .values()
            .filter(|stored| {
                stored.site == site
                    && stored.row.class == class
                    && stored.row.games_played > MIN_LEADERBOARD_GAMES
            })
            .map(|stored| {
                let player = inner.players.get(&(stored.row.steam_id, site.to_string()));
                LeaderboardEntry {
                    steam_id: stored.row.steam_id,
                    name: player.map(|p| p.name.clone()).unwrap_or_default(),
                    avatar_url: player.map(|p| p.avatar_url.clone()).unwrap_or_default(),
                    rating: stored.row.rating,
                    games_played: stored.row.games_played,
                    games_won: stored.row.games_won,
                    games_tied: stored.row.games_tied,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        Ok(entries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn player_history(
        &self,
        site: &str,
        steam_id: SteamId,
        class: &str,
    ) -> crate::error::Result<Vec<RatingHistoryRecord>> {
        let inner = self.read()?;
        let leaderboard_ids: Vec<i64> = inner
            .ratings
            .iter()
            .filter(|(_, stored)| {
                stored.site == site
                    && stored.row.steam_id == steam_id
                    && stored.row.class == class
            })
            .map(|(id, _)| *id)
            .collect();

        let records = inner
            .history
            .iter()
            .filter(|entry| entry.site == site && leaderboard_ids.contains(&entry.leaderboard_id))
            .map(|entry| {
                let scores = inner
                    .matches
                    .get(&(entry.match_id, site.to_string()))
                    .map(|m| (m.red_score, m.blu_score))
                    .unwrap_or_default();
                RatingHistoryRecord {
                    match_id: entry.match_id,
                    rating: entry.rating,
                    result: entry.result.to_string(),
                    red_score: scores.0,
                    blu_score: scores.1,
                    ts: entry.ts,
                }
            })
            .collect();

        Ok(records)
    }

    async fn player_name(
        &self,
        site: &str,
        steam_id: SteamId,
    ) -> crate::error::Result<Option<String>> {
        let inner = self.read()?;
        Ok(inner
            .players
            .get(&(steam_id, site.to_string()))
            .map(|player| player.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkillBelief;

    fn prior_row(steam_id: SteamId, class: &str) -> RatingRow {
        RatingRow::prior(steam_id, class.to_string(), &SkillBelief::new(16.0, 16.0 / 3.0))
    }

    #[tokio::test]
    async fn test_cursor_tracks_highest_match() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.last_match_id("site-a").await.unwrap(), None);

        for match_id in [3, 7, 5] {
            ledger
                .save_match(&MatchRecord {
                    match_id,
                    site: "site-a".to_string(),
                    red_score: 1,
                    blu_score: 0,
                })
                .await
                .unwrap();
        }

        assert_eq!(ledger.last_match_id("site-a").await.unwrap(), Some(7));
        assert_eq!(ledger.last_match_id("site-b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_match_is_rejected() {
        let ledger = InMemoryLedger::new();
        let record = MatchRecord {
            match_id: 1,
            site: "site-a".to_string(),
            red_score: 2,
            blu_score: 2,
        };

        ledger.save_match(&record).await.unwrap();
        assert!(ledger.save_match(&record).await.is_err());
        assert_eq!(ledger.match_count(), 1);
    }

    #[tokio::test]
    async fn test_filter_unknown_players_is_scoped_per_site() {
        let ledger = InMemoryLedger::new();
        ledger
            .create_players(
                &[PlayerRecord {
                    steam_id: 10,
                    name: "a".to_string(),
                    avatar_url: String::new(),
                }],
                "site-a",
            )
            .await
            .unwrap();

        let unknown = ledger
            .filter_unknown_players(&[10, 11], "site-a")
            .await
            .unwrap();
        assert_eq!(unknown, vec![11]);

        // Same player on a different site is unknown there.
        let unknown = ledger
            .filter_unknown_players(&[10, 11], "site-b")
            .await
            .unwrap();
        assert_eq!(unknown, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_create_ratings_assigns_ids_and_rejects_duplicates() {
        let ledger = InMemoryLedger::new();
        ledger
            .create_ratings(&[prior_row(10, "scout"), prior_row(10, "medic")], "site-a")
            .await
            .unwrap();

        let rows = ledger.ratings_for_players(&[10], "site-a").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.id > 0));

        assert!(ledger
            .create_ratings(&[prior_row(10, "scout")], "site-a")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_leaderboard_applies_min_games_threshold() {
        let ledger = InMemoryLedger::new();
        ledger
            .create_players(
                &[
                    PlayerRecord {
                        steam_id: 1,
                        name: "veteran".to_string(),
                        avatar_url: String::new(),
                    },
                    PlayerRecord {
                        steam_id: 2,
                        name: "rookie".to_string(),
                        avatar_url: String::new(),
                    },
                ],
                "site-a",
            )
            .await
            .unwrap();

        let mut veteran = prior_row(1, "scout");
        veteran.games_played = MIN_LEADERBOARD_GAMES + 1;
        let mut rookie = prior_row(2, "scout");
        rookie.games_played = MIN_LEADERBOARD_GAMES;
        ledger
            .create_ratings(&[veteran, rookie], "site-a")
            .await
            .unwrap();

        let entries = ledger.leaderboard("site-a", "scout", 0, 50).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "veteran");
    }

    #[tokio::test]
    async fn test_injected_failure_fires_after_allowed_successes() {
        let ledger = InMemoryLedger::new();
        ledger.fail_after("save_match", 1);

        let record = |match_id| MatchRecord {
            match_id,
            site: "site-a".to_string(),
            red_score: 0,
            blu_score: 0,
        };

        ledger.save_match(&record(1)).await.unwrap();
        assert!(ledger.save_match(&record(2)).await.is_err());
        assert_eq!(ledger.match_count(), 1);
    }
}
