//! Postgres ledger adapter
//!
//! Production implementation of both ledger contracts over a sqlx
//! connection pool. Bulk writes are issued row by row in submission
//! order; the first failing row aborts the call and earlier rows stay
//! applied, matching the contract in [`crate::ledger`].

use crate::ledger::{
    LeaderboardEntry, LedgerReader, MatchRecord, PlayerRecord, RatingHistoryRecord, RatingLedger,
    RatingRow, RatingUpdate, MIN_LEADERBOARD_GAMES,
};
use crate::types::SteamId;
use crate::utils::current_timestamp;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{query, query_as, query_scalar, PgPool};

/// Rating ledger backed by Postgres
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Connect to the database and bring the schema up to date
    pub async fn connect(database_url: &str) -> crate::error::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connecting to rating ledger")?;

        sqlx::migrate!("db/migrations")
            .run(&pool)
            .await
            .context("running ledger migrations")?;

        Ok(Self { pool })
    }

    /// Adapter over an existing pool; the schema is assumed current
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingLedger for PostgresLedger {
    async fn last_match_id(&self, site: &str) -> crate::error::Result<Option<i64>> {
        let match_id = query_scalar::<_, i64>(
            "select game_id from game_history where pickup_site = $1 \
             order by game_id desc limit 1",
        )
        .bind(site)
        .fetch_optional(&self.pool)
        .await
        .context("last_match_id")?;

        Ok(match_id)
    }

    async fn filter_unknown_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<SteamId>> {
        let unknown = query_scalar::<_, i64>(
            "select candidate.steam_id \
             from unnest($1::bigint[]) as candidate(steam_id) \
             where not exists ( \
                 select 1 from players p \
                 where p.steam_id = candidate.steam_id and p.pickup_site = $2)",
        )
        .bind(steam_ids)
        .bind(site)
        .fetch_all(&self.pool)
        .await
        .context("filter_unknown_players")?;

        Ok(unknown)
    }

    async fn create_players(
        &self,
        players: &[PlayerRecord],
        site: &str,
    ) -> crate::error::Result<()> {
        for (i, player) in players.iter().enumerate() {
            query(
                "insert into players (steam_id, pickup_site, name, avatar_url) \
                 values ($1, $2, $3, $4)",
            )
            .bind(player.steam_id)
            .bind(site)
            .bind(&player.name)
            .bind(&player.avatar_url)
            .execute(&self.pool)
            .await
            .with_context(|| format!("create_players: row {i}"))?;
        }

        Ok(())
    }

    async fn save_match(&self, record: &MatchRecord) -> crate::error::Result<()> {
        query(
            "insert into game_history (game_id, pickup_site, red_score, blu_score, ts) \
             values ($1, $2, $3, $4, $5)",
        )
        .bind(record.match_id)
        .bind(&record.site)
        .bind(record.red_score)
        .bind(record.blu_score)
        .bind(current_timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("save_match: match {}", record.match_id))?;

        Ok(())
    }

    async fn create_ratings(&self, rows: &[RatingRow], site: &str) -> crate::error::Result<()> {
        for (i, row) in rows.iter().enumerate() {
            query(
                "insert into player_leaderboard \
                 (pickup_site, player_steam_id, player_class, rating, uncertainty_value) \
                 values ($1, $2, $3, $4, $5)",
            )
            .bind(site)
            .bind(row.steam_id)
            .bind(&row.class)
            .bind(row.rating)
            .bind(row.uncertainty)
            .execute(&self.pool)
            .await
            .with_context(|| format!("create_ratings: row {i}"))?;
        }

        Ok(())
    }

    async fn ratings_for_players(
        &self,
        steam_ids: &[SteamId],
        site: &str,
    ) -> crate::error::Result<Vec<RatingRow>> {
        let rows = query_as::<_, (i64, i64, String, f64, f64, i64, i64, i64)>(
            "select id, player_steam_id, player_class, rating, uncertainty_value, \
                    games_played, games_won, games_tied \
             from player_leaderboard \
             where pickup_site = $1 and player_steam_id = any($2) \
             order by id",
        )
        .bind(site)
        .bind(steam_ids)
        .fetch_all(&self.pool)
        .await
        .context("ratings_for_players")?;

        Ok(rows
            .into_iter()
            .map(
                |(id, steam_id, class, rating, uncertainty, played, won, tied)| RatingRow {
                    id,
                    steam_id,
                    class,
                    rating,
                    uncertainty,
                    games_played: played,
                    games_won: won,
                    games_tied: tied,
                },
            )
            .collect())
    }

    async fn append_history(
        &self,
        match_id: i64,
        site: &str,
        updates: &[RatingUpdate],
    ) -> crate::error::Result<()> {
        let ts = current_timestamp();
        for (i, update) in updates.iter().enumerate() {
            query(
                "insert into player_rating_history \
                 (game_id, pickup_site, leaderboard_id, rating_value, result, ts) \
                 values ($1, $2, $3, $4, $5, $6)",
            )
            .bind(match_id)
            .bind(site)
            .bind(update.row.id)
            .bind(update.row.rating)
            .bind(update.result.as_str())
            .bind(ts)
            .execute(&self.pool)
            .await
            .with_context(|| format!("append_history: row {i}"))?;
        }

        Ok(())
    }

    async fn update_ratings(&self, updates: &[RatingUpdate]) -> crate::error::Result<()> {
        for (i, update) in updates.iter().enumerate() {
            query(
                "update player_leaderboard set \
                     rating = $1, \
                     uncertainty_value = $2, \
                     games_played = $3, \
                     games_won = $4, \
                     games_tied = $5 \
                 where id = $6",
            )
            .bind(update.row.rating)
            .bind(update.row.uncertainty)
            .bind(update.row.games_played)
            .bind(update.row.games_won)
            .bind(update.row.games_tied)
            .bind(update.row.id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("update_ratings: row {i}"))?;
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerReader for PostgresLedger {
    async fn available_sites(&self) -> crate::error::Result<Vec<String>> {
        let sites = query_scalar::<_, String>(
            "select distinct pickup_site from game_history order by pickup_site",
        )
        .fetch_all(&self.pool)
        .await
        .context("available_sites")?;

        Ok(sites)
    }

    async fn leaderboard(
        &self,
        site: &str,
        class: &str,
        offset: i64,
        limit: i64,
    ) -> crate::error::Result<Vec<LeaderboardEntry>> {
        let rows = query_as::<_, (i64, String, String, f64, i64, i64, i64)>(
            "select p.steam_id, p.name, p.avatar_url, l.rating, \
                    l.games_played, l.games_won, l.games_tied \
             from player_leaderboard l \
             join players p \
               on l.player_steam_id = p.steam_id and l.pickup_site = p.pickup_site \
             where l.pickup_site = $1 \
               and l.player_class = $2 \
               and l.games_played > $3 \
             order by l.rating desc \
             offset $4 limit $5",
        )
        .bind(site)
        .bind(class)
        .bind(MIN_LEADERBOARD_GAMES)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("leaderboard")?;

        Ok(rows
            .into_iter()
            .map(
                |(steam_id, name, avatar_url, rating, played, won, tied)| LeaderboardEntry {
                    steam_id,
                    name,
                    avatar_url,
                    rating,
                    games_played: played,
                    games_won: won,
                    games_tied: tied,
                },
            )
            .collect())
    }

    async fn player_history(
        &self,
        site: &str,
        steam_id: SteamId,
        class: &str,
    ) -> crate::error::Result<Vec<RatingHistoryRecord>> {
        let rows = query_as::<_, (i64, f64, String, i64, i64, DateTime<Utc>)>(
            "select rh.game_id, rh.rating_value, rh.result, \
                    gh.red_score, gh.blu_score, rh.ts \
             from player_rating_history rh \
             join player_leaderboard pl on rh.leaderboard_id = pl.id \
             join game_history gh \
               on rh.game_id = gh.game_id and rh.pickup_site = gh.pickup_site \
             where pl.player_steam_id = $1 \
               and pl.player_class = $2 \
               and rh.pickup_site = $3 \
             order by rh.ts",
        )
        .bind(steam_id)
        .bind(class)
        .bind(site)
        .fetch_all(&self.pool)
        .await
        .context("player_history")?;

        Ok(rows
            .into_iter()
            .map(
                |(match_id, rating, result, red_score, blu_score, ts)| RatingHistoryRecord {
                    match_id,
                    rating,
                    result,
                    red_score,
                    blu_score,
                    ts,
                },
            )
            .collect())
    }

    async fn player_name(
        &self,
        site: &str,
        steam_id: SteamId,
    ) -> crate::error::Result<Option<String>> {
        let name = query_scalar::<_, String>(
            "select name from players where pickup_site = $1 and steam_id = $2",
        )
        .bind(site)
        .bind(steam_id)
        .fetch_optional(&self.pool)
        .await
        .context("player_name")?;

        Ok(name)
    }
}
