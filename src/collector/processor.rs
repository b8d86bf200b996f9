//! Collector state machine
//!
//! One invocation reads the site's cursor, fetches every newer match, and
//! processes them strictly in ascending id order. In-progress matches are
//! skipped entirely; broken matches are recorded so the cursor advances;
//! ended matches run the full rating pipeline. The first persistence
//! failure aborts the run, and already-applied writes stay put: the next
//! run resumes from the advanced cursor.

use crate::collector::roster::{RatedParticipant, Roster};
use crate::config::RatingConfig;
use crate::ledger::{MatchRecord, RatingLedger, RatingRow, RatingUpdate};
use crate::rating::calculator::RatingCalculator;
use crate::source::models::{MatchPhase, PickupMatch};
use crate::source::MatchSource;
use crate::types::{MatchResult, SkillBelief, Team};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Counters for one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Matches returned by the source for this run
    pub matches_fetched: usize,
    /// Matches persisted (ended or broken)
    pub matches_recorded: usize,
    /// Matches whose rating pipeline ran to completion
    pub matches_rated: usize,
    /// Players bootstrapped with prior ratings
    pub players_created: usize,
    /// Rating rows mutated across all rated matches
    pub ratings_updated: usize,
}

/// The match ingestion and rating-update pipeline for one site
pub struct MatchCollector {
    site: String,
    ledger: Arc<dyn RatingLedger>,
    source: Arc<dyn MatchSource>,
    calculator: Arc<dyn RatingCalculator>,
    rating_config: RatingConfig,
    batch_limit: usize,
}

impl MatchCollector {
    pub fn new(
        site: String,
        ledger: Arc<dyn RatingLedger>,
        source: Arc<dyn MatchSource>,
        calculator: Arc<dyn RatingCalculator>,
        rating_config: RatingConfig,
        batch_limit: usize,
    ) -> Self {
        Self {
            site,
            ledger,
            source,
            calculator,
            rating_config,
            batch_limit,
        }
    }

    /// Run one collection pass: fetch everything past the cursor and
    /// process it in order.
    ///
    /// The shutdown signal is observed between matches; a requested
    /// shutdown ends the run cleanly without touching the match being
    /// asked about next.
    pub async fn collect_matches(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> crate::error::Result<CollectorStats> {
        let cursor = self.ledger.last_match_id(&self.site).await?.unwrap_or(0);

        let matches = self
            .source
            .load_new_matches(cursor, self.batch_limit)
            .await?;

        let mut stats = CollectorStats {
            matches_fetched: matches.len(),
            ..CollectorStats::default()
        };

        for pickup_match in &matches {
            if *shutdown.borrow() {
                info!(
                    next_match = pickup_match.number,
                    "shutdown requested, stopping collection"
                );
                break;
            }

            info!(number = pickup_match.number, "processing match");
            self.process_match(pickup_match, &mut stats).await?;
        }

        Ok(stats)
    }

    async fn process_match(
        &self,
        pickup_match: &PickupMatch,
        stats: &mut CollectorStats,
    ) -> crate::error::Result<()> {
        let phase = pickup_match.phase();

        // Ongoing matches leave no trace; they come back in a later run.
        if phase == MatchPhase::InProgress {
            debug!(number = pickup_match.number, "match still in progress");
            return Ok(());
        }

        self.ledger
            .save_match(&MatchRecord {
                match_id: pickup_match.number,
                site: self.site.clone(),
                red_score: pickup_match.score.red,
                blu_score: pickup_match.score.blu,
            })
            .await?;
        stats.matches_recorded += 1;

        if phase == MatchPhase::Broken {
            info!(
                state = %pickup_match.state,
                number = pickup_match.number,
                "recorded match with broken state, skipping ratings"
            );
            return Ok(());
        }

        let roster = Roster::from_slots(&pickup_match.slots);
        if roster.is_empty() {
            warn!(
                number = pickup_match.number,
                "ended match has no roster slots, skipping ratings"
            );
            return Ok(());
        }

        stats.players_created += self.bootstrap_players(&roster).await?;

        let rows = self
            .ledger
            .ratings_for_players(roster.steam_ids(), &self.site)
            .await?;
        let participants = roster.filter_ratings_by_class(rows);

        let (red, blu): (Vec<RatedParticipant>, Vec<RatedParticipant>) = participants
            .into_iter()
            .partition(|participant| participant.team == Team::Red);

        if red.is_empty() || blu.is_empty() {
            warn!(
                number = pickup_match.number,
                red_players = red.len(),
                blu_players = blu.len(),
                "one-sided roster, skipping ratings"
            );
            return Ok(());
        }

        let red_beliefs: Vec<SkillBelief> = red.iter().map(|p| p.row.belief()).collect();
        let blu_beliefs: Vec<SkillBelief> = blu.iter().map(|p| p.row.belief()).collect();

        let update = self.calculator.rate_teams(
            &red_beliefs,
            &blu_beliefs,
            pickup_match.score.red,
            pickup_match.score.blu,
        )?;

        let red_result = MatchResult::from_scores(pickup_match.score.red, pickup_match.score.blu);
        let blu_result = MatchResult::from_scores(pickup_match.score.blu, pickup_match.score.red);

        let mut updates = apply_outcome(red, update.red, red_result);
        updates.extend(apply_outcome(blu, update.blu, blu_result));

        debug!(
            number = pickup_match.number,
            updates = updates.len(),
            "new ratings calculated"
        );

        self.ledger
            .append_history(pickup_match.number, &self.site, &updates)
            .await?;
        self.ledger.update_ratings(&updates).await?;

        stats.matches_rated += 1;
        stats.ratings_updated += updates.len();

        Ok(())
    }

    /// Register unseen players and give them the prior belief for every
    /// supported class at once, not only the class played in this match.
    async fn bootstrap_players(&self, roster: &Roster) -> crate::error::Result<usize> {
        let unknown = self
            .ledger
            .filter_unknown_players(roster.steam_ids(), &self.site)
            .await?;
        if unknown.is_empty() {
            return Ok(0);
        }

        let records: Vec<_> = unknown
            .iter()
            .filter_map(|steam_id| roster.player_record(*steam_id))
            .collect();
        self.ledger.create_players(&records, &self.site).await?;

        let prior = self.calculator.initial_rating();
        let rows: Vec<RatingRow> = unknown
            .iter()
            .flat_map(|steam_id| {
                self.rating_config
                    .classes
                    .iter()
                    .map(|class| RatingRow::prior(*steam_id, class.clone(), &prior))
            })
            .collect();
        self.ledger.create_ratings(&rows, &self.site).await?;

        debug!(count = unknown.len(), "new players created");
        Ok(unknown.len())
    }
}

/// Fold the engine's new beliefs back into the rows, in input order
fn apply_outcome(
    participants: Vec<RatedParticipant>,
    new_beliefs: Vec<SkillBelief>,
    result: MatchResult,
) -> Vec<RatingUpdate> {
    participants
        .into_iter()
        .zip(new_beliefs)
        .map(|(mut participant, belief)| {
            let delta = participant.row.apply_result(&belief, result);
            RatingUpdate {
                row: participant.row,
                result,
                delta,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::rating::calculator::NoOpRatingCalculator;
    use crate::rating::{RatingEngineConfig, WengLinRatingCalculator};
    use crate::source::models::{Avatar, PickupPlayer, Score, Slot};
    use crate::types::SteamId;
    use async_trait::async_trait;

    const SITE: &str = "tf2pickup.fi";
    const PRIOR: f64 = 16.0;

    /// Serves a fixed set of matches, honoring the cursor offset the way
    /// the live listing does
    struct ScriptedSource {
        matches: Vec<PickupMatch>,
    }

    #[async_trait]
    impl MatchSource for ScriptedSource {
        async fn load_new_matches(
            &self,
            offset: i64,
            _min_count: usize,
        ) -> crate::error::Result<Vec<PickupMatch>> {
            Ok(self
                .matches
                .iter()
                .filter(|m| m.number > offset)
                .cloned()
                .collect())
        }
    }

    fn slot(steam_id: SteamId, team: Team, class: &str) -> Slot {
        Slot {
            player: PickupPlayer {
                name: format!("player-{steam_id}"),
                avatar: Avatar {
                    small: format!("https://avatars.example/{steam_id}.jpg"),
                },
                steam_id,
            },
            team,
            game_class: class.to_string(),
        }
    }

    /// Three players per side: scout, soldier, medic
    fn six_player_slots() -> Vec<Slot> {
        vec![
            slot(1, Team::Red, "scout"),
            slot(2, Team::Red, "soldier"),
            slot(3, Team::Red, "medic"),
            slot(4, Team::Blu, "scout"),
            slot(5, Team::Blu, "soldier"),
            slot(6, Team::Blu, "medic"),
        ]
    }

    fn match_with_state(number: i64, state: &str, red: i64, blu: i64) -> PickupMatch {
        PickupMatch {
            id: format!("doc-{number}"),
            number,
            slots: six_player_slots(),
            state: state.to_string(),
            score: Score { red, blu },
        }
    }

    fn ended_match(number: i64, red: i64, blu: i64) -> PickupMatch {
        match_with_state(number, "ended", red, blu)
    }

    fn collector(
        ledger: Arc<InMemoryLedger>,
        matches: Vec<PickupMatch>,
    ) -> MatchCollector {
        let calculator =
            WengLinRatingCalculator::new(RatingEngineConfig::default()).unwrap();
        MatchCollector::new(
            SITE.to_string(),
            ledger,
            Arc::new(ScriptedSource { matches }),
            Arc::new(calculator),
            RatingConfig::default(),
            1000,
        )
    }

    fn idle_shutdown() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_end_to_end_first_match_on_empty_site() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(ledger.clone(), vec![ended_match(1, 3, 1)]);

        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(stats.matches_fetched, 1);
        assert_eq!(stats.matches_recorded, 1);
        assert_eq!(stats.matches_rated, 1);
        assert_eq!(stats.players_created, 6);
        assert_eq!(stats.ratings_updated, 6);

        assert_eq!(ledger.player_count(), 6);
        assert_eq!(ledger.match_count(), 1);
        // Priors are created for all four supported classes at once.
        assert_eq!(ledger.rating_row_count(), 24);
        assert_eq!(ledger.history_count(), 6);

        // Winners end at or above the prior, losers below.
        for (steam_id, class) in [(1, "scout"), (2, "soldier"), (3, "medic")] {
            let row = ledger.rating_of(steam_id, class, SITE).unwrap();
            assert!(row.rating > PRIOR);
            assert_eq!((row.games_played, row.games_won, row.games_tied), (1, 1, 0));
        }
        for (steam_id, class) in [(4, "scout"), (5, "soldier"), (6, "medic")] {
            let row = ledger.rating_of(steam_id, class, SITE).unwrap();
            assert!(row.rating < PRIOR);
            assert_eq!((row.games_played, row.games_won, row.games_tied), (1, 0, 0));
        }
    }

    #[tokio::test]
    async fn test_known_players_are_not_recreated() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(
            ledger.clone(),
            vec![ended_match(1, 3, 1), ended_match(2, 0, 2)],
        );

        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(stats.players_created, 6);
        assert_eq!(ledger.player_count(), 6);
        assert_eq!(ledger.rating_row_count(), 24);
        assert_eq!(ledger.history_count(), 12);

        let row = ledger.rating_of(1, "scout", SITE).unwrap();
        assert_eq!(row.games_played, 2);
        assert_eq!(row.games_won, 1);
    }

    #[tokio::test]
    async fn test_in_progress_match_leaves_no_trace() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(
            ledger.clone(),
            vec![match_with_state(1, "in progress", 0, 0)],
        );

        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(stats.matches_fetched, 1);
        assert_eq!(stats.matches_recorded, 0);
        assert_eq!(ledger.match_count(), 0);
        assert_eq!(ledger.player_count(), 0);
    }

    #[tokio::test]
    async fn test_broken_match_recorded_without_ratings() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(
            ledger.clone(),
            vec![
                match_with_state(1, "interrupted", 1, 0),
                match_with_state(2, "some future state", 0, 0),
            ],
        );

        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(stats.matches_recorded, 2);
        assert_eq!(stats.matches_rated, 0);
        assert_eq!(ledger.match_count(), 2);
        assert_eq!(ledger.player_count(), 0);
        assert_eq!(ledger.history_count(), 0);
        // The cursor still advances past broken matches.
        assert_eq!(ledger.last_match_id(SITE).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_tie_increments_games_tied_for_everyone() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(ledger.clone(), vec![ended_match(1, 4, 4)]);

        collector.collect_matches(&idle_shutdown()).await.unwrap();

        for (steam_id, class) in [
            (1, "scout"),
            (2, "soldier"),
            (3, "medic"),
            (4, "scout"),
            (5, "soldier"),
            (6, "medic"),
        ] {
            let row = ledger.rating_of(steam_id, class, SITE).unwrap();
            assert_eq!((row.games_played, row.games_won, row.games_tied), (1, 0, 1));
            assert!(row.games_won + row.games_tied <= row.games_played);
        }
    }

    #[tokio::test]
    async fn test_class_isolation() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(ledger.clone(), vec![ended_match(1, 5, 3)]);

        collector.collect_matches(&idle_shutdown()).await.unwrap();

        // Player 1 played scout; their medic belief must stay at the prior.
        let medic_row = ledger.rating_of(1, "medic", SITE).unwrap();
        assert_eq!(medic_row.rating, PRIOR);
        assert_eq!(medic_row.games_played, 0);

        let scout_row = ledger.rating_of(1, "scout", SITE).unwrap();
        assert!(scout_row.rating > PRIOR);
    }

    #[tokio::test]
    async fn test_second_run_resumes_from_cursor() {
        let ledger = Arc::new(InMemoryLedger::new());
        let matches = vec![ended_match(1, 3, 1), ended_match(2, 2, 2)];
        let collector = collector(ledger.clone(), matches);

        collector.collect_matches(&idle_shutdown()).await.unwrap();
        let scout_after_first = ledger.rating_of(1, "scout", SITE).unwrap();

        // Re-running against the same listing fetches nothing new and
        // mutates nothing.
        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();
        assert_eq!(stats.matches_fetched, 0);
        assert_eq!(ledger.history_count(), 12);
        assert_eq!(ledger.rating_of(1, "scout", SITE).unwrap(), scout_after_first);
    }

    #[tokio::test]
    async fn test_cursor_covers_every_terminal_match() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(
            ledger.clone(),
            vec![
                ended_match(1, 2, 0),
                match_with_state(2, "interrupted", 0, 0),
                match_with_state(3, "in progress", 0, 0),
            ],
        );

        collector.collect_matches(&idle_shutdown()).await.unwrap();

        let cursor = ledger.last_match_id(SITE).await.unwrap().unwrap();
        assert_eq!(cursor, 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_run_and_keeps_prior_writes() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.fail_after("append_history", 1);
        let collector = collector(
            ledger.clone(),
            vec![ended_match(1, 3, 1), ended_match(2, 1, 0)],
        );

        let result = collector.collect_matches(&idle_shutdown()).await;
        assert!(result.is_err());

        // Match 1 went through completely; match 2 was recorded but its
        // rating pipeline stopped at the failing history write.
        assert_eq!(ledger.match_count(), 2);
        assert_eq!(ledger.history_count(), 6);
        let row = ledger.rating_of(1, "scout", SITE).unwrap();
        assert_eq!(row.games_played, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_next_match() {
        let ledger = Arc::new(InMemoryLedger::new());
        let collector = collector(ledger.clone(), vec![ended_match(1, 3, 1)]);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let stats = collector.collect_matches(&rx).await.unwrap();

        assert_eq!(stats.matches_fetched, 1);
        assert_eq!(stats.matches_recorded, 0);
        assert_eq!(ledger.match_count(), 0);
    }

    #[tokio::test]
    async fn test_ended_match_without_slots_is_recorded_only() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut empty = ended_match(1, 2, 1);
        empty.slots.clear();
        let collector = collector(ledger.clone(), vec![empty]);

        let stats = collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(stats.matches_recorded, 1);
        assert_eq!(stats.matches_rated, 0);
        assert_eq!(ledger.player_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_delta_updates_still_write_history() {
        let ledger = Arc::new(InMemoryLedger::new());
        let calculator = NoOpRatingCalculator::new(SkillBelief::new(PRIOR, PRIOR / 3.0));
        let collector = MatchCollector::new(
            SITE.to_string(),
            ledger.clone(),
            Arc::new(ScriptedSource {
                matches: vec![ended_match(1, 2, 1)],
            }),
            Arc::new(calculator),
            RatingConfig::default(),
            1000,
        );

        collector.collect_matches(&idle_shutdown()).await.unwrap();

        assert_eq!(ledger.history_count(), 6);
        let row = ledger.rating_of(1, "scout", SITE).unwrap();
        assert_eq!(row.rating, PRIOR);
        assert_eq!(row.games_played, 1);
    }
}
