//! Leaderboard HTTP server
//!
//! Serves per-site, per-class standings and per-player rating history
//! using Axum. Ledger failures surface as a generic error response.

use crate::ledger::LedgerReader;
use crate::types::SteamId;
use crate::utils::rating_label;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared state for the web server
#[derive(Clone)]
struct WebState {
    reader: Arc<dyn LedgerReader>,
}

/// Read-only leaderboard server
pub struct LeaderboardServer {
    config: WebServerConfig,
    state: WebState,
    shutdown_tx: broadcast::Sender<()>,
}

impl LeaderboardServer {
    /// Create a new leaderboard server over the given ledger reader
    pub fn new(config: WebServerConfig, reader: Arc<dyn LedgerReader>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: WebState { reader },
            shutdown_tx,
        }
    }

    /// Start the server and serve until shutdown is requested
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid leaderboard server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr).await?;

        info!("Leaderboard server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Leaderboard server shutdown signal received");
            })
            .await?;

        info!("Leaderboard server stopped");
        Ok(())
    }

    /// Create the Axum router with all read endpoints
    fn create_router(&self) -> Router {
        Router::new()
            .route("/sites", get(sites_handler))
            .route("/{site}/leaderboard", get(leaderboard_handler))
            .route("/{site}/player/{steam_id}", get(player_handler))
            .with_state(self.state.clone())
    }

    /// Stop the server
    pub fn stop(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to leaderboard server: {}", e);
        }
    }
}

const DEFAULT_CLASS: &str = "scout";
const DEFAULT_PAGE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
struct ClassQuery {
    class: Option<String>,
    #[serde(default)]
    offset: i64,
    limit: Option<i64>,
}

impl ClassQuery {
    fn class(&self) -> &str {
        self.class.as_deref().unwrap_or(DEFAULT_CLASS)
    }

    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }
}

/// One leaderboard line with the display-scaled rating label
#[derive(Debug, Serialize)]
struct LeaderboardLine {
    position: usize,
    steam_id: SteamId,
    name: String,
    avatar_url: String,
    rating: i64,
    wins: i64,
    ties: i64,
    losses: i64,
}

/// One history line; the diff is derived from the previous entry
#[derive(Debug, Serialize)]
struct HistoryLine {
    match_id: i64,
    rating: i64,
    diff: i64,
    result: String,
    red_score: i64,
    blu_score: i64,
    ts: String,
}

fn ledger_unavailable(err: anyhow::Error) -> Response {
    error!("ledger read failed: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "ledger unavailable" })),
    )
        .into_response()
}

/// GET /sites - sites with any recorded match
async fn sites_handler(State(state): State<WebState>) -> Response {
    match state.reader.available_sites().await {
        Ok(sites) => Json(json!({ "sites": sites })).into_response(),
        Err(e) => ledger_unavailable(e),
    }
}

/// GET /{site}/leaderboard?class= - ranked standings for one class
async fn leaderboard_handler(
    State(state): State<WebState>,
    Path(site): Path<String>,
    Query(query): Query<ClassQuery>,
) -> Response {
    let entries = match state
        .reader
        .leaderboard(&site, query.class(), query.offset, query.limit())
        .await
    {
        Ok(entries) => entries,
        Err(e) => return ledger_unavailable(e),
    };

    let lines: Vec<LeaderboardLine> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| LeaderboardLine {
            position: query.offset as usize + i + 1,
            steam_id: entry.steam_id,
            name: entry.name,
            avatar_url: entry.avatar_url,
            rating: rating_label(entry.rating),
            wins: entry.games_won,
            ties: entry.games_tied,
            losses: entry.games_played - (entry.games_won + entry.games_tied),
        })
        .collect();

    Json(json!({
        "site": site,
        "class": query.class(),
        "ratings": lines,
    }))
    .into_response()
}

/// GET /{site}/player/{steam_id}?class= - chronological rating history
async fn player_handler(
    State(state): State<WebState>,
    Path((site, steam_id)): Path<(String, SteamId)>,
    Query(query): Query<ClassQuery>,
) -> Response {
    let name = match state.reader.player_name(&site, steam_id).await {
        Ok(Some(name)) => name,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "player not found" })),
            )
                .into_response();
        }
        Err(e) => return ledger_unavailable(e),
    };

    let history = match state
        .reader
        .player_history(&site, steam_id, query.class())
        .await
    {
        Ok(history) => history,
        Err(e) => return ledger_unavailable(e),
    };

    let mut last_rating = None;
    let lines: Vec<HistoryLine> = history
        .into_iter()
        .map(|record| {
            let diff = match last_rating {
                Some(previous) => rating_label(record.rating - previous),
                None => 0,
            };
            last_rating = Some(record.rating);
            HistoryLine {
                match_id: record.match_id,
                rating: rating_label(record.rating),
                diff,
                result: record.result,
                red_score: record.red_score,
                blu_score: record.blu_score,
                ts: record.ts.to_rfc3339(),
            }
        })
        .collect();

    Json(json!({
        "site": site,
        "class": query.class(),
        "player": name,
        "steam_id": steam_id,
        "history": lines,
    }))
    .into_response()
}
