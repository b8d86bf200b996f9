//! Read-side entry point: serves leaderboards and rating history
//!
//! Pure read view over the ledger; the collector owns all writes.

use anyhow::Result;
use clap::Parser;
use pickup_ratings::ledger::PostgresLedger;
use pickup_ratings::web::{LeaderboardServer, WebServerConfig};
use std::env;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Pickup Ratings Leaderboard Server
#[derive(Parser)]
#[command(
    name = "leaderboard-server",
    version,
    about = "Serves per-class standings and player rating history as JSON"
)]
struct Args {
    /// Database URL (falls back to the DATABASE_URL environment variable)
    #[arg(
        long,
        value_name = "URL",
        help = "Postgres connection string for the rating ledger"
    )]
    database_url: Option<String>,

    /// Bind host
    #[arg(long, value_name = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port
    #[arg(short, long, value_name = "PORT", default_value_t = 8080)]
    port: u16,

    /// Log level
    #[arg(short, long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let database_url = match args.database_url.or_else(|| env::var("DATABASE_URL").ok()) {
        Some(url) => url,
        None => {
            eprintln!("Database URL missing: pass --database-url or set DATABASE_URL");
            std::process::exit(1);
        }
    };

    let ledger = Arc::new(PostgresLedger::connect(&database_url).await?);

    let server = Arc::new(LeaderboardServer::new(
        WebServerConfig {
            host: args.host,
            port: args.port,
        },
        ledger,
    ));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT (Ctrl+C) signal");
            signal_server.stop();
        }
    });

    server.start().await
}
